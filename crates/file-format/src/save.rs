use std::path::Path;

use feature_engine::PartStudio;
use serde::Serialize;

use crate::errors::SaveError;
use crate::metadata::ProjectMetadata;

/// Format identifier written into every document.
pub const FORMAT_ID: &str = "part-studio";

/// Current file format version.
pub const FORMAT_VERSION: u32 = 2;

/// The top-level file structure. Runtime state (node results, parameter
/// errors) is never written.
#[derive(Debug, Serialize)]
struct StudioFile<'a> {
    format: &'a str,
    version: u32,
    project: &'a ProjectMetadata,
    studio: &'a PartStudio,
}

/// Serialize a studio to a pretty-printed JSON string.
pub fn save_studio(studio: &PartStudio, metadata: &ProjectMetadata) -> Result<String, SaveError> {
    let file = StudioFile {
        format: FORMAT_ID,
        version: FORMAT_VERSION,
        project: metadata,
        studio,
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Stamp `metadata` and write the studio to `path`.
pub fn save_to_path(
    path: impl AsRef<Path>,
    studio: &PartStudio,
    metadata: &mut ProjectMetadata,
) -> Result<(), SaveError> {
    metadata.touch();
    let text = save_studio(studio, metadata)?;
    std::fs::write(path.as_ref(), text)?;
    tracing::info!(path = %path.as_ref().display(), ops = studio.len(), "studio saved");
    Ok(())
}
