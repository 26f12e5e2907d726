use std::path::Path;

use feature_engine::PartStudio;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::{FORMAT_ID, FORMAT_VERSION};

#[derive(Debug, Deserialize)]
struct StudioFileRaw {
    project: ProjectMetadata,
    studio: PartStudio,
}

/// A studio read back from disk. Every op starts out unbuilt.
#[derive(Debug, Clone)]
pub struct LoadedStudio {
    pub studio: PartStudio,
    pub project: ProjectMetadata,
    /// Version the file was written with, before migration.
    pub file_version: u32,
}

/// Deserialize a studio from a JSON string.
///
/// Checks the format identifier and version, migrates older documents and
/// validates the studio's structural invariants.
pub fn load_studio(json: &str) -> Result<LoadedStudio, LoadError> {
    let doc: Value = serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    let format = doc.get("format").and_then(Value::as_str).unwrap_or_default();
    if format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(format.to_string()));
    }
    let file_version = doc
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| LoadError::ParseError("missing or invalid version".into()))?;
    if file_version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version,
            supported_version: FORMAT_VERSION,
        });
    }

    let doc = if file_version < FORMAT_VERSION {
        crate::migrate::migrate(doc, file_version, FORMAT_VERSION)?
    } else {
        doc
    };

    let raw: StudioFileRaw = serde_json::from_value(doc).map_err(|e| LoadError::ParseError(e.to_string()))?;
    let mut studio = raw.studio;
    studio.validate()?;
    studio.params.validate()?;
    studio.params.evaluate_all();

    tracing::debug!(studio = %studio.id, ops = studio.len(), file_version, "studio loaded");
    Ok(LoadedStudio {
        studio,
        project: raw.project,
        file_version,
    })
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoadedStudio, LoadError> {
    let text = std::fs::read_to_string(path)?;
    load_studio(&text)
}
