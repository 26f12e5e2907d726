use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project metadata stored alongside the studio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Human-readable project name.
    pub name: String,
    /// When the project was first created.
    pub created: DateTime<Utc>,
    /// When the project was last saved.
    pub modified: DateTime<Utc>,
    /// Version of the engine that last wrote the file.
    #[serde(default)]
    pub generator: String,
}

impl ProjectMetadata {
    /// Create metadata with the given name and current timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created: now,
            modified: now,
            generator: generator(),
        }
    }

    /// Stamp a save.
    pub fn touch(&mut self) {
        self.modified = Utc::now().max(self.created);
        self.generator = generator();
    }
}

fn generator() -> String {
    concat!("file-format ", env!("CARGO_PKG_VERSION")).to_string()
}
