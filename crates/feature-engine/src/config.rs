use serde::{Deserialize, Serialize};

/// Engine tuning knobs. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chordal deflection passed to the kernel when meshing results.
    pub mesh_deflection: f64,
    /// Upper bound on pattern instance counts.
    pub max_pattern_count: u32,
    /// Emit a debug line for every reused op.
    pub log_reuse: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mesh_deflection: 0.05,
            max_pattern_count: 1000,
            log_reuse: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "max_pattern_count": 8 }"#).unwrap();
        assert_eq!(config.max_pattern_count, 8);
        assert_eq!(config.mesh_deflection, EngineConfig::default().mesh_deflection);
    }
}
