//! Upgrades of older documents, applied to the raw JSON before it is typed.

use serde_json::{Map, Value};

use crate::errors::LoadError;

/// Apply format migrations from `from_version` to `to_version`, one step at a time.
pub fn migrate(mut doc: Value, from_version: u32, to_version: u32) -> Result<Value, LoadError> {
    let mut version = from_version;
    while version < to_version {
        doc = match version {
            1 => v1_to_v2(doc).map_err(|reason| LoadError::MigrationFailed {
                from: 1,
                to: 2,
                reason,
            })?,
            _ => {
                return Err(LoadError::MigrationFailed {
                    from: version,
                    to: to_version,
                    reason: format!("no migration path from v{}", version),
                })
            }
        };
        version += 1;
        tracing::debug!(version, "document migrated");
    }
    Ok(doc)
}

/// Version 1 kept the history order under `order` and had no studio metadata.
fn v1_to_v2(mut doc: Value) -> Result<Value, String> {
    let studio = doc
        .get_mut("studio")
        .and_then(Value::as_object_mut)
        .ok_or("missing studio object")?;
    if let Some(order) = studio.remove("order") {
        studio.insert("op_order".into(), order);
    }
    studio
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(version) = doc.get_mut("version") {
        *version = Value::from(2u32);
    }
    Ok(doc)
}
