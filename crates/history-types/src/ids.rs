use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Allocate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifies an operation in a part studio's feature history.
    OpId,
    "op"
);
uuid_id!(
    /// Identifies a sketch owned by a part studio.
    SketchId,
    "sketch"
);
uuid_id!(
    /// Identifies a named parameter.
    ParamId,
    "param"
);
uuid_id!(
    /// Identifies a construction plane.
    PlaneId,
    "plane"
);
uuid_id!(
    /// Identifies a part studio document.
    StudioId,
    "studio"
);

/// Sketch-local id shared by primitives and constraints.
pub type ElementId = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = OpId::new();
        let b = OpId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("op:"));
        assert!(SketchId::new().to_string().starts_with("sketch:"));
    }

    #[test]
    fn ids_serialize_as_bare_uuid() {
        let id = ParamId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
