use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, Key, KeyData};

new_key_type! {
    /// Arena key for shapes stored inside a kernel session.
    pub struct ShapeKey;
}

/// Opaque handle to a shape owned by one kernel session.
/// NEVER persisted and never valid in another kernel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(u64);

impl ShapeHandle {
    /// Wrap a raw integer handle from an external kernel.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn from_key(key: ShapeKey) -> Self {
        Self(key.data().as_ffi())
    }

    pub(crate) fn key(self) -> ShapeKey {
        ShapeKey::from(KeyData::from_ffi(self.0))
    }
}

impl std::fmt::Display for ShapeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Topological kind of a stored shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Wire,
    Face,
    Solid,
}

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("invalid shape handle {handle}")]
    InvalidHandle { handle: ShapeHandle },

    #[error("{operation} expects a {expected:?}, got a {actual:?}")]
    WrongKind {
        operation: &'static str,
        expected: ShapeKind,
        actual: ShapeKind,
    },

    #[error("invalid input to {operation}: {reason}")]
    InvalidInput {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation} failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: &'static str },
}

impl KernelError {
    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        KernelError::InvalidInput {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn failed(operation: &'static str, reason: impl Into<String>) -> Self {
        KernelError::OperationFailed {
            operation,
            reason: reason.into(),
        }
    }
}

/// Tessellated triangle mesh. Plain buffers, safe to hand across threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Flat vertex positions [x0, y0, z0, x1, ...].
    pub positions: Vec<f32>,
    /// Flat vertex normals, same layout as `positions`.
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex arrays.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A face reported by topology enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceInfo {
    pub index: usize,
    pub center: [f64; 3],
    pub normal: [f64; 3],
    pub area: f64,
}

/// An edge reported by topology enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    pub index: usize,
    pub midpoint: [f64; 3],
    pub length: f64,
}

/// Handle bookkeeping counters for a kernel session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelStats {
    /// Shape-producing calls that were attempted, successful or not.
    pub calls: u64,
    /// Handles handed out.
    pub produced: u64,
    /// `free_shape` calls that released a live handle.
    pub freed: u64,
    /// `free_shape` calls on an unknown or already freed handle.
    pub redundant_frees: u64,
}
