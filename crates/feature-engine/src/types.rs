use std::fmt;
use std::sync::Arc;

use history_types::{Fingerprint, OpId, Scalar, SketchId};
use modeling_ops::{BooleanKind, EdgeSelection};
use serde::{Deserialize, Serialize};
use shape_kernel::{Mesh, ShapeHandle};

/// A single entry in a part studio's feature history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    pub id: OpId,
    /// User-visible name.
    pub name: String,
    /// Suppressed ops stay in the history but produce nothing.
    #[serde(default)]
    pub suppressed: bool,
    pub kind: OpKind,
}

impl Op {
    pub fn new(name: impl Into<String>, kind: OpKind) -> Self {
        Self {
            id: OpId::new(),
            name: name.into(),
            suppressed: false,
            kind,
        }
    }
}

/// A modeling operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpKind {
    /// Places a sketch in the timeline. Produces no solid.
    Sketch { sketch: SketchId },
    Extrude {
        sketch: SketchId,
        depth: Scalar,
        #[serde(default)]
        direction: Option<[f64; 3]>,
        #[serde(default)]
        symmetric: bool,
    },
    Revolve {
        sketch: SketchId,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle_deg: Scalar,
    },
    Sweep { profile: SketchId, path: SketchId },
    Loft { sections: Vec<SketchId> },
    Boolean { kind: BooleanKind, target: OpId, tool: OpId },
    Fillet {
        target: OpId,
        edges: EdgeSelection,
        radius: Scalar,
    },
    Chamfer {
        target: OpId,
        edges: EdgeSelection,
        distance: Scalar,
    },
    Shell {
        target: OpId,
        faces: Vec<usize>,
        thickness: Scalar,
    },
    Pattern { target: OpId, layout: PatternLayout },
    Mirror {
        target: OpId,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
        #[serde(default)]
        keep_original: bool,
    },
    Box {
        origin: [f64; 3],
        dx: Scalar,
        dy: Scalar,
        dz: Scalar,
    },
    Cylinder {
        origin: [f64; 3],
        radius: Scalar,
        height: Scalar,
    },
    Sphere { center: [f64; 3], radius: Scalar },
    Cone {
        origin: [f64; 3],
        bottom_radius: Scalar,
        top_radius: Scalar,
        height: Scalar,
    },
    Transform {
        target: OpId,
        #[serde(default)]
        translation: [f64; 3],
        #[serde(default = "default_axis")]
        rotation_axis: [f64; 3],
        rotation_deg: Scalar,
        scale: Scalar,
    },
}

fn default_axis() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

impl OpKind {
    /// Stable tag used in logs and fingerprints.
    pub fn tag(&self) -> &'static str {
        match self {
            OpKind::Sketch { .. } => "sketch",
            OpKind::Extrude { .. } => "extrude",
            OpKind::Revolve { .. } => "revolve",
            OpKind::Sweep { .. } => "sweep",
            OpKind::Loft { .. } => "loft",
            OpKind::Boolean { .. } => "boolean",
            OpKind::Fillet { .. } => "fillet",
            OpKind::Chamfer { .. } => "chamfer",
            OpKind::Shell { .. } => "shell",
            OpKind::Pattern { .. } => "pattern",
            OpKind::Mirror { .. } => "mirror",
            OpKind::Box { .. } => "box",
            OpKind::Cylinder { .. } => "cylinder",
            OpKind::Sphere { .. } => "sphere",
            OpKind::Cone { .. } => "cone",
            OpKind::Transform { .. } => "transform",
        }
    }

    /// The sketch this op places in the timeline, if it is a sketch op.
    pub fn defined_sketch(&self) -> Option<SketchId> {
        match self {
            OpKind::Sketch { sketch } => Some(*sketch),
            _ => None,
        }
    }

    /// Copy of this kind with every scalar replaced by its resolved value.
    pub fn resolve_scalars<E>(&self, eval: &mut dyn FnMut(&Scalar) -> Result<f64, E>) -> Result<OpKind, E> {
        let mut out = self.clone();
        for scalar in out.scalars_mut() {
            *scalar = Scalar::Value(eval(scalar)?);
        }
        Ok(out)
    }

    fn scalars_mut(&mut self) -> Vec<&mut Scalar> {
        match self {
            OpKind::Sketch { .. } | OpKind::Sweep { .. } | OpKind::Loft { .. } | OpKind::Boolean { .. } => {
                Vec::new()
            }
            OpKind::Mirror { .. } => Vec::new(),
            OpKind::Extrude { depth, .. } => vec![depth],
            OpKind::Revolve { angle_deg, .. } => vec![angle_deg],
            OpKind::Fillet { radius, .. } => vec![radius],
            OpKind::Chamfer { distance, .. } => vec![distance],
            OpKind::Shell { thickness, .. } => vec![thickness],
            OpKind::Pattern { layout, .. } => match layout {
                PatternLayout::Linear { spacing, .. } => vec![spacing],
                PatternLayout::Circular { total_angle_deg, .. } => vec![total_angle_deg],
            },
            OpKind::Box { dx, dy, dz, .. } => vec![dx, dy, dz],
            OpKind::Cylinder { radius, height, .. } => vec![radius, height],
            OpKind::Sphere { radius, .. } => vec![radius],
            OpKind::Cone {
                bottom_radius,
                top_radius,
                height,
                ..
            } => vec![bottom_radius, top_radius, height],
            OpKind::Transform {
                rotation_deg, scale, ..
            } => vec![rotation_deg, scale],
        }
    }
}

/// Pattern layout as stored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PatternLayout {
    Linear {
        direction: [f64; 3],
        spacing: Scalar,
        count: u32,
    },
    Circular {
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        count: u32,
        total_angle_deg: Scalar,
    },
}

/// Partial update for [`crate::PartStudio::update_op`].
#[derive(Debug, Clone, Default)]
pub struct OpPatch {
    pub name: Option<String>,
    pub kind: Option<OpKind>,
}

/// Something an op can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    Sketch(SketchId),
    Op(OpId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Sketch(id) => write!(f, "{}", id),
            EntityRef::Op(id) => write!(f, "{}", id),
        }
    }
}

/// Output of a successful build.
#[derive(Debug, Clone, PartialEq)]
pub struct OpResult {
    /// Absent for sketch ops.
    pub shape: Option<ShapeHandle>,
    /// Tessellated from `shape` in the same build.
    pub mesh: Option<Arc<Mesh>>,
    pub fingerprint: Fingerprint,
}

/// Runtime build state of an op. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeState {
    #[default]
    Unbuilt,
    Built(OpResult),
    Failed(OpError),
}

impl NodeState {
    pub fn is_built(&self) -> bool {
        matches!(self, NodeState::Built(_))
    }

    pub fn result(&self) -> Option<&OpResult> {
        match self {
            NodeState::Built(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&OpError> {
        match self {
            NodeState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// An op together with its runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpNode {
    pub op: Op,
    #[serde(skip)]
    pub state: NodeState,
    /// Forces the next rebuild to re-execute even if the fingerprint matches.
    #[serde(skip)]
    pub stale: bool,
}

impl OpNode {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            state: NodeState::Unbuilt,
            stale: false,
        }
    }
}

/// Per-op build failure. Attached to the node, never aborts a rebuild.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    #[error("upstream {upstream} did not build")]
    UpstreamFailure { upstream: EntityRef },

    #[error("reference to missing {missing}")]
    DanglingReference { missing: EntityRef },

    #[error("kernel failure: {0}")]
    KernelFailure(String),

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}

impl From<modeling_ops::OpError> for OpError {
    fn from(e: modeling_ops::OpError) -> Self {
        match e {
            modeling_ops::OpError::Kernel(k) => OpError::KernelFailure(k.to_string()),
            other => OpError::InvalidParameter {
                reason: other.to_string(),
            },
        }
    }
}

/// Errors from document mutations. A rejected mutation leaves the studio unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("op {op} at position {position} cannot reference {reference} at position {reference_position}")]
    ForwardReferenceViolation {
        op: OpId,
        reference: EntityRef,
        position: i64,
        reference_position: i64,
    },

    #[error("op not found: {id}")]
    OpNotFound { id: OpId },

    #[error("sketch not found: {id}")]
    SketchNotFound { id: SketchId },

    #[error("plane not found: {id}")]
    PlaneNotFound { id: history_types::PlaneId },

    #[error("duplicate op id: {id}")]
    DuplicateOp { id: OpId },

    #[error("{sketch} is already placed by {by}")]
    SketchAlreadyPlaced { sketch: SketchId, by: OpId },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("parameter not found: {id}")]
    ParamNotFound { id: history_types::ParamId },

    #[error("a parameter named '{name}' already exists")]
    DuplicateParamName { name: String },

    #[error("'{name}' is not a valid parameter name")]
    InvalidParamName { name: String },
}
