use history_types::{Fingerprint, FingerprintBuilder};

use crate::studio::PartStudio;
use crate::types::{EntityRef, NodeState, OpError, OpKind};

/// Content hash of everything that determines an op's output: its kind with
/// scalars resolved, and the identity and content of every entity it reads.
///
/// Referenced ops must already carry a `Built` state.
pub(crate) fn op_fingerprint(
    studio: &PartStudio,
    resolved: &OpKind,
    entities: &[EntityRef],
) -> Result<Fingerprint, OpError> {
    let invalid = |e: serde_json::Error| OpError::InvalidParameter {
        reason: format!("cannot encode op: {}", e),
    };
    let mut fp = FingerprintBuilder::new("op");
    fp.str(1, resolved.tag());
    fp.json(2, resolved).map_err(invalid)?;
    for entity in entities {
        match *entity {
            EntityRef::Op(id) => {
                let upstream = match studio.state(id) {
                    Some(NodeState::Built(result)) => result.fingerprint,
                    _ => return Err(OpError::UpstreamFailure { upstream: *entity }),
                };
                fp.bytes(3, id.as_bytes()).fingerprint(4, &upstream);
            }
            EntityRef::Sketch(id) => {
                let sketch = studio
                    .sketch(id)
                    .ok_or(OpError::DanglingReference { missing: *entity })?;
                fp.bytes(5, id.as_bytes());
                match studio.planes.get(&sketch.plane_id) {
                    Some(plane) => {
                        fp.json(6, plane).map_err(invalid)?;
                    }
                    None => {
                        fp.bytes(6, sketch.plane_id.as_bytes());
                    }
                }
                // Unsolved sketches still place; their users fail before hashing.
                match sketch.positions_fingerprint() {
                    Some(positions) => fp.fingerprint(7, &positions),
                    None => fp.fingerprint(8, &sketch.input_fingerprint()),
                };
                fp.fingerprint(9, &sketch.topology_fingerprint());
            }
        }
    }
    Ok(fp.finish())
}
