//! Ownership of kernel handles that outlive a single build step.

use std::collections::{HashMap, HashSet};

use history_types::OpId;
use shape_kernel::{Kernel, ShapeHandle};

/// Sole owner of one kernel handle. Must be given back with [`OwnedShape::release`];
/// dropping it while armed leaks the kernel shape and logs a warning.
#[derive(Debug)]
pub struct OwnedShape {
    handle: ShapeHandle,
    armed: bool,
}

impl OwnedShape {
    pub fn new(handle: ShapeHandle) -> Self {
        Self { handle, armed: true }
    }

    pub fn handle(&self) -> ShapeHandle {
        self.handle
    }

    /// Free the kernel shape. Returns what `free_shape` reported.
    pub fn release(mut self, kernel: &mut dyn Kernel) -> bool {
        self.armed = false;
        kernel.free_shape(self.handle)
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for OwnedShape {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(handle = %self.handle, "shape handle dropped without release, kernel shape leaked");
        }
    }
}

/// Maps each op to the one handle it currently owns.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    owned: HashMap<OpId, OwnedShape>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    pub fn handle(&self, op: OpId) -> Option<ShapeHandle> {
        self.owned.get(&op).map(OwnedShape::handle)
    }

    /// Take ownership of `handle` for `op`, freeing whatever `op` held before.
    pub fn adopt(&mut self, kernel: &mut dyn Kernel, op: OpId, handle: ShapeHandle) {
        if let Some(previous) = self.owned.insert(op, OwnedShape::new(handle)) {
            if previous.handle() == handle {
                previous.disarm();
            } else {
                previous.release(kernel);
            }
        }
    }

    /// Free and forget the handle owned by `op`, if any.
    pub fn release(&mut self, kernel: &mut dyn Kernel, op: OpId) -> bool {
        match self.owned.remove(&op) {
            Some(owned) => owned.release(kernel),
            None => false,
        }
    }

    /// Free every handle whose owner is not in `live`. Returns how many were freed.
    pub fn retain(&mut self, kernel: &mut dyn Kernel, live: &HashSet<OpId>) -> usize {
        let dead: Vec<OpId> = self.owned.keys().filter(|op| !live.contains(op)).copied().collect();
        for op in &dead {
            self.release(kernel, *op);
        }
        dead.len()
    }

    pub fn release_all(&mut self, kernel: &mut dyn Kernel) -> usize {
        let count = self.owned.len();
        for (_, owned) in self.owned.drain() {
            owned.release(kernel);
        }
        count
    }
}
