//! Scope guard for intermediate kernel handles.

use shape_kernel::{Kernel, KernelError, ShapeHandle};

/// Owns every handle produced through it and frees them when dropped.
///
/// The one handle an operation hands back to its caller is taken out with
/// [`Scratch::keep`]; wires, faces, copies and partial results stay tracked
/// and are released on both the success and the error path.
pub struct Scratch<'k> {
    kernel: &'k mut dyn Kernel,
    handles: Vec<ShapeHandle>,
}

impl<'k> Scratch<'k> {
    pub fn new(kernel: &'k mut dyn Kernel) -> Self {
        Self {
            kernel,
            handles: Vec::new(),
        }
    }

    /// Run a shape-producing kernel call and track its result.
    pub fn run(
        &mut self,
        f: impl FnOnce(&mut dyn Kernel) -> Result<ShapeHandle, KernelError>,
    ) -> Result<ShapeHandle, KernelError> {
        let handle = f(&mut *self.kernel)?;
        self.handles.push(handle);
        Ok(handle)
    }

    /// Read-only access for queries such as `edges` or `faces`.
    pub fn kernel(&self) -> &dyn Kernel {
        &*self.kernel
    }

    /// Stop tracking `handle`; the caller now owns it.
    pub fn keep(mut self, handle: ShapeHandle) -> ShapeHandle {
        self.handles.retain(|h| *h != handle);
        handle
    }

    pub fn tracked(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.kernel.free_shape(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shape_kernel::MockKernel;

    #[test]
    fn intermediates_freed_on_success() {
        let mut kernel = MockKernel::new();
        let kept = {
            let mut s = Scratch::new(&mut kernel);
            let a = s.run(|k| k.make_box([0.0; 3], [1.0; 3])).unwrap();
            let b = s.run(|k| k.translate(a, [2.0, 0.0, 0.0])).unwrap();
            assert_eq!(s.tracked(), 2);
            s.keep(b)
        };
        assert_eq!(kernel.live_shape_count(), 1);
        assert!(kernel.volume(kept).is_ok());
    }

    #[test]
    fn intermediates_freed_on_error() {
        let mut kernel = MockKernel::new();
        kernel.inject_failure("translate", "boom");
        let result = {
            let mut s = Scratch::new(&mut kernel);
            s.run(|k| k.make_box([0.0; 3], [1.0; 3]))
                .and_then(|a| s.run(|k| k.translate(a, [1.0, 0.0, 0.0])))
        };
        assert!(result.is_err());
        assert_eq!(kernel.live_shape_count(), 0);
        assert_eq!(kernel.stats().redundant_frees, 0);
    }
}
