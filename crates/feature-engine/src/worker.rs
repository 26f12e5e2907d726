//! Background rebuild worker.
//!
//! The studio and its session live on one thread. Callers queue edits and
//! cursor moves; every request bumps a shared generation counter, a pass that
//! falls behind the counter is cancelled, and only the frame of the newest
//! generation is ever published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use history_types::OpId;
use parking_lot::{Condvar, Mutex};
use shape_kernel::Mesh;

use crate::rebuild::{rebuild_with, RebuildReport};
use crate::session::StudioSession;
use crate::studio::PartStudio;
use crate::timeline::TimelinePosition;
use crate::types::{EngineError, NodeState};

/// Monotonic request counter shared between callers and the worker.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance and return the new generation.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A body the viewer should draw: a built op nothing downstream consumed.
#[derive(Debug, Clone)]
pub struct FrameBody {
    pub op: OpId,
    pub name: String,
    pub mesh: Arc<Mesh>,
}

/// Snapshot of one completed rebuild, safe to hand to another thread.
#[derive(Debug, Clone, Default)]
pub struct StudioFrame {
    pub generation: u64,
    pub bodies: Vec<FrameBody>,
    pub errors: Vec<(OpId, String)>,
    /// Edits the graph refused since the previous frame.
    pub rejected: Vec<String>,
}

impl StudioFrame {
    pub fn capture(studio: &PartStudio, report: &RebuildReport) -> Self {
        let has_shape = |id: &OpId| {
            studio
                .state(*id)
                .and_then(NodeState::result)
                .is_some_and(|r| r.shape.is_some())
        };
        let mut bodies = Vec::new();
        let mut errors = Vec::new();
        for op in studio.ops() {
            match studio.state(op.id) {
                Some(NodeState::Built(result)) => {
                    let Some(mesh) = &result.mesh else { continue };
                    if studio.dependents(op.id).iter().any(has_shape) {
                        continue;
                    }
                    bodies.push(FrameBody {
                        op: op.id,
                        name: op.name.clone(),
                        mesh: Arc::clone(mesh),
                    });
                }
                Some(NodeState::Failed(e)) => errors.push((op.id, e.to_string())),
                _ => {}
            }
        }
        Self {
            generation: report.generation,
            bodies,
            errors,
            rejected: Vec::new(),
        }
    }
}

pub type Edit = Box<dyn FnOnce(&mut PartStudio) -> Result<(), EngineError> + Send>;

enum Command {
    Edit(u64, Edit),
    SetPosition(u64, TimelinePosition),
    Shutdown,
}

type FrameSlot = Arc<(Mutex<Option<StudioFrame>>, Condvar)>;

/// Owns a studio on a background thread and rebuilds it on demand.
pub struct StudioWorker {
    tx: Sender<Command>,
    counter: GenerationCounter,
    frame: FrameSlot,
    handle: Option<JoinHandle<PartStudio>>,
}

impl StudioWorker {
    /// Move `studio` and `session` onto a new thread and start the first rebuild.
    pub fn spawn(studio: PartStudio, session: StudioSession) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let counter = GenerationCounter::new();
        let frame: FrameSlot = Arc::new((Mutex::new(None), Condvar::new()));

        let handle = {
            let counter = counter.clone();
            let frame = Arc::clone(&frame);
            std::thread::Builder::new()
                .name(format!("studio-{}", studio.id))
                .spawn(move || run(studio, session, rx, counter, frame))?
        };

        let worker = Self {
            tx,
            counter,
            frame,
            handle: Some(handle),
        };
        worker.set_position(TimelinePosition::Tip);
        Ok(worker)
    }

    /// Queue a graph edit. Returns the generation that will include it.
    pub fn edit(&self, edit: impl FnOnce(&mut PartStudio) -> Result<(), EngineError> + Send + 'static) -> u64 {
        let generation = self.counter.bump();
        self.send(Command::Edit(generation, Box::new(edit)));
        generation
    }

    pub fn set_position(&self, position: TimelinePosition) -> u64 {
        let generation = self.counter.bump();
        self.send(Command::SetPosition(generation, position));
        generation
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::warn!("studio worker is gone; request dropped");
        }
    }

    pub fn generation(&self) -> u64 {
        self.counter.current()
    }

    pub fn latest_frame(&self) -> Option<StudioFrame> {
        self.frame.0.lock().clone()
    }

    /// Block until a frame of at least `generation` is published.
    pub fn wait_for(&self, generation: u64, timeout: Duration) -> Option<StudioFrame> {
        let deadline = Instant::now() + timeout;
        let (slot, ready) = &*self.frame;
        let mut guard = slot.lock();
        loop {
            if let Some(frame) = guard.as_ref().filter(|f| f.generation >= generation) {
                return Some(frame.clone());
            }
            if ready.wait_until(&mut guard, deadline).timed_out() {
                return guard.as_ref().filter(|f| f.generation >= generation).cloned();
            }
        }
    }

    /// Stop the thread and take the studio back.
    pub fn shutdown(mut self) -> Option<PartStudio> {
        self.stop()
    }

    fn stop(&mut self) -> Option<PartStudio> {
        let handle = self.handle.take()?;
        let _ = self.tx.send(Command::Shutdown);
        match handle.join() {
            Ok(studio) => Some(studio),
            Err(_) => {
                tracing::error!("studio worker panicked");
                None
            }
        }
    }
}

impl Drop for StudioWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut studio: PartStudio,
    mut session: StudioSession,
    rx: Receiver<Command>,
    counter: GenerationCounter,
    frame: FrameSlot,
) -> PartStudio {
    let mut position = TimelinePosition::Tip;
    let mut rejected = Vec::new();

    'outer: while let Ok(first) = rx.recv() {
        let mut target = 0;
        let mut next = Some(first);
        while let Some(command) = next {
            match command {
                Command::Edit(generation, edit) => {
                    target = target.max(generation);
                    if let Err(e) = edit(&mut studio) {
                        tracing::warn!(error = %e, "edit rejected");
                        rejected.push(e.to_string());
                    }
                }
                Command::SetPosition(generation, p) => {
                    target = target.max(generation);
                    position = p;
                }
                Command::Shutdown => break 'outer,
            }
            next = rx.try_recv().ok();
        }

        session.set_generation(target);
        let cancel = || counter.current() > target;
        let report = rebuild_with(&mut studio, &mut session, position, &cancel);
        if report.cancelled {
            continue;
        }

        let mut captured = StudioFrame::capture(&studio, &report);
        let (slot, ready) = &*frame;
        let mut guard = slot.lock();
        if counter.current() != target {
            tracing::debug!(generation = target, "frame superseded before publish");
            continue;
        }
        captured.rejected = std::mem::take(&mut rejected);
        *guard = Some(captured);
        ready.notify_all();
    }

    tracing::debug!(studio = %studio.id, "studio worker stopped");
    studio
}
