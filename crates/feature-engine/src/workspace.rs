use std::collections::BTreeMap;

use history_types::StudioId;

use crate::rebuild::{rebuild, RebuildReport};
use crate::session::StudioSession;
use crate::studio::PartStudio;
use crate::timeline::TimelinePosition;

struct Entry {
    studio: PartStudio,
    session: StudioSession,
    position: TimelinePosition,
}

/// Several independent part studios. Each has its own session, so studios
/// rebuild in parallel without sharing any geometry state.
#[derive(Default)]
pub struct Workspace {
    entries: BTreeMap<StudioId, Entry>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a studio, replacing any previous one with the same id.
    pub fn add(&mut self, studio: PartStudio, session: StudioSession) -> StudioId {
        let id = studio.id;
        self.entries.insert(
            id,
            Entry {
                studio,
                session,
                position: TimelinePosition::Tip,
            },
        );
        id
    }

    pub fn remove(&mut self, id: StudioId) -> Option<(PartStudio, StudioSession)> {
        self.entries.remove(&id).map(|e| (e.studio, e.session))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = StudioId> + '_ {
        self.entries.keys().copied()
    }

    pub fn studio(&self, id: StudioId) -> Option<&PartStudio> {
        self.entries.get(&id).map(|e| &e.studio)
    }

    pub fn studio_mut(&mut self, id: StudioId) -> Option<&mut PartStudio> {
        self.entries.get_mut(&id).map(|e| &mut e.studio)
    }

    pub fn session(&self, id: StudioId) -> Option<&StudioSession> {
        self.entries.get(&id).map(|e| &e.session)
    }

    pub fn set_position(&mut self, id: StudioId, position: TimelinePosition) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.position = position;
                true
            }
            None => false,
        }
    }

    /// Rebuild one studio on the calling thread.
    pub fn rebuild(&mut self, id: StudioId) -> Option<RebuildReport> {
        let entry = self.entries.get_mut(&id)?;
        Some(rebuild(&mut entry.studio, &mut entry.session, entry.position))
    }

    /// Rebuild every studio, one scoped thread each.
    pub fn rebuild_all(&mut self) -> BTreeMap<StudioId, RebuildReport> {
        std::thread::scope(|scope| {
            let running: Vec<_> = self
                .entries
                .iter_mut()
                .map(|(id, entry)| {
                    let id = *id;
                    let handle = scope.spawn(move || rebuild(&mut entry.studio, &mut entry.session, entry.position));
                    (id, handle)
                })
                .collect();
            running
                .into_iter()
                .filter_map(|(id, handle)| match handle.join() {
                    Ok(report) => Some((id, report)),
                    Err(_) => {
                        tracing::error!(studio = %id, "rebuild thread panicked");
                        None
                    }
                })
                .collect()
        })
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("studios", &self.entries.len()).finish()
    }
}
