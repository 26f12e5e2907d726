use history_types::OpId;

use crate::rebuild::{rebuild, RebuildReport};
use crate::session::StudioSession;
use crate::studio::PartStudio;
use crate::types::{EngineError, Op};

/// How far down the history a rebuild goes. A view, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimelinePosition {
    /// Always the last op, however many there are.
    #[default]
    Tip,
    /// Last included op; -1 excludes everything.
    Index(i64),
}

impl TimelinePosition {
    /// Index of the last included op for a history of `len` ops, in `-1..len`.
    pub fn resolve(self, len: usize) -> i64 {
        let last = len as i64 - 1;
        match self {
            TimelinePosition::Tip => last,
            TimelinePosition::Index(i) => i.clamp(-1, last.max(-1)),
        }
    }
}

/// Rollback cursor over a studio. Position and suppression are independent:
/// moving the cursor never changes suppression flags and vice versa.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    position: TimelinePosition,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> TimelinePosition {
        self.position
    }

    pub fn rebuild(&self, studio: &mut PartStudio, session: &mut StudioSession) -> RebuildReport {
        rebuild(studio, session, self.position)
    }

    /// Move the cursor (clamped to the history) and rebuild.
    pub fn set_position(
        &mut self,
        studio: &mut PartStudio,
        session: &mut StudioSession,
        position: TimelinePosition,
    ) -> RebuildReport {
        self.position = match position {
            TimelinePosition::Tip => TimelinePosition::Tip,
            TimelinePosition::Index(_) => TimelinePosition::Index(position.resolve(studio.len())),
        };
        tracing::debug!(position = ?self.position, "timeline moved");
        self.rebuild(studio, session)
    }

    /// Flip an op's suppression and rebuild at the current position.
    pub fn toggle_suppress(
        &mut self,
        studio: &mut PartStudio,
        session: &mut StudioSession,
        id: OpId,
    ) -> Result<RebuildReport, EngineError> {
        let suppressed = studio.op(id).ok_or(EngineError::OpNotFound { id })?.suppressed;
        studio.set_suppressed(id, !suppressed)?;
        Ok(self.rebuild(studio, session))
    }

    /// Insert right after the cursor and advance the cursor onto the new op.
    pub fn insert_at_cursor(
        &mut self,
        studio: &mut PartStudio,
        session: &mut StudioSession,
        op: Op,
    ) -> Result<(OpId, RebuildReport), EngineError> {
        let at = (self.position.resolve(studio.len()) + 1) as usize;
        let id = studio.insert_op(op, at)?;
        if let TimelinePosition::Index(_) = self.position {
            self.position = TimelinePosition::Index(at as i64);
        }
        Ok((id, self.rebuild(studio, session)))
    }

    /// Delete an op, keeping an index cursor on the same surviving op.
    pub fn delete_op(
        &mut self,
        studio: &mut PartStudio,
        session: &mut StudioSession,
        id: OpId,
    ) -> Result<(Op, RebuildReport), EngineError> {
        let at = studio.position(id).ok_or(EngineError::OpNotFound { id })? as i64;
        let op = studio.delete_op(id)?;
        if let TimelinePosition::Index(i) = self.position {
            let i = if at <= i { i - 1 } else { i };
            self.position = TimelinePosition::Index(i.clamp(-1, studio.len() as i64 - 1));
        }
        Ok((op, self.rebuild(studio, session)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_clamps() {
        assert_eq!(TimelinePosition::Tip.resolve(3), 2);
        assert_eq!(TimelinePosition::Tip.resolve(0), -1);
        assert_eq!(TimelinePosition::Index(7).resolve(3), 2);
        assert_eq!(TimelinePosition::Index(-5).resolve(3), -1);
        assert_eq!(TimelinePosition::Index(1).resolve(0), -1);
    }
}
