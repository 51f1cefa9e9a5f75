use log::{debug, trace, warn};

use super::GenerationStage;
use crate::error::{FailureReason, GenerationFailure};
use crate::state::WorldState;

/// Stage marker plus the ordered, human-readable decision record of a run.
#[derive(Debug, Clone, Default)]
pub(crate) struct Trace {
    stage: GenerationStage,
    entries: Vec<String>,
}

impl Trace {
    pub(crate) fn enter(&mut self, stage: GenerationStage) {
        debug!("generation stage {} -> {stage}", self.stage);
        self.stage = stage;
    }

    #[cfg(test)]
    pub(crate) const fn stage(&self) -> GenerationStage {
        self.stage
    }

    pub(crate) fn record(&mut self, entry: String) {
        trace!("[{}] {entry}", self.stage);
        self.entries.push(format!("[{}] {entry}", self.stage));
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[String] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<String> {
        self.entries
    }

    /// Close the run as failed at the current stage.
    pub(crate) fn fail(
        mut self,
        reason: FailureReason,
        state: Option<&WorldState>,
    ) -> GenerationFailure {
        let stage = self.stage;
        warn!("generation failed during {stage}: {reason}");
        self.record(format!("failed: {reason}"));
        self.stage = GenerationStage::Failed;
        GenerationFailure {
            stage,
            reason,
            trace: self.entries,
            discovered: state
                .map(|state| state.discovered_regions().clone())
                .unwrap_or_default(),
            available: state.map_or(0, |state| state.available().len()),
            unreached: state.map_or(0, |state| state.unreached().len()),
        }
    }
}
