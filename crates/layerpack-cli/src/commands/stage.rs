use std::fmt;

/// Position of a pipeline run.
///
/// ```text
/// Init → WorkspaceReady → DependenciesAcquired → [Extracted] → Archived → [Published] → Done
/// ```
///
/// Cleanup of the build root runs from any stage; a failed run ends
/// aborted at the stage it had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    Init,
    WorkspaceReady,
    DependenciesAcquired,
    Extracted,
    Archived,
    Published,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::WorkspaceReady => "workspace-ready",
            Stage::DependenciesAcquired => "dependencies-acquired",
            Stage::Extracted => "extracted",
            Stage::Archived => "archived",
            Stage::Published => "published",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Records the stages a run passes through.
#[derive(Debug)]
pub(crate) struct Stages {
    pipeline: &'static str,
    reached: Vec<Stage>,
}

impl Stages {
    pub(crate) fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            reached: vec![Stage::Init],
        }
    }

    pub(crate) fn current(&self) -> Stage {
        self.reached.last().copied().unwrap_or(Stage::Init)
    }

    pub(crate) fn reached(&self) -> &[Stage] {
        &self.reached
    }

    /// Move forward to `next`. Stages only ever advance.
    pub(crate) fn advance(&mut self, next: Stage) {
        let current = self.current();
        debug_assert!(next > current, "stage {next} does not follow {current}");
        tracing::info!(pipeline = self.pipeline, from = %current, to = %next, "stage");
        self.reached.push(next);
    }

    /// Log the outcome of a run. Failed runs are reported as aborted at the
    /// last stage reached.
    pub(crate) fn finish<T>(&self, result: &anyhow::Result<T>) {
        match result {
            Ok(_) => tracing::info!(
                pipeline = self.pipeline,
                stages = ?self.reached(),
                "build directory torn down"
            ),
            Err(e) => tracing::error!(
                pipeline = self.pipeline,
                stage = %self.current(),
                error = %e,
                "aborted; build directory torn down"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_init() {
        let stages = Stages::new("manifest");
        assert_eq!(stages.current(), Stage::Init);
        assert_eq!(stages.reached(), [Stage::Init]);
    }

    #[test]
    fn optional_stages_can_be_skipped() {
        let mut stages = Stages::new("manifest");
        stages.advance(Stage::WorkspaceReady);
        stages.advance(Stage::DependenciesAcquired);
        stages.advance(Stage::Archived);
        stages.advance(Stage::Done);

        assert_eq!(stages.current(), Stage::Done);
        assert!(!stages.reached().contains(&Stage::Extracted));
        assert!(!stages.reached().contains(&Stage::Published));
    }

    #[test]
    fn stage_names_are_kebab_case() {
        assert_eq!(Stage::DependenciesAcquired.to_string(), "dependencies-acquired");
        assert_eq!(Stage::Done.to_string(), "done");
    }
}
