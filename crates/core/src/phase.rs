//! The four phases a sub-timestep's physics pipeline runs through.

/// A phase of the per-sub-timestep physics pipeline.
///
/// Phases run in this order for every sub-timestep: `Halo` steps act
/// once per halo before any galaxy-level physics; `Galaxy` steps act on
/// every non-merged galaxy; `Post` steps run after mergers queued
/// during `Galaxy` have been drained and applied; `Final` runs once per
/// halo after all sub-timesteps for that halo have completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Runs once per halo, before galaxy-level physics.
    Halo,
    /// Runs once per non-merged galaxy, every sub-timestep.
    Galaxy,
    /// Runs once per sub-timestep, after mergers have been applied.
    Post,
    /// Runs once per halo, after every sub-timestep has completed.
    Final,
}

impl Phase {
    /// All phases, in pipeline execution order.
    pub const ALL: [Phase; 4] = [Phase::Halo, Phase::Galaxy, Phase::Post, Phase::Final];

    /// Dense index into a fixed `[T; 4]` array, stable across the
    /// lifetime of the process.
    pub fn index(self) -> usize {
        match self {
            Phase::Halo => 0,
            Phase::Galaxy => 1,
            Phase::Post => 2,
            Phase::Final => 3,
        }
    }

    /// Short, lowercase name used in logging and diagnostic summaries.
    pub fn name(self) -> &'static str {
        match self {
            Phase::Halo => "halo",
            Phase::Galaxy => "galaxy",
            Phase::Post => "post",
            Phase::Final => "final",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_and_unique() {
        let mut seen = [false; 4];
        for phase in Phase::ALL {
            assert!(!seen[phase.index()]);
            seen[phase.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
