//! Traits for external collaborators the evolution driver calls out to:
//! an output writer and a merger-handling plugin. Both are supplied by
//! the embedding application; this crate only defines the seam.

use crate::context::EvolutionContext;
use galform_core::EvolutionResult;
use galform_primitives::{Galaxy, MergerEvent};

/// Receives finished galaxy records at each output snapshot.
///
/// Implementations typically buffer records and flush them to HDF5 or
/// binary tree files; this crate has no opinion on the output format.
pub trait GalaxyOutputWriter {
    /// Commit one galaxy's record at `snap`.
    fn commit(&mut self, galaxy: &Galaxy, snap: i32) -> EvolutionResult<()>;

    /// Patch a previously committed galaxy's merger target, used when a
    /// galaxy's eventual merge destination is only known after the
    /// destination itself has been committed.
    fn patch_merge_target(
        &mut self,
        committed_index: u64,
        merge_into_id: i64,
        merge_into_snap: i32,
    ) -> EvolutionResult<()>;
}

/// Applies a queued merger's physical consequences to the surviving
/// central once both galaxies have finished their sub-timestep's galaxy
/// phase.
pub trait MergerHandler {
    /// Mutate the central named by `event.central_index` to absorb the
    /// satellite named by `event.satellite_index`.
    ///
    /// Called after the satellite and central galaxy records both exist
    /// in `ctx`, with the satellite still carrying its pre-merger
    /// property values. The handler is responsible for marking the
    /// satellite as [`galform_core::GalaxyType::Merged`]; the driver
    /// does not do this automatically, since some merger types (disk
    /// instability, for instance) do not consume a second galaxy.
    fn handle_merger(&mut self, ctx: &mut EvolutionContext, event: &MergerEvent) -> EvolutionResult<()>;
}
