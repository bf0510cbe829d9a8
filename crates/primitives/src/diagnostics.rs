//! Per-run diagnostics: phase execution counts and timings, core
//! infrastructure event tallies, and merger tallies split by merger
//! type, gathered for logging and for tests that assert the pipeline
//! actually ran.

use galform_core::{EvolutionError, EvolutionResult, MergeType, Phase};
use std::time::{Duration, Instant};

/// Where a newly constructed galaxy came from, for the created/copied
/// breakdown [`Diagnostics`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalaxyOrigin {
    /// Seeded fresh — no occupied progenitor to carry forward.
    Created,
    /// Carried forward from a progenitor's galaxy record.
    Copied,
}

/// The closed set of core infrastructure events [`Diagnostics`] tallies
/// outside of phase bookkeeping and merger tallies.
///
/// [`Diagnostics::record_event`] is the single entry point for these;
/// anything not named here is rejected rather than silently counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A forest's evolution pipeline began.
    PipelineStarted,
    /// A forest's evolution pipeline completed, successfully or not.
    PipelineCompleted,
    /// A physics module was enabled.
    ModuleActivated,
    /// A physics module was disabled.
    ModuleDeactivated,
}

impl DiagnosticEvent {
    /// Parses the event's canonical lowercase, underscore-separated
    /// name. Used by [`Diagnostics::record_named_event`], the boundary
    /// at which an unrecognized name is rejected rather than ignored.
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "pipeline_started" => Some(DiagnosticEvent::PipelineStarted),
            "pipeline_completed" => Some(DiagnosticEvent::PipelineCompleted),
            "module_activated" => Some(DiagnosticEvent::ModuleActivated),
            "module_deactivated" => Some(DiagnosticEvent::ModuleDeactivated),
            _ => None,
        }
    }
}

/// Elapsed-time and throughput figures computed once evolution for a
/// run (or forest) has finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Wall-clock seconds between [`Diagnostics::start_pipeline`] and
    /// [`Diagnostics::finalize`]. Zero if the pipeline was never
    /// started.
    pub elapsed_secs: f64,
    /// `galaxies / elapsed_secs`, clamped to `0.0` rather than dividing
    /// by a non-positive elapsed time.
    pub galaxies_per_second: f64,
}

const MERGE_TYPE_VARIANTS: usize = 5;

fn merge_type_index(merge_type: MergeType) -> usize {
    merge_type.as_i32() as usize
}

/// Accumulated counts and timings for one run (or one forest, if the
/// caller resets it per forest).
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    phase_calls: [u64; 4],
    phase_duration: [Duration; 4],
    phase_started: [u64; 4],
    phase_completed: [u64; 4],
    phase_open_since: [Option<Instant>; 4],
    galaxy_phase_steps: u64,
    halos_processed: u64,
    galaxies_created: u64,
    galaxies_copied: u64,
    galaxies_merged: u64,
    mergers_detected: [u64; MERGE_TYPE_VARIANTS],
    mergers_applied: [u64; MERGE_TYPE_VARIANTS],
    pipeline_started: u64,
    pipeline_completed: u64,
    modules_activated: u64,
    modules_deactivated: u64,
    run_started_at: Option<Instant>,
    last_summary: Option<RunSummary>,
}

impl Diagnostics {
    /// A fresh, all-zero counter set.
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Mark the start of a phase's execution for timing and pairing
    /// purposes. Overwrites any previously open start for this phase —
    /// a phase is never meaningfully re-entered without an intervening
    /// [`Diagnostics::end_phase`] in this single-threaded driver.
    pub fn start_phase(&mut self, phase: Phase) {
        self.phase_started[phase.index()] += 1;
        self.phase_open_since[phase.index()] = Some(Instant::now());
    }

    /// Pair off a prior [`Diagnostics::start_phase`] call, recording the
    /// elapsed wall time and incrementing the phase's invocation count.
    ///
    /// Ending a phase that was never started is an invariant violation:
    /// [`Diagnostics`] has no forest or halo context of its own, so the
    /// error carries only the phase name; callers with forest context
    /// (the engine's pipeline registry) should wrap it with
    /// `EvolutionError::invariant` if they need that detail attached.
    pub fn end_phase(&mut self, phase: Phase) -> EvolutionResult<()> {
        let idx = phase.index();
        let Some(started_at) = self.phase_open_since[idx].take() else {
            return Err(EvolutionError::contract_violation(format!(
                "end_phase({}) called without a matching start_phase",
                phase.name()
            )));
        };
        self.phase_calls[idx] += 1;
        self.phase_duration[idx] += started_at.elapsed();
        self.phase_completed[idx] += 1;
        Ok(())
    }

    /// Record that `phase` ran once more, taking `elapsed` wall time,
    /// without going through the [`Diagnostics::start_phase`] /
    /// [`Diagnostics::end_phase`] pair. Kept for callers that already
    /// measure elapsed time themselves.
    pub fn record_phase(&mut self, phase: Phase, elapsed: Duration) {
        self.phase_calls[phase.index()] += 1;
        self.phase_duration[phase.index()] += elapsed;
    }

    /// Record that one more halo was processed by the traversal driver.
    pub fn record_halo_processed(&mut self) {
        self.halos_processed += 1;
    }

    /// Record that one more galaxy was constructed, split by whether it
    /// was seeded fresh or carried forward from a progenitor.
    pub fn record_galaxy_constructed(&mut self, origin: GalaxyOrigin) {
        match origin {
            GalaxyOrigin::Created => self.galaxies_created += 1,
            GalaxyOrigin::Copied => self.galaxies_copied += 1,
        }
    }

    /// Record that one more galaxy became merged (consumed and excluded
    /// from further GALAXY-phase execution and from output).
    pub fn record_galaxy_merged(&mut self) {
        self.galaxies_merged += 1;
    }

    /// Record that a merger of `merge_type` was detected and queued.
    pub fn record_merger_detected(&mut self, merge_type: MergeType) {
        self.mergers_detected[merge_type_index(merge_type)] += 1;
    }

    /// Record that a merger of `merge_type` was drained and handled.
    pub fn record_merger_applied(&mut self, merge_type: MergeType) {
        self.mergers_applied[merge_type_index(merge_type)] += 1;
    }

    /// Record that one more sub-timestep reached the galaxy phase,
    /// independent of how many galaxies it dispatched to.
    ///
    /// [`Diagnostics::phase_call_count`] for [`Phase::Galaxy`] counts one
    /// call per live galaxy per sub-timestep; this counts one per
    /// sub-timestep regardless of galaxy count, distinguishing a halo's
    /// step count from its total galaxy-phase dispatch count.
    pub fn record_galaxy_phase_step(&mut self) {
        self.galaxy_phase_steps += 1;
    }

    /// Record one of the closed set of core infrastructure events.
    pub fn record_event(&mut self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::PipelineStarted => self.pipeline_started += 1,
            DiagnosticEvent::PipelineCompleted => self.pipeline_completed += 1,
            DiagnosticEvent::ModuleActivated => self.modules_activated += 1,
            DiagnosticEvent::ModuleDeactivated => self.modules_deactivated += 1,
        }
    }

    /// Record a core infrastructure event by its canonical name,
    /// rejecting anything outside [`DiagnosticEvent`]'s closed set
    /// rather than counting it silently.
    pub fn record_named_event(&mut self, name: &str) -> EvolutionResult<()> {
        let event = DiagnosticEvent::from_name(name)
            .ok_or_else(|| EvolutionError::unknown_option(format!("diagnostic event '{name}'")))?;
        self.record_event(event);
        Ok(())
    }

    /// Mark the start of a pipeline run (one forest's evolution), for
    /// [`Diagnostics::finalize`]'s elapsed-time calculation.
    pub fn start_pipeline(&mut self) {
        self.run_started_at = Some(Instant::now());
        self.record_event(DiagnosticEvent::PipelineStarted);
    }

    /// Finalize the run: records pipeline completion and computes
    /// elapsed seconds and galaxies/second, guarding division by a
    /// zero or negative elapsed time by reporting `0.0` throughput
    /// rather than dividing.
    pub fn finalize(&mut self) -> RunSummary {
        self.record_event(DiagnosticEvent::PipelineCompleted);
        let elapsed_secs = self
            .run_started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let galaxies = (self.galaxies_created + self.galaxies_copied) as f64;
        let galaxies_per_second = if elapsed_secs > 0.0 { galaxies / elapsed_secs } else { 0.0 };
        let summary = RunSummary { elapsed_secs, galaxies_per_second };
        self.last_summary = Some(summary);
        summary
    }

    /// The most recent [`RunSummary`] computed by
    /// [`Diagnostics::finalize`], if it has been called.
    pub fn last_summary(&self) -> Option<RunSummary> {
        self.last_summary
    }

    /// Number of sub-timesteps that reached the galaxy phase.
    pub fn galaxy_phase_steps(&self) -> u64 {
        self.galaxy_phase_steps
    }

    /// Number of times `phase` has run.
    pub fn phase_call_count(&self, phase: Phase) -> u64 {
        self.phase_calls[phase.index()]
    }

    /// Total wall time spent in `phase` across every call.
    pub fn phase_total_duration(&self, phase: Phase) -> Duration {
        self.phase_duration[phase.index()]
    }

    /// Number of times `start_phase(phase)` has been called.
    pub fn phase_started_count(&self, phase: Phase) -> u64 {
        self.phase_started[phase.index()]
    }

    /// Number of times `end_phase(phase)` has successfully paired off a
    /// start.
    pub fn phase_completed_count(&self, phase: Phase) -> u64 {
        self.phase_completed[phase.index()]
    }

    /// Total halos processed so far.
    pub fn halos_processed(&self) -> u64 {
        self.halos_processed
    }

    /// Total galaxies constructed so far, created and copied combined.
    pub fn galaxies_constructed(&self) -> u64 {
        self.galaxies_created + self.galaxies_copied
    }

    /// Galaxies seeded fresh (no occupied progenitor).
    pub fn galaxies_created(&self) -> u64 {
        self.galaxies_created
    }

    /// Galaxies carried forward from a progenitor's record.
    pub fn galaxies_copied(&self) -> u64 {
        self.galaxies_copied
    }

    /// Galaxies consumed by a merger.
    pub fn galaxies_merged(&self) -> u64 {
        self.galaxies_merged
    }

    /// Mergers of `merge_type` detected and queued.
    pub fn mergers_detected(&self, merge_type: MergeType) -> u64 {
        self.mergers_detected[merge_type_index(merge_type)]
    }

    /// Mergers of `merge_type` drained and handled.
    pub fn mergers_applied(&self, merge_type: MergeType) -> u64 {
        self.mergers_applied[merge_type_index(merge_type)]
    }

    /// Total mergers applied across every merger type.
    pub fn mergers_applied_total(&self) -> u64 {
        self.mergers_applied.iter().sum()
    }

    /// Number of times a forest's pipeline was started.
    pub fn pipeline_started(&self) -> u64 {
        self.pipeline_started
    }

    /// Number of times a forest's pipeline completed (successfully or
    /// not — [`Diagnostics::finalize`] runs on every exit path).
    pub fn pipeline_completed(&self) -> u64 {
        self.pipeline_completed
    }

    /// Number of module-enable transitions recorded.
    pub fn modules_activated(&self) -> u64 {
        self.modules_activated
    }

    /// Number of module-disable transitions recorded.
    pub fn modules_deactivated(&self) -> u64 {
        self.modules_deactivated
    }

    /// Merge `other`'s counts into `self`, useful for combining
    /// per-forest diagnostics into a run-wide total.
    pub fn merge(&mut self, other: &Diagnostics) {
        for phase in Phase::ALL {
            let idx = phase.index();
            self.phase_calls[idx] += other.phase_calls[idx];
            self.phase_duration[idx] += other.phase_duration[idx];
            self.phase_started[idx] += other.phase_started[idx];
            self.phase_completed[idx] += other.phase_completed[idx];
        }
        self.halos_processed += other.halos_processed;
        self.galaxies_created += other.galaxies_created;
        self.galaxies_copied += other.galaxies_copied;
        self.galaxies_merged += other.galaxies_merged;
        self.galaxy_phase_steps += other.galaxy_phase_steps;
        self.pipeline_started += other.pipeline_started;
        self.pipeline_completed += other.pipeline_completed;
        self.modules_activated += other.modules_activated;
        self.modules_deactivated += other.modules_deactivated;
        for i in 0..MERGE_TYPE_VARIANTS {
            self.mergers_detected[i] += other.mergers_detected[i];
            self.mergers_applied[i] += other.mergers_applied[i];
        }
    }

    /// A one-line human-readable summary, suitable for an end-of-run
    /// log line.
    pub fn summary(&self) -> String {
        format!(
            "halos={} galaxies=[created:{} copied:{} merged:{}] mergers={} \
             phases=[halo:{} galaxy:{} post:{} final:{}] pipeline=[started:{} completed:{}]",
            self.halos_processed,
            self.galaxies_created,
            self.galaxies_copied,
            self.galaxies_merged,
            self.mergers_applied_total(),
            self.phase_calls[Phase::Halo.index()],
            self.phase_calls[Phase::Galaxy.index()],
            self.phase_calls[Phase::Post.index()],
            self.phase_calls[Phase::Final.index()],
            self.pipeline_started,
            self.pipeline_completed,
        )
    }
}
