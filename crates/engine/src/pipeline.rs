//! The physics pipeline: an ordered set of modules, each contributing
//! zero or more of the four per-sub-timestep phases.
//!
//! A module that has nothing to do in a phase simply inherits that
//! phase's default no-op — cooling only needs the galaxy phase,
//! infall detection only needs the halo phase, and so on. The registry
//! itself does not know what any module computes; it only knows how to
//! call into it at the right point in the pipeline and how to react
//! when a call fails.

use crate::context::EvolutionContext;
use galform_core::{EvolutionError, EvolutionResult, Phase};
use galform_primitives::{DiagnosticEvent, Diagnostics};

/// One contributor to the physics pipeline.
///
/// Every method defaults to a no-op so a module only overrides the
/// phases it actually participates in.
pub trait PhysicsModule: Send + Sync {
    /// Name used in logging and in [`EvolutionError::MissingCapability`]
    /// reports.
    fn name(&self) -> &str;

    /// Runs once per halo, before any galaxy-level physics for that
    /// halo's sub-timestep.
    fn run_halo_phase(&self, _ctx: &mut EvolutionContext, _halo_idx: usize) -> EvolutionResult<()> {
        Ok(())
    }

    /// Runs once per non-merged galaxy, every sub-timestep.
    fn run_galaxy_phase(
        &self,
        _ctx: &mut EvolutionContext,
        _galaxy_idx: usize,
    ) -> EvolutionResult<()> {
        Ok(())
    }

    /// Runs once per sub-timestep, after mergers queued during the
    /// galaxy phase have been drained and applied.
    fn run_post_phase(&self, _ctx: &mut EvolutionContext) -> EvolutionResult<()> {
        Ok(())
    }

    /// Runs once per halo, after every sub-timestep for that halo has
    /// completed.
    fn run_final_phase(
        &self,
        _ctx: &mut EvolutionContext,
        _halo_idx: usize,
    ) -> EvolutionResult<()> {
        Ok(())
    }
}

/// A module that participates in no phase. Useful as a placeholder
/// when wiring up a pipeline before every physics module is ready, and
/// in tests that only care about traversal and join behavior.
pub struct NoopModule {
    name: String,
}

impl NoopModule {
    /// A no-op module registered under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        NoopModule { name: name.into() }
    }
}

impl PhysicsModule for NoopModule {
    fn name(&self) -> &str {
        &self.name
    }
}

struct PipelineStep {
    module: Box<dyn PhysicsModule>,
    enabled: bool,
}

/// Ordered collection of physics modules executed together, phase by
/// phase, every sub-timestep.
#[derive(Default)]
pub struct PipelineRegistry {
    steps: Vec<PipelineStep>,
}

impl PipelineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PipelineRegistry { steps: Vec::new() }
    }

    /// Append `module` to the end of the pipeline, enabled by default.
    pub fn register(&mut self, module: Box<dyn PhysicsModule>) {
        self.steps.push(PipelineStep {
            module,
            enabled: true,
        });
    }

    /// Enable or disable the named module without removing it from the
    /// registry. A disabled module's phases are skipped entirely. A
    /// genuine transition is recorded in `diagnostics`; re-asserting the
    /// current state is not.
    pub fn set_enabled(&mut self, diagnostics: &mut Diagnostics, name: &str, enabled: bool) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.module.name() == name) {
            if step.enabled != enabled {
                diagnostics.record_event(if enabled {
                    DiagnosticEvent::ModuleActivated
                } else {
                    DiagnosticEvent::ModuleDeactivated
                });
            }
            step.enabled = enabled;
        }
    }

    /// Names of every registered module, in pipeline order.
    pub fn steps(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.module.name()).collect()
    }

    /// Number of currently enabled modules.
    pub fn enabled_count(&self) -> usize {
        self.steps.iter().filter(|s| s.enabled).count()
    }

    /// Run the halo phase of every enabled module, for `halo_idx`.
    pub fn execute_halo_phase(
        &self,
        ctx: &mut EvolutionContext,
        halo_idx: usize,
    ) -> EvolutionResult<()> {
        self.run_all(Phase::Halo, ctx, |module, ctx| {
            module.run_halo_phase(ctx, halo_idx)
        })
    }

    /// Run the galaxy phase of every enabled module, for `galaxy_idx`.
    pub fn execute_galaxy_phase(
        &self,
        ctx: &mut EvolutionContext,
        galaxy_idx: usize,
    ) -> EvolutionResult<()> {
        ctx.set_current_galaxy(Some(galaxy_idx));
        let result = self.run_all(Phase::Galaxy, ctx, |module, ctx| {
            module.run_galaxy_phase(ctx, galaxy_idx)
        });
        ctx.set_current_galaxy(None);
        result
    }

    /// Run the post phase of every enabled module.
    pub fn execute_post_phase(&self, ctx: &mut EvolutionContext) -> EvolutionResult<()> {
        self.run_all(Phase::Post, ctx, |module, ctx| module.run_post_phase(ctx))
    }

    /// Run the final phase of every enabled module, for `halo_idx`.
    pub fn execute_final_phase(
        &self,
        ctx: &mut EvolutionContext,
        halo_idx: usize,
    ) -> EvolutionResult<()> {
        self.run_all(Phase::Final, ctx, |module, ctx| {
            module.run_final_phase(ctx, halo_idx)
        })
    }

    fn run_all(
        &self,
        phase: Phase,
        ctx: &mut EvolutionContext,
        call: impl Fn(&dyn PhysicsModule, &mut EvolutionContext) -> EvolutionResult<()>,
    ) -> EvolutionResult<()> {
        ctx.set_current_phase(Some(phase));
        ctx.diagnostics_mut().start_phase(phase);
        let result = self.run_all_inner(phase, ctx, call);
        ctx.diagnostics_mut().end_phase(phase)?;
        ctx.set_current_phase(None);
        result
    }

    fn run_all_inner(
        &self,
        phase: Phase,
        ctx: &mut EvolutionContext,
        call: impl Fn(&dyn PhysicsModule, &mut EvolutionContext) -> EvolutionResult<()>,
    ) -> EvolutionResult<()> {
        for step in self.steps.iter().filter(|s| s.enabled) {
            let result = call(step.module.as_ref(), ctx);
            match result {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        target: "galform_engine::pipeline",
                        module = step.module.name(),
                        phase = phase.name(),
                        error = %e,
                        "skipping module after recoverable error"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Constructs a [`PipelineRegistry`] from module names, wiring each to a
/// [`NoopModule`]. Intended for tests and for callers assembling a
/// pipeline before every physics module has a real implementation.
pub fn noop_pipeline(names: &[&str]) -> PipelineRegistry {
    let mut registry = PipelineRegistry::new();
    for name in names {
        registry.register(Box::new(NoopModule::new(*name)));
    }
    registry
}

/// Validates that `name` is registered in `registry`, returning a
/// [`EvolutionError::MissingCapability`] otherwise.
pub fn require_module(registry: &PipelineRegistry, step: &str, name: &str) -> EvolutionResult<()> {
    if registry.steps().iter().any(|s| *s == name) {
        Ok(())
    } else {
        Err(EvolutionError::missing_capability(step, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::empty_context;

    struct FailingModule;

    impl PhysicsModule for FailingModule {
        fn name(&self) -> &str {
            "failing"
        }

        fn run_galaxy_phase(
            &self,
            _ctx: &mut EvolutionContext,
            _galaxy_idx: usize,
        ) -> EvolutionResult<()> {
            Err(EvolutionError::missing_capability("failing", "cooling_table"))
        }
    }

    #[test]
    fn registers_modules_in_order() {
        let registry = noop_pipeline(&["infall", "cooling", "star_formation"]);
        assert_eq!(registry.steps(), vec!["infall", "cooling", "star_formation"]);
        assert_eq!(registry.enabled_count(), 3);
    }

    #[test]
    fn disabled_module_is_excluded_from_enabled_count() {
        let mut registry = noop_pipeline(&["infall", "cooling"]);
        let mut diagnostics = Diagnostics::new();
        registry.set_enabled(&mut diagnostics, "cooling", false);
        assert_eq!(registry.enabled_count(), 1);
        assert_eq!(diagnostics.modules_deactivated(), 1);
        assert_eq!(diagnostics.modules_activated(), 0);
    }

    #[test]
    fn re_asserting_the_same_enabled_state_does_not_double_count() {
        let mut registry = noop_pipeline(&["infall"]);
        let mut diagnostics = Diagnostics::new();
        registry.set_enabled(&mut diagnostics, "infall", true);
        assert_eq!(diagnostics.modules_activated(), 0);
        registry.set_enabled(&mut diagnostics, "infall", false);
        registry.set_enabled(&mut diagnostics, "infall", false);
        assert_eq!(diagnostics.modules_deactivated(), 1);
    }

    #[test]
    fn recoverable_error_is_swallowed_and_pipeline_continues() {
        let mut registry = PipelineRegistry::new();
        registry.register(Box::new(FailingModule));
        registry.register(Box::new(NoopModule::new("after")));
        let (mut ctx, _schema) = empty_context();
        let result = registry.execute_galaxy_phase(&mut ctx, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn require_module_reports_missing_capability() {
        let registry = noop_pipeline(&["infall"]);
        assert!(require_module(&registry, "join", "infall").is_ok());
        let err = require_module(&registry, "join", "cooling").unwrap_err();
        assert!(err.is_recoverable());
    }
}
