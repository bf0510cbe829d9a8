//! The evolution context: everything a physics module, the join step,
//! or the traversal driver needs to read or mutate for one forest's
//! current sub-timestep.
//!
//! A context is built once per forest and threaded by `&mut` through
//! traversal, join, and the pipeline. It owns the forest's halo and
//! galaxy data for the duration of that forest's evolution; nothing
//! about it is shared across forests or across threads.

use galform_core::{
    compose_galaxy_index, CosmologyModel, EvolutionError, EvolutionResult, FileId, ForestId, Halo,
    HaloAux, Phase, RunParams,
};
use galform_primitives::{
    Diagnostics, Galaxy, GalaxyArray, GalaxyOrigin, MergerEvent, MergerEventQueue, PropertySchema,
};
use std::sync::Arc;

/// Everything needed to evolve one forest through one sub-timestep.
pub struct EvolutionContext {
    schema: Arc<PropertySchema>,
    params: Arc<RunParams>,
    cosmology: Arc<dyn CosmologyModel>,
    forest: ForestId,
    file: FileId,
    halos: Vec<Halo>,
    halo_aux: Vec<HaloAux>,
    galaxies: GalaxyArray,
    merger_queue: MergerEventQueue,
    diagnostics: Diagnostics,
    current_snap: i32,
    current_step: u32,
    next_galaxy_nr: i64,
    /// Galaxy array index the GALAXY phase is currently invoked for.
    /// `None` outside the GALAXY phase.
    current_galaxy: Option<usize>,
    /// Phase currently being dispatched by the pipeline, for modules
    /// that branch on it.
    current_phase: Option<Phase>,
    /// Cosmic age of the halo currently being evolved.
    halo_age: f64,
    /// Redshift of the halo currently being evolved.
    redshift: f64,
    /// Sub-timestep width for the galaxy named by `current_galaxy`.
    dt: f64,
    /// Cosmic time at the midpoint of the current sub-timestep, for the
    /// galaxy named by `current_galaxy`.
    time: f64,
}

/// Upper bound on outstanding merger events per forest: generous enough
/// that only a genuinely pathological tree (or a bug that re-queues the
/// same pair) would hit it.
const MERGER_QUEUE_CAPACITY: usize = 4096;

impl EvolutionContext {
    /// Construct a context for `forest`, with `halos`/`halo_aux` as
    /// supplied by the tree reader.
    pub fn new(
        schema: Arc<PropertySchema>,
        params: Arc<RunParams>,
        cosmology: Arc<dyn CosmologyModel>,
        forest: ForestId,
        file: FileId,
        halos: Vec<Halo>,
        halo_aux: Vec<HaloAux>,
    ) -> EvolutionResult<Self> {
        if halos.len() != halo_aux.len() {
            return Err(EvolutionError::contract_violation(format!(
                "halos ({}) and halo_aux ({}) lengths differ for forest {forest}",
                halos.len(),
                halo_aux.len()
            )));
        }
        Ok(EvolutionContext {
            schema,
            params,
            cosmology,
            forest,
            file,
            halos,
            halo_aux,
            galaxies: GalaxyArray::new(),
            merger_queue: MergerEventQueue::new(MERGER_QUEUE_CAPACITY),
            diagnostics: Diagnostics::new(),
            current_snap: 0,
            current_step: 0,
            next_galaxy_nr: 0,
            current_galaxy: None,
            current_phase: None,
            halo_age: 0.0,
            redshift: 0.0,
            dt: 0.0,
            time: 0.0,
        })
    }

    /// The file this forest was read from.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Allocate the next per-forest galaxy number and compose its
    /// globally unique galaxy index.
    ///
    /// Returns an invariant violation, rather than wrapping, if the
    /// composition would overflow `i64`.
    pub fn allocate_galaxy_index(&mut self, halo_nr: i32) -> EvolutionResult<(i64, i64)> {
        let galaxy_nr = self.next_galaxy_nr;
        self.next_galaxy_nr += 1;
        let galaxy_index = compose_galaxy_index(
            galaxy_nr,
            self.forest.raw() as i64,
            self.params.forest_mulfac,
            self.file.raw() as i64,
            self.params.file_mulfac,
        )
        .ok_or_else(|| {
            EvolutionError::invariant(
                self.forest,
                halo_nr,
                format!("galaxy index composition overflowed i64 at galaxy_nr={galaxy_nr}"),
            )
        })?;
        Ok((galaxy_nr, galaxy_index))
    }

    /// The schema every galaxy's property store is allocated against.
    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    /// A cheaply-cloneable handle to the schema.
    pub fn schema_handle(&self) -> Arc<PropertySchema> {
        Arc::clone(&self.schema)
    }

    /// Run-wide configuration.
    pub fn params(&self) -> &RunParams {
        &self.params
    }

    /// The cosmology collaborator.
    pub fn cosmology(&self) -> &dyn CosmologyModel {
        self.cosmology.as_ref()
    }

    /// The forest this context belongs to.
    pub fn forest(&self) -> ForestId {
        self.forest
    }

    /// Every halo in this forest.
    pub fn halos(&self) -> &[Halo] {
        &self.halos
    }

    /// A single halo by index.
    pub fn halo(&self, index: usize) -> Option<&Halo> {
        self.halos.get(index)
    }

    /// Traversal state for every halo in this forest.
    pub fn halo_aux(&self) -> &[HaloAux] {
        &self.halo_aux
    }

    /// Mutable traversal state for a single halo by index.
    pub fn halo_aux_mut(&mut self, index: usize) -> Option<&mut HaloAux> {
        self.halo_aux.get_mut(index)
    }

    /// The current snapshot's galaxy array.
    pub fn galaxies(&self) -> &GalaxyArray {
        &self.galaxies
    }

    /// Mutable access to the current snapshot's galaxy array.
    pub fn galaxies_mut(&mut self) -> &mut GalaxyArray {
        &mut self.galaxies
    }

    /// A single galaxy by index.
    pub fn galaxy(&self, index: usize) -> Option<&Galaxy> {
        self.galaxies.get(index)
    }

    /// A single galaxy by index, mutably.
    pub fn galaxy_mut(&mut self, index: usize) -> Option<&mut Galaxy> {
        self.galaxies.get_mut(index)
    }

    /// The central of the galaxy at `index`, if both the galaxy and its
    /// `central_gal` link exist.
    pub fn central_of(&self, index: usize) -> Option<&Galaxy> {
        let central_idx = self.galaxies.get(index)?.central_gal?;
        self.galaxies.get(central_idx)
    }

    /// Append a newly constructed galaxy, returning its index.
    pub fn push_galaxy(&mut self, galaxy: Galaxy, origin: GalaxyOrigin) -> usize {
        self.diagnostics.record_galaxy_constructed(origin);
        self.galaxies.push(galaxy)
    }

    /// Queue a merger for handling after the current sub-timestep's
    /// galaxy phase completes.
    pub fn queue_merger(&mut self, event: MergerEvent) -> EvolutionResult<()> {
        self.merger_queue.push(event)?;
        self.diagnostics.record_merger_detected(event.merge_type);
        Ok(())
    }

    /// Drain every queued merger, in the order it was queued.
    pub fn drain_mergers(&mut self) -> Vec<MergerEvent> {
        self.merger_queue.drain()
    }

    /// Clear the merger queue without processing its events, at the
    /// start of a sub-timestep.
    pub fn reset_mergers(&mut self) {
        self.merger_queue.reset();
    }

    /// Diagnostics accumulated so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Mutable access to diagnostics, used by the pipeline to record
    /// phase timings.
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Snapshot currently being evolved.
    pub fn current_snap(&self) -> i32 {
        self.current_snap
    }

    /// Advance to evolving `snap`. The galaxy array is never cleared
    /// between snapshots: it accumulates every galaxy constructed for
    /// the whole forest, since earlier snapshots' records are still
    /// read by joins further up the tree and are only retired when
    /// written out or merged away.
    pub fn begin_snapshot(&mut self, snap: i32) {
        self.current_snap = snap;
        self.current_step = 0;
    }

    /// Sub-timestep currently executing within the current snapshot.
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Advance to the next sub-timestep within the current snapshot.
    pub fn begin_step(&mut self, step: u32) {
        self.current_step = step;
    }

    /// Galaxy array index the GALAXY phase is currently invoked for.
    pub fn current_galaxy(&self) -> Option<usize> {
        self.current_galaxy
    }

    /// Set the galaxy the GALAXY phase is about to run for; cleared by
    /// the driver once the phase call returns.
    pub fn set_current_galaxy(&mut self, galaxy_idx: Option<usize>) {
        self.current_galaxy = galaxy_idx;
    }

    /// Phase currently being dispatched by the pipeline.
    pub fn current_phase(&self) -> Option<Phase> {
        self.current_phase
    }

    /// Record which phase the pipeline is about to dispatch.
    pub fn set_current_phase(&mut self, phase: Option<Phase>) {
        self.current_phase = phase;
    }

    /// Cosmic age of the halo presently being evolved.
    pub fn halo_age(&self) -> f64 {
        self.halo_age
    }

    /// Set the cosmic age of the halo presently being evolved.
    pub fn set_halo_age(&mut self, age: f64) {
        self.halo_age = age;
    }

    /// Redshift of the halo presently being evolved.
    pub fn redshift(&self) -> f64 {
        self.redshift
    }

    /// Set the redshift of the halo presently being evolved.
    pub fn set_redshift(&mut self, redshift: f64) {
        self.redshift = redshift;
    }

    /// Sub-timestep width for `current_galaxy` at the current step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Set the sub-timestep width for the galaxy about to be evolved.
    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
    }

    /// Cosmic time at the midpoint of the current sub-timestep, for
    /// `current_galaxy`.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Set the cosmic time at the midpoint of the current sub-timestep.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Validates the invariants the engine depends on before evolution
    /// starts: halo/aux length parity (already enforced at
    /// construction) plus every `central_gal` link presently in range.
    pub fn validate(&self) -> EvolutionResult<()> {
        for (idx, galaxy) in self.galaxies.iter().enumerate() {
            if let Some(central_idx) = galaxy.central_gal {
                if self.galaxies.get(central_idx).is_none() {
                    return Err(EvolutionError::invariant(
                        self.forest,
                        galaxy.halo_nr,
                        format!(
                            "galaxy {idx} has central_gal {central_idx} out of range"
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::empty_context;
    use super::*;

    #[test]
    fn construction_rejects_mismatched_halo_and_aux_lengths() {
        let schema = Arc::new({
            let mut b = galform_primitives::PropertySchemaBuilder::new();
            galform_primitives::register_core_properties(&mut b).unwrap();
            b.build()
        });
        let params = Arc::new(RunParams::new(20, 1.0, vec![0.1], vec![], None, 1, 1).unwrap());
        let err = EvolutionContext::new(
            schema,
            params,
            Arc::new(test_support::ConstantCosmology),
            ForestId::new(0),
            FileId::new(0),
            vec![],
            vec![HaloAux::default()],
        )
        .unwrap_err();
        assert!(err.is_fatal_to_run());
    }

    #[test]
    fn central_of_resolves_through_central_gal() {
        let (mut ctx, schema) = empty_context();
        let mut satellite = Galaxy::seed(&schema, 0, 1, 1, 0, 2);
        satellite.central_gal = Some(0);
        ctx.push_galaxy(satellite, GalaxyOrigin::Created);
        let central = ctx.central_of(1).unwrap();
        assert_eq!(central.galaxy_nr, 0);
    }

    #[test]
    fn validate_rejects_out_of_range_central_gal() {
        let (mut ctx, schema) = empty_context();
        let mut satellite = Galaxy::seed(&schema, 0, 1, 1, 0, 2);
        satellite.central_gal = Some(99);
        ctx.push_galaxy(satellite, GalaxyOrigin::Created);
        let err = ctx.validate().unwrap_err();
        assert!(err.is_fatal_to_forest());
    }

    #[test]
    fn begin_snapshot_advances_counters_without_clearing_galaxies() {
        let (mut ctx, _schema) = empty_context();
        assert_eq!(ctx.galaxies().len(), 1);
        ctx.begin_snapshot(1);
        assert_eq!(ctx.galaxies().len(), 1);
        assert_eq!(ctx.current_snap(), 1);
        assert_eq!(ctx.current_step(), 0);
    }
}
