//! The evolution driver: orchestrates tree construction, the physics
//! pipeline, merger handling, and output for one forest from start to
//! finish.
//!
//! Halos are visited in ascending snapshot order. For each FOF group
//! not yet constructed, [`traversal::construct_fof_group`] builds every
//! member halo's galaxies (recursing into progenitors as needed, joining
//! halo-level mergers, then assigning the group's single central). The
//! FOF group as a whole is then evolved as one unit: the HALO phase
//! runs once, every member halo's galaxies share the same per-step
//! galaxy-phase loop and merger drain, POST runs once per sub-timestep,
//! and FINAL runs once — matching the source's `evolve(fof_head,
//! fof_buffer, ...)` contract, which operates on the combined buffer of
//! every member halo's galaxies rather than evolving each member in
//! isolation.

use crate::collaborators::{GalaxyOutputWriter, MergerHandler};
use crate::context::EvolutionContext;
use crate::pipeline::PipelineRegistry;
use crate::traversal::construct_fof_group;
use galform_core::{EvolutionError, EvolutionResult};

/// Evolves an entire forest: constructs every FOF group in snapshot
/// order, runs the physics pipeline over every halo, and commits
/// output at the configured snapshots.
///
/// Diagnostics are finalised on every exit path, successful or not —
/// matching the error model's "diagnostics are finalised and reported
/// before abort" guarantee for a fatal forest-level failure.
pub fn evolve_forest(
    ctx: &mut EvolutionContext,
    pipeline: &PipelineRegistry,
    merger_handler: &mut dyn MergerHandler,
    writer: &mut dyn GalaxyOutputWriter,
) -> EvolutionResult<()> {
    ctx.diagnostics_mut().start_pipeline();
    let result = evolve_forest_inner(ctx, pipeline, merger_handler, writer);
    ctx.diagnostics_mut().finalize();
    result
}

fn evolve_forest_inner(
    ctx: &mut EvolutionContext,
    pipeline: &PipelineRegistry,
    merger_handler: &mut dyn MergerHandler,
    writer: &mut dyn GalaxyOutputWriter,
) -> EvolutionResult<()> {
    let mut order: Vec<usize> = (0..ctx.halos().len()).collect();
    order.sort_by_key(|&idx| ctx.halo(idx).map(|h| h.snap_num).unwrap_or(i32::MAX));

    for halo_idx in order {
        let halo = ctx.halo(halo_idx).cloned().ok_or_else(|| {
            EvolutionError::contract_violation(format!("halo {halo_idx} not found"))
        })?;
        if ctx.params().should_stop_at(halo.snap_num) {
            continue;
        }
        if !halo.is_fof_central(halo_idx) {
            continue;
        }
        if ctx
            .halo_aux()
            .get(halo_idx)
            .map(|a| a.done_flag)
            .unwrap_or(false)
        {
            continue;
        }

        ctx.begin_snapshot(halo.snap_num);
        construct_fof_group(ctx, halo_idx)?;
        evolve_fof_group(ctx, halo_idx, pipeline, merger_handler, writer)?;
    }

    ctx.validate()
}

/// Runs the physics pipeline, merger handling, and output for an
/// entire FOF group as one unit: every member halo of the group (which
/// must already be constructed) shares a single HALO-phase call, a
/// single per-step galaxy-phase loop over the combined buffer of every
/// member's galaxies, a single POST call per sub-timestep, and a
/// single FINAL call, per the source's `evolve(fof_head, fof_buffer,
/// ...)` contract.
fn evolve_fof_group(
    ctx: &mut EvolutionContext,
    fof_central_halo_idx: usize,
    pipeline: &PipelineRegistry,
    merger_handler: &mut dyn MergerHandler,
    writer: &mut dyn GalaxyOutputWriter,
) -> EvolutionResult<()> {
    let mut members = Vec::new();
    let mut current = Some(fof_central_halo_idx);
    while let Some(halo_idx) = current {
        members.push(halo_idx);
        current = ctx.halo(halo_idx).and_then(|h| h.next_halo_in_fof_group);
    }

    let snap = ctx
        .halo(fof_central_halo_idx)
        .map(|h| h.snap_num)
        .ok_or_else(|| {
            EvolutionError::contract_violation(format!("halo {fof_central_halo_idx} not found"))
        })?;

    let ranges: Vec<(Option<usize>, i32)> = members
        .iter()
        .map(|&halo_idx| {
            ctx.halo_aux()
                .get(halo_idx)
                .map(|a| (a.first_galaxy, a.n_galaxies))
                .unwrap_or((None, 0))
        })
        .collect();

    ctx.set_halo_age(ctx.cosmology().age_at_snapshot(snap));
    ctx.set_redshift(ctx.cosmology().redshift_at_snapshot(snap));

    pipeline.execute_halo_phase(ctx, fof_central_halo_idx)?;

    let steps = ctx.params().steps;
    for step in 0..steps {
        ctx.begin_step(step);
        ctx.reset_mergers();
        ctx.diagnostics_mut().record_galaxy_phase_step();

        for &(first_galaxy, n_galaxies) in &ranges {
            let Some(first) = first_galaxy else { continue };
            for offset in 0..n_galaxies as usize {
                let galaxy_idx = first + offset;
                let galaxy_snap =
                    ctx.galaxy(galaxy_idx).filter(|g| !g.is_merged()).map(|g| g.snap_num);
                if let Some(galaxy_snap) = galaxy_snap {
                    let age_at_galaxy_snap = ctx.cosmology().age_at_snapshot(galaxy_snap);
                    let dt_total = age_at_galaxy_snap - ctx.halo_age();
                    let dt = dt_total / steps as f64;
                    let time = age_at_galaxy_snap - (step as f64 + 0.5) * dt;
                    ctx.set_dt(dt);
                    ctx.set_time(time);
                    pipeline.execute_galaxy_phase(ctx, galaxy_idx)?;
                }
            }
        }

        for event in ctx.drain_mergers() {
            merger_handler.handle_merger(ctx, &event)?;
            ctx.diagnostics_mut().record_merger_applied(event.merge_type);
            ctx.diagnostics_mut().record_galaxy_merged();
        }

        pipeline.execute_post_phase(ctx)?;
    }

    pipeline.execute_final_phase(ctx, fof_central_halo_idx)?;

    if ctx.params().is_output_snap(snap) {
        for &(first_galaxy, n_galaxies) in &ranges {
            let Some(first) = first_galaxy else { continue };
            for offset in 0..n_galaxies as usize {
                let galaxy_idx = first + offset;
                if let Some(galaxy) = ctx.galaxy(galaxy_idx) {
                    if !galaxy.is_merged() {
                        writer.commit(galaxy, snap)?;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{sample_halo, ConstantCosmology};
    use crate::pipeline::noop_pipeline;
    use galform_core::{FileId, ForestId, GalaxyType, HaloAux, RunParams};
    use galform_primitives::{
        register_core_properties, Galaxy, GalaxyOrigin, MergerEvent, PropertySchemaBuilder,
    };
    use std::sync::Arc;

    struct RecordingWriter {
        committed: Vec<(i64, i32)>,
    }

    impl GalaxyOutputWriter for RecordingWriter {
        fn commit(&mut self, galaxy: &Galaxy, snap: i32) -> EvolutionResult<()> {
            self.committed.push((galaxy.galaxy_index, snap));
            Ok(())
        }

        fn patch_merge_target(
            &mut self,
            _committed_index: u64,
            _merge_into_id: i64,
            _merge_into_snap: i32,
        ) -> EvolutionResult<()> {
            Ok(())
        }
    }

    struct NoopMergerHandler;

    impl MergerHandler for NoopMergerHandler {
        fn handle_merger(
            &mut self,
            _ctx: &mut EvolutionContext,
            _event: &MergerEvent,
        ) -> EvolutionResult<()> {
            Ok(())
        }
    }

    fn context_with(halos: Vec<galform_core::Halo>, output_snaps: Vec<i32>) -> EvolutionContext {
        let mut builder = PropertySchemaBuilder::new();
        register_core_properties(&mut builder).unwrap();
        let schema = Arc::new(builder.build());
        let params = Arc::new(
            RunParams::new(2, 43007.1, vec![0.1, 0.2, 0.3], output_snaps, None, 1_000, 1_000_000)
                .unwrap(),
        );
        let aux = vec![HaloAux::default(); halos.len()];
        EvolutionContext::new(
            schema,
            params,
            Arc::new(ConstantCosmology),
            ForestId::new(0),
            FileId::new(0),
            halos,
            aux,
        )
        .unwrap()
    }

    #[test]
    fn evolve_forest_seeds_and_commits_an_isolated_halo() {
        let mut halo = sample_halo();
        halo.snap_num = 0;
        let mut ctx = context_with(vec![halo], vec![0]);
        let pipeline = noop_pipeline(&["noop"]);
        let mut writer = RecordingWriter { committed: Vec::new() };
        let mut handler = NoopMergerHandler;
        evolve_forest(&mut ctx, &pipeline, &mut handler, &mut writer).unwrap();
        assert_eq!(ctx.galaxies().len(), 1);
        assert_eq!(writer.committed.len(), 1);
        assert_eq!(writer.committed[0].1, 0);
        assert_eq!(ctx.diagnostics().halos_processed(), 1);
    }

    #[test]
    fn evolve_forest_carries_a_linear_chain_and_commits_only_output_snaps() {
        let mut root = sample_halo();
        root.snap_num = 0;
        let mut descendant = sample_halo();
        descendant.snap_num = 1;
        descendant.first_progenitor = Some(0);
        descendant.first_halo_in_fof_group = 1;
        let mut ctx = context_with(vec![root, descendant], vec![1]);
        let pipeline = noop_pipeline(&["noop"]);
        let mut writer = RecordingWriter { committed: Vec::new() };
        let mut handler = NoopMergerHandler;
        evolve_forest(&mut ctx, &pipeline, &mut handler, &mut writer).unwrap();
        assert_eq!(ctx.galaxies().len(), 2);
        assert_eq!(writer.committed.len(), 1);
        assert_eq!(writer.committed[0].1, 1);
    }

    #[test]
    fn evolve_forest_demotes_satellite_and_assigns_common_central() {
        let mut central_prog = sample_halo();
        central_prog.snap_num = 0;
        let mut satellite_prog = sample_halo();
        satellite_prog.snap_num = 0;
        satellite_prog.first_halo_in_fof_group = 1;

        let mut central_halo = sample_halo();
        central_halo.snap_num = 1;
        central_halo.first_progenitor = Some(0);
        central_halo.first_halo_in_fof_group = 2;
        central_halo.next_halo_in_fof_group = Some(3);

        let mut satellite_halo = sample_halo();
        satellite_halo.snap_num = 1;
        satellite_halo.first_progenitor = Some(1);
        satellite_halo.first_halo_in_fof_group = 2;

        let mut ctx = context_with(
            vec![central_prog, satellite_prog, central_halo, satellite_halo],
            vec![1],
        );
        let pipeline = noop_pipeline(&["noop"]);
        let mut writer = RecordingWriter { committed: Vec::new() };
        let mut handler = NoopMergerHandler;
        evolve_forest(&mut ctx, &pipeline, &mut handler, &mut writer).unwrap();
        assert_eq!(ctx.galaxy(2).unwrap().galaxy_type, GalaxyType::Central);
        assert_eq!(ctx.galaxy(3).unwrap().galaxy_type, GalaxyType::SatelliteSubhalo);
        assert_eq!(writer.committed.len(), 2);
    }

    #[test]
    fn evolve_fof_group_runs_halo_and_final_once_regardless_of_galaxy_count() {
        let mut halo = sample_halo();
        halo.snap_num = 1;
        let mut ctx = context_with(vec![halo], vec![1]);

        let schema = ctx.schema_handle();
        for n in 0..3i64 {
            let galaxy = Galaxy::seed(&schema, 1, n, n, 0, 1);
            ctx.push_galaxy(galaxy, GalaxyOrigin::Created);
        }
        if let Some(aux) = ctx.halo_aux_mut(0) {
            aux.first_galaxy = Some(0);
            aux.n_galaxies = 3;
        }

        let pipeline = noop_pipeline(&[]);
        let mut writer = RecordingWriter { committed: Vec::new() };
        let mut handler = NoopMergerHandler;
        evolve_fof_group(&mut ctx, 0, &pipeline, &mut handler, &mut writer).unwrap();

        let diagnostics = ctx.diagnostics();
        assert_eq!(diagnostics.phase_call_count(galform_core::Phase::Halo), 1);
        assert_eq!(diagnostics.galaxy_phase_steps(), 2);
        assert_eq!(diagnostics.phase_call_count(galform_core::Phase::Galaxy), 6);
        assert_eq!(diagnostics.phase_call_count(galform_core::Phase::Post), 2);
        assert_eq!(diagnostics.phase_call_count(galform_core::Phase::Final), 1);
        assert_eq!(writer.committed.len(), 3);
    }
}
