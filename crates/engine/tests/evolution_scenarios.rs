//! End-to-end scenarios driving the public evolution API against small,
//! hand-built forests — no physics modules, so every assertion is about
//! traversal, join, and diagnostics behavior alone.

use galform_core::{FileId, ForestId, GalaxyType, Halo, HaloAux, RunParams, MERGE_TIME_INFINITE};
use galform_engine::{evolve_forest, noop_pipeline, EvolutionContext, GalaxyOutputWriter, MergerHandler};
use galform_primitives::{register_core_properties, Galaxy, MergerEvent, PropertySchemaBuilder};
use std::sync::Arc;

struct ConstantCosmology;

impl galform_core::CosmologyModel for ConstantCosmology {
    fn virial_mass(&self, halo: &Halo) -> f64 {
        halo.len as f64 * 1e10
    }

    fn virial_radius(&self, _halo: &Halo) -> f64 {
        0.2
    }

    fn virial_velocity(&self, _halo: &Halo) -> f64 {
        150.0
    }

    fn age_at_snapshot(&self, snap: i32) -> f64 {
        snap as f64
    }

    fn redshift_at_snapshot(&self, snap: i32) -> f64 {
        (10 - snap) as f64
    }
}

struct RecordingWriter {
    committed: Vec<(Galaxy, i32)>,
}

impl GalaxyOutputWriter for RecordingWriter {
    fn commit(&mut self, galaxy: &Galaxy, snap: i32) -> galform_core::EvolutionResult<()> {
        self.committed.push((galaxy.clone(), snap));
        Ok(())
    }

    fn patch_merge_target(
        &mut self,
        _committed_index: u64,
        _merge_into_id: i64,
        _merge_into_snap: i32,
    ) -> galform_core::EvolutionResult<()> {
        Ok(())
    }
}

struct NoopMergerHandler;

impl MergerHandler for NoopMergerHandler {
    fn handle_merger(
        &mut self,
        _ctx: &mut EvolutionContext,
        _event: &MergerEvent,
    ) -> galform_core::EvolutionResult<()> {
        Ok(())
    }
}

fn sample_halo(len: i32, snap_num: i32) -> Halo {
    Halo {
        len,
        pos: [0.0; 3],
        vel: [0.0; 3],
        vmax: 120.0,
        vel_disp: 80.0,
        spin: [0.0; 3],
        snap_num,
        most_bound_id: 1,
        first_progenitor: None,
        next_progenitor: None,
        first_halo_in_fof_group: 0,
        next_halo_in_fof_group: None,
    }
}

fn run(halos: Vec<Halo>, output_snaps: Vec<i32>, steps: u32) -> (EvolutionContext, RecordingWriter) {
    let mut builder = PropertySchemaBuilder::new();
    register_core_properties(&mut builder).unwrap();
    let schema = Arc::new(builder.build());
    let params = Arc::new(
        RunParams::new(steps, 43007.1, vec![0.1; 10], output_snaps, None, 1_000, 1_000_000).unwrap(),
    );
    let aux = vec![HaloAux::default(); halos.len()];
    let mut ctx = EvolutionContext::new(
        schema,
        params,
        Arc::new(ConstantCosmology),
        ForestId::new(0),
        FileId::new(0),
        halos,
        aux,
    )
    .unwrap();
    let pipeline = noop_pipeline(&[]);
    let mut writer = RecordingWriter { committed: Vec::new() };
    let mut handler = NoopMergerHandler;
    evolve_forest(&mut ctx, &pipeline, &mut handler, &mut writer).unwrap();
    (ctx, writer)
}

#[test]
fn single_isolated_halo_seeds_a_galaxy() {
    let halo = sample_halo(100, 0);
    let (ctx, writer) = run(vec![halo], vec![0], 20);

    assert_eq!(writer.committed.len(), 1);
    let (galaxy, snap) = &writer.committed[0];
    assert_eq!(*snap, 0);
    assert_eq!(galaxy.galaxy_type, GalaxyType::Central);
    assert_eq!(galaxy.halo_nr, 0);
    assert_eq!(galaxy.galaxy_nr, 0);
    assert_eq!(galaxy.snap_num, 0);
    assert_eq!(ctx.galaxy(0).unwrap().central_gal, Some(0));
    assert_eq!(galaxy.merge_time(ctx.schema()), MERGE_TIME_INFINITE);
}

#[test]
fn linear_carry_forward_preserves_identity() {
    let h0 = sample_halo(100, 0);
    let mut h1 = sample_halo(120, 1);
    h1.first_progenitor = Some(0);
    h1.first_halo_in_fof_group = 1;
    let (_ctx, writer) = run(vec![h0, h1], vec![0, 1], 20);

    let g0 = writer
        .committed
        .iter()
        .find(|(_, snap)| *snap == 0)
        .expect("snapshot 0 output");
    let g1 = writer
        .committed
        .iter()
        .find(|(_, snap)| *snap == 1)
        .expect("snapshot 1 output");
    assert_eq!(g0.0.galaxy_nr, g1.0.galaxy_nr);
    assert_eq!(g1.0.galaxy_type, GalaxyType::Central);
    assert_eq!(g1.0.halo_nr, 1);
}

#[test]
fn satellite_capture_records_infall_and_a_finite_merge_time() {
    let main_prog = sample_halo(100, 0);
    let mut sat_prog = sample_halo(40, 0);
    sat_prog.first_halo_in_fof_group = 1;

    let mut main_halo = sample_halo(150, 1);
    main_halo.first_progenitor = Some(0);
    main_halo.first_halo_in_fof_group = 2;
    main_halo.next_halo_in_fof_group = Some(3);

    let mut sat_halo = sample_halo(60, 1);
    sat_halo.first_progenitor = Some(1);
    sat_halo.first_halo_in_fof_group = 2;

    let (ctx, writer) = run(vec![main_prog, sat_prog, main_halo, sat_halo], vec![1], 20);

    let snap1: Vec<_> = writer.committed.iter().filter(|(_, snap)| *snap == 1).collect();
    assert_eq!(snap1.len(), 2);

    let central = snap1
        .iter()
        .find(|(g, _)| g.galaxy_type == GalaxyType::Central)
        .expect("one central survives");
    let satellite = snap1
        .iter()
        .find(|(g, _)| g.galaxy_type == GalaxyType::SatelliteSubhalo)
        .expect("one satellite survives");

    assert!(satellite.0.infall_mvir(ctx.schema()) > 0.0);
    assert!(satellite.0.merge_time(ctx.schema()) < MERGE_TIME_INFINITE);
    assert!(satellite.0.merge_time(ctx.schema()) >= 0.0);
    assert_eq!(satellite.0.central_galaxy_index, central.0.galaxy_index);
}

#[test]
fn orphaning_when_branch_loses_halo() {
    let mut main_prog = sample_halo(200, 0);
    main_prog.next_progenitor = Some(1);
    let mut off_branch_prog = sample_halo(50, 0);
    off_branch_prog.first_halo_in_fof_group = 1;

    let mut descendant = sample_halo(250, 1);
    descendant.first_progenitor = Some(0);
    descendant.first_halo_in_fof_group = 2;

    let (ctx, writer) = run(vec![main_prog, off_branch_prog, descendant], vec![1], 20);

    let snap1: Vec<_> = writer.committed.iter().filter(|(_, snap)| *snap == 1).collect();
    assert_eq!(snap1.len(), 2);

    let main_branch = snap1
        .iter()
        .find(|(g, _)| g.galaxy_type == GalaxyType::Central)
        .expect("main branch stays a central, this halo is its own FOF head");
    let orphan = snap1
        .iter()
        .find(|(g, _)| g.galaxy_type == GalaxyType::Orphan)
        .expect("off-branch galaxy is orphaned");

    assert_eq!(main_branch.0.merge_time(ctx.schema()), MERGE_TIME_INFINITE);
    assert_eq!(orphan.0.merge_time(ctx.schema()), 0.0);
}

#[test]
fn galaxy_index_overflow_is_reported_rather_than_wrapped() {
    let overflowing = galform_core::compose_galaxy_index(11, 0, 10, 0, 1);
    assert_eq!(overflowing, Some(11));

    let galaxy_nr = i64::MAX;
    let overflow = galform_core::compose_galaxy_index(galaxy_nr, 1, 10, 0, 1);
    assert!(overflow.is_none());
}
