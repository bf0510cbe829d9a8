//! The tree traversal driver: walks a forest's halos depth-first
//! through progenitor chains, constructing each halo's galaxies only
//! after every one of its progenitors has been constructed, then
//! assigns FOF-group centrals once every member halo of a group has
//! been constructed.

use crate::join::{assign_fof_group, join_halo};
use galform_core::{EvolutionError, EvolutionResult, HaloFlag};
use crate::context::EvolutionContext;

/// Ensures `halo_idx` (and everything it depends on) has been
/// constructed, recursing into its progenitor chain first.
///
/// Idempotent: a halo already marked done is skipped. Detects cycles
/// via `HaloFlag::Scheduled` — a halo reached again while still on the
/// current recursion stack is an invariant violation, not infinite
/// recursion.
pub fn construct(ctx: &mut EvolutionContext, halo_idx: usize) -> EvolutionResult<()> {
    let aux = *ctx.halo_aux().get(halo_idx).ok_or_else(|| {
        EvolutionError::contract_violation(format!("halo {halo_idx} not found"))
    })?;
    if aux.done_flag {
        return Ok(());
    }
    if aux.halo_flag == HaloFlag::Scheduled {
        return Err(EvolutionError::invariant(
            ctx.forest(),
            halo_idx as i32,
            "cyclic progenitor reference detected during traversal",
        ));
    }
    if let Some(entry) = ctx.halo_aux_mut(halo_idx) {
        entry.halo_flag = HaloFlag::Scheduled;
    }

    let chain = progenitor_indices(ctx, halo_idx);
    for prog_idx in chain {
        construct(ctx, prog_idx)?;
    }

    join_halo(ctx, halo_idx)?;

    if let Some(entry) = ctx.halo_aux_mut(halo_idx) {
        entry.done_flag = true;
        entry.halo_flag = HaloFlag::Processed;
    }
    ctx.diagnostics_mut().record_halo_processed();
    Ok(())
}

fn progenitor_indices(ctx: &EvolutionContext, halo_idx: usize) -> Vec<usize> {
    let mut chain = Vec::new();
    let Some(halo) = ctx.halo(halo_idx) else {
        return chain;
    };
    let Some(first) = halo.first_progenitor else {
        return chain;
    };
    let mut current = Some(first);
    while let Some(idx) = current {
        chain.push(idx);
        current = ctx.halo(idx).and_then(|h| h.next_progenitor);
    }
    chain
}

/// Constructs every halo in the FOF group rooted at
/// `fof_central_halo_idx`, then assigns the group's central.
///
/// `fof_central_halo_idx` must itself be a FOF central
/// (`first_halo_in_fof_group == fof_central_halo_idx`); the traversal
/// driver's caller is responsible for identifying FOF centrals, since
/// only it knows which snapshot is currently being processed.
pub fn construct_fof_group(ctx: &mut EvolutionContext, fof_central_halo_idx: usize) -> EvolutionResult<()> {
    let mut current = Some(fof_central_halo_idx);
    while let Some(halo_idx) = current {
        construct(ctx, halo_idx)?;
        current = ctx.halo(halo_idx).and_then(|h| h.next_halo_in_fof_group);
    }
    assign_fof_group(ctx, fof_central_halo_idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{sample_halo, ConstantCosmology};
    use galform_core::{FileId, ForestId, GalaxyType, HaloAux, RunParams};
    use galform_primitives::{register_core_properties, PropertySchemaBuilder};
    use std::sync::Arc;

    fn context_with(halos: Vec<galform_core::Halo>) -> EvolutionContext {
        let mut builder = PropertySchemaBuilder::new();
        register_core_properties(&mut builder).unwrap();
        let schema = Arc::new(builder.build());
        let params = Arc::new(
            RunParams::new(20, 43007.1, vec![0.1, 0.2, 0.3], vec![], None, 1_000, 1_000_000)
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
    fn construct_is_idempotent() {
        let mut ctx = context_with(vec![sample_halo()]);
        construct(&mut ctx, 0).unwrap();
        construct(&mut ctx, 0).unwrap();
        assert_eq!(ctx.galaxies().len(), 1);
        assert_eq!(ctx.diagnostics().halos_processed(), 1);
    }

    #[test]
    fn construct_recurses_through_a_linear_progenitor_chain() {
        let mut root = sample_halo();
        root.snap_num = 0;
        let mut mid = sample_halo();
        mid.snap_num = 1;
        mid.first_progenitor = Some(0);
        mid.first_halo_in_fof_group = 1;
        let mut tip = sample_halo();
        tip.snap_num = 2;
        tip.first_progenitor = Some(1);
        tip.first_halo_in_fof_group = 2;
        let mut ctx = context_with(vec![root, mid, tip]);
        construct(&mut ctx, 2).unwrap();
        assert_eq!(ctx.galaxies().len(), 3);
        assert_eq!(ctx.diagnostics().halos_processed(), 3);
        let same_galaxy_nr = ctx.galaxy(0).unwrap().galaxy_nr;
        assert_eq!(ctx.galaxy(1).unwrap().galaxy_nr, same_galaxy_nr);
        assert_eq!(ctx.galaxy(2).unwrap().galaxy_nr, same_galaxy_nr);
    }

    #[test]
    fn construct_rejects_a_self_referential_cycle() {
        let mut a = sample_halo();
        a.first_progenitor = Some(0);
        let mut ctx = context_with(vec![a]);
        let err = construct(&mut ctx, 0).unwrap_err();
        assert!(err.is_fatal_to_forest());
    }

    #[test]
    fn construct_fof_group_demotes_satellites() {
        let mut central_prog = sample_halo();
        central_prog.snap_num = 0;
        let mut satellite_prog = sample_halo();
        satellite_prog.snap_num = 0;
        satellite_prog.first_halo_in_fof_group = 1;

        let mut central = sample_halo();
        central.snap_num = 1;
        central.first_progenitor = Some(0);
        central.first_halo_in_fof_group = 2;
        central.next_halo_in_fof_group = Some(3);

        let mut satellite = sample_halo();
        satellite.snap_num = 1;
        satellite.first_progenitor = Some(1);
        satellite.first_halo_in_fof_group = 2;

        let mut ctx = context_with(vec![central_prog, satellite_prog, central, satellite]);
        construct_fof_group(&mut ctx, 2).unwrap();
        assert_eq!(ctx.galaxy(2).unwrap().galaxy_type, GalaxyType::Central);
        assert_eq!(ctx.galaxy(3).unwrap().galaxy_type, GalaxyType::SatelliteSubhalo);
    }
}
