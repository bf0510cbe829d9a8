//! Join and carry-forward: materializes a halo's galaxy list from its
//! progenitors, then, once every halo in a FOF group has been joined,
//! assigns the group's single central.
//!
//! A halo's own `FirstHaloInFOFgroup` link is read directly off the
//! halo record, so `join_halo` already knows whether `halo_idx` is its
//! own FOF group's head and assigns `GalaxyType::Central` versus
//! `GalaxyType::SatelliteSubhalo` accordingly. The later
//! [`assign_fof_group`] pass only has to locate that single central
//! across the whole group and point every member's `central_gal` at
//! it — a validation pass, not a reassignment.

use crate::context::EvolutionContext;
use galform_core::{EvolutionError, EvolutionResult, GalaxyType, MERGE_TIME_INFINITE};
use galform_primitives::{Galaxy, GalaxyOrigin};

/// Walks `first_progenitor`, then the `next_progenitor` linked list
/// starting there, collecting every halo index that is a progenitor of
/// `halo_idx`.
fn progenitor_chain(ctx: &EvolutionContext, halo_idx: usize) -> Vec<usize> {
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

/// Picks the main-branch progenitor: the occupied progenitor (one that
/// has at least one joined galaxy) with the strictly largest `Len`,
/// ties keeping the earlier candidate in chain order. Falls back to
/// `FirstProgenitor` (the chain's first entry) if no progenitor has any
/// galaxies at all.
fn main_branch(ctx: &EvolutionContext, chain: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for &idx in chain {
        let n_galaxies = ctx.halo_aux().get(idx).map(|a| a.n_galaxies).unwrap_or(0);
        if n_galaxies == 0 {
            continue;
        }
        let len = ctx.halo(idx).map(|h| h.len).unwrap_or(0);
        match best {
            Some((_, best_len)) if len <= best_len => {}
            _ => best = Some((idx, len)),
        }
    }
    best.map(|(idx, _)| idx).or_else(|| chain.first().copied())
}

/// Seeds a brand-new central galaxy for a halo with no occupied
/// progenitor, applying this snapshot's halo-derived properties.
fn seed_new_central(ctx: &mut EvolutionContext, halo_idx: usize) -> EvolutionResult<usize> {
    let halo = ctx
        .halo(halo_idx)
        .cloned()
        .ok_or_else(|| EvolutionError::contract_violation(format!("halo {halo_idx} not found")))?;
    let (galaxy_nr, galaxy_index) = ctx.allocate_galaxy_index(halo_idx as i32)?;
    let schema = ctx.schema_handle();
    let mut galaxy = Galaxy::seed(
        &schema,
        halo.snap_num,
        galaxy_nr,
        galaxy_index,
        halo_idx as i32,
        halo.most_bound_id,
    );
    apply_halo_derived_properties(ctx, &mut galaxy, &halo);
    galaxy.set_merge_time(&schema, MERGE_TIME_INFINITE);
    Ok(ctx.push_galaxy(galaxy, GalaxyOrigin::Created))
}

/// Refreshes `Pos`, `Vel`, `Len`, `Vmax`, and the cosmology-derived
/// `Mvir`/`Rvir`/`Vvir` (with `DeltaMvir` recorded against the previous
/// value) for a galaxy attached to `halo` at this snapshot.
fn apply_halo_derived_properties(ctx: &EvolutionContext, galaxy: &mut Galaxy, halo: &galform_core::Halo) {
    let schema = ctx.schema();
    let mvir = ctx.cosmology().virial_mass(halo);
    galaxy.set_delta_mvir(schema, mvir - galaxy.mvir(schema));
    galaxy.set_mvir(schema, mvir);
    galaxy.set_rvir(schema, ctx.cosmology().virial_radius(halo));
    galaxy.set_vvir(schema, ctx.cosmology().virial_velocity(halo));
    galaxy.set_vmax(schema, halo.vmax as f64);
    galaxy.set_len(schema, halo.len);
    galaxy.set_pos(schema, halo.pos);
    galaxy.set_vel(schema, halo.vel);
}

/// Dynamical-friction merging time for a galaxy newly captured as a
/// satellite of `fof_head_idx`, following the same Coulomb-logarithm
/// form as the classic semi-analytic recipe. Degenerates to
/// [`MERGE_TIME_INFINITE`] rather than a negative or infinite-magnitude
/// result when the Coulomb log or the satellite's mass is non-positive.
fn dynamical_friction_merge_time(
    ctx: &EvolutionContext,
    fof_head_idx: usize,
    halo: &galform_core::Halo,
    captured: &Galaxy,
) -> f64 {
    let Some(fof_head_halo) = ctx.halo(fof_head_idx) else {
        return MERGE_TIME_INFINITE;
    };
    if halo.len <= 0 {
        return MERGE_TIME_INFINITE;
    }
    let coulomb_log = (1.0 + fof_head_halo.len as f64 / halo.len as f64).ln();
    let satellite_mvir = captured.mvir(ctx.schema());
    if coulomb_log <= 0.0 || satellite_mvir <= 0.0 {
        return MERGE_TIME_INFINITE;
    }
    let rvir_fof = ctx.cosmology().virial_radius(fof_head_halo);
    let vvir_fof = ctx.cosmology().virial_velocity(fof_head_halo);
    let gravity = ctx.params().gravity;
    2.0 * 1.17 * rvir_fof * rvir_fof * vvir_fof / (coulomb_log * gravity * satellite_mvir)
}

/// Materializes `halo_idx`'s galaxy list from its progenitors (or seeds
/// a fresh central if it is its own FOF head with none), recording the
/// resulting slice in `halo_aux`.
pub fn join_halo(ctx: &mut EvolutionContext, halo_idx: usize) -> EvolutionResult<()> {
    let chain = progenitor_chain(ctx, halo_idx);
    let halo = ctx
        .halo(halo_idx)
        .cloned()
        .ok_or_else(|| EvolutionError::contract_violation(format!("halo {halo_idx} not found")))?;
    let fof_head_idx = halo.first_halo_in_fof_group;
    let is_fof_head = fof_head_idx == halo_idx;

    let first_galaxy = ctx.galaxies().len();

    if !chain.is_empty() {
        let main = main_branch(ctx, &chain).expect("non-empty chain has a main branch");
        for &prog_idx in &chain {
            let (prog_first, prog_count) = ctx
                .halo_aux()
                .get(prog_idx)
                .map(|a| (a.first_galaxy, a.n_galaxies))
                .unwrap_or((None, 0));
            let Some(prog_first) = prog_first else { continue };
            for offset in 0..prog_count as usize {
                let src_idx = prog_first + offset;
                let Some(src) = ctx.galaxy(src_idx) else { continue };
                if src.is_merged() {
                    continue;
                }
                let schema = ctx.schema_handle();
                let src_was_central = src.galaxy_type == GalaxyType::Central;
                let src_mvir = src.mvir(&schema);
                let src_vvir = src.vvir(&schema);
                let src_vmax = src.vmax(&schema);
                let mut carried = src.carry_forward(halo_idx as i32, halo.snap_num);

                if prog_idx == main && src_was_central {
                    apply_halo_derived_properties(ctx, &mut carried, &halo);
                    if is_fof_head {
                        carried.galaxy_type = GalaxyType::Central;
                        carried.set_merge_time(&schema, MERGE_TIME_INFINITE);
                    } else {
                        carried.galaxy_type = GalaxyType::SatelliteSubhalo;
                        carried.set_infall_mvir(&schema, src_mvir);
                        carried.set_infall_vvir(&schema, src_vvir);
                        carried.set_infall_vmax(&schema, src_vmax);
                        let merge_time =
                            dynamical_friction_merge_time(ctx, fof_head_idx, &halo, &carried);
                        carried.set_merge_time(&schema, merge_time);
                    }
                } else {
                    if src_was_central {
                        carried.set_infall_mvir(&schema, src_mvir);
                        carried.set_infall_vvir(&schema, src_vvir);
                        carried.set_infall_vmax(&schema, src_vmax);
                    }
                    carried.galaxy_type = GalaxyType::Orphan;
                    carried.set_merge_time(&schema, 0.0);
                }
                ctx.push_galaxy(carried, GalaxyOrigin::Copied);
            }
        }
    }

    if ctx.galaxies().len() == first_galaxy && is_fof_head {
        seed_new_central(ctx, halo_idx)?;
    }

    let n_galaxies = (ctx.galaxies().len() - first_galaxy) as i32;
    if let Some(aux) = ctx.halo_aux_mut(halo_idx) {
        aux.first_galaxy = Some(first_galaxy);
        aux.n_galaxies = n_galaxies;
    }
    Ok(())
}

/// Finds the single `GalaxyType::Central` galaxy across every member
/// halo's joined slice in the FOF group rooted at `fof_head_idx`.
/// Returns `Ok(None)` if no member halo has a central, which is only
/// valid when no member has a `SatelliteSubhalo` galaxy either (the
/// group is composed entirely of inherited orphans).
fn group_central(ctx: &EvolutionContext, fof_head_idx: usize) -> EvolutionResult<Option<usize>> {
    let mut found = None;
    let mut current = Some(fof_head_idx);
    while let Some(halo_idx) = current {
        let aux = *ctx
            .halo_aux()
            .get(halo_idx)
            .ok_or_else(|| EvolutionError::contract_violation(format!("halo {halo_idx} not found")))?;
        if let Some(first) = aux.first_galaxy {
            for offset in 0..aux.n_galaxies as usize {
                let idx = first + offset;
                if ctx.galaxy(idx).map(|g| g.galaxy_type) == Some(GalaxyType::Central) {
                    if found.is_some() {
                        return Err(EvolutionError::invariant(
                            ctx.forest(),
                            halo_idx as i32,
                            "FOF group has more than one central galaxy",
                        ));
                    }
                    found = Some(idx);
                }
            }
        }
        current = ctx.halo(halo_idx).and_then(|h| h.next_halo_in_fof_group);
    }
    Ok(found)
}

/// Walks the FOF group starting at `fof_head_idx`, pointing every
/// member galaxy's `central_gal`/`central_galaxy_index` at the group's
/// single central. If the group has no central, every member must be an
/// orphan; a `SatelliteSubhalo` galaxy with no central is a fatal
/// invariant violation.
pub fn assign_fof_group(ctx: &mut EvolutionContext, fof_head_idx: usize) -> EvolutionResult<()> {
    let central_idx = group_central(ctx, fof_head_idx)?;

    let Some(central_idx) = central_idx else {
        let mut current = Some(fof_head_idx);
        while let Some(halo_idx) = current {
            let aux = *ctx
                .halo_aux()
                .get(halo_idx)
                .ok_or_else(|| EvolutionError::contract_violation(format!("halo {halo_idx} not found")))?;
            if let Some(first) = aux.first_galaxy {
                for offset in 0..aux.n_galaxies as usize {
                    let idx = first + offset;
                    if ctx.galaxy(idx).map(|g| g.galaxy_type) == Some(GalaxyType::SatelliteSubhalo) {
                        return Err(EvolutionError::invariant(
                            ctx.forest(),
                            halo_idx as i32,
                            "satellite galaxy has no FOF group central",
                        ));
                    }
                }
            }
            current = ctx.halo(halo_idx).and_then(|h| h.next_halo_in_fof_group);
        }
        return Ok(());
    };

    let central_galaxy_index = ctx.galaxy(central_idx).expect("just located").galaxy_index;

    let mut current = Some(fof_head_idx);
    while let Some(halo_idx) = current {
        let aux = *ctx
            .halo_aux()
            .get(halo_idx)
            .ok_or_else(|| EvolutionError::contract_violation(format!("halo {halo_idx} not found")))?;
        if let Some(first) = aux.first_galaxy {
            for offset in 0..aux.n_galaxies as usize {
                let idx = first + offset;
                if let Some(galaxy) = ctx.galaxy_mut(idx) {
                    galaxy.central_gal = Some(central_idx);
                    galaxy.central_galaxy_index = central_galaxy_index;
                }
            }
        }
        current = ctx.halo(halo_idx).and_then(|h| h.next_halo_in_fof_group);
    }

    Ok(())
}
