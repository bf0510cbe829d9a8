//! Traits for external collaborators whose implementation is supplied
//! by the embedding application, not by this crate.

use crate::halo::Halo;

/// Cosmology-dependent quantities derived from a halo's raw catalog
/// properties. Implementations typically wrap a fitting function over
/// the run's assumed cosmology (e.g. spherical collapse with a mean
/// density contrast), but the engine treats this purely as an
/// interface: it never assumes a particular overdensity definition.
pub trait CosmologyModel {
    /// Virial mass implied by `halo` under the run's cosmology.
    fn virial_mass(&self, halo: &Halo) -> f64;

    /// Virial radius implied by `halo` under the run's cosmology.
    fn virial_radius(&self, halo: &Halo) -> f64;

    /// Virial velocity implied by `halo` under the run's cosmology.
    fn virial_velocity(&self, halo: &Halo) -> f64;

    /// Cosmic age at the given snapshot, in the run's internal time unit.
    fn age_at_snapshot(&self, snap: i32) -> f64;

    /// Redshift at the given snapshot.
    fn redshift_at_snapshot(&self, snap: i32) -> f64;
}
