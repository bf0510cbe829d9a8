//! A concrete flat Lambda-CDM [`CosmologyModel`], supplied as a
//! reasonable default for callers that do not need a custom halo
//! finder's own virial conventions.
//!
//! Halo virial quantities are derived from the spherical overdensity
//! definition `M = (4/3) pi R^3 Delta rho_crit`, with a fixed present-day
//! overdensity `Delta = 200`. Ages come from the standard flat-LCDM
//! analytic age-of-universe formula, evaluated at the scale factor
//! recorded for each snapshot.

use galform_core::{CosmologyModel, Halo};

const DELTA_VIR: f64 = 200.0;
const GRAVITY: f64 = 43007.1;

/// A flat Lambda-CDM cosmology: `virial_mass` reads particle count off
/// the halo, `virial_radius`/`virial_velocity` are derived from it
/// under a fixed overdensity, and `age_at_snapshot` looks up a
/// per-snapshot scale factor supplied via [`with_scale_factors`].
///
/// [`with_scale_factors`]: FlatLcdmCosmology::with_scale_factors
pub struct FlatLcdmCosmology {
    omega_m: f64,
    omega_lambda: f64,
    hubble_h: f64,
    particle_mass: f64,
    scale_factors: Vec<f64>,
}

impl FlatLcdmCosmology {
    /// A flat LCDM cosmology with unit particle mass and no scale
    /// factor table; `age_at_snapshot` returns `0.0` until
    /// [`with_scale_factors`](Self::with_scale_factors) is set.
    pub fn new(omega_m: f64, omega_lambda: f64, hubble_h: f64) -> Self {
        FlatLcdmCosmology {
            omega_m,
            omega_lambda,
            hubble_h,
            particle_mass: 1.0,
            scale_factors: Vec::new(),
        }
    }

    /// Mass of a single dark-matter particle, in the same mass unit
    /// `virial_mass` should report (typically 1e10 Msun/h).
    pub fn with_particle_mass(mut self, particle_mass: f64) -> Self {
        self.particle_mass = particle_mass;
        self
    }

    /// Scale factor at each snapshot, indexed by snapshot number.
    pub fn with_scale_factors(mut self, scale_factors: Vec<f64>) -> Self {
        self.scale_factors = scale_factors;
        self
    }

    fn hubble0(&self) -> f64 {
        100.0 * self.hubble_h
    }

    fn age_at_scale_factor(&self, a: f64) -> f64 {
        if a <= 0.0 {
            return 0.0;
        }
        let h0 = self.hubble0();
        (2.0 / (3.0 * h0 * self.omega_lambda.sqrt()))
            * ((self.omega_lambda / self.omega_m).sqrt() * a.powf(1.5)).asinh()
    }
}

impl CosmologyModel for FlatLcdmCosmology {
    fn virial_mass(&self, halo: &Halo) -> f64 {
        halo.len as f64 * self.particle_mass
    }

    fn virial_radius(&self, halo: &Halo) -> f64 {
        let mass = self.virial_mass(halo);
        let h0 = self.hubble0();
        (2.0 * GRAVITY * mass / (DELTA_VIR * h0 * h0)).cbrt()
    }

    fn virial_velocity(&self, halo: &Halo) -> f64 {
        let mass = self.virial_mass(halo);
        let radius = self.virial_radius(halo);
        if radius <= 0.0 {
            return 0.0;
        }
        (GRAVITY * mass / radius).sqrt()
    }

    fn age_at_snapshot(&self, snap: i32) -> f64 {
        usize::try_from(snap)
            .ok()
            .and_then(|i| self.scale_factors.get(i))
            .map(|&a| self.age_at_scale_factor(a))
            .unwrap_or(0.0)
    }

    fn redshift_at_snapshot(&self, snap: i32) -> f64 {
        usize::try_from(snap)
            .ok()
            .and_then(|i| self.scale_factors.get(i))
            .map(|&a| 1.0 / a - 1.0)
            .unwrap_or(0.0)
    }
}
