//! Run-wide configuration, loaded from TOML with the teacher's
//! `serde` + `toml` convention: defaults baked into the struct via
//! `#[serde(default = ...)]`, validated by a constructor rather than at
//! the call sites that use the values.

use crate::error::{EvolutionError, EvolutionResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_steps() -> u32 {
    20
}

fn default_g() -> f64 {
    43007.1
}

fn default_forest_mulfac() -> i64 {
    1_000_000_000_000
}

fn default_file_mulfac() -> i64 {
    1_000_000_000_000_000
}

/// Run-wide parameters recognized by the engine.
///
/// Constructed via [`RunParams::new`] or loaded from a TOML file with
/// [`RunParams::from_file`]; both paths run the same validation, so a
/// `RunParams` in hand is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Number of physics sub-timesteps per snapshot gap.
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Gravitational constant in the run's internal unit system.
    #[serde(default = "default_g")]
    pub gravity: f64,

    /// Cosmic age at each snapshot, indexed by snapshot number.
    #[serde(default)]
    pub age: Vec<f64>,

    /// Snapshots at which galaxies are written to output.
    #[serde(default)]
    pub list_output_snaps: Vec<i32>,

    /// Optional last snapshot to process; later snapshots are skipped
    /// even if present in the tree.
    #[serde(default)]
    pub max_snap: Option<i32>,

    /// Multiplier applied to the forest number when composing a global
    /// galaxy index.
    #[serde(default = "default_forest_mulfac")]
    pub forest_mulfac: i64,

    /// Multiplier applied to the file number when composing a global
    /// galaxy index.
    #[serde(default = "default_file_mulfac")]
    pub file_mulfac: i64,
}

impl RunParams {
    /// Construct and validate a [`RunParams`].
    ///
    /// Rejects zero sub-timesteps and an empty age table; both make the
    /// evolution driver's arithmetic meaningless rather than merely
    /// degenerate.
    pub fn new(
        steps: u32,
        gravity: f64,
        age: Vec<f64>,
        list_output_snaps: Vec<i32>,
        max_snap: Option<i32>,
        forest_mulfac: i64,
        file_mulfac: i64,
    ) -> EvolutionResult<Self> {
        let params = RunParams {
            steps,
            gravity,
            age,
            list_output_snaps,
            max_snap,
            forest_mulfac,
            file_mulfac,
        };
        params.validate()?;
        Ok(params)
    }

    /// Parse and validate a [`RunParams`] from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> EvolutionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EvolutionError::contract_violation(format!(
                "could not read params file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a [`RunParams`] from a TOML string.
    pub fn from_toml_str(text: &str) -> EvolutionResult<Self> {
        let params: RunParams = toml::from_str(text)
            .map_err(|e| EvolutionError::contract_violation(format!("invalid params: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> EvolutionResult<()> {
        if self.steps == 0 {
            return Err(EvolutionError::contract_violation(
                "steps must be at least 1",
            ));
        }
        if self.age.is_empty() {
            return Err(EvolutionError::contract_violation(
                "age table must not be empty",
            ));
        }
        if self.forest_mulfac <= 0 || self.file_mulfac <= 0 {
            return Err(EvolutionError::contract_violation(
                "forest_mulfac and file_mulfac must be positive",
            ));
        }
        Ok(())
    }

    /// Cosmic age at `snap`, or `None` if `snap` is out of range of the
    /// age table.
    pub fn age_at(&self, snap: i32) -> Option<f64> {
        usize::try_from(snap).ok().and_then(|i| self.age.get(i).copied())
    }

    /// True if `snap` is at or beyond the configured stopping point.
    pub fn should_stop_at(&self, snap: i32) -> bool {
        match self.max_snap {
            Some(max) => snap >= max,
            None => false,
        }
    }

    /// True if `snap` is one of the configured output snapshots.
    pub fn is_output_snap(&self, snap: i32) -> bool {
        self.list_output_snaps.contains(&snap)
    }
}
