//! Galaxy classification and merger bookkeeping vocabulary shared across
//! crates.

/// A galaxy's structural role within its FOF group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GalaxyType {
    /// Central galaxy of a halo that is itself a FOF central.
    #[default]
    Central = 0,
    /// Satellite galaxy whose own subhalo still exists.
    SatelliteSubhalo = 1,
    /// Satellite whose subhalo has been stripped away; it is now
    /// carried by the central's position.
    Orphan = 2,
    /// Consumed by a merger; no longer evolved, kept for output only.
    Merged = 3,
}

impl GalaxyType {
    /// The on-disk/legacy numeric encoding.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Reconstructs a [`GalaxyType`] from its numeric encoding.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(GalaxyType::Central),
            1 => Some(GalaxyType::SatelliteSubhalo),
            2 => Some(GalaxyType::Orphan),
            3 => Some(GalaxyType::Merged),
            _ => None,
        }
    }

    /// True for [`GalaxyType::Merged`] — skipped by every physics step.
    pub fn is_merged(self) -> bool {
        matches!(self, GalaxyType::Merged)
    }

    /// True for any non-central type (satellite, orphan, or merged).
    pub fn is_satellite_like(self) -> bool {
        !matches!(self, GalaxyType::Central)
    }
}

/// Classification of how a galaxy was consumed by a merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeType {
    /// Not merged (yet).
    #[default]
    None = 0,
    /// Minor merger: the satellite's baryons are added to the central's
    /// hot/intracluster reservoirs.
    Minor = 1,
    /// Major merger: triggers a starburst and morphological transformation.
    Major = 2,
    /// Disk instability collapse, not a merger with another galaxy.
    DiskInstability = 3,
    /// Fully disrupted into the intracluster component.
    Disrupted = 4,
}

impl MergeType {
    /// The on-disk/legacy numeric encoding.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Reconstructs a [`MergeType`] from its numeric encoding.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(MergeType::None),
            1 => Some(MergeType::Minor),
            2 => Some(MergeType::Major),
            3 => Some(MergeType::DiskInstability),
            4 => Some(MergeType::Disrupted),
            _ => None,
        }
    }
}

/// Sentinel merger time treated as "effectively infinite": the galaxy is
/// not presently scheduled to merge.
pub const MERGE_TIME_INFINITE: f64 = 999.9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn galaxy_type_round_trips_through_its_numeric_encoding() {
        for t in [
            GalaxyType::Central,
            GalaxyType::SatelliteSubhalo,
            GalaxyType::Orphan,
            GalaxyType::Merged,
        ] {
            assert_eq!(GalaxyType::from_i32(t.as_i32()), Some(t));
        }
        assert_eq!(GalaxyType::from_i32(99), None);
    }

    #[test]
    fn merge_type_round_trips_through_its_numeric_encoding() {
        for t in [
            MergeType::None,
            MergeType::Minor,
            MergeType::Major,
            MergeType::DiskInstability,
            MergeType::Disrupted,
        ] {
            assert_eq!(MergeType::from_i32(t.as_i32()), Some(t));
        }
    }

    #[test]
    fn merged_is_the_only_terminal_type() {
        assert!(GalaxyType::Merged.is_merged());
        assert!(!GalaxyType::Orphan.is_merged());
    }

    #[test]
    fn satellite_like_excludes_only_central() {
        assert!(!GalaxyType::Central.is_satellite_like());
        assert!(GalaxyType::SatelliteSubhalo.is_satellite_like());
        assert!(GalaxyType::Orphan.is_satellite_like());
        assert!(GalaxyType::Merged.is_satellite_like());
    }
}
