//! Newtype identifiers and the global galaxy index composition rule.

use std::fmt;

/// Identifies a merger forest within a single input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForestId(u64);

impl ForestId {
    /// Construct a forest id from its raw numeric value.
    pub fn new(raw: u64) -> Self {
        ForestId(raw)
    }

    /// The raw numeric value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ForestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forest#{}", self.0)
    }
}

/// Identifies the input tree file a forest was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u64);

impl FileId {
    /// Construct a file id from its raw numeric value.
    pub fn new(raw: u64) -> Self {
        FileId(raw)
    }

    /// The raw numeric value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Composes a process-wide unique galaxy index from a per-forest galaxy
/// number, the owning forest number, and the owning file number.
///
/// The composition is `galaxy_nr + forest_mulfac * forest_nr +
/// file_mulfac * file_nr`, checked at every step: any intermediate
/// multiplication or addition that would overflow `i64` is reported as
/// an invariant violation rather than silently wrapping. Callers choose
/// `forest_mulfac` and `file_mulfac` large enough that forests and files
/// never collide; this function only guards the arithmetic, it does not
/// choose the multipliers.
pub fn compose_galaxy_index(
    galaxy_nr: i64,
    forest_nr: i64,
    forest_mulfac: i64,
    file_nr: i64,
    file_mulfac: i64,
) -> Option<i64> {
    let forest_term = forest_mulfac.checked_mul(forest_nr)?;
    let file_term = file_mulfac.checked_mul(file_nr)?;
    galaxy_nr.checked_add(forest_term)?.checked_add(file_term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_in_the_expected_order() {
        let idx = compose_galaxy_index(3, 2, 1_000_000, 1, 1_000_000_000_000).unwrap();
        assert_eq!(idx, 3 + 2 * 1_000_000 + 1 * 1_000_000_000_000);
    }

    #[test]
    fn detects_overflow_instead_of_wrapping() {
        let idx = compose_galaxy_index(0, i64::MAX, 2, 0, 1);
        assert!(idx.is_none());
    }

    #[test]
    fn display_formats_are_stable() {
        assert_eq!(ForestId::new(7).to_string(), "forest#7");
        assert_eq!(FileId::new(2).to_string(), "file#2");
    }
}
