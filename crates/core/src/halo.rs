//! Halo records as supplied by the tree reader, and the auxiliary
//! traversal state the engine threads alongside them.

/// A single halo at one snapshot, as read from the merger tree.
///
/// Links between halos (progenitors, FOF group membership) are array
/// indices into the same forest's halo slice rather than pointers —
/// the whole forest is a single contiguous arena for the duration of
/// its evolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Halo {
    /// Number of bound particles.
    pub len: i32,
    /// Position, halo-catalog units.
    pub pos: [f32; 3],
    /// Velocity, halo-catalog units.
    pub vel: [f32; 3],
    /// Maximum circular velocity.
    pub vmax: f32,
    /// Particle velocity dispersion.
    pub vel_disp: f32,
    /// Specific angular momentum.
    pub spin: [f32; 3],
    /// Snapshot number this halo belongs to.
    pub snap_num: i32,
    /// Most-bound particle id, used as a merger target anchor.
    pub most_bound_id: i64,
    /// Index of this halo's immediate progenitor on the main branch,
    /// if any.
    pub first_progenitor: Option<usize>,
    /// Index of the next progenitor sharing `first_progenitor`'s
    /// descendant, forming the progenitor linked list.
    pub next_progenitor: Option<usize>,
    /// Index of the first (central) halo in this halo's FOF group.
    pub first_halo_in_fof_group: usize,
    /// Index of the next halo in this halo's FOF group's linked list.
    pub next_halo_in_fof_group: Option<usize>,
}

impl Halo {
    /// True if this halo is the central of its FOF group.
    pub fn is_fof_central(&self, self_index: usize) -> bool {
        self.first_halo_in_fof_group == self_index
    }
}

/// Traversal state the engine threads: one entry per halo in the forest,
/// index-aligned with the halo slice.
///
/// `HaloAux` is not part of the tree reader's halo catalog; the engine
/// owns and mutates it in place during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HaloAux {
    /// Set once this halo's galaxies have been constructed.
    pub done_flag: bool,
    /// Visitation state within the current depth-first walk.
    pub halo_flag: HaloFlag,
    /// Number of galaxies attached to this halo.
    pub n_galaxies: i32,
    /// Index of the first galaxy attached to this halo, if any.
    pub first_galaxy: Option<usize>,
    /// Snapshot at which this halo's galaxies were (or will be) written
    /// out, if it is an output snapshot.
    pub output_snap_n: Option<i32>,
}

/// Visitation state of a halo within the depth-first traversal that
/// walks the FOF group's progenitor chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HaloFlag {
    /// Not yet visited by the current traversal.
    #[default]
    Unvisited,
    /// Pushed onto the traversal stack, not yet processed.
    Scheduled,
    /// Fully processed; its galaxies exist.
    Processed,
}
