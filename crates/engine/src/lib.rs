//! The evolution engine: threads a forest's halos and galaxies through
//! tree construction, the physics pipeline, merger handling, and
//! output, one forest at a time.
//!
//! This crate depends on both `galform-core` (identifiers, error
//! types, halo records, run configuration) and `galform-primitives`
//! (the galaxy record, its property store, diagnostics). It has no
//! opinion on where halos come from or where galaxies end up — those
//! are the [`collaborators`] seam.

pub mod collaborators;
pub mod context;
pub mod driver;
pub mod join;
pub mod pipeline;
pub mod traversal;

pub use collaborators::{GalaxyOutputWriter, MergerHandler};
pub use context::EvolutionContext;
pub use driver::evolve_forest;
pub use join::{assign_fof_group, join_halo};
pub use pipeline::{noop_pipeline, require_module, NoopModule, PhysicsModule, PipelineRegistry};
pub use traversal::{construct, construct_fof_group};
