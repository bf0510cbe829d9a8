//! # galform
//!
//! A semi-analytic galaxy formation evolution engine: tree traversal,
//! halo-level join/carry-forward, a phased physics pipeline, and a
//! dense per-galaxy property store, in place of the usual handful of
//! hardcoded struct fields.
//!
//! galform reads a merger tree's halos, builds a galaxy for every halo
//! that needs one (seeding new centrals, carrying existing galaxies
//! forward, collapsing halo-level mergers into a single surviving
//! branch), and runs an ordered pipeline of physics modules over every
//! galaxy at every configured sub-timestep. It has no opinion on tree
//! file formats, output formats, or which physics modules exist —
//! those are supplied by the embedding application through the
//! [`GalaxyOutputWriter`], [`MergerHandler`], [`CosmologyModel`], and
//! [`PhysicsModule`] traits.
//!
//! # Quick Start
//!
//! ```no_run
//! use galform::{
//!     evolve_forest, noop_pipeline, EvolutionContext, FileId, ForestId, GalaxyOutputWriter,
//!     MergerEvent, MergerHandler, EvolutionResult, Galaxy, HaloAux, RunParams,
//! };
//! use galform::{register_core_properties, PropertySchemaBuilder};
//! use std::sync::Arc;
//!
//! struct StdoutWriter;
//!
//! impl GalaxyOutputWriter for StdoutWriter {
//!     fn commit(&mut self, galaxy: &Galaxy, snap: i32) -> EvolutionResult<()> {
//!         println!("snap {snap}: galaxy {}", galaxy.galaxy_index);
//!         Ok(())
//!     }
//!
//!     fn patch_merge_target(&mut self, _: u64, _: i64, _: i32) -> EvolutionResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! struct DropSatellites;
//!
//! impl MergerHandler for DropSatellites {
//!     fn handle_merger(&mut self, _ctx: &mut EvolutionContext, _event: &MergerEvent) -> EvolutionResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> EvolutionResult<()> {
//!     let mut builder = PropertySchemaBuilder::new();
//!     register_core_properties(&mut builder)?;
//!     let schema = Arc::new(builder.build());
//!     let params = Arc::new(RunParams::new(20, 43007.1, vec![0.1, 0.2], vec![1], None, 1_000, 1_000_000)?);
//!
//!     let cosmology = Arc::new(galform::FlatLcdmCosmology::new(0.308, 0.692, 0.678));
//!     let halos = vec![]; // supplied by the tree reader
//!     let halo_aux = vec![];
//!     let mut ctx = EvolutionContext::new(schema, params, cosmology, ForestId::new(0), FileId::new(0), halos, halo_aux)?;
//!
//!     let pipeline = noop_pipeline(&["infall", "cooling", "star_formation"]);
//!     let mut writer = StdoutWriter;
//!     let mut mergers = DropSatellites;
//!     evolve_forest(&mut ctx, &pipeline, &mut mergers, &mut writer)?;
//!     println!("{}", ctx.diagnostics().summary());
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! | Crate | Responsibility |
//! |-------|----------------|
//! | `galform-core` | Identifiers, error model, halo records, run configuration, the `CosmologyModel` seam |
//! | `galform-primitives` | The property store, the galaxy record, the galaxy array, the merger queue, diagnostics |
//! | `galform-engine` | Join/carry-forward, tree traversal, the physics pipeline, the evolution driver |
//!
//! Only this crate's re-exports are considered part of the stable
//! public API; the sub-crates may rearrange their internals across
//! minor versions.

pub use galform_core::{
    compose_galaxy_index, CosmologyModel, EvolutionError, EvolutionResult, FileId, ForestId,
    GalaxyType, Halo, HaloAux, HaloFlag, MergeType, Phase, PropertyId, PropertyMetadata,
    PropertyType, PropertyValue, RunParams, MERGE_TIME_INFINITE,
};
pub use galform_primitives::{
    register_core_properties, DiagnosticEvent, Diagnostics, Galaxy, GalaxyArray, GalaxyOrigin,
    MergerEvent, MergerEventQueue, PropertySchema, PropertySchemaBuilder, PropertyStorage,
    RunSummary,
};
pub use galform_engine::{
    assign_fof_group, construct, construct_fof_group, evolve_forest, join_halo, noop_pipeline,
    require_module, EvolutionContext, GalaxyOutputWriter, MergerHandler, NoopModule,
    PhysicsModule, PipelineRegistry,
};

mod cosmology;
pub use cosmology::FlatLcdmCosmology;
