//! Shared types, error model, and collaborator traits for the galform
//! semi-analytic galaxy evolution engine.
//!
//! This crate carries no behavior beyond construction and validation:
//! the halo and auxiliary-state records the tree reader produces, the
//! newtype identifiers and index composition rule, run configuration,
//! the unified error type, and the traits through which the engine
//! reaches cosmology, output, and merger-handling collaborators
//! supplied by the embedding application.

pub mod collaborators;
pub mod error;
pub mod galaxy_type;
pub mod halo;
pub mod ids;
pub mod params;
pub mod phase;
pub mod property;

pub use collaborators::CosmologyModel;
pub use error::{EvolutionError, EvolutionResult};
pub use galaxy_type::{GalaxyType, MergeType, MERGE_TIME_INFINITE};
pub use halo::{Halo, HaloAux, HaloFlag};
pub use ids::{compose_galaxy_index, FileId, ForestId};
pub use params::RunParams;
pub use phase::Phase;
pub use property::{PropertyId, PropertyMetadata, PropertyType, PropertyValue};
