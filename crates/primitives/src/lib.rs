//! Property store, galaxy record, galaxy array, merger queue, and
//! diagnostics primitives for the galform evolution engine.
//!
//! These are the leaf data structures the engine is built from; none
//! of them know about trees, forests, or pipelines. That orchestration
//! lives one layer up, in `galform-engine`.

pub mod diagnostics;
pub mod galaxy;
pub mod galaxy_array;
pub mod merger_queue;
pub mod property;

pub use diagnostics::{DiagnosticEvent, Diagnostics, GalaxyOrigin, RunSummary};
pub use galaxy::{register_core_properties, Galaxy};
pub use galaxy_array::GalaxyArray;
pub use merger_queue::{MergerEvent, MergerEventQueue};
pub use property::{PropertySchema, PropertySchemaBuilder, PropertyStorage};
