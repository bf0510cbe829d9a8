//! The property store: a process-wide schema of typed, named
//! properties plus a per-galaxy storage block that holds one value per
//! registered property.
//!
//! This is the single representation for every galaxy attribute that
//! used to live in two places at once (a struct field and a property
//! slot, kept in sync by hand). Core attributes and physics-module
//! extensions are registered through the same API; the only difference
//! is registration order, which fixes `is_core`.

use galform_core::{EvolutionError, EvolutionResult, PropertyId, PropertyMetadata, PropertyType, PropertyValue};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

const NAME_CACHE_CAPACITY: usize = 64;

/// Process-wide, immutable description of every registered property.
///
/// Built once via [`PropertySchemaBuilder`] and shared (typically
/// behind an `Arc`) by every [`PropertyStorage`] allocated against it.
#[derive(Debug)]
pub struct PropertySchema {
    properties: Vec<PropertyMetadata>,
    core_count: usize,
    name_cache: parking_lot::Mutex<NameCache>,
}

impl PropertySchema {
    /// Number of registered properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True if no properties are registered.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Metadata for `id`, or `None` if `id` is out of range.
    pub fn metadata(&self, id: PropertyId) -> Option<&PropertyMetadata> {
        self.properties.get(id.index())
    }

    /// True iff `id` names a core property (`id.index() < CORE_COUNT`).
    pub fn is_core(&self, id: PropertyId) -> bool {
        id.index() < self.core_count
    }

    /// Number of core properties, i.e. the smallest id that names an
    /// extension property.
    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// Look up a property id by name.
    ///
    /// Checks a small bounded cache first; on a miss, scans the
    /// metadata table and refreshes the cache. Unknown names return
    /// `None`, never a sentinel id.
    pub fn id_of(&self, name: &str) -> Option<PropertyId> {
        {
            let cache = self.name_cache.lock();
            if let Some(id) = cache.get(name) {
                return Some(id);
            }
        }
        let found = self
            .properties
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.id);
        if let Some(id) = found {
            self.name_cache.lock().insert(name.to_string(), id);
        }
        found
    }

    /// Name registered for `id`, or `None` if `id` is out of range.
    pub fn name_of(&self, id: PropertyId) -> Option<&str> {
        self.metadata(id).map(|m| m.name.as_str())
    }
}

#[derive(Debug)]
struct NameCache {
    entries: VecDeque<(String, PropertyId)>,
}

impl NameCache {
    fn new() -> Self {
        NameCache {
            entries: VecDeque::with_capacity(NAME_CACHE_CAPACITY),
        }
    }

    fn get(&self, name: &str) -> Option<PropertyId> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    fn insert(&mut self, name: String, id: PropertyId) {
        if self.entries.len() >= NAME_CACHE_CAPACITY {
            self.entries.pop_back();
        }
        self.entries.push_front((name, id));
    }
}

/// Builds a [`PropertySchema`], enforcing that core properties are all
/// registered before any extension property so that `is_core` reduces
/// to a single comparison.
pub struct PropertySchemaBuilder {
    properties: Vec<PropertyMetadata>,
    names: FxHashSet<String>,
    extensions_started: bool,
}

impl PropertySchemaBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        PropertySchemaBuilder {
            properties: Vec::new(),
            names: FxHashSet::default(),
            extensions_started: false,
        }
    }

    /// Register a scalar or array core property.
    pub fn add_core(
        &mut self,
        name: impl Into<String>,
        ty: PropertyType,
        default: PropertyValue,
    ) -> EvolutionResult<PropertyId> {
        if self.extensions_started {
            return Err(EvolutionError::contract_violation(format!(
                "core property '{}' registered after an extension property",
                name.into()
            )));
        }
        self.register(name, ty, default, true)
    }

    /// Register a physics-module extension property.
    pub fn add_extension(
        &mut self,
        name: impl Into<String>,
        ty: PropertyType,
        default: PropertyValue,
    ) -> EvolutionResult<PropertyId> {
        self.extensions_started = true;
        self.register(name, ty, default, false)
    }

    fn register(
        &mut self,
        name: impl Into<String>,
        ty: PropertyType,
        default: PropertyValue,
        core: bool,
    ) -> EvolutionResult<PropertyId> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(EvolutionError::contract_violation(format!(
                "duplicate property name '{name}'"
            )));
        }
        if default.property_type() != ty {
            return Err(EvolutionError::contract_violation(format!(
                "property '{name}' default value type does not match declared type"
            )));
        }
        let id = PropertyId::new(self.properties.len() as u32);
        let is_array = default.is_array();
        let array_len = default.len();
        self.properties.push(PropertyMetadata {
            id,
            name,
            ty,
            is_array,
            array_len,
            default,
            core,
        });
        Ok(id)
    }

    /// Finish building the schema.
    pub fn build(self) -> PropertySchema {
        let core_count = self.properties.iter().filter(|m| m.core).count();
        PropertySchema {
            properties: self.properties,
            core_count,
            name_cache: parking_lot::Mutex::new(NameCache::new()),
        }
    }
}

impl Default for PropertySchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Array element accessors are identical in shape across the five
// recognised scalar types; this macro keeps the `f32`/`f64`/`i32`/`i64`/
// `u64` pairs from drifting out of sync with one another.
//
// `get_array_element_<T>` reads element `index` of array property
// `id`, returning `fallback` if `id` is invalid, not a `<T>` array, or
// `index` is out of bounds.
//
// `set_array_element_<T>` writes element `index` of array property
// `id`, returning an `Err` under the same conditions.
macro_rules! array_element_accessors {
    ($get:ident, $set:ident, $variant:ident, $t:ty, $label:literal) => {
        #[doc = concat!(
            "Read element `index` of array property `id` as `",
            $label,
            "`, or `fallback` if `id` is invalid, not a `",
            $label,
            "` array, or `index` is out of bounds."
        )]
        pub fn $get(
            &self,
            schema: &PropertySchema,
            id: PropertyId,
            index: usize,
            fallback: $t,
        ) -> $t {
            match (schema.metadata(id), self.values.get(id.index())) {
                (Some(_), Some(PropertyValue::$variant(arr))) => {
                    arr.get(index).copied().unwrap_or(fallback)
                }
                _ => fallback,
            }
        }

        #[doc = concat!(
            "Write element `index` of array property `id`. No-op with an ",
            "`Err` if `id` is invalid, not a `",
            $label,
            "` array, or `index` is out of bounds."
        )]
        pub fn $set(
            &mut self,
            schema: &PropertySchema,
            id: PropertyId,
            index: usize,
            value: $t,
        ) -> EvolutionResult<()> {
            let meta = schema.metadata(id).ok_or_else(|| {
                EvolutionError::unknown_option(format!("property id {}", id.index()))
            })?;
            match self.values.get_mut(id.index()) {
                Some(PropertyValue::$variant(arr)) => {
                    let slot = arr.get_mut(index).ok_or_else(|| {
                        EvolutionError::contract_violation(format!(
                            "array index {index} out of bounds for property '{}'",
                            meta.name
                        ))
                    })?;
                    *slot = value;
                    Ok(())
                }
                _ => Err(EvolutionError::contract_violation(format!(
                    concat!("property '{}' is not a ", $label, " array"),
                    meta.name
                ))),
            }
        }
    };
}

/// Per-galaxy storage block: one [`PropertyValue`] slot per property
/// registered in the owning schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyStorage {
    values: Vec<PropertyValue>,
}

impl PropertyStorage {
    /// Allocate storage for `schema`, filling every slot with its
    /// registered default value.
    pub fn allocate(schema: &PropertySchema) -> Self {
        PropertyStorage {
            values: schema.properties.iter().map(|m| m.default.clone()).collect(),
        }
    }

    /// Overwrite every slot in place with `schema`'s default values,
    /// without reallocating.
    pub fn reset_to_defaults(&mut self, schema: &PropertySchema) {
        for (slot, meta) in self.values.iter_mut().zip(schema.properties.iter()) {
            *slot = meta.default.clone();
        }
    }

    /// Deep-copy this storage block. Owned `Vec` buffers mean the
    /// result never aliases `self`'s buffers.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    fn scalar<T>(
        &self,
        schema: &PropertySchema,
        id: PropertyId,
        fallback: T,
        extract: impl Fn(&PropertyValue) -> Option<T>,
        expected: PropertyType,
    ) -> T {
        let Some(meta) = schema.metadata(id) else {
            return fallback;
        };
        let Some(slot) = self.values.get(id.index()) else {
            return fallback;
        };
        match extract(slot) {
            Some(v) => v,
            None => {
                tracing::error!(
                    target: "galform_primitives::property",
                    property = meta.name.as_str(),
                    expected = ?expected,
                    actual = ?slot.property_type(),
                    "property type mismatch on read"
                );
                fallback
            }
        }
    }

    /// Read property `id` as `f32`, or `fallback` if `id` is invalid or
    /// not an `f32` scalar.
    pub fn get_f32(&self, schema: &PropertySchema, id: PropertyId, fallback: f32) -> f32 {
        self.scalar(
            schema,
            id,
            fallback,
            |v| if let PropertyValue::F32(x) = v { Some(*x) } else { None },
            PropertyType::F32,
        )
    }

    /// Read property `id` as `f64`, or `fallback` if `id` is invalid or
    /// not an `f64` scalar.
    pub fn get_f64(&self, schema: &PropertySchema, id: PropertyId, fallback: f64) -> f64 {
        self.scalar(
            schema,
            id,
            fallback,
            |v| if let PropertyValue::F64(x) = v { Some(*x) } else { None },
            PropertyType::F64,
        )
    }

    /// Read property `id` as `i32`, or `fallback` if `id` is invalid or
    /// not an `i32` scalar.
    pub fn get_i32(&self, schema: &PropertySchema, id: PropertyId, fallback: i32) -> i32 {
        self.scalar(
            schema,
            id,
            fallback,
            |v| if let PropertyValue::I32(x) = v { Some(*x) } else { None },
            PropertyType::I32,
        )
    }

    /// Read property `id` as `i64`, or `fallback` if `id` is invalid or
    /// not an `i64` scalar.
    pub fn get_i64(&self, schema: &PropertySchema, id: PropertyId, fallback: i64) -> i64 {
        self.scalar(
            schema,
            id,
            fallback,
            |v| if let PropertyValue::I64(x) = v { Some(*x) } else { None },
            PropertyType::I64,
        )
    }

    /// Read property `id` as `u64`, or `fallback` if `id` is invalid or
    /// not a `u64` scalar.
    pub fn get_u64(&self, schema: &PropertySchema, id: PropertyId, fallback: u64) -> u64 {
        self.scalar(
            schema,
            id,
            fallback,
            |v| if let PropertyValue::U64(x) = v { Some(*x) } else { None },
            PropertyType::U64,
        )
    }

    fn set_checked(
        &mut self,
        schema: &PropertySchema,
        id: PropertyId,
        value: PropertyValue,
    ) -> EvolutionResult<()> {
        let meta = schema.metadata(id).ok_or_else(|| {
            EvolutionError::unknown_option(format!("property id {}", id.index()))
        })?;
        if value.property_type() != meta.ty || value.is_array() != meta.is_array {
            return Err(EvolutionError::contract_violation(format!(
                "type mismatch writing property '{}'",
                meta.name
            )));
        }
        let Some(slot) = self.values.get_mut(id.index()) else {
            return Err(EvolutionError::unknown_option(format!(
                "property id {}",
                id.index()
            )));
        };
        *slot = value;
        Ok(())
    }

    /// Write `value` to scalar property `id`. No-op with an `Err` if
    /// `id` is invalid or not an `f32` scalar.
    pub fn set_f32(&mut self, schema: &PropertySchema, id: PropertyId, value: f32) -> EvolutionResult<()> {
        self.set_checked(schema, id, PropertyValue::F32(value))
    }

    /// Write `value` to scalar property `id`. No-op with an `Err` if
    /// `id` is invalid or not an `f64` scalar.
    pub fn set_f64(&mut self, schema: &PropertySchema, id: PropertyId, value: f64) -> EvolutionResult<()> {
        self.set_checked(schema, id, PropertyValue::F64(value))
    }

    /// Write `value` to scalar property `id`. No-op with an `Err` if
    /// `id` is invalid or not an `i32` scalar.
    pub fn set_i32(&mut self, schema: &PropertySchema, id: PropertyId, value: i32) -> EvolutionResult<()> {
        self.set_checked(schema, id, PropertyValue::I32(value))
    }

    /// Write `value` to scalar property `id`. No-op with an `Err` if
    /// `id` is invalid or not an `i64` scalar.
    pub fn set_i64(&mut self, schema: &PropertySchema, id: PropertyId, value: i64) -> EvolutionResult<()> {
        self.set_checked(schema, id, PropertyValue::I64(value))
    }

    /// Write `value` to scalar property `id`. No-op with an `Err` if
    /// `id` is invalid or not a `u64` scalar.
    pub fn set_u64(&mut self, schema: &PropertySchema, id: PropertyId, value: u64) -> EvolutionResult<()> {
        self.set_checked(schema, id, PropertyValue::U64(value))
    }

    array_element_accessors!(get_array_element_f32, set_array_element_f32, F32Array, f32, "f32");
    array_element_accessors!(get_array_element_f64, set_array_element_f64, F64Array, f64, "f64");
    array_element_accessors!(get_array_element_i32, set_array_element_i32, I32Array, i32, "i32");
    array_element_accessors!(get_array_element_i64, set_array_element_i64, I64Array, i64, "i64");
    array_element_accessors!(get_array_element_u64, set_array_element_u64, U64Array, u64, "u64");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> PropertySchema {
        let mut b = PropertySchemaBuilder::new();
        b.add_core("Mvir", PropertyType::F64, PropertyValue::F64(0.0)).unwrap();
        b.add_core("Len", PropertyType::I32, PropertyValue::I32(0)).unwrap();
        b.add_core(
            "Pos",
            PropertyType::F32,
            PropertyValue::F32Array(vec![0.0, 0.0, 0.0]),
        )
        .unwrap();
        b.add_extension("StellarMass", PropertyType::F64, PropertyValue::F64(0.0))
            .unwrap();
        b.add_extension(
            "SnapHistory",
            PropertyType::I64,
            PropertyValue::I64Array(vec![0, 0]),
        )
        .unwrap();
        b.add_extension(
            "BinCounts",
            PropertyType::U64,
            PropertyValue::U64Array(vec![0, 0]),
        )
        .unwrap();
        b.add_extension(
            "FlagHistory",
            PropertyType::I32,
            PropertyValue::I32Array(vec![0, 0]),
        )
        .unwrap();
        b.build()
    }

    #[test]
    fn core_count_matches_core_registrations() {
        let schema = sample_schema();
        assert_eq!(schema.core_count(), 3);
        assert_eq!(schema.len(), 7);
        assert!(schema.is_core(schema.id_of("Len").unwrap()));
        assert!(!schema.is_core(schema.id_of("StellarMass").unwrap()));
    }

    #[test]
    fn rejects_core_property_registered_after_an_extension() {
        let mut b = PropertySchemaBuilder::new();
        b.add_extension("StellarMass", PropertyType::F64, PropertyValue::F64(0.0))
            .unwrap();
        let err = b
            .add_core("Mvir", PropertyType::F64, PropertyValue::F64(0.0))
            .unwrap_err();
        assert!(err.is_fatal_to_run());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut b = PropertySchemaBuilder::new();
        b.add_core("Mvir", PropertyType::F64, PropertyValue::F64(0.0)).unwrap();
        let err = b
            .add_core("Mvir", PropertyType::F64, PropertyValue::F64(0.0))
            .unwrap_err();
        assert!(err.is_fatal_to_run());
    }

    #[test]
    fn id_of_is_case_sensitive_and_unknown_names_return_none() {
        let schema = sample_schema();
        assert!(schema.id_of("mvir").is_none());
        assert!(schema.id_of("NoSuchProperty").is_none());
        assert!(schema.id_of("Mvir").is_some());
    }

    #[test]
    fn allocate_fills_defaults_and_scalar_round_trips() {
        let schema = sample_schema();
        let mut storage = PropertyStorage::allocate(&schema);
        let mvir = schema.id_of("Mvir").unwrap();
        assert_eq!(storage.get_f64(&schema, mvir, -1.0), 0.0);
        storage.set_f64(&schema, mvir, 12.5).unwrap();
        assert_eq!(storage.get_f64(&schema, mvir, -1.0), 12.5);
    }

    #[test]
    fn type_mismatch_on_read_falls_back_without_panicking() {
        let schema = sample_schema();
        let storage = PropertyStorage::allocate(&schema);
        let mvir = schema.id_of("Mvir").unwrap();
        assert_eq!(storage.get_i32(&schema, mvir, -7), -7);
    }

    #[test]
    fn type_mismatch_on_write_is_rejected() {
        let schema = sample_schema();
        let mut storage = PropertyStorage::allocate(&schema);
        let mvir = schema.id_of("Mvir").unwrap();
        assert!(storage.set_i32(&schema, mvir, 5).is_err());
    }

    #[test]
    fn array_element_access_is_bounds_checked() {
        let schema = sample_schema();
        let mut storage = PropertyStorage::allocate(&schema);
        let pos = schema.id_of("Pos").unwrap();
        storage.set_array_element_f32(&schema, pos, 1, 9.0).unwrap();
        assert_eq!(storage.get_array_element_f32(&schema, pos, 1, -1.0), 9.0);
        assert_eq!(storage.get_array_element_f32(&schema, pos, 99, -1.0), -1.0);
        assert!(storage.set_array_element_f32(&schema, pos, 99, 1.0).is_err());
    }

    #[test]
    fn array_element_accessors_cover_every_scalar_type() {
        let schema = sample_schema();
        let mut storage = PropertyStorage::allocate(&schema);

        let pos = schema.id_of("Pos").unwrap();
        storage.set_array_element_f32(&schema, pos, 0, 1.5).unwrap();
        assert_eq!(storage.get_array_element_f32(&schema, pos, 0, -1.0), 1.5);

        let history = schema.id_of("SnapHistory").unwrap();
        storage.set_array_element_i64(&schema, history, 1, 42).unwrap();
        assert_eq!(storage.get_array_element_i64(&schema, history, 1, -1), 42);
        assert_eq!(storage.get_array_element_i64(&schema, history, 99, -1), -1);
        assert!(storage.set_array_element_i64(&schema, history, 99, 0).is_err());

        let bins = schema.id_of("BinCounts").unwrap();
        storage.set_array_element_u64(&schema, bins, 0, 7).unwrap();
        assert_eq!(storage.get_array_element_u64(&schema, bins, 0, 0), 7);

        let flags = schema.id_of("FlagHistory").unwrap();
        storage.set_array_element_i32(&schema, flags, 1, -3).unwrap();
        assert_eq!(storage.get_array_element_i32(&schema, flags, 1, 0), -3);

        let mvir = schema.id_of("StellarMass").unwrap();
        assert!(storage.set_array_element_f64(&schema, mvir, 0, 1.0).is_err());
    }

    #[test]
    fn set_array_element_f64_writes_in_place() {
        let mut b = PropertySchemaBuilder::new();
        let id = b
            .add_core(
                "SfrHistory",
                PropertyType::F64,
                PropertyValue::F64Array(vec![0.0, 0.0, 0.0]),
            )
            .unwrap();
        let schema = b.build();
        let mut storage = PropertyStorage::allocate(&schema);
        storage.set_array_element_f64(&schema, id, 2, 3.25).unwrap();
        assert_eq!(storage.get_array_element_f64(&schema, id, 2, -1.0), 3.25);
        assert_eq!(storage.get_array_element_f64(&schema, id, 0, -1.0), 0.0);
    }

    #[test]
    fn deep_copy_never_aliases_the_source() {
        let schema = sample_schema();
        let mut a = PropertyStorage::allocate(&schema);
        let mvir = schema.id_of("Mvir").unwrap();
        a.set_f64(&schema, mvir, 1.0).unwrap();
        let mut b = a.deep_copy();
        b.set_f64(&schema, mvir, 2.0).unwrap();
        assert_eq!(a.get_f64(&schema, mvir, 0.0), 1.0);
        assert_eq!(b.get_f64(&schema, mvir, 0.0), 2.0);
    }

    #[test]
    fn reset_to_defaults_restores_every_slot() {
        let schema = sample_schema();
        let mut storage = PropertyStorage::allocate(&schema);
        let mvir = schema.id_of("Mvir").unwrap();
        storage.set_f64(&schema, mvir, 42.0).unwrap();
        storage.reset_to_defaults(&schema);
        assert_eq!(storage.get_f64(&schema, mvir, -1.0), 0.0);
    }

    #[test]
    fn name_cache_survives_more_than_capacity_lookups() {
        let mut b = PropertySchemaBuilder::new();
        for i in 0..100 {
            b.add_core(format!("Prop{i}"), PropertyType::F64, PropertyValue::F64(0.0))
                .unwrap();
        }
        let schema = b.build();
        for i in 0..100 {
            assert!(schema.id_of(&format!("Prop{i}")).is_some());
        }
        assert!(schema.id_of("Prop0").is_some());
    }
}
