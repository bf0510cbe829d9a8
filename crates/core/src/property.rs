//! Lightweight property-schema vocabulary shared between the property
//! store implementation (in `galform-primitives`) and anything that
//! needs to name a property without depending on the store itself.

/// Dense numeric identifier of a registered property. Stable for the
/// lifetime of a [`PropertySchema`](https://docs.rs/galform-primitives)
/// instance; never reused across schema rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u32);

impl PropertyId {
    /// Wrap a raw dense index as a property id.
    pub fn new(raw: u32) -> Self {
        PropertyId(raw)
    }

    /// The raw dense index, usable to index a `Vec` of per-property slots.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scalar element type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 64-bit unsigned integer.
    U64,
}

/// A typed property value: either a scalar or a fixed-length array of
/// one of the five recognized scalar kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Scalar `f32`.
    F32(f32),
    /// Scalar `f64`.
    F64(f64),
    /// Scalar `i32`.
    I32(i32),
    /// Scalar `i64`.
    I64(i64),
    /// Scalar `u64`.
    U64(u64),
    /// Fixed-length `f32` array.
    F32Array(Vec<f32>),
    /// Fixed-length `f64` array.
    F64Array(Vec<f64>),
    /// Fixed-length `i32` array.
    I32Array(Vec<i32>),
    /// Fixed-length `i64` array.
    I64Array(Vec<i64>),
    /// Fixed-length `u64` array.
    U64Array(Vec<u64>),
}

impl PropertyValue {
    /// The scalar element type carried by this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::F32(_) | PropertyValue::F32Array(_) => PropertyType::F32,
            PropertyValue::F64(_) | PropertyValue::F64Array(_) => PropertyType::F64,
            PropertyValue::I32(_) | PropertyValue::I32Array(_) => PropertyType::I32,
            PropertyValue::I64(_) | PropertyValue::I64Array(_) => PropertyType::I64,
            PropertyValue::U64(_) | PropertyValue::U64Array(_) => PropertyType::U64,
        }
    }

    /// True if this value is an array rather than a scalar.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            PropertyValue::F32Array(_)
                | PropertyValue::F64Array(_)
                | PropertyValue::I32Array(_)
                | PropertyValue::I64Array(_)
                | PropertyValue::U64Array(_)
        )
    }

    /// Array length, or `1` for a scalar.
    pub fn len(&self) -> usize {
        match self {
            PropertyValue::F32Array(v) => v.len(),
            PropertyValue::F64Array(v) => v.len(),
            PropertyValue::I32Array(v) => v.len(),
            PropertyValue::I64Array(v) => v.len(),
            PropertyValue::U64Array(v) => v.len(),
            _ => 1,
        }
    }

    /// True if `len()` would return `0`. Never true for a scalar.
    pub fn is_empty(&self) -> bool {
        self.is_array() && self.len() == 0
    }
}

/// Immutable description of one registered property: its name, type,
/// shape, default value, and whether it is part of the fixed core set.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    /// Dense id assigned at registration time.
    pub id: PropertyId,
    /// Canonical name, e.g. `"Mvir"`.
    pub name: String,
    /// Scalar element type.
    pub ty: PropertyType,
    /// True if this property is a fixed-length array.
    pub is_array: bool,
    /// Array length (`1` for scalars).
    pub array_len: usize,
    /// Default value assigned on allocation and on reset.
    pub default: PropertyValue,
    /// True for the always-present core properties
    /// (`id.index() < CORE_COUNT`); false for physics-module extensions.
    pub core: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_id_index_round_trips() {
        let id = PropertyId::new(17);
        assert_eq!(id.index(), 17);
    }

    #[test]
    fn scalar_len_is_always_one() {
        assert_eq!(PropertyValue::F64(1.0).len(), 1);
        assert!(!PropertyValue::F64(1.0).is_array());
    }

    #[test]
    fn array_value_reports_its_type_and_length() {
        let v = PropertyValue::F32Array(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.property_type(), PropertyType::F32);
        assert!(v.is_array());
        assert_eq!(v.len(), 3);
        assert!(!v.is_empty());
    }

    #[test]
    fn empty_array_is_empty() {
        let v: PropertyValue = PropertyValue::I32Array(vec![]);
        assert!(v.is_empty());
    }
}
