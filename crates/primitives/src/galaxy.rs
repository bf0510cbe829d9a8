//! The galaxy record: identity and linkage fields that are intrinsic to
//! a galaxy's place in the tree, plus a property store holding every
//! physical quantity a physics module reads or writes.
//!
//! Earlier designs kept a handful of "hot" quantities (virial mass,
//! position, merger time, ...) mirrored both as struct fields and as
//! property-store entries, synced by hand at a few call sites. That
//! double representation is gone here: `Mvir`, `Pos`, `MergTime` and
//! the rest of the halo-derived and merger-bookkeeping quantities live
//! only in the property store, reached through the typed accessors
//! below. Only fields that are structural — who this galaxy *is* and
//! what it is linked to — are plain struct fields.

use crate::property::{PropertySchema, PropertyStorage};
use galform_core::{GalaxyType, MergeType, PropertyId, MERGE_TIME_INFINITE};

/// One galaxy at one snapshot.
#[derive(Debug, Clone)]
pub struct Galaxy {
    /// Snapshot this record belongs to.
    pub snap_num: i32,
    /// Structural role within its FOF group.
    pub galaxy_type: GalaxyType,
    /// Per-forest galaxy number, assigned at construction.
    pub galaxy_nr: i64,
    /// Globally unique index, composed from `galaxy_nr`, the owning
    /// forest number, and the owning file number.
    pub galaxy_index: i64,
    /// `galaxy_index` of this galaxy's central, for fast lookup without
    /// walking `central_gal`.
    pub central_galaxy_index: i64,
    /// Halo this galaxy is (or was last) attached to.
    pub halo_nr: i32,
    /// Most-bound particle id of the halo at attachment time, used to
    /// track an orphan galaxy when its subhalo has been stripped away.
    pub most_bound_id: i64,
    /// Index, within the same snapshot's galaxy array, of this galaxy's
    /// central. `None` before the join step assigns it.
    pub central_gal: Option<usize>,
    /// How this galaxy was consumed by a merger, if at all.
    pub merge_type: MergeType,
    /// `galaxy_index` of the galaxy this one will merge into, once
    /// `merge_type != MergeType::None`.
    pub merge_into_id: Option<i64>,
    /// Snapshot at which the scheduled merger will complete.
    pub merge_into_snap_num: Option<i32>,
    /// Time step between this galaxy's last snapshot and its current
    /// halo's snapshot. Reset to `-1.0` at join; the evolution driver
    /// recomputes it from the cosmology collaborator's ages before
    /// running the galaxy phase.
    pub dt: f64,
    /// Physical and merger-bookkeeping quantities, single source of
    /// truth for every property a physics module touches.
    pub store: PropertyStorage,
}

impl Galaxy {
    /// Construct a freshly seeded galaxy: a new central with every
    /// property at its schema default, and no scheduled merger.
    pub fn seed(
        schema: &PropertySchema,
        snap_num: i32,
        galaxy_nr: i64,
        galaxy_index: i64,
        halo_nr: i32,
        most_bound_id: i64,
    ) -> Self {
        Galaxy {
            snap_num,
            galaxy_type: GalaxyType::Central,
            galaxy_nr,
            galaxy_index,
            central_galaxy_index: galaxy_index,
            halo_nr,
            most_bound_id,
            central_gal: None,
            merge_type: MergeType::None,
            merge_into_id: None,
            merge_into_snap_num: None,
            dt: -1.0,
            store: PropertyStorage::allocate(schema),
        }
    }

    /// Carry this galaxy forward to the next snapshot: same identity
    /// and property values, attached to a new halo.
    pub fn carry_forward(&self, new_halo_nr: i32, new_snap_num: i32) -> Self {
        let mut next = self.clone();
        next.halo_nr = new_halo_nr;
        next.snap_num = new_snap_num;
        next.central_gal = None;
        next.dt = -1.0;
        next
    }

    /// True if this galaxy has been consumed by a merger or disrupted.
    ///
    /// Gated on `merge_type`, not `galaxy_type` — a galaxy with
    /// `merge_type > 0` is skipped in all subsequent GALAXY-phase
    /// executions and excluded from output regardless of whatever
    /// `galaxy_type` a `MergerHandler` implementation did or didn't also
    /// set.
    pub fn is_merged(&self) -> bool {
        self.merge_type != MergeType::None
    }

    /// True if this galaxy has a merger scheduled (`merge_time` finite
    /// and not yet past).
    pub fn has_scheduled_merger(&self) -> bool {
        self.merge_into_id.is_some()
    }

    fn id(schema: &PropertySchema, name: &str) -> PropertyId {
        schema
            .id_of(name)
            .unwrap_or_else(|| panic!("schema missing required core property '{name}'"))
    }

    /// Virial mass at this snapshot.
    pub fn mvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "Mvir"), 0.0)
    }

    /// Set virial mass at this snapshot.
    pub fn set_mvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self.store.set_f64(schema, Self::id(schema, "Mvir"), value);
    }

    /// Change in virial mass since the previous snapshot.
    pub fn delta_mvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "DeltaMvir"), 0.0)
    }

    /// Set change in virial mass since the previous snapshot.
    pub fn set_delta_mvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self
            .store
            .set_f64(schema, Self::id(schema, "DeltaMvir"), value);
    }

    /// Virial mass of this galaxy's central, cached at join time.
    pub fn central_mvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "CentralMvir"), 0.0)
    }

    /// Set virial mass of this galaxy's central.
    pub fn set_central_mvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self
            .store
            .set_f64(schema, Self::id(schema, "CentralMvir"), value);
    }

    /// Virial radius at this snapshot.
    pub fn rvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "Rvir"), 0.0)
    }

    /// Set virial radius at this snapshot.
    pub fn set_rvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self.store.set_f64(schema, Self::id(schema, "Rvir"), value);
    }

    /// Virial velocity at this snapshot.
    pub fn vvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "Vvir"), 0.0)
    }

    /// Set virial velocity at this snapshot.
    pub fn set_vvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self.store.set_f64(schema, Self::id(schema, "Vvir"), value);
    }

    /// Maximum circular velocity at this snapshot.
    pub fn vmax(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "Vmax"), 0.0)
    }

    /// Set maximum circular velocity at this snapshot.
    pub fn set_vmax(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self.store.set_f64(schema, Self::id(schema, "Vmax"), value);
    }

    /// Bound particle count of the attached halo.
    pub fn len(&self, schema: &PropertySchema) -> i32 {
        self.store.get_i32(schema, Self::id(schema, "Len"), 0)
    }

    /// Set bound particle count of the attached halo.
    pub fn set_len(&mut self, schema: &PropertySchema, value: i32) {
        let _ = self.store.set_i32(schema, Self::id(schema, "Len"), value);
    }

    /// Scheduled merger completion time, or [`MERGE_TIME_INFINITE`] if
    /// none is scheduled.
    pub fn merge_time(&self, schema: &PropertySchema) -> f64 {
        self.store
            .get_f64(schema, Self::id(schema, "MergTime"), MERGE_TIME_INFINITE)
    }

    /// Set scheduled merger completion time.
    pub fn set_merge_time(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self
            .store
            .set_f64(schema, Self::id(schema, "MergTime"), value);
    }

    /// Virial mass of the halo this galaxy last belonged to before
    /// becoming a satellite.
    pub fn infall_mvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "InfallMvir"), 0.0)
    }

    /// Set infall virial mass.
    pub fn set_infall_mvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self
            .store
            .set_f64(schema, Self::id(schema, "InfallMvir"), value);
    }

    /// Virial velocity at infall.
    pub fn infall_vvir(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "InfallVvir"), 0.0)
    }

    /// Set virial velocity at infall.
    pub fn set_infall_vvir(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self
            .store
            .set_f64(schema, Self::id(schema, "InfallVvir"), value);
    }

    /// Maximum circular velocity at infall.
    pub fn infall_vmax(&self, schema: &PropertySchema) -> f64 {
        self.store.get_f64(schema, Self::id(schema, "InfallVmax"), 0.0)
    }

    /// Set maximum circular velocity at infall.
    pub fn set_infall_vmax(&mut self, schema: &PropertySchema, value: f64) {
        let _ = self
            .store
            .set_f64(schema, Self::id(schema, "InfallVmax"), value);
    }

    /// Current position.
    pub fn pos(&self, schema: &PropertySchema) -> [f32; 3] {
        let id = Self::id(schema, "Pos");
        [
            self.store.get_array_element_f32(schema, id, 0, 0.0),
            self.store.get_array_element_f32(schema, id, 1, 0.0),
            self.store.get_array_element_f32(schema, id, 2, 0.0),
        ]
    }

    /// Set current position.
    pub fn set_pos(&mut self, schema: &PropertySchema, value: [f32; 3]) {
        let id = Self::id(schema, "Pos");
        for (i, component) in value.into_iter().enumerate() {
            let _ = self.store.set_array_element_f32(schema, id, i, component);
        }
    }

    /// Current velocity.
    pub fn vel(&self, schema: &PropertySchema) -> [f32; 3] {
        let id = Self::id(schema, "Vel");
        [
            self.store.get_array_element_f32(schema, id, 0, 0.0),
            self.store.get_array_element_f32(schema, id, 1, 0.0),
            self.store.get_array_element_f32(schema, id, 2, 0.0),
        ]
    }

    /// Set current velocity.
    pub fn set_vel(&mut self, schema: &PropertySchema, value: [f32; 3]) {
        let id = Self::id(schema, "Vel");
        for (i, component) in value.into_iter().enumerate() {
            let _ = self.store.set_array_element_f32(schema, id, i, component);
        }
    }
}

/// Builds the fixed set of core properties every galaxy carries,
/// regardless of which physics modules are enabled.
pub fn register_core_properties(
    builder: &mut crate::property::PropertySchemaBuilder,
) -> galform_core::EvolutionResult<()> {
    use galform_core::{PropertyType, PropertyValue};

    builder.add_core("Len", PropertyType::I32, PropertyValue::I32(0))?;
    builder.add_core("Mvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("DeltaMvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("CentralMvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("Rvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("Vvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("Vmax", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core(
        "MergTime",
        PropertyType::F64,
        PropertyValue::F64(MERGE_TIME_INFINITE),
    )?;
    builder.add_core("InfallMvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("InfallVvir", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core("InfallVmax", PropertyType::F64, PropertyValue::F64(0.0))?;
    builder.add_core(
        "Pos",
        PropertyType::F32,
        PropertyValue::F32Array(vec![0.0, 0.0, 0.0]),
    )?;
    builder.add_core(
        "Vel",
        PropertyType::F32,
        PropertyValue::F32Array(vec![0.0, 0.0, 0.0]),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertySchemaBuilder;

    fn schema() -> PropertySchema {
        let mut b = PropertySchemaBuilder::new();
        register_core_properties(&mut b).unwrap();
        b.build()
    }

    #[test]
    fn seed_produces_a_central_with_default_properties() {
        let schema = schema();
        let g = Galaxy::seed(&schema, 10, 0, 42, 3, 777);
        assert_eq!(g.galaxy_type, GalaxyType::Central);
        assert_eq!(g.central_galaxy_index, g.galaxy_index);
        assert_eq!(g.mvir(&schema), 0.0);
        assert_eq!(g.merge_time(&schema), MERGE_TIME_INFINITE);
        assert!(!g.has_scheduled_merger());
    }

    #[test]
    fn carry_forward_preserves_identity_and_properties() {
        let schema = schema();
        let mut g = Galaxy::seed(&schema, 10, 0, 42, 3, 777);
        g.set_mvir(&schema, 11.3);
        g.central_gal = Some(4);
        let next = g.carry_forward(9, 11);
        assert_eq!(next.galaxy_nr, g.galaxy_nr);
        assert_eq!(next.galaxy_index, g.galaxy_index);
        assert_eq!(next.halo_nr, 9);
        assert_eq!(next.snap_num, 11);
        assert_eq!(next.mvir(&schema), 11.3);
        assert!(next.central_gal.is_none());
    }

    #[test]
    fn pos_and_vel_round_trip_through_the_store() {
        let schema = schema();
        let mut g = Galaxy::seed(&schema, 10, 0, 42, 3, 777);
        g.set_pos(&schema, [1.0, 2.0, 3.0]);
        g.set_vel(&schema, [4.0, 5.0, 6.0]);
        assert_eq!(g.pos(&schema), [1.0, 2.0, 3.0]);
        assert_eq!(g.vel(&schema), [4.0, 5.0, 6.0]);
    }
}
