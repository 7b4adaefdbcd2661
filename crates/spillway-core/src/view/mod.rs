//! Typed field overlays on top of raw region bytes.

/// Field descriptors, decoded values and codec helpers.
pub mod field;

pub use field::{
    decode_field, decode_unsigned, encode_field, Field, FieldId, FieldKind, FieldValue,
    INTEGER_WIDTHS,
};

use log::debug;

use crate::{AddressSpace, RegionHandle, SimError};

/// Registry of typed fields declared over an [`AddressSpace`]'s regions.
///
/// Fields are non-owning descriptors: decoding always reads the current bytes
/// from the address space, so bytes spilled in from a neighbouring region show
/// up in the decoded value.
#[derive(Debug, Clone, Default)]
pub struct TypedRegionView {
    fields: Vec<Field>,
}

impl TypedRegionView {
    /// Creates an empty view.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares a field over `region`.
    ///
    /// # Errors
    ///
    /// - [`SimError::UnknownRegion`] when `region` is not registered in `space`.
    /// - [`SimError::InvalidFieldWidth`] when `width` is illegal for `kind`.
    /// - [`SimError::FieldOutsideRegion`] when the range passes the region capacity.
    /// - [`SimError::DuplicateName`] when the region already has a field named `name`.
    /// - [`SimError::Overlap`] when the range intersects another field of the region.
    pub fn declare_field(
        &mut self,
        space: &AddressSpace,
        region: RegionHandle,
        name: impl Into<String>,
        offset: usize,
        width: usize,
        kind: FieldKind,
    ) -> Result<FieldId, SimError> {
        let name = name.into();
        let descriptor = space.region(region)?;

        if !kind.accepts_width(width) {
            return Err(SimError::InvalidFieldWidth { field: name, width });
        }
        if offset
            .checked_add(width)
            .is_none_or(|end| end > descriptor.capacity)
        {
            return Err(SimError::FieldOutsideRegion {
                region: descriptor.name.clone(),
                field: name,
                offset,
                width,
                capacity: descriptor.capacity,
            });
        }

        let candidate = Field {
            region,
            name,
            offset,
            width,
            kind,
        };
        for existing in self.fields.iter().filter(|f| f.region == region) {
            if existing.name == candidate.name {
                return Err(SimError::DuplicateName {
                    name: format!("{}.{}", descriptor.name, candidate.name),
                });
            }
            if existing.overlaps(&candidate) {
                return Err(SimError::Overlap {
                    region: descriptor.name.clone(),
                    field: candidate.name,
                    existing: existing.name.clone(),
                });
            }
        }

        debug!(
            "declared field `{}.{}` at +{offset} width {width} ({})",
            descriptor.name,
            candidate.name,
            kind.label()
        );

        let id = FieldId(self.fields.len());
        self.fields.push(candidate);
        Ok(id)
    }

    /// Returns the descriptor of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownField`] when `id` was not issued by this view.
    pub fn field(&self, id: FieldId) -> Result<&Field, SimError> {
        self.fields.get(id.0).ok_or_else(|| SimError::UnknownField {
            region: String::from("?"),
            field: format!("#{}", id.0),
        })
    }

    /// Looks up a field by region and field name.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownRegion`] or [`SimError::UnknownField`].
    pub fn find(&self, space: &AddressSpace, region: &str, field: &str) -> Result<FieldId, SimError> {
        let handle = space.find(region)?;
        self.fields
            .iter()
            .position(|f| f.region == handle && f.name == field)
            .map(FieldId)
            .ok_or_else(|| SimError::UnknownField {
                region: region.to_string(),
                field: field.to_string(),
            })
    }

    /// Iterates every declared field with its id, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &Field)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .map(|(index, field)| (FieldId(index), field))
    }

    /// Iterates the fields of one region ordered by offset.
    pub fn fields_in(&self, region: RegionHandle) -> Vec<(FieldId, &Field)> {
        let mut fields: Vec<_> = self.fields().filter(|(_, f)| f.region == region).collect();
        fields.sort_by_key(|(_, f)| f.offset);
        fields
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodes the current value of `id` from `space`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownField`] for a foreign id and propagates
    /// address-space lookup errors, including a `space` other than the one
    /// the field was declared against.
    pub fn decode(&self, space: &AddressSpace, id: FieldId) -> Result<FieldValue, SimError> {
        let field = self.field(id)?;
        let bytes = space.read_bytes(field.region, field.offset, field.width)?;
        decode_field(field, &bytes, space.byte_order())
    }

    /// Writes `value` into field `id`, encoded with the space's byte order.
    ///
    /// The write is confined to the field's own bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ValueMismatch`] when the value does not fit and
    /// [`SimError::UnknownField`] for a foreign id.
    pub fn write_field(
        &self,
        space: &mut AddressSpace,
        id: FieldId,
        value: &FieldValue,
    ) -> Result<(), SimError> {
        let field = self.field(id)?;
        let bytes = encode_field(field, value, space.byte_order())?;
        space.write_bytes(field.region, field.offset, &bytes)?;
        Ok(())
    }
}
