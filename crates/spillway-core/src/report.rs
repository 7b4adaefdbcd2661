//! Before/after field snapshots and the corruption diff between them.

use std::collections::BTreeMap;
use std::fmt;

use crate::{AddressSpace, FieldId, FieldValue, SimError, TypedRegionView};

/// Decoded value of one field at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SnapshotEntry {
    /// Owning region name.
    pub region: String,
    /// Field name.
    pub field: String,
    /// Decoded value.
    pub value: FieldValue,
}

/// Decoded values of every declared field at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    entries: BTreeMap<FieldId, SnapshotEntry>,
}

impl Snapshot {
    /// Returns the entry captured for `id`.
    #[must_use]
    pub fn get(&self, id: FieldId) -> Option<&SnapshotEntry> {
        self.entries.get(&id)
    }

    /// Iterates entries in field declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &SnapshotEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Number of captured fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no field was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A field whose decoded value differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FieldChange {
    /// Owning region name.
    pub region: String,
    /// Field name.
    pub field: String,
    /// Value in the earlier snapshot.
    pub old: FieldValue,
    /// Value in the later snapshot.
    pub new: FieldValue,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {} -> {}", self.region, self.field, self.old, self.new)
    }
}

/// Fields whose logical value changed, in field declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CorruptionReport {
    changes: Vec<FieldChange>,
}

impl CorruptionReport {
    /// Returns `true` when no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates changed fields.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldChange> {
        self.changes.iter()
    }

    /// Changed fields belonging to `region`.
    pub fn changes_in<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a FieldChange> + 'a {
        self.changes.iter().filter(move |change| change.region == region)
    }

    /// Looks up the change recorded for `region.field`.
    #[must_use]
    pub fn change(&self, region: &str, field: &str) -> Option<&FieldChange> {
        self.changes
            .iter()
            .find(|change| change.region == region && change.field == field)
    }

    /// Names of regions with at least one changed field, first-seen order.
    #[must_use]
    pub fn touched_regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = Vec::new();
        for change in &self.changes {
            if !regions.contains(&change.region.as_str()) {
                regions.push(&change.region);
            }
        }
        regions
    }
}

impl<'a> IntoIterator for &'a CorruptionReport {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Captures field snapshots and diffs them.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorruptionReporter;

impl CorruptionReporter {
    /// Creates a reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decodes every field declared in `view` from the current bytes of `space`.
    ///
    /// # Errors
    ///
    /// Propagates lookup errors when `view` was declared against another space.
    pub fn snapshot(
        &self,
        space: &AddressSpace,
        view: &TypedRegionView,
    ) -> Result<Snapshot, SimError> {
        let mut entries = BTreeMap::new();
        for (id, field) in view.fields() {
            let region = space.region(field.region)?.name.clone();
            entries.insert(
                id,
                SnapshotEntry {
                    region,
                    field: field.name.clone(),
                    value: view.decode(space, id)?,
                },
            );
        }
        Ok(Snapshot { entries })
    }

    /// Lists fields present in both snapshots whose decoded values differ.
    ///
    /// Unchanged fields are omitted. Comparison is by logical value, never by
    /// raw bytes.
    #[must_use]
    pub fn diff(&self, before: &Snapshot, after: &Snapshot) -> CorruptionReport {
        let changes = before
            .iter()
            .filter_map(|(id, old)| {
                let new = after.get(id)?;
                (old.value != new.value).then(|| FieldChange {
                    region: old.region.clone(),
                    field: old.field.clone(),
                    old: old.value.clone(),
                    new: new.value.clone(),
                })
            })
            .collect();
        CorruptionReport { changes }
    }
}

#[cfg(test)]
mod tests {
    use super::CorruptionReporter;
    use crate::{AddressSpace, FieldKind, FieldValue, TypedRegionView};

    fn setup() -> (AddressSpace, TypedRegionView) {
        let mut space = AddressSpace::default();
        let buffer = space.register_region("buffer", 8).expect("buffer");
        let object = space.register_region("object", 8).expect("object");
        let mut view = TypedRegionView::new();
        view.declare_field(&space, buffer, "head", 0, 4, FieldKind::Bytes)
            .expect("head");
        view.declare_field(&space, object, "label", 0, 4, FieldKind::Chars)
            .expect("label");
        view.declare_field(&space, object, "count", 4, 4, FieldKind::Unsigned)
            .expect("count");
        (space, view)
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty() {
        let (space, view) = setup();
        let reporter = CorruptionReporter::new();
        let before = reporter.snapshot(&space, &view).expect("snapshot");
        assert_eq!(before.len(), 3);
        assert!(reporter.diff(&before, &before).is_empty());
    }

    #[test]
    fn diff_lists_changed_fields_with_old_and_new() {
        let (mut space, view) = setup();
        let reporter = CorruptionReporter::new();
        let before = reporter.snapshot(&space, &view).expect("before");

        let object = space.find("object").expect("object");
        space.write_bytes(object, 4, &[7, 0, 0, 0]).expect("write");

        let after = reporter.snapshot(&space, &view).expect("after");
        let report = reporter.diff(&before, &after);

        assert_eq!(report.len(), 1);
        let change = report.change("object", "count").expect("count changed");
        assert_eq!(change.old, FieldValue::Unsigned(0));
        assert_eq!(change.new, FieldValue::Unsigned(7));
        assert_eq!(change.to_string(), "object.count: 0 (0x0) -> 7 (0x7)");
        assert_eq!(report.touched_regions(), vec!["object"]);
    }

    #[test]
    fn byte_change_that_decodes_alike_is_omitted() {
        let (mut space, view) = setup();
        let object = space.find("object").expect("object");
        space.write_bytes(object, 0, b"ab\0x").expect("seed");

        let reporter = CorruptionReporter::new();
        let before = reporter.snapshot(&space, &view).expect("before");
        space.write_bytes(object, 3, b"y").expect("past terminator");
        let after = reporter.snapshot(&space, &view).expect("after");

        assert!(reporter.diff(&before, &after).is_empty());
    }

    #[test]
    fn fields_missing_from_either_snapshot_are_ignored() {
        let (space, mut view) = setup();
        let reporter = CorruptionReporter::new();
        let before = reporter.snapshot(&space, &view).expect("before");

        let buffer = space.find("buffer").expect("buffer");
        view.declare_field(&space, buffer, "tail", 4, 4, FieldKind::Signed)
            .expect("tail");
        let after = reporter.snapshot(&space, &view).expect("after");

        assert_eq!(after.len(), 4);
        assert!(reporter.diff(&before, &after).is_empty());
    }
}
