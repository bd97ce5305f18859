//! Declarative description of which string fields of a record are encrypted.
//!
//! A [`FieldSpec`] is a list of typed accessors. A scalar accessor yields at
//! most one slot; an `each` accessor yields one slot per element of a nested
//! collection (`files[].displayName`). Absent values are simply not yielded.
//!
//! ```rust
//! use sealfield_codec::{Field, FieldSpec};
//!
//! struct Note {
//!     title: Option<String>,
//!     tags: Vec<String>,
//! }
//!
//! fn title(note: &mut Note) -> Option<&mut String> {
//!     note.title.as_mut()
//! }
//!
//! fn tags(note: &mut Note) -> Vec<&mut String> {
//!     note.tags.iter_mut().collect()
//! }
//!
//! let spec = FieldSpec::new(vec![Field::scalar("title", title), Field::each("tags", tags)]);
//! assert_eq!(spec.field_names(), vec!["title", "tags"]);
//! ```

use sealfield_core::KeyUri;

/// A record with encryptable fields and a key URL slot.
pub trait Encryptable: Send {
    /// The fields encrypted for this record type.
    fn field_spec() -> FieldSpec<Self>
    where
        Self: Sized;

    fn encryption_key_url(&self) -> Option<&KeyUri>;

    fn set_encryption_key_url(&mut self, uri: KeyUri);
}

enum Accessor<R> {
    Scalar(fn(&mut R) -> Option<&mut String>),
    Each(fn(&mut R) -> Vec<&mut String>),
}

/// One named field of a [`FieldSpec`].
pub struct Field<R> {
    name: &'static str,
    accessor: Accessor<R>,
}

impl<R> Field<R> {
    /// A single optional string.
    pub fn scalar(name: &'static str, get: fn(&mut R) -> Option<&mut String>) -> Self {
        Self {
            name,
            accessor: Accessor::Scalar(get),
        }
    }

    /// A string inside every element of a collection.
    pub fn each(name: &'static str, get: fn(&mut R) -> Vec<&mut String>) -> Self {
        Self {
            name,
            accessor: Accessor::Each(get),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn slots<'r>(&self, record: &'r mut R) -> Vec<&'r mut String> {
        match self.accessor {
            Accessor::Scalar(get) => get(record).into_iter().collect(),
            Accessor::Each(get) => get(record),
        }
    }
}

impl<R> std::fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.accessor {
            Accessor::Scalar(_) => "scalar",
            Accessor::Each(_) => "each",
        };
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// The ordered list of encrypted fields for a record type.
#[derive(Debug)]
pub struct FieldSpec<R> {
    fields: Vec<Field<R>>,
}

/// A non-empty value lifted out of a record, waiting for its crypto call.
#[derive(Debug, Clone)]
pub(crate) struct PendingValue {
    pub field: &'static str,
    field_index: usize,
    slot_index: usize,
    pub value: String,
}

impl<R> FieldSpec<R> {
    pub fn new(fields: Vec<Field<R>>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field<R>] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(Field::name).collect()
    }

    /// Copy out every non-empty value, in field order.
    pub(crate) fn pending(&self, record: &mut R) -> Vec<PendingValue> {
        let mut pending = Vec::new();
        for (field_index, field) in self.fields.iter().enumerate() {
            for (slot_index, slot) in field.slots(record).into_iter().enumerate() {
                if slot.is_empty() {
                    continue;
                }
                pending.push(PendingValue {
                    field: field.name,
                    field_index,
                    slot_index,
                    value: slot.clone(),
                });
            }
        }
        pending
    }

    /// Write transformed values back into the slots they came from.
    pub(crate) fn write_back(&self, record: &mut R, done: Vec<(PendingValue, String)>) {
        let mut by_field: Vec<Vec<(usize, String)>> = vec![Vec::new(); self.fields.len()];
        for (pending, value) in done {
            if let Some(group) = by_field.get_mut(pending.field_index) {
                group.push((pending.slot_index, value));
            }
        }

        for (field, group) in self.fields.iter().zip(by_field) {
            if group.is_empty() {
                continue;
            }
            let mut slots = field.slots(record);
            for (slot_index, value) in group {
                if let Some(slot) = slots.get_mut(slot_index) {
                    **slot = value;
                }
            }
        }
    }
}
