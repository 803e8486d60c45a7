//! A single MIB node: identifier, metadata, and its typed value.

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::store::Store;
use crate::value::{Primitive, TypeTag};
use rusqlite::params;

/// Access mode of a MIB node.
///
/// Stored as a small integer in the `access` column; the discriminants below
/// are that on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessMode {
    NotAccessible = 0,
    ReadOnly = 1,
    ReadWrite = 2,
    ReadCreate = 3,
}

impl AccessMode {
    /// Decode the stored integer form.
    pub fn from_stored(n: i64) -> Option<Self> {
        match n {
            0 => Some(AccessMode::NotAccessible),
            1 => Some(AccessMode::ReadOnly),
            2 => Some(AccessMode::ReadWrite),
            3 => Some(AccessMode::ReadCreate),
            _ => None,
        }
    }

    /// The stored integer form.
    pub fn as_stored(self) -> i64 {
        self as i64
    }
}

/// One MIB node.
///
/// `type` and `access_mode` are fixed at construction; only the value can
/// change afterwards, and only through [`set_value`](MibEntry::set_value).
#[derive(Debug, Clone)]
pub struct MibEntry {
    oid: Oid,
    name: String,
    access: AccessMode,
    primitive: Primitive,
}

impl MibEntry {
    /// Construct an entry, validating `value` against `tag`.
    ///
    /// Persistence is the table's job: [`MibTable::add`](super::MibTable::add)
    /// writes the row when the entry joins the index, and
    /// [`MibTable::load`](super::MibTable::load) feeds stored rows back
    /// through this constructor.
    pub fn new(oid: Oid, tag: TypeTag, value: &str, access: AccessMode, name: &str) -> Result<Self> {
        let primitive = Primitive::new(tag, value)?;
        Ok(Self {
            oid,
            name: name.to_string(),
            access,
            primitive,
        })
    }

    /// The entry's OID.
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// The symbolic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type tag.
    pub fn tag(&self) -> TypeTag {
        self.primitive.tag()
    }

    /// The access mode.
    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// The current printable value.
    pub fn printable(&self) -> String {
        self.primitive.printable()
    }

    /// Validate, persist, and commit a new value.
    ///
    /// Validation runs on a candidate first and the row update goes to the
    /// store before the in-memory value changes, so a rejected input or a
    /// storage failure leaves the entry exactly as it was.
    pub fn set_value(&mut self, store: &Store, printable: &str) -> Result<()> {
        let mut candidate = self.primitive.clone();
        candidate.set(printable)?;
        store.execute(
            "UPDATE oids SET value = ?1 WHERE oid = ?2",
            params![candidate.printable(), self.oid.to_string()],
        )?;
        self.primitive = candidate;
        Ok(())
    }
}

/// Decode the `access` column, mapping junk to a corrupt-row error.
pub(super) fn access_from_column(oid: &str, column: &str) -> Result<AccessMode> {
    column
        .parse::<i64>()
        .ok()
        .and_then(AccessMode::from_stored)
        .ok_or_else(|| Error::CorruptRow {
            oid: oid.to_string(),
            msg: format!("bad access mode {column:?}"),
        })
}
