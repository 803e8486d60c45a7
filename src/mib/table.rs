//! Ordered in-memory projection of the persisted OID tree.

use super::entry::{AccessMode, MibEntry, access_from_column};
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::store::Store;
use crate::value::TypeTag;
use rusqlite::params;

/// The MIB table.
///
/// Entries are kept sorted by component-wise OID order in a flat vector, so
/// exact lookup and lexicographic-next are both a binary search. The table
/// mirrors the `oids` collection in the store: every mutation goes to both.
#[derive(Debug, Default)]
pub struct MibTable {
    entries: Vec<MibEntry>,
}

impl MibTable {
    /// Create an empty table (not yet backed by any rows).
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Load every persisted OID row and build the sorted index.
    ///
    /// Any row that fails to reconstruct (unknown tag, bad access mode,
    /// value that no longer validates) aborts the load: a daemon serving a
    /// partially loaded tree would silently answer `no-such-name` for rows
    /// that exist.
    pub fn load(store: &Store) -> Result<Self> {
        let rows = store.select("SELECT oid, name, datatype, access, value FROM oids", [])?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let oid = Oid::parse(&row[0])?;
            let tag = TypeTag::parse(&row[2]).map_err(|_| Error::CorruptRow {
                oid: row[0].clone(),
                msg: format!("bad type tag {:?}", row[2]),
            })?;
            let access = access_from_column(&row[0], &row[3])?;
            entries.push(MibEntry::new(oid, tag, &row[4], access, &row[1])?);
        }
        entries.sort_by(|a, b| a.oid().cmp(b.oid()));

        Ok(Self { entries })
    }

    fn position(&self, oid: &Oid) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|e| e.oid().cmp(oid))
    }

    /// Exact lookup.
    pub fn get(&self, oid: &Oid) -> Option<&MibEntry> {
        self.position(oid).ok().map(|idx| &self.entries[idx])
    }

    /// Exact lookup, mutable.
    pub fn get_mut(&mut self, oid: &Oid) -> Option<&mut MibEntry> {
        match self.position(oid) {
            Ok(idx) => Some(&mut self.entries[idx]),
            Err(_) => None,
        }
    }

    /// The smallest OID strictly greater than `oid`, or `None` at the end of
    /// the tree.
    ///
    /// `oid` itself does not need to exist; traversal can start anywhere.
    pub fn next_after(&self, oid: &Oid) -> Option<&Oid> {
        let idx = match self.position(oid) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        };
        self.entries.get(idx).map(|e| e.oid())
    }

    /// True iff `parent` exists and is a SEQUENCE node, i.e. a table or
    /// container whose children may be provisioned dynamically.
    pub fn is_table_child(&self, parent: &Oid) -> bool {
        self.get(parent).is_some_and(|e| e.tag() == TypeTag::Sequence)
    }

    /// Insert a new entry into the index and the store.
    ///
    /// Fails with [`Error::Duplicate`] if the OID is already present; the
    /// store is untouched in that case.
    pub fn add(&mut self, store: &Store, entry: MibEntry) -> Result<()> {
        match self.position(entry.oid()) {
            Ok(_) => Err(Error::Duplicate(entry.oid().to_string())),
            Err(idx) => {
                store.execute(
                    "INSERT INTO oids (oid, name, datatype, access, value) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        entry.oid().to_string(),
                        entry.name(),
                        entry.tag().as_str(),
                        entry.access().as_stored(),
                        entry.printable(),
                    ],
                )?;
                self.entries.insert(idx, entry);
                Ok(())
            }
        }
    }

    /// Provision a table row under a SEQUENCE parent.
    ///
    /// The child takes the request's datatype and value, inherits `name` from
    /// the parent, and is always created READ_CREATE. This is the only place
    /// dynamic row creation happens; the protocol engine's SET path is its
    /// sole caller.
    pub fn create_child(
        &mut self,
        store: &Store,
        parent: &Oid,
        child: &Oid,
        tag: TypeTag,
        value: &str,
    ) -> Result<()> {
        let parent_entry = self
            .get(parent)
            .ok_or_else(|| Error::NotFound(parent.to_string()))?;
        let name = parent_entry.name().to_string();
        let entry = MibEntry::new(child.clone(), tag, value, AccessMode::ReadCreate, &name)?;
        self.add(store, entry)
    }

    /// Remove every entry from the index and the store.
    pub fn clear(&mut self, store: &Store) -> Result<()> {
        store.execute("DELETE FROM oids", [])?;
        self.entries.clear();
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &MibEntry> {
        self.entries.iter()
    }
}
