//! Loader for the flattened record format produced by the offline MIB
//! compiler.
//!
//! The compiler turns an ASN.1 MIB module into one record per object:
//!
//! ```text
//! # oid|TYPE|access|name[|value]
//! 1.3.6.1.2.1.1|SEQUENCE|0|system
//! 1.3.6.1.2.1.1.1.0|OCTET STRING|1|sysDescr|Linux router
//! ```
//!
//! `access` is the stored integer encoding (0 NOT_ACCESSIBLE, 1 READ_ONLY,
//! 2 READ_WRITE, 3 READ_CREATE); the value field may be omitted for nodes
//! with no initial value. Blank lines and `#` comments are ignored.

use super::entry::{AccessMode, MibEntry};
use super::table::MibTable;
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::store::Store;
use crate::value::TypeTag;
use std::path::Path;

/// Parse `path` and insert every record under `root` into the table.
///
/// The whole file is validated before anything is inserted, so a malformed
/// record leaves the table untouched. Returns the number of OIDs loaded.
pub fn load_compiled_mib(
    store: &Store,
    mib: &mut MibTable,
    root: &Oid,
    path: &Path,
) -> Result<usize> {
    let text = std::fs::read_to_string(path)?;

    let mut staged: Vec<MibEntry> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = parse_record(idx + 1, line, root)?;
        if mib.get(entry.oid()).is_some() || staged.iter().any(|e| e.oid() == entry.oid()) {
            return Err(Error::BadRecord {
                line: idx + 1,
                msg: format!("duplicate OID {}", entry.oid()),
            });
        }
        staged.push(entry);
    }

    let count = staged.len();
    for entry in staged {
        mib.add(store, entry)?;
    }
    Ok(count)
}

fn parse_record(line: usize, record: &str, root: &Oid) -> Result<MibEntry> {
    let bad = |msg: String| Error::BadRecord { line, msg };

    let fields: Vec<&str> = record.split('|').collect();
    if fields.len() < 4 || fields.len() > 5 {
        return Err(bad(format!(
            "expected oid|TYPE|access|name[|value], got {} fields",
            fields.len()
        )));
    }

    let oid =
        Oid::parse(fields[0].trim()).map_err(|_| bad(format!("bad OID {:?}", fields[0])))?;
    if !oid.starts_with(root) {
        return Err(bad(format!("OID {oid} is outside root {root}")));
    }

    let tag = TypeTag::parse(fields[1].trim())
        .map_err(|_| bad(format!("bad type tag {:?}", fields[1])))?;

    let access = fields[2]
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(AccessMode::from_stored)
        .ok_or_else(|| bad(format!("bad access mode {:?}", fields[2])))?;

    let name = fields[3].trim();
    let value = fields.get(4).copied().unwrap_or("");

    MibEntry::new(oid, tag, value, access, name)
        .map_err(|e| bad(format!("bad value {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use std::io::Write;

    fn write_mib(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_compiled_mib() {
        let store = Store::open_in_memory().unwrap();
        let mut mib = MibTable::new();
        let file = write_mib(
            "# interfaces table\n\
             1.3.6.1.2.1.2|SEQUENCE|0|interfaces\n\
             \n\
             1.3.6.1.2.1.2.1.0|INTEGER|1|ifNumber|4\n\
             1.3.6.1.2.1.2.2.1.10|SEQUENCE|3|ifInOctets\n",
        );

        let count =
            load_compiled_mib(&store, &mut mib, &oid!(1, 3, 6, 1, 2, 1, 2), file.path()).unwrap();
        assert_eq!(count, 3);
        assert_eq!(mib.len(), 3);
        assert_eq!(
            mib.get(&oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)).unwrap().printable(),
            "4"
        );
        assert!(mib.is_table_child(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10)));
    }

    #[test]
    fn test_record_outside_root_rejected() {
        let store = Store::open_in_memory().unwrap();
        let mut mib = MibTable::new();
        let file = write_mib("1.3.6.1.4.1.9|INTEGER|1|offTree|1\n");

        let result = load_compiled_mib(&store, &mut mib, &oid!(1, 3, 6, 1, 2), file.path());
        assert!(result.is_err());
        assert!(mib.is_empty());
    }

    #[test]
    fn test_malformed_record_loads_nothing() {
        let store = Store::open_in_memory().unwrap();
        let mut mib = MibTable::new();
        let file = write_mib(
            "1.3.6.1.2.1|INTEGER|1|good|1\n\
             1.3.6.1.2.2|INTEGER|9|badAccess|1\n",
        );

        assert!(load_compiled_mib(&store, &mut mib, &oid!(1, 3, 6, 1, 2), file.path()).is_err());
        // first record was valid but must not have been committed
        assert!(mib.is_empty());
        assert!(store.select("SELECT oid FROM oids", []).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_within_file_rejected() {
        let store = Store::open_in_memory().unwrap();
        let mut mib = MibTable::new();
        let file = write_mib(
            "1.3.6.1.2.1|INTEGER|1|one|1\n\
             1.3.6.1.2.1|INTEGER|1|two|2\n",
        );
        assert!(load_compiled_mib(&store, &mut mib, &oid!(1, 3, 6, 1, 2), file.path()).is_err());
        assert!(mib.is_empty());
    }
}
