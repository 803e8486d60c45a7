//! The typed value family ("primitives").
//!
//! Every MIB entry owns one [`Primitive`]: a declared [`TypeTag`] plus the
//! storage slot holding the current value. The family is closed — the tags
//! below are the whole vocabulary — and each tag carries its own parse,
//! validation and rendering rules.
//!
//! The declared tag and the storage slot are deliberately distinct. COUNTER,
//! COUNTER32, GAUGE, GAUGE32, UNSIGNED32 and TIMETICKS all hold an unsigned
//! 32-bit slot, but each renders its own tag on the wire, so a row declared
//! GAUGE stays GAUGE even though it shares validation with COUNTER32.

use crate::error::{Error, Result};
use crate::oid::Oid;
use std::fmt;

/// Declared SNMP type of a MIB entry.
///
/// The `Display` form is the exact uppercase spelling used on the wire and in
/// the `datatype` column, including the embedded spaces of `OCTET STRING` and
/// `OBJECT IDENTIFIER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Signed 32-bit integer.
    Integer,
    /// Legacy spelling of Counter32.
    Counter,
    /// Unsigned 32-bit wrapping counter.
    Counter32,
    /// Unsigned 64-bit wrapping counter.
    Counter64,
    /// Legacy spelling of Gauge32.
    Gauge,
    /// Unsigned 32-bit non-wrapping value.
    Gauge32,
    /// Unsigned 32-bit value.
    Unsigned32,
    /// Hundredths of seconds since some epoch; unsigned 32-bit.
    TimeTicks,
    /// Four dotted-quad octets.
    IpAddress,
    /// Arbitrary byte string, stored verbatim.
    OctetString,
    /// Dotted-decimal object identifier.
    ObjectIdentifier,
    /// Structural marker for a table or container node; holds no value.
    Sequence,
}

impl TypeTag {
    /// Parse a type tag, normalizing to uppercase first.
    ///
    /// # Examples
    ///
    /// ```
    /// use mibward::value::TypeTag;
    ///
    /// assert_eq!(TypeTag::parse("counter32").unwrap(), TypeTag::Counter32);
    /// assert_eq!(TypeTag::parse("OCTET STRING").unwrap(), TypeTag::OctetString);
    /// assert!(TypeTag::parse("FLOAT").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" => Ok(TypeTag::Integer),
            "COUNTER" => Ok(TypeTag::Counter),
            "COUNTER32" => Ok(TypeTag::Counter32),
            "COUNTER64" => Ok(TypeTag::Counter64),
            "GAUGE" => Ok(TypeTag::Gauge),
            "GAUGE32" => Ok(TypeTag::Gauge32),
            "UNSIGNED32" => Ok(TypeTag::Unsigned32),
            "TIMETICKS" => Ok(TypeTag::TimeTicks),
            "IPADDRESS" => Ok(TypeTag::IpAddress),
            "OCTET STRING" => Ok(TypeTag::OctetString),
            "OBJECT IDENTIFIER" => Ok(TypeTag::ObjectIdentifier),
            "SEQUENCE" => Ok(TypeTag::Sequence),
            _ => Err(Error::UnknownType(s.to_string())),
        }
    }

    /// The canonical uppercase spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Integer => "INTEGER",
            TypeTag::Counter => "COUNTER",
            TypeTag::Counter32 => "COUNTER32",
            TypeTag::Counter64 => "COUNTER64",
            TypeTag::Gauge => "GAUGE",
            TypeTag::Gauge32 => "GAUGE32",
            TypeTag::Unsigned32 => "UNSIGNED32",
            TypeTag::TimeTicks => "TIMETICKS",
            TypeTag::IpAddress => "IPADDRESS",
            TypeTag::OctetString => "OCTET STRING",
            TypeTag::ObjectIdentifier => "OBJECT IDENTIFIER",
            TypeTag::Sequence => "SEQUENCE",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage slot behind a primitive.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Int(i32),
    Unsigned(u32),
    Wide(u64),
    Addr([u8; 4]),
    Text(String),
    Object(Oid),
    Empty,
}

/// A typed value: declared tag plus current storage slot.
///
/// Construction and every subsequent [`set`](Primitive::set) validate the
/// printable form eagerly against the tag's rules, with exact bounds checks
/// at the numeric type's range.
///
/// # Examples
///
/// ```
/// use mibward::value::{Primitive, TypeTag};
///
/// let mut counter = Primitive::new(TypeTag::Counter32, "17").unwrap();
/// assert_eq!(counter.printable(), "17");
///
/// // exact range check at 2^32 - 1
/// assert!(counter.set("4294967295").is_ok());
/// assert!(counter.set("4294967296").is_err());
///
/// // SEQUENCE holds no value; set is a successful no-op
/// let mut seq = Primitive::new(TypeTag::Sequence, "").unwrap();
/// assert!(seq.set("anything").is_ok());
/// assert_eq!(seq.printable(), "");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    tag: TypeTag,
    slot: Slot,
}

impl Primitive {
    /// Validate `printable` against `tag` and construct.
    pub fn new(tag: TypeTag, printable: &str) -> Result<Self> {
        let slot = parse_slot(tag, printable)?;
        Ok(Self { tag, slot })
    }

    /// Validate and store a new value.
    ///
    /// On failure the previous value is kept. Setting a SEQUENCE always
    /// succeeds and leaves it empty.
    pub fn set(&mut self, printable: &str) -> Result<()> {
        if self.tag == TypeTag::Sequence {
            return Ok(());
        }
        self.slot = parse_slot(self.tag, printable)?;
        Ok(())
    }

    /// The canonical rendering of the current value.
    pub fn printable(&self) -> String {
        match &self.slot {
            Slot::Int(v) => v.to_string(),
            Slot::Unsigned(v) => v.to_string(),
            Slot::Wide(v) => v.to_string(),
            Slot::Addr(octets) => {
                format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
            }
            Slot::Text(s) => s.clone(),
            Slot::Object(oid) => oid.to_string(),
            Slot::Empty => String::new(),
        }
    }

    /// The declared type tag.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }
}

fn parse_slot(tag: TypeTag, printable: &str) -> Result<Slot> {
    let reject = || Error::Parse {
        tag,
        input: printable.to_string(),
    };

    match tag {
        TypeTag::Integer => printable.parse::<i32>().map(Slot::Int).map_err(|_| reject()),
        TypeTag::Counter
        | TypeTag::Counter32
        | TypeTag::Gauge
        | TypeTag::Gauge32
        | TypeTag::Unsigned32
        | TypeTag::TimeTicks => printable
            .parse::<u32>()
            .map(Slot::Unsigned)
            .map_err(|_| reject()),
        TypeTag::Counter64 => printable
            .parse::<u64>()
            .map(Slot::Wide)
            .map_err(|_| reject()),
        TypeTag::IpAddress => parse_quad(printable).map(Slot::Addr).ok_or_else(reject),
        TypeTag::OctetString => Ok(Slot::Text(printable.to_string())),
        TypeTag::ObjectIdentifier => Oid::parse(printable)
            .map(Slot::Object)
            .map_err(|_| reject()),
        TypeTag::Sequence => Ok(Slot::Empty),
    }
}

/// Parse a dotted-quad IPv4 address; exactly four octets, each in [0, 255].
fn parse_quad(s: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut count = 0;
    for part in s.split('.') {
        if count == 4 {
            return None;
        }
        octets[count] = part.parse().ok()?;
        count += 1;
    }
    if count == 4 { Some(octets) } else { None }
}
