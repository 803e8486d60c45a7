//! Property-based tests for the primitive family and MIB table ordering.

use mibward::mib::{AccessMode, MibEntry, MibTable};
use mibward::oid::Oid;
use mibward::store::Store;
use mibward::value::{Primitive, TypeTag};
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// Strategies
// =============================================================================

/// Valid printable inputs for a given tag, paired with the tag.
fn arb_tag_and_value() -> impl Strategy<Value = (TypeTag, String)> {
    let unsigned_tags = prop::sample::select(vec![
        TypeTag::Counter,
        TypeTag::Counter32,
        TypeTag::Gauge,
        TypeTag::Gauge32,
        TypeTag::Unsigned32,
        TypeTag::TimeTicks,
    ]);

    prop_oneof![
        any::<i32>().prop_map(|v| (TypeTag::Integer, v.to_string())),
        (unsigned_tags, any::<u32>()).prop_map(|(tag, v)| (tag, v.to_string())),
        any::<u64>().prop_map(|v| (TypeTag::Counter64, v.to_string())),
        any::<[u8; 4]>().prop_map(|o| {
            (
                TypeTag::IpAddress,
                format!("{}.{}.{}.{}", o[0], o[1], o[2], o[3]),
            )
        }),
        // printable forms live on single lines of the wire protocol
        "[ -~]{0,64}".prop_map(|s| (TypeTag::OctetString, s)),
        prop::collection::vec(any::<u32>(), 1..=12).prop_map(|arcs| {
            (
                TypeTag::ObjectIdentifier,
                arcs.iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join("."),
            )
        }),
    ]
}

fn arb_oid() -> impl Strategy<Value = Oid> {
    prop::collection::vec(0u32..100, 1..=10).prop_map(Oid::new)
}

// =============================================================================
// Primitive round-trip
// =============================================================================

proptest! {
    /// Any accepted value re-parses from its printable form to the same
    /// primitive, and the tag survives.
    #[test]
    fn primitive_printable_roundtrip((tag, input) in arb_tag_and_value()) {
        let first = Primitive::new(tag, &input).unwrap();
        let printed = first.printable();
        let second = Primitive::new(tag, &printed).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(second.printable(), printed);
        prop_assert_eq!(first.tag(), tag);
    }

    /// Printable forms fit on one line of the wire protocol.
    #[test]
    fn printable_is_single_line((tag, input) in arb_tag_and_value()) {
        let primitive = Primitive::new(tag, &input).unwrap();
        let printed = primitive.printable();
        prop_assert!(!printed.contains('\n'));
        prop_assert!(!printed.contains('\r'));
    }

    /// set() accepts exactly what new() accepts.
    #[test]
    fn set_agrees_with_new((tag, input) in arb_tag_and_value()) {
        let mut primitive = Primitive::new(tag, &input).unwrap();
        prop_assert!(primitive.set(&input).is_ok());
    }
}

// =============================================================================
// OID ordering
// =============================================================================

proptest! {
    /// Display/parse round-trip preserves identity and ordering.
    #[test]
    fn oid_display_parse_roundtrip(a in arb_oid(), b in arb_oid()) {
        let a2 = Oid::parse(&a.to_string()).unwrap();
        let b2 = Oid::parse(&b.to_string()).unwrap();
        prop_assert_eq!(&a, &a2);
        prop_assert_eq!(a.cmp(&b), a2.cmp(&b2));
    }

    /// next_after returns exactly the smallest strictly greater OID.
    #[test]
    fn next_after_is_least_upper_bound(
        oids in prop::collection::btree_set(arb_oid(), 1..20),
        probe in arb_oid(),
    ) {
        let store = Store::open_in_memory().unwrap();
        let mut table = MibTable::new();
        for oid in &oids {
            let entry = MibEntry::new(
                oid.clone(),
                TypeTag::Integer,
                "0",
                AccessMode::ReadOnly,
                "node",
            )
            .unwrap();
            table.add(&store, entry).unwrap();
        }

        let expected: BTreeSet<&Oid> = oids.iter().filter(|o| *o > &probe).collect();
        let expected_next = expected.iter().next().copied();
        prop_assert_eq!(table.next_after(&probe), expected_next);

        // and every member's successor chains through the sorted set
        for oid in &oids {
            let expected_next = oids.iter().find(|o| *o > oid);
            prop_assert_eq!(table.next_after(oid), expected_next);
        }
    }
}
