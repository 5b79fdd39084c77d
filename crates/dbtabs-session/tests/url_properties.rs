//! Location encode/decode properties

use dbtabs_core::TabId;
use dbtabs_session::{TabIdAllocator, UrlView, decode, encode};
use proptest::prelude::*;

fn tab_id() -> impl Strategy<Value = TabId> {
    prop_oneof![
        "[a-z0-9]{1,10}".prop_map(|token| TabId::parse(&format!("query-{token}")).unwrap()),
        ("[a-z_][a-z0-9_]{0,8}", "[A-Za-z0-9_.&=%+#?/-]{1,12}")
            .prop_map(|(schema, table)| TabId::for_table(&schema, &table).unwrap()),
    ]
}

fn unique_ids() -> impl Strategy<Value = Vec<TabId>> {
    prop::collection::vec(tab_id(), 1..8).prop_map(|ids| {
        let mut unique: Vec<TabId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        unique
    })
}

proptest! {
    #[test]
    fn prop_round_trip_clamps_active(ids in unique_ids(), active in 0usize..12) {
        let location = encode(&ids, active);
        let mut allocator = TabIdAllocator::starting_at(0);
        let view = decode(&location, &mut allocator);

        let expected = if active < ids.len() { active } else { 0 };
        prop_assert_eq!(view.tab_ids(), ids.as_slice());
        prop_assert_eq!(view.active_index(), expected);
    }

    #[test]
    fn prop_parse_never_yields_out_of_range_index(query in ".{0,64}") {
        let view = UrlView::parse(&query);
        if view.is_empty() {
            prop_assert_eq!(view.active_index(), 0);
        } else {
            prop_assert!(view.active_index() < view.len());
        }
    }

    #[test]
    fn prop_decode_always_yields_a_tab(query in ".{0,64}") {
        let mut allocator = TabIdAllocator::starting_at(0);
        let view = decode(&query, &mut allocator);
        prop_assert!(!view.is_empty());
        prop_assert!(view.active_tab().is_some());
    }
}
