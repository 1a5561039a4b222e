//! Relationship class queries through a published snapshot.
//!
//! Fixed scenarios for compaction, sets and defaults, plus property tests
//! over randomly generated three-way relationship classes.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use spine_interface::{
    anything, Dataset, Entity, Error, Filter, Filters, MemorySource, QueryOptions,
    RelationshipKey, Selection,
};

fn unit_node_commodity(tuples: &BTreeSet<(usize, usize, usize)>) -> MemorySource {
    let names = |prefix: &str, n: usize| (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>();
    MemorySource::new()
        .with_object_class("unit", names("u", 4))
        .with_object_class("node", names("n", 3))
        .with_object_class("commodity", names("c", 3))
        .with_relationship_class(
            "unit__node__commodity",
            ["unit", "node", "commodity"],
            tuples
                .iter()
                .map(|(u, n, c)| vec![format!("u{u}"), format!("n{n}"), format!("c{c}")]),
        )
}

fn key(u: usize, n: usize, c: usize) -> RelationshipKey {
    RelationshipKey::new([
        Entity::new("unit", format!("u{u}")),
        Entity::new("node", format!("n{n}")),
        Entity::new("commodity", format!("c{c}")),
    ])
}

fn tuples() -> BTreeSet<(usize, usize, usize)> {
    [(0, 0, 0), (0, 1, 0), (1, 1, 2), (2, 1, 2), (3, 2, 1)].into_iter().collect()
}

// ============================================================================
// Fixed scenarios
// ============================================================================

#[test]
fn test_wildcards_return_every_tuple_in_ingest_order() {
    let dataset = Dataset::open(&unit_node_commodity(&tuples())).unwrap();
    let filters = Filters::new()
        .with("unit", anything())
        .with("node", anything())
        .with("commodity", anything());
    let got = dataset
        .snapshot()
        .query("unit__node__commodity", &filters, &QueryOptions::default())
        .unwrap();

    let (dims, keys) = got.as_tuples().unwrap();
    assert_eq!(dims, &["unit".to_string(), "node".to_string(), "commodity".to_string()][..]);
    let expected: Vec<RelationshipKey> = tuples().iter().map(|&(u, n, c)| key(u, n, c)).collect();
    assert_eq!(keys, &expected[..]);
}

#[test]
fn test_single_filter_drops_its_dimension() {
    let dataset = Dataset::open(&unit_node_commodity(&tuples())).unwrap();
    let got = dataset
        .snapshot()
        .query(
            "unit__node__commodity",
            &Filters::new().with("node", Entity::new("node", "n1")),
            &QueryOptions::default(),
        )
        .unwrap();

    let (dims, keys) = got.as_tuples().unwrap();
    assert_eq!(dims, &["unit".to_string(), "commodity".to_string()][..]);
    assert_eq!(
        keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["(u0, c0)", "(u1, c2)", "(u2, c2)"]
    );
}

#[test]
fn test_set_filter_and_default() {
    let dataset = Dataset::open(&unit_node_commodity(&tuples())).unwrap();
    let snapshot = dataset.snapshot();

    let units = Filter::Many(vec![Entity::new("unit", "u1"), Entity::new("unit", "u3")]);
    let got = snapshot
        .query(
            "unit__node__commodity",
            &Filters::new().with("unit", units).with("commodity", Entity::new("commodity", "c2")),
            &QueryOptions::default(),
        )
        .unwrap();
    let (dims, keys) = got.as_tuples().unwrap();
    assert_eq!(dims, &["unit".to_string(), "node".to_string()][..]);
    assert_eq!(keys.len(), 1);

    let fallback = Selection::Entities(vec![Entity::new("node", "n0")]);
    let got = snapshot
        .query(
            "unit__node__commodity",
            &Filters::new().with("commodity", Entity::new("commodity", "c1")).with("node", Entity::new("node", "n0")),
            &QueryOptions::default().with_default(fallback.clone()),
        )
        .unwrap();
    assert_eq!(got, fallback);
}

#[test]
fn test_unknown_dimension_is_error() {
    let dataset = Dataset::open(&unit_node_commodity(&tuples())).unwrap();
    let err = dataset
        .snapshot()
        .query(
            "unit__node__commodity",
            &Filters::new().with("connection", anything()),
            &QueryOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnknownDimension { dimension, .. } if dimension == "connection"));
}

// ============================================================================
// node__commodity
// ============================================================================

fn node_commodity() -> MemorySource {
    MemorySource::new()
        .with_object_class("node", ["Dublin", "Espoo", "Leuven", "Nimes", "Sthlm"])
        .with_object_class("commodity", ["wind", "water", "gas"])
        .with_relationship_class(
            "node__commodity",
            ["node", "commodity"],
            [
                ["Dublin", "wind"],
                ["Espoo", "wind"],
                ["Leuven", "wind"],
                ["Nimes", "water"],
                ["Sthlm", "water"],
            ],
        )
}

fn node(name: &str) -> Entity {
    Entity::new("node", name)
}

fn commodity(name: &str) -> Entity {
    Entity::new("commodity", name)
}

fn sorted_entities(selection: Selection) -> Vec<Entity> {
    let mut entities = selection.into_entities().unwrap();
    entities.sort();
    entities
}

fn sorted_tuples(selection: &Selection) -> Vec<String> {
    let (_, keys) = selection.as_tuples().unwrap();
    let mut tuples: Vec<String> = keys.iter().map(ToString::to_string).collect();
    tuples.sort();
    tuples
}

#[test]
fn test_node_commodity_listing() {
    let dataset = Dataset::open(&node_commodity()).unwrap();
    let got = dataset
        .snapshot()
        .query("node__commodity", &Filters::new(), &QueryOptions::default())
        .unwrap();
    assert_eq!(
        sorted_tuples(&got),
        vec![
            "(Dublin, wind)",
            "(Espoo, wind)",
            "(Leuven, wind)",
            "(Nimes, water)",
            "(Sthlm, water)",
        ]
    );
}

#[test]
fn test_node_commodity_nodes_of_water() {
    let dataset = Dataset::open(&node_commodity()).unwrap();
    let got = dataset
        .snapshot()
        .query(
            "node__commodity",
            &Filters::new().with("commodity", commodity("water")),
            &QueryOptions::default(),
        )
        .unwrap();
    assert_eq!(got, Selection::Entities(vec![node("Nimes"), node("Sthlm")]));
}

#[test]
fn test_node_commodity_any_node() {
    let dataset = Dataset::open(&node_commodity()).unwrap();
    let snapshot = dataset.snapshot();
    let any_node = Filters::new().with("node", anything());

    let got = snapshot
        .query("node__commodity", &any_node, &QueryOptions::default())
        .unwrap();
    assert_eq!(sorted_entities(got), vec![commodity("water"), commodity("wind")]);

    let got = snapshot
        .query("node__commodity", &any_node, &QueryOptions::default().with_compact(false))
        .unwrap();
    assert_eq!(got.as_tuples().map(|(dims, _)| dims.len()), Some(2));
    assert_eq!(sorted_tuples(&got).len(), 5);

    // Omitting the filter keeps the node dimension.
    let omitted = snapshot
        .query("node__commodity", &Filters::new(), &QueryOptions::default())
        .unwrap();
    assert_eq!(omitted.as_tuples().map(|(_, keys)| keys.len()), Some(5));
}

#[test]
fn test_node_commodity_water_uncompacted() {
    let dataset = Dataset::open(&node_commodity()).unwrap();
    let got = dataset
        .snapshot()
        .query(
            "node__commodity",
            &Filters::new().with("commodity", commodity("water")),
            &QueryOptions::default().with_compact(false),
        )
        .unwrap();
    let (dims, _) = got.as_tuples().unwrap();
    assert_eq!(dims, &["node".to_string(), "commodity".to_string()][..]);
    assert_eq!(sorted_tuples(&got), vec!["(Nimes, water)", "(Sthlm, water)"]);
}

#[test]
fn test_node_commodity_node_set() {
    let dataset = Dataset::open(&node_commodity()).unwrap();
    let got = dataset
        .snapshot()
        .query(
            "node__commodity",
            &Filters::new().with("node", vec![node("Dublin"), node("Espoo")]),
            &QueryOptions::default(),
        )
        .unwrap();
    // A set of two keeps its dimension.
    assert_eq!(sorted_tuples(&got), vec!["(Dublin, wind)", "(Espoo, wind)"]);
}

#[test]
fn test_node_commodity_gas_falls_back_to_default() {
    let dataset = Dataset::open(&node_commodity()).unwrap();
    let no_gas = Selection::Entities(vec![commodity("gas")]);
    let got = dataset
        .snapshot()
        .query(
            "node__commodity",
            &Filters::new().with("commodity", commodity("gas")),
            &QueryOptions::default().with_default(no_gas.clone()),
        )
        .unwrap();
    assert_eq!(got, no_gas);
}

// ============================================================================
// Properties
// ============================================================================

fn tuple_sets() -> impl Strategy<Value = BTreeSet<(usize, usize, usize)>> {
    proptest::collection::btree_set((0..4usize, 0..3usize, 0..3usize), 0..24)
}

proptest! {
    #[test]
    fn property_wildcard_query_returns_all_keys(tuples in tuple_sets()) {
        let dataset = Dataset::open(&unit_node_commodity(&tuples)).unwrap();
        let got = dataset
            .snapshot()
            .query("unit__node__commodity", &Filters::new(), &QueryOptions::default())
            .unwrap();
        let expected: Vec<RelationshipKey> = tuples.iter().map(|&(u, n, c)| key(u, n, c)).collect();
        prop_assert_eq!(got.len(), expected.len());
        if let Some((_, keys)) = got.as_tuples() {
            prop_assert_eq!(keys, &expected[..]);
        }
    }

    #[test]
    fn property_all_but_one_bound_flattens(tuples in tuple_sets(), u in 0..4usize, n in 0..3usize) {
        let dataset = Dataset::open(&unit_node_commodity(&tuples)).unwrap();
        let filters = Filters::new()
            .with("unit", Entity::new("unit", format!("u{u}")))
            .with("node", Entity::new("node", format!("n{n}")));
        let got = dataset
            .snapshot()
            .query("unit__node__commodity", &filters, &QueryOptions::default())
            .unwrap();

        let expected: Vec<Entity> = tuples
            .iter()
            .filter(|&&(tu, tn, _)| tu == u && tn == n)
            .map(|&(_, _, c)| Entity::new("commodity", format!("c{c}")))
            .collect();
        prop_assert_eq!(got, Selection::Entities(expected));
    }
}
