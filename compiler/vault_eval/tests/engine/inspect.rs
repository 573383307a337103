//! Inspector walks over generated value graphs.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use vault_eval::inspect::collect;
use vault_eval::{CompositeValue, ContainerEnd, DictionaryValue, Inspected, Value};
use vault_ir::{CompositeKind, Name};

fn tree() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::None),
    ];
    leaf.prop_recursive(5, 96, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
            inner.clone().prop_map(Value::some),
            prop::collection::btree_map(any::<i64>(), inner.clone(), 0..3).prop_map(|entries| {
                let entries = entries.into_iter().map(|(k, v)| (Value::Int(k), v));
                Value::Dictionary(DictionaryValue::from_entries(entries).unwrap())
            }),
            prop::collection::vec(inner, 0..3).prop_map(|fields| {
                Value::Composite(CompositeValue::new(
                    Name::from_raw(1),
                    CompositeKind::Structure,
                    (10..).map(Name::from_raw).zip(fields),
                ))
            }),
        ]
    })
}

#[derive(Default, Debug, PartialEq)]
struct Shape {
    values: usize,
    containers: usize,
    entries: usize,
}

fn shape(value: &Value, acc: &mut Shape) {
    acc.values += 1;
    match value {
        Value::Some(inner) => {
            acc.containers += 1;
            shape(inner, acc);
        }
        Value::Array(array) => {
            acc.containers += 1;
            array.elements().iter().for_each(|v| shape(v, acc));
        }
        Value::Dictionary(dict) => {
            acc.containers += 1;
            for (key, value) in dict.entries() {
                acc.entries += 1;
                shape(&key, acc);
                shape(&value, acc);
            }
        }
        Value::Composite(composite) => {
            acc.containers += 1;
            composite.fields().iter().for_each(|(_, v)| shape(v, acc));
        }
        _ => {}
    }
}

fn observed(events: &[Inspected]) -> Shape {
    let mut acc = Shape::default();
    for event in events {
        match event {
            Inspected::Value(_) => acc.values += 1,
            Inspected::End(ContainerEnd::DictionaryKey) => acc.entries += 1,
            Inspected::End(ContainerEnd::DictionaryValue) => {}
            Inspected::End(_) => acc.containers += 1,
        }
    }
    acc
}

proptest! {
    #[test]
    fn full_walk_visits_every_value_once(root in tree()) {
        let mut expected = Shape::default();
        shape(&root, &mut expected);
        let events = collect(&root);
        prop_assert_eq!(observed(&events), expected);
        let first = Inspected::Value(root.clone());
        prop_assert_eq!(events.first(), Some(&first));
    }

    #[test]
    fn markers_close_in_reverse_order(root in tree()) {
        let mut open = Vec::new();
        for event in collect(&root) {
            match event {
                Inspected::Value(Value::Some(_)) => open.push(ContainerEnd::Optional),
                Inspected::Value(Value::Array(_)) => open.push(ContainerEnd::Array),
                Inspected::Value(Value::Dictionary(_)) => open.push(ContainerEnd::Dictionary),
                Inspected::Value(Value::Composite(_)) => open.push(ContainerEnd::Composite),
                Inspected::End(ContainerEnd::DictionaryKey | ContainerEnd::DictionaryValue)
                | Inspected::Value(_) => {}
                Inspected::End(end) => {
                    prop_assert_eq!(open.pop(), Some(end));
                }
            }
        }
        prop_assert!(open.is_empty());
    }

    #[test]
    fn pruning_the_root_yields_one_event(root in tree()) {
        let mut events = Vec::new();
        vault_eval::inspect(&root, |event| {
            events.push(event);
            false
        });
        prop_assert_eq!(events, vec![Inspected::Value(root)]);
    }
}

#[test]
fn resource_graph_reports_owned_values() {
    let vault = Value::Composite(CompositeValue::new(
        Name::from_raw(1),
        CompositeKind::Resource,
        [(Name::from_raw(2), Value::Int(100))],
    ));
    let root = Value::array(vec![Value::some(vault.clone()), Value::Int(0)]);
    root.set_owner(Some(vault_eval::Address::from_u64(1)));

    let owned: Vec<Value> = collect(&root)
        .into_iter()
        .filter_map(|event| match event {
            Inspected::Value(v @ Value::Composite(_)) if v.owner().is_some() => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(owned, vec![vault]);
}
