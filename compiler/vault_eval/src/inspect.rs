//! Depth-first walk over a value graph.
//!
//! [`inspect`] visits `root` and everything it transitively contains in
//! pre-order. Container boundaries are reported as [`Inspected::End`]
//! markers, so a consumer can track nesting without a stack of its own.
//!
//! Dictionary entries are visited key first, each followed by its own
//! marker:
//!
//! ```text
//! dict, key, End(DictionaryKey), value, End(DictionaryValue), ..., End(Dictionary)
//! ```
//!
//! The walk keeps its own work stack, so nesting depth does not touch the
//! native stack.

use crate::value::Value;

/// Kind of container a marker closes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerEnd {
    Optional,
    Array,
    Dictionary,
    DictionaryKey,
    DictionaryValue,
    Composite,
}

/// One event of the walk.
#[derive(Clone, Debug, PartialEq)]
pub enum Inspected {
    /// A value, before any of its children.
    Value(Value),
    /// All children of a container (or one side of a dictionary entry) were
    /// visited.
    End(ContainerEnd),
}

enum Work {
    Visit(Value),
    Emit(ContainerEnd),
}

/// Walk `root` in pre-order.
///
/// `visit` returns whether to descend into the value it was given. A pruned
/// container gets no end marker; dictionary key and value markers belong to
/// the entry and are always emitted. The return value is ignored for
/// markers.
pub fn inspect(root: &Value, mut visit: impl FnMut(Inspected) -> bool) {
    let mut stack = vec![Work::Visit(root.clone())];
    while let Some(work) = stack.pop() {
        let value = match work {
            Work::Emit(end) => {
                visit(Inspected::End(end));
                continue;
            }
            Work::Visit(value) => value,
        };
        if !visit(Inspected::Value(value.clone())) {
            continue;
        }
        // Children are pushed in reverse so they pop in iteration order.
        match value {
            Value::Some(inner) => {
                stack.push(Work::Emit(ContainerEnd::Optional));
                stack.push(Work::Visit(inner.into_value()));
            }
            Value::Array(array) => {
                stack.push(Work::Emit(ContainerEnd::Array));
                stack.extend(array.elements().into_iter().rev().map(Work::Visit));
            }
            Value::Dictionary(dict) => {
                stack.push(Work::Emit(ContainerEnd::Dictionary));
                for (key, value) in dict.entries().into_iter().rev() {
                    stack.push(Work::Emit(ContainerEnd::DictionaryValue));
                    stack.push(Work::Visit(value));
                    stack.push(Work::Emit(ContainerEnd::DictionaryKey));
                    stack.push(Work::Visit(key));
                }
            }
            Value::Composite(composite) => {
                stack.push(Work::Emit(ContainerEnd::Composite));
                stack.extend(
                    composite
                        .fields()
                        .into_iter()
                        .rev()
                        .map(|(_, value)| Work::Visit(value)),
                );
            }
            _ => {}
        }
    }
}

/// Collect every event of a full walk.
pub fn collect(root: &Value) -> Vec<Inspected> {
    let mut events = Vec::new();
    inspect(root, |event| {
        events.push(event);
        true
    });
    events
}
