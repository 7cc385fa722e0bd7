//! Deadline-bounded depth-first search over an object graph.

use std::time::Instant;

use super::graph::{GraphValue, ObjectRef, Visited};

struct Frame {
    object: ObjectRef,
    keys: Vec<String>,
    next: usize,
}

/// Searches `root` depth-first for the first property where
/// `predicate(key, value)` holds and returns that value.
///
/// Each object is expanded at most once (identity-based), so cyclic graphs
/// terminate. The deadline is checked before every expansion, the root
/// included; once it has passed the search gives up and returns `None`.
/// Properties that cannot be read are skipped.
pub fn search<P>(root: &GraphValue, predicate: P, deadline: Instant) -> Option<GraphValue>
where
    P: Fn(&str, &GraphValue) -> bool,
{
    let root = root.as_object()?;
    let mut visited = Visited::new();
    let mut stack: Vec<Frame> = Vec::new();

    if !expand(root, &mut visited, &mut stack, deadline) {
        return None;
    }

    while let Some(frame) = stack.last_mut() {
        let Some(key) = frame.keys.get(frame.next).cloned() else {
            stack.pop();
            continue;
        };
        frame.next += 1;

        let value = match frame.object.get(&key) {
            Ok(value) => value,
            Err(_) => continue,
        };

        if predicate(&key, &value) {
            return Some(value);
        }

        if let GraphValue::Object(child) = &value {
            if Instant::now() >= deadline {
                return None;
            }
            // Descending here keeps the visiting order of a recursive walk.
            expand(child, &mut visited, &mut stack, deadline);
        }
    }

    None
}

/// Pushes a frame for `object` unless it was already entered or time is up.
/// Returns false only when the deadline has passed.
fn expand(
    object: &ObjectRef,
    visited: &mut Visited,
    stack: &mut Vec<Frame>,
    deadline: Instant,
) -> bool {
    if Instant::now() >= deadline {
        return false;
    }
    if visited.enter(object) {
        stack.push(Frame {
            object: object.clone(),
            keys: object.keys(),
            next: 0,
        });
    }
    true
}

/// Predicate for a string-valued property named `key`.
pub fn string_named(key: &str) -> impl Fn(&str, &GraphValue) -> bool + '_ {
    move |k, value| k == key && matches!(value, GraphValue::String(_))
}
