//! `if`/`for` block runtime state (spec §4.8), ported from
//! `libliquify/block-if.c` and `libliquify/block-for.c`.

use serde_json::Value;

/// Per-block opaque state, stored on the runtime stack frame (spec §3,
/// "Template Runtime Stack").
#[derive(Debug, Clone)]
pub enum FrameData {
    If {
        matched: bool,
    },
    For {
        /// Snapshot taken on first entry: either the array itself, or —
        /// for a mapping — its keys in **reverse** insertion order. This
        /// reversal is a deliberate port of `for_current()`'s
        /// `json_array_get(keys, count - idx - 1)`, not a bug (spec §9).
        items: Vec<Value>,
        idx: usize,
        var: String,
    },
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub opening: usize,
    pub ident: String,
    pub data: FrameData,
}

/// Truthiness used by `if`/`elsif` (spec §4.8): null/false/0/0.0 are
/// false; non-empty strings, arrays, and objects are true.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// `liquify_block_if_begin_`: evaluates the condition, returns whether
/// the frame should start out inhibited.
pub fn if_begin(condition: &Value) -> (FrameData, bool) {
    let matched = truthy(condition);
    (FrameData::If { matched }, !matched)
}

/// `for_current()`: the item at the loop's current index, honouring the
/// reverse-order rule for mapping iteration.
fn for_current(items: &[Value], idx: usize) -> Option<&Value> {
    items.get(idx)
}

/// Builds the snapshot a `for` loop iterates, per `for_begin_`: arrays
/// are kept in order; objects are captured as a list of `{key, value}`
/// pairs with **keys visited in reverse of insertion order**.
pub fn for_snapshot(collection: &Value) -> Vec<Value> {
    match collection {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map.values().rev().cloned().collect(),
        _ => Vec::new(),
    }
}

/// `liquify_block_for_begin_`: builds the frame for a fresh loop entry
/// and returns `(frame_data, current_value, should_inhibit)`. An empty
/// collection inhibits the body entirely (source: `liquify_inhibit_`
/// when `for_current` has nothing).
pub fn for_begin(var: &str, collection: &Value) -> (FrameData, Option<Value>, bool) {
    let items = for_snapshot(collection);
    let current = for_current(&items, 0).cloned();
    let inhibit = current.is_none();
    (
        FrameData::For {
            items,
            idx: 0,
            var: var.to_string(),
        },
        current,
        inhibit,
    )
}

/// `liquify_block_for_end_`: advances the index; returns the next bound
/// value (and `true` for "jump back to the opening part") or `None` to
/// fall through and end the loop.
pub fn for_advance(data: &mut FrameData) -> Option<Value> {
    let FrameData::For { items, idx, .. } = data else {
        return None;
    };
    *idx += 1;
    for_current(items, *idx).cloned()
}
