//! Tool-call collector — merges fragmented function-call descriptors.
//!
//! Tool calls arrive across stream deltas as sparse fragments keyed by
//! `index`. A fragment is created lazily the first time its index is seen;
//! after that, deltas only ever set the name and append argument text.
//! Arguments are frequently split mid-JSON-token, so the merge is naive
//! string concatenation — replacing instead of appending corrupts
//! multi-chunk arguments.

use denkitsu_core::client::ToolCallDelta;
use denkitsu_core::turn::ToolCallFragment;

/// Fold one wire fragment into the accumulated tool-call list.
///
/// Indices may arrive out of order or with gaps; an unseen index starts a
/// fresh fragment regardless of what other indices exist.
pub fn fold_tool_call_delta(fragments: &mut Vec<ToolCallFragment>, delta: &ToolCallDelta) {
    let fragment = match fragments.iter_mut().find(|f| f.index == delta.index) {
        Some(existing) => existing,
        None => {
            fragments.push(ToolCallFragment::new(delta.index));
            fragments.last_mut().unwrap()
        }
    };

    if let Some(name) = &delta.function.name {
        if !name.is_empty() {
            fragment.name = name.clone();
        }
    }

    if let Some(arguments) = &delta.function.arguments {
        fragment.arguments.push_str(arguments);
    }
}
