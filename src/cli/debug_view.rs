// src/cli/debug_view.rs

use crate::core::dispatcher::Invocation;
use crate::models::NodeRef;
use serde_json::{Map, Value as Json, json};

/// A JSON dump of the parse session: resolved command, match states, store.
pub fn render_debug(inv: &Invocation<'_>) -> String {
    let mut states: Vec<_> = inv.parse.states().collect();
    states.sort_by_key(|(node, _)| **node);

    let matched: Vec<Json> = states
        .into_iter()
        .map(|(node, state)| {
            let (kind, path) = match *node {
                NodeRef::Command(c) => ("command", inv.tree.dotted_path(c)),
                NodeRef::Flag(f) => ("flag", inv.tree.flag_path(f)),
            };
            json!({
                "kind": kind,
                "path": path,
                "hit": state.hit_str,
                "times": state.hit_times,
                "short": state.short,
                "dbl_tilde": state.dbl_tilde,
                "plus": state.plus,
                "value": state.value.as_ref().map(|v| v.to_json()),
            })
        })
        .collect();

    let store: Map<String, Json> = inv
        .store
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_json()))
        .collect();

    let dump = json!({
        "command": inv.tree.dotted_path(inv.command),
        "positional": inv.parse.positional(),
        "unknown_flags": inv.parse.unknown_flags(),
        "anomalies": inv.parse.anomalies(),
        "pass_through": inv.parse.pass_through(),
        "matched": matched,
        "store": store,
    });
    serde_json::to_string_pretty(&dump).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
