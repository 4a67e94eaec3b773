// src/core/xref.rs

//! Per-command lookup indices.
//!
//! Each command gets its own [`CommandXref`] covering its *direct* children
//! only. Ancestor fallback is done by the matcher walking `owner` links, not by
//! flattening indices.

use crate::core::tree::CommandTree;
use crate::core::value::Value;
use crate::models::{CmdId, FlagId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;

/// Which member of a toggle group is currently on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleGroupMatch {
    /// Flags in the group, in declaration order.
    pub members: Vec<FlagId>,
    /// The member set last, if any.
    pub matched: Option<FlagId>,
}

/// Lookup maps of one command.
#[derive(Debug, Clone, Default)]
pub struct CommandXref {
    /// Long titles and aliases of subcommands.
    pub long_commands: HashMap<String, CmdId>,
    /// Short titles of subcommands.
    pub short_commands: HashMap<String, CmdId>,
    /// Long titles and aliases of flags.
    pub long_flags: HashMap<String, FlagId>,
    /// Short titles of flags.
    pub short_flags: HashMap<String, FlagId>,
    /// Toggle groups declared by this command's flags.
    pub toggle_groups: HashMap<String, ToggleGroupMatch>,
    /// The flag that accepts `-<number>`.
    pub head_like: Option<FlagId>,
}

impl CommandXref {
    /// The longest flag key in `map` that prefixes `text`, among flags
    /// `admits` accepts.
    pub(crate) fn longest_prefix<'m>(
        map: &'m HashMap<String, FlagId>,
        text: &str,
        admits: impl Fn(FlagId) -> bool,
    ) -> Option<(&'m str, FlagId)> {
        map.iter()
            .filter(|(key, id)| {
                !key.is_empty() && text.starts_with(key.as_str()) && admits(**id)
            })
            .max_by_key(|(key, _)| key.len())
            .map(|(key, id)| (key.as_str(), *id))
    }
}

fn insert_unique<I: Copy + Debug>(
    map: &mut HashMap<String, I>,
    key: &str,
    id: I,
    owner: &str,
    kind: &str,
) {
    if key.is_empty() {
        return;
    }
    match map.entry(key.to_string()) {
        Entry::Occupied(existing) => {
            log::warn!(
                "Duplicate {} title '{}' under '{}': keeping {:?}, ignoring {:?}.",
                kind,
                key,
                owner,
                existing.get(),
                id
            );
        }
        Entry::Vacant(slot) => {
            slot.insert(id);
        }
    }
}

/// Builds the index of command `id` from its direct children.
pub(crate) fn build(tree: &CommandTree, id: CmdId) -> CommandXref {
    let cmd = &tree[id];
    let owner = tree.dotted_path(id);
    let mut xref = CommandXref::default();

    for &child in cmd.children() {
        let base = &tree[child].base;
        insert_unique(&mut xref.long_commands, &base.long, child, &owner, "command");
        for alias in &base.aliases {
            insert_unique(&mut xref.long_commands, alias, child, &owner, "command");
        }
        insert_unique(&mut xref.short_commands, &base.short, child, &owner, "command");
    }

    for &fid in cmd.flags() {
        let flag = &tree[fid];
        insert_unique(&mut xref.long_flags, &flag.base.long, fid, &owner, "flag");
        for alias in &flag.base.aliases {
            insert_unique(&mut xref.long_flags, alias, fid, &owner, "flag");
        }
        insert_unique(&mut xref.short_flags, &flag.base.short, fid, &owner, "flag");

        if let Some(group) = &flag.toggle_group {
            let entry = xref.toggle_groups.entry(group.clone()).or_default();
            entry.members.push(fid);
            if flag.value == Value::Bool(true) {
                entry.matched = Some(fid);
            }
        }

        if flag.head_like {
            match xref.head_like {
                None => xref.head_like = Some(fid),
                Some(kept) => log::warn!(
                    "Command '{}' declares several head-like flags; keeping {:?}.",
                    owner,
                    kept
                ),
            }
        }
    }

    log::debug!(
        "Built xref for '{}': {} commands, {} flags, {} toggle groups.",
        owner,
        xref.long_commands.len(),
        xref.long_flags.len(),
        xref.toggle_groups.len()
    );
    xref
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Command, Flag};

    #[test]
    fn test_longest_prefix_prefers_longer_keys() {
        let mut map = HashMap::new();
        map.insert("v".to_string(), FlagId(0));
        map.insert("vv".to_string(), FlagId(1));
        assert_eq!(
            CommandXref::longest_prefix(&map, "vvz", |_| true),
            Some(("vv", FlagId(1)))
        );
        assert_eq!(
            CommandXref::longest_prefix(&map, "vvz", |id| id != FlagId(1)),
            Some(("v", FlagId(0)))
        );
        assert_eq!(CommandXref::longest_prefix(&map, "x", |_| true), None);
    }

    #[test]
    fn test_build_indexes_direct_children_and_aliases() {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        let server = tree
            .add_subcommand(root, Command::new("server").with_short("s").with_aliases(&["srv"]))
            .unwrap();
        tree.add_subcommand(server, Command::new("start")).unwrap();
        let verbose = tree
            .add_flag(root, Flag::new("verbose", false).with_short("v"))
            .unwrap();

        let xref = build(&tree, root);
        assert_eq!(xref.long_commands.get("server"), Some(&server));
        assert_eq!(xref.long_commands.get("srv"), Some(&server));
        assert_eq!(xref.short_commands.get("s"), Some(&server));
        assert!(!xref.long_commands.contains_key("start"));
        assert_eq!(xref.short_flags.get("v"), Some(&verbose));
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        let first = tree
            .add_flag(root, Flag::new("alpha", false).with_short("a"))
            .unwrap();
        tree.add_flag(root, Flag::new("all", false).with_short("a"))
            .unwrap();
        let xref = build(&tree, root);
        assert_eq!(xref.short_flags.get("a"), Some(&first));
    }

    #[test]
    fn test_toggle_groups_and_head_like() {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        let a = tree
            .add_flag(root, Flag::new("tcp", true).with_toggle_group("proto"))
            .unwrap();
        let b = tree
            .add_flag(root, Flag::new("udp", false).with_toggle_group("proto"))
            .unwrap();
        let lines = tree
            .add_flag(root, Flag::new("lines", Value::I64(10)).head_like())
            .unwrap();

        let xref = build(&tree, root);
        let group = xref.toggle_groups.get("proto").unwrap();
        assert_eq!(group.members, vec![a, b]);
        assert_eq!(group.matched, Some(a));
        assert_eq!(xref.head_like, Some(lines));
    }
}
