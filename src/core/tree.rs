// src/core/tree.rs

//! The command tree arena.
//!
//! Commands and flags live in two flat vectors and refer to each other through
//! [`CmdId`] / [`FlagId`]. The root is always `CmdId(0)`.

use crate::core::value::Value;
use crate::core::xref::{self, CommandXref};
use crate::models::{CmdId, Command, EvalPolicy, Flag, FlagId};
use std::ops::{Index, IndexMut};

/// Owns every command and flag of one application.
#[derive(Debug, Clone)]
pub struct CommandTree {
    commands: Vec<Command>,
    flags: Vec<Flag>,
}

#[allow(clippy::indexing_slicing)]
impl Index<CmdId> for CommandTree {
    type Output = Command;

    fn index(&self, id: CmdId) -> &Command {
        &self.commands[id.0]
    }
}

#[allow(clippy::indexing_slicing)]
impl IndexMut<CmdId> for CommandTree {
    fn index_mut(&mut self, id: CmdId) -> &mut Command {
        &mut self.commands[id.0]
    }
}

#[allow(clippy::indexing_slicing)]
impl Index<FlagId> for CommandTree {
    type Output = Flag;

    fn index(&self, id: FlagId) -> &Flag {
        &self.flags[id.0]
    }
}

#[allow(clippy::indexing_slicing)]
impl IndexMut<FlagId> for CommandTree {
    fn index_mut(&mut self, id: FlagId) -> &mut Flag {
        &mut self.flags[id.0]
    }
}

impl CommandTree {
    /// Starts a tree whose root is `root`.
    pub fn new(mut root: Command) -> Self {
        root.owner = None;
        root.root = CmdId(0);
        Self {
            commands: vec![root],
            flags: Vec::new(),
        }
    }

    pub fn root(&self) -> CmdId {
        CmdId(0)
    }

    pub fn command(&self, id: CmdId) -> Option<&Command> {
        self.commands.get(id.0)
    }

    pub fn flag(&self, id: FlagId) -> Option<&Flag> {
        self.flags.get(id.0)
    }

    /// Every flag in the arena, including ones produced dynamically.
    pub fn flag_ids(&self) -> impl Iterator<Item = FlagId> + use<> {
        (0..self.flags.len()).map(FlagId)
    }

    /// Every command in the arena.
    pub fn command_ids(&self) -> impl Iterator<Item = CmdId> + use<> {
        (0..self.commands.len()).map(CmdId)
    }

    /// Adds `cmd` under `parent`. A sibling with the same title tuple wins and
    /// `None` is returned.
    pub fn add_subcommand(&mut self, parent: CmdId, mut cmd: Command) -> Option<CmdId> {
        let duplicate = self[parent]
            .children
            .iter()
            .any(|&c| self[c].base.title_tuple() == cmd.base.title_tuple());
        if duplicate {
            log::debug!(
                "Ignoring duplicate subcommand '{}' under '{}'.",
                cmd.base.long,
                self.dotted_path(parent)
            );
            return None;
        }

        cmd.owner = Some(parent);
        cmd.root = self[parent].root;
        let id = CmdId(self.commands.len());
        self.commands.push(cmd);
        self[parent].children.push(id);
        self.invalidate_xref(parent);
        Some(id)
    }

    /// Adds `flag` to `owner`. A sibling with the same title tuple wins and
    /// `None` is returned.
    pub fn add_flag(&mut self, owner: CmdId, mut flag: Flag) -> Option<FlagId> {
        let duplicate = self[owner]
            .flags
            .iter()
            .any(|&f| self[f].base.title_tuple() == flag.base.title_tuple());
        if duplicate {
            log::debug!(
                "Ignoring duplicate flag '{}' under '{}'.",
                flag.base.long,
                self.dotted_path(owner)
            );
            return None;
        }

        flag.owner = Some(owner);
        let id = FlagId(self.flags.len());
        self.flags.push(flag);
        self[owner].flags.push(id);
        self.invalidate_xref(owner);
        Some(id)
    }

    /// Re-stamps `owner` and `root` links across the whole tree.
    pub fn ensure_tree(&mut self) {
        let root = self.root();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let children = self[id].children.clone();
            let flags = self[id].flags.clone();
            for child in children {
                self[child].owner = Some(id);
                self[child].root = root;
                stack.push(child);
            }
            for flag in flags {
                self[flag].owner = Some(id);
            }
        }
    }

    /// Builds the index of every reachable command that lacks one.
    pub fn ensure_xref(&mut self) {
        let mut pending = Vec::new();
        self.walk(self.root(), &mut |id, _| pending.push(id));
        for id in pending {
            self.ensure_xref_of(id);
        }
    }

    /// Builds the index of a single command if it lacks one.
    pub(crate) fn ensure_xref_of(&mut self, id: CmdId) {
        if self[id].xref.is_none() {
            let built = xref::build(self, id);
            self[id].xref = Some(built);
        }
    }

    /// Drops the index of `id`; the next `ensure_xref` rebuilds it.
    pub fn invalidate_xref(&mut self, id: CmdId) {
        self[id].xref = None;
    }

    pub fn xref(&self, id: CmdId) -> Option<&CommandXref> {
        self[id].xref.as_ref()
    }

    pub(crate) fn xref_mut(&mut self, id: CmdId) -> Option<&mut CommandXref> {
        self[id].xref.as_mut()
    }

    /// Depth-first visit of `start` and its static descendants.
    pub fn walk(&self, start: CmdId, visit: &mut dyn FnMut(CmdId, usize)) {
        let mut stack = vec![(start, 0)];
        while let Some((id, depth)) = stack.pop() {
            visit(id, depth);
            for &child in self[id].children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    /// `id`, its owner, its owner's owner, up to the root.
    pub fn ancestors(&self, id: CmdId) -> impl Iterator<Item = CmdId> + '_ {
        std::iter::successors(Some(id), move |c| self[*c].owner)
    }

    /// The command's path from the root, root excluded: `server.start`.
    pub fn dotted_path(&self, id: CmdId) -> String {
        let mut parts: Vec<&str> = self
            .ancestors(id)
            .filter(|c| self[*c].owner.is_some())
            .map(|c| self[c].base.long.as_str())
            .collect();
        parts.reverse();
        parts.join(".")
    }

    /// The flag's path: owner path then long title, `server.start.port`.
    pub fn flag_path(&self, id: FlagId) -> String {
        let flag = &self[id];
        match flag.owner.map(|o| self.dotted_path(o)) {
            Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, flag.base.long),
            _ => flag.base.long.clone(),
        }
    }

    /// Resolves a dotted command path from the root; `""` is the root.
    pub fn find_command_by_path(&self, path: &str) -> Option<CmdId> {
        let mut current = self.root();
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = self
                .children_with_dynamic(current)
                .find(|&c| self[c].base.has_title(segment))?;
        }
        Some(current)
    }

    /// Resolves `cmd.path.flag` to a flag.
    pub fn find_flag_by_path(&self, path: &str) -> Option<FlagId> {
        let (cmd_path, title) = path.rsplit_once('.').unwrap_or(("", path));
        let owner = self.find_command_by_path(cmd_path)?;
        self.flags_with_dynamic(owner)
            .find(|&f| self[f].base.has_title(title))
    }

    /// Finds a flag by title on `start` or its nearest ancestor declaring it.
    pub fn find_flag_in_chain(&self, start: CmdId, title: &str) -> Option<FlagId> {
        self.ancestors(start)
            .find_map(|c| self.flags_with_dynamic(c).find(|&f| self[f].base.has_title(title)))
    }

    /// A leaf has no subcommands, static or dynamic.
    pub fn is_leaf(&self, id: CmdId) -> bool {
        let cmd = &self[id];
        cmd.children.is_empty() && cmd.dynamic_commands.is_none()
    }

    fn children_with_dynamic(&self, id: CmdId) -> impl Iterator<Item = CmdId> + '_ {
        let cmd = &self[id];
        let cached = cmd
            .dynamic_commands
            .as_ref()
            .and_then(|d| d.cached.as_deref())
            .unwrap_or_default();
        cmd.children.iter().chain(cached).copied()
    }

    fn flags_with_dynamic(&self, id: CmdId) -> impl Iterator<Item = FlagId> + '_ {
        let cmd = &self[id];
        let cached = cmd
            .dynamic_flags
            .as_ref()
            .and_then(|d| d.cached.as_deref())
            .unwrap_or_default();
        cmd.flags.iter().chain(cached).copied()
    }

    /// Marks every "every time" source stale and recomputes toggle-group
    /// matches from the current flag values. Called once flags are reset.
    pub(crate) fn begin_parse(&mut self) {
        let flags = &self.flags;
        for cmd in &mut self.commands {
            if let Some(source) = cmd.dynamic_commands.as_mut() {
                source.stale = source.policy == EvalPolicy::EveryTime;
            }
            if let Some(source) = cmd.dynamic_flags.as_mut() {
                source.stale = source.policy == EvalPolicy::EveryTime;
            }
            if let Some(xref) = cmd.xref.as_mut() {
                for group in xref.toggle_groups.values_mut() {
                    group.matched = group.members.iter().copied().find(|m| {
                        flags.get(m.0).is_some_and(|f| f.value == Value::Bool(true))
                    });
                }
            }
        }
    }

    /// Evaluates the dynamic subcommands of `id` under its policy and adopts
    /// the produced nodes into the arena. An "every time" source runs at most
    /// once per parse; a produced node whose title tuple matches one from the
    /// previous run takes over that arena slot.
    pub(crate) fn dynamic_subcommands(&mut self, id: CmdId) -> Vec<CmdId> {
        let Some(source) = self[id].dynamic_commands.clone() else {
            return Vec::new();
        };
        if !source.stale
            && let Some(cached) = source.cached
        {
            return cached;
        }

        let produced = (source.producer)(&self[id]);
        let previous = source.cached.unwrap_or_default();
        let root = self[id].root;
        let mut ids = Vec::with_capacity(produced.len());
        for mut cmd in produced {
            cmd.owner = Some(id);
            cmd.root = root;
            let reused = previous
                .iter()
                .copied()
                .find(|&old| {
                    !ids.contains(&old) && self[old].base.title_tuple() == cmd.base.title_tuple()
                });
            match reused {
                Some(old) => {
                    self[old] = cmd;
                    ids.push(old);
                }
                None => {
                    ids.push(CmdId(self.commands.len()));
                    self.commands.push(cmd);
                }
            }
        }
        log::debug!(
            "Evaluated {} dynamic subcommands of '{}'.",
            ids.len(),
            self.dotted_path(id)
        );
        if let Some(source) = self[id].dynamic_commands.as_mut() {
            source.cached = Some(ids.clone());
            source.stale = false;
        }
        ids
    }

    /// Same as [`Self::dynamic_subcommands`] for flags.
    pub(crate) fn dynamic_flags(&mut self, id: CmdId) -> Vec<FlagId> {
        let Some(source) = self[id].dynamic_flags.clone() else {
            return Vec::new();
        };
        if !source.stale
            && let Some(cached) = source.cached
        {
            return cached;
        }

        let produced = (source.producer)(&self[id]);
        let previous = source.cached.unwrap_or_default();
        let mut ids = Vec::with_capacity(produced.len());
        for mut flag in produced {
            flag.owner = Some(id);
            let reused = previous
                .iter()
                .copied()
                .find(|&old| {
                    !ids.contains(&old) && self[old].base.title_tuple() == flag.base.title_tuple()
                });
            match reused {
                Some(old) => {
                    self[old] = flag;
                    ids.push(old);
                }
                None => {
                    ids.push(FlagId(self.flags.len()));
                    self.flags.push(flag);
                }
            }
        }
        log::debug!(
            "Evaluated {} dynamic flags of '{}'.",
            ids.len(),
            self.dotted_path(id)
        );
        if let Some(source) = self[id].dynamic_flags.as_mut() {
            source.cached = Some(ids.clone());
            source.stale = false;
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (CommandTree, CmdId, CmdId) {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        let server = tree.add_subcommand(root, Command::new("server")).unwrap();
        let start = tree
            .add_subcommand(server, Command::new("start").with_aliases(&["run"]))
            .unwrap();
        tree.add_flag(root, Flag::new("verbose", false).with_short("v"));
        tree.add_flag(start, Flag::new("port", Value::U16(8080)).with_short("p"));
        (tree, server, start)
    }

    #[test]
    fn test_add_stamps_ownership_and_root() {
        let (tree, server, start) = sample();
        assert_eq!(tree[start].owner(), Some(server));
        assert_eq!(tree[start].root(), tree.root());
        assert_eq!(tree[server].root(), tree.root());
    }

    #[test]
    fn test_duplicate_subcommand_is_ignored() {
        let (mut tree, _, _) = sample();
        let root = tree.root();
        assert!(tree.add_subcommand(root, Command::new("server")).is_none());
        assert_eq!(tree[root].children().len(), 1);
    }

    #[test]
    fn test_add_invalidates_parent_xref() {
        let (mut tree, server, _) = sample();
        tree.ensure_xref();
        assert!(tree.xref(server).is_some());
        tree.add_subcommand(server, Command::new("stop"));
        assert!(tree.xref(server).is_none());
        tree.ensure_xref();
        assert!(tree.xref(server).unwrap().long_commands.contains_key("stop"));
    }

    #[test]
    fn test_paths() {
        let (tree, _, start) = sample();
        assert_eq!(tree.dotted_path(tree.root()), "");
        assert_eq!(tree.dotted_path(start), "server.start");
        let port = tree.find_flag_by_path("server.start.port").unwrap();
        assert_eq!(tree.flag_path(port), "server.start.port");
        let verbose = tree.find_flag_by_path("verbose").unwrap();
        assert_eq!(tree.flag_path(verbose), "verbose");
        assert_eq!(tree.find_command_by_path("server.run"), Some(start));
        assert_eq!(tree.find_command_by_path("server.nope"), None);
    }

    #[test]
    fn test_find_flag_in_chain_climbs_ancestors() {
        let (tree, _, start) = sample();
        let verbose = tree.find_flag_in_chain(start, "v").unwrap();
        assert_eq!(tree[verbose].long(), "verbose");
        assert!(tree.find_flag_in_chain(tree.root(), "port").is_none());
    }

    #[test]
    fn test_walk_is_depth_first_in_order() {
        let (mut tree, server, _) = sample();
        let root = tree.root();
        tree.add_subcommand(root, Command::new("client"));
        tree.add_subcommand(server, Command::new("stop"));
        let mut seen = Vec::new();
        tree.walk(root, &mut |id, depth| seen.push((tree[id].long().to_string(), depth)));
        let names: Vec<(&str, usize)> = seen.iter().map(|(n, d)| (n.as_str(), *d)).collect();
        assert_eq!(
            names,
            vec![("app", 0), ("server", 1), ("start", 2), ("stop", 2), ("client", 1)]
        );
    }

    #[test]
    fn test_leaf_and_dynamic_subcommands() {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        let plugins = tree
            .add_subcommand(
                root,
                Command::new("plugin").with_dynamic_subcommands(EvalPolicy::Once, |_| {
                    vec![Command::new("fmt"), Command::new("lint")]
                }),
            )
            .unwrap();
        assert!(!tree.is_leaf(plugins));

        let first = tree.dynamic_subcommands(plugins);
        let second = tree.dynamic_subcommands(plugins);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(tree.find_command_by_path("plugin.lint"), first.get(1).copied());
    }

    #[test]
    fn test_every_time_flags_run_once_per_parse_and_reuse_slots() {
        use std::cell::Cell;
        use std::rc::Rc;

        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let mut tree = CommandTree::new(Command::new("x").with_dynamic_flags(
            EvalPolicy::EveryTime,
            move |_| {
                counter.set(counter.get() + 1);
                vec![Flag::new("tag", ""), Flag::new("mode", "")]
            },
        ));
        let root = tree.root();

        let first = tree.dynamic_flags(root);
        assert_eq!(tree.dynamic_flags(root), first);
        assert_eq!(runs.get(), 1);

        let arena = tree.flag_ids().count();
        for _ in 0..5 {
            tree.begin_parse();
            assert_eq!(tree.dynamic_flags(root), first);
        }
        assert_eq!(runs.get(), 6);
        assert_eq!(tree.flag_ids().count(), arena);
    }

    #[test]
    fn test_ensure_tree_restamps_links() {
        let (mut tree, server, start) = sample();
        tree[start].owner = None;
        tree.ensure_tree();
        assert_eq!(tree[start].owner(), Some(server));
    }
}
