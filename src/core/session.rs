// src/core/session.rs

//! Per-parse state. A fresh [`ParseContext`] is created for every `parse`/`run`
//! and is never persisted.

use crate::core::value::Value;
use crate::models::{Builtin, CmdId, FlagId, NodeRef};
use std::collections::{HashMap, HashSet};

/// What happened to one node during a parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchState {
    /// Matched through a short title.
    pub short: bool,
    /// Matched in `~~long` form.
    pub dbl_tilde: bool,
    /// Matched in `+x` form.
    pub plus: bool,
    /// The title typed.
    pub hit_str: String,
    /// How many times it was hit.
    pub hit_times: u32,
    /// The coerced value, for flags.
    pub value: Option<Value>,
}

/// A flag that can only go from unset to set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latch(bool);

impl Latch {
    /// Sets the latch; returns true only on the first call.
    pub fn set_once(&mut self) -> bool {
        let first = !self.0;
        self.0 = true;
        first
    }

    pub fn is_set(self) -> bool {
        self.0
    }
}

/// Bit set of built-ins requested during a parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinMask(u32);

impl BuiltinMask {
    pub fn insert(&mut self, builtin: Builtin) {
        self.0 |= builtin.bit();
    }

    pub fn contains(self, builtin: Builtin) -> bool {
        self.0 & builtin.bit() != 0
    }

    /// The highest-priority requested built-in.
    pub fn first(self) -> Option<Builtin> {
        Builtin::PRIORITY.into_iter().find(|b| self.contains(*b))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// The outcome of one parse.
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub(crate) command: CmdId,
    pub(crate) matched_commands: Vec<CmdId>,
    pub(crate) matched_flags: Vec<FlagId>,
    pub(crate) positional: Vec<String>,
    pub(crate) states: HashMap<NodeRef, MatchState>,
    pub(crate) unknown_flags: Vec<String>,
    pub(crate) anomalies: Vec<String>,
    pub(crate) mask: BuiltinMask,
    pub(crate) pass_through: Latch,
    pub(crate) stray: Latch,
    pub(crate) unmatched: Latch,
    pub(crate) should_stop: bool,
    pub(crate) stopped_by_builtin: bool,
    pub(crate) env_seeded: HashSet<FlagId>,
}

impl ParseContext {
    pub(crate) fn new(root: CmdId) -> Self {
        Self {
            command: root,
            matched_commands: Vec::new(),
            matched_flags: Vec::new(),
            positional: Vec::new(),
            states: HashMap::new(),
            unknown_flags: Vec::new(),
            anomalies: Vec::new(),
            mask: BuiltinMask::default(),
            pass_through: Latch::default(),
            stray: Latch::default(),
            unmatched: Latch::default(),
            should_stop: false,
            stopped_by_builtin: false,
            env_seeded: HashSet::new(),
        }
    }

    /// The command the parse resolved to.
    pub fn command(&self) -> CmdId {
        self.command
    }

    /// Commands matched, in order.
    pub fn matched_commands(&self) -> &[CmdId] {
        &self.matched_commands
    }

    /// Flags matched, in hit order (repeats included).
    pub fn matched_flags(&self) -> &[FlagId] {
        &self.matched_flags
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn state(&self, node: NodeRef) -> Option<&MatchState> {
        self.states.get(&node)
    }

    pub fn flag_state(&self, flag: FlagId) -> Option<&MatchState> {
        self.state(NodeRef::Flag(flag))
    }

    pub fn states(&self) -> impl Iterator<Item = (&NodeRef, &MatchState)> {
        self.states.iter()
    }

    /// Flag tokens that matched nothing and became positional.
    pub fn unknown_flags(&self) -> &[String] {
        &self.unknown_flags
    }

    /// Tokens such as a lone `-` that were skipped.
    pub fn anomalies(&self) -> &[String] {
        &self.anomalies
    }

    pub fn builtins(&self) -> BuiltinMask {
        self.mask
    }

    pub fn pass_through(&self) -> bool {
        self.pass_through.is_set()
    }

    pub fn stopped_by_builtin(&self) -> bool {
        self.stopped_by_builtin
    }

    /// True when the flag was hit on the command line or seeded from env.
    pub fn is_set(&self, flag: FlagId) -> bool {
        self.env_seeded.contains(&flag)
            || self
                .flag_state(flag)
                .is_some_and(|s| s.hit_times > 0)
    }

    pub(crate) fn record(&mut self, node: NodeRef) -> &mut MatchState {
        self.states.entry(node).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_sets_once() {
        let mut latch = Latch::default();
        assert!(!latch.is_set());
        assert!(latch.set_once());
        assert!(!latch.set_once());
        assert!(latch.is_set());
    }

    #[test]
    fn test_mask_priority() {
        let mut mask = BuiltinMask::default();
        assert_eq!(mask.first(), None);
        mask.insert(Builtin::Tree);
        mask.insert(Builtin::Version);
        assert_eq!(mask.first(), Some(Builtin::Version));
        assert!(mask.contains(Builtin::Tree));
        assert!(!mask.contains(Builtin::Help));
    }

    #[test]
    fn test_is_set_counts_env_seeded_flags() {
        let mut ctx = ParseContext::new(CmdId(0));
        assert!(!ctx.is_set(FlagId(3)));
        ctx.env_seeded.insert(FlagId(3));
        assert!(ctx.is_set(FlagId(3)));
        ctx.record(NodeRef::Flag(FlagId(4))).hit_times = 1;
        assert!(ctx.is_set(FlagId(4)));
    }
}
