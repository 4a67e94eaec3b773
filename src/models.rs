// src/models.rs

//! Declarative nodes of a command tree: [`Command`] and [`Flag`], their shared
//! [`BaseOpt`] identity, and the hook types attached to them.

use crate::core::dispatcher::Invocation;
use crate::core::errors::EngineError;
use crate::core::value::Value;
use crate::core::xref::CommandXref;
use std::fmt;
use std::rc::Rc;

// --- ARENA IDS ---

/// Index of a command inside a [`crate::core::tree::CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CmdId(pub(crate) usize);

/// Index of a flag inside a [`crate::core::tree::CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlagId(pub(crate) usize);

/// Identity of any tree node, used to key per-session match records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    /// A command node.
    Command(CmdId),
    /// A flag node.
    Flag(FlagId),
}

// --- HOOKS ---

/// Result of a hook that may decline to handle an event.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<T> {
    /// The hook handled the event and produced `T`.
    Handled(T),
    /// The hook declined; the engine applies its default behavior.
    Fallback,
}

/// A shared callback. Cloning shares the underlying closure.
pub struct Hook<F: ?Sized>(pub(crate) Rc<F>);

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<hook>")
    }
}

/// What a flag hook sees when it fires.
#[derive(Debug)]
pub struct FlagEvent<'a> {
    /// The flag being assigned.
    pub flag: &'a Flag,
    /// The title the user typed for it.
    pub hit: &'a str,
    /// The value before assignment.
    pub old: &'a Value,
    /// The value about to be (or just) assigned.
    pub new: &'a Value,
}

/// A command handler, pre-action or post-action.
pub type Action = Hook<dyn Fn(&Invocation<'_>) -> anyhow::Result<()>>;
/// Fired when a command is matched; receives the hit title.
pub type CommandMatchedHook = Hook<dyn Fn(&Command, &str) -> Result<(), EngineError>>;
/// Turns raw text into a flag value before the coercion engine is tried.
pub type ParseValueHook = Hook<dyn Fn(&Flag, &str) -> Result<HookOutcome<Value>, EngineError>>;
/// Fired around flag assignment.
pub type FlagHook = Hook<dyn Fn(&FlagEvent<'_>) -> Result<HookOutcome<()>, EngineError>>;

/// When a dynamic producer is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalPolicy {
    /// Evaluate on first use and memoize the result.
    #[default]
    Once,
    /// Evaluate again on the first use of every parse.
    EveryTime,
}

/// A producer of extra children evaluated at match time.
pub struct DynamicSource<T, I> {
    /// Re-evaluation policy.
    pub policy: EvalPolicy,
    pub(crate) producer: Rc<dyn Fn(&Command) -> Vec<T>>,
    pub(crate) cached: Option<Vec<I>>,
    /// Set when a new parse starts; the next lookup re-runs the producer.
    pub(crate) stale: bool,
}

impl<T, I: Clone> Clone for DynamicSource<T, I> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            producer: Rc::clone(&self.producer),
            cached: self.cached.clone(),
            stale: self.stale,
        }
    }
}

impl<T, I: fmt::Debug> fmt::Debug for DynamicSource<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSource")
            .field("policy", &self.policy)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

// --- BUILT-INS ---

/// Engine-provided behaviors that can be requested from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Print the help screen.
    Help,
    /// Print the version line.
    Version,
    /// Print build information.
    BuildInfo,
    /// Print the command tree.
    Tree,
    /// Dump the parse session.
    Debug,
}

impl Builtin {
    /// Fallback order when no handler is present.
    pub const PRIORITY: [Self; 5] = [
        Self::Help,
        Self::Version,
        Self::BuildInfo,
        Self::Tree,
        Self::Debug,
    ];

    /// The bit this built-in occupies in a session mask.
    pub fn bit(self) -> u32 {
        match self {
            Self::Help => 1,
            Self::Version => 1 << 1,
            Self::BuildInfo => 1 << 2,
            Self::Tree => 1 << 3,
            Self::Debug => 1 << 4,
        }
    }
}

// --- NODES ---

/// Identity and descriptive metadata shared by commands and flags.
#[derive(Debug, Clone, Default)]
pub struct BaseOpt {
    pub long: String,
    pub short: String,
    pub aliases: Vec<String>,
    /// Internal name; defaults to `long`.
    pub name: String,
    pub description: String,
    pub long_description: String,
    pub examples: String,
    pub group: String,
    /// Set to the replacement hint when the node is deprecated.
    pub deprecated: Option<String>,
    pub hidden: bool,
    pub vendor_hidden: bool,
    pub(crate) hit_title: String,
    pub(crate) hit_times: u32,
}

impl BaseOpt {
    fn titled(long: &str) -> Self {
        Self {
            long: long.to_string(),
            name: long.to_string(),
            ..Self::default()
        }
    }

    /// `(long, short, name)`, the tuple used to de-duplicate siblings.
    pub fn title_tuple(&self) -> (&str, &str, &str) {
        (&self.long, &self.short, &self.name)
    }

    /// Long title, short title and aliases, skipping empty ones.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.long.as_str())
            .chain(std::iter::once(self.short.as_str()))
            .chain(self.aliases.iter().map(String::as_str))
            .filter(|t| !t.is_empty())
    }

    /// True when `title` names this node.
    pub fn has_title(&self, title: &str) -> bool {
        self.titles().any(|t| t == title)
    }

    /// The title typed at the last hit.
    pub fn hit_title(&self) -> &str {
        &self.hit_title
    }

    /// How many times the node was hit in the current session.
    pub fn hit_times(&self) -> u32 {
        self.hit_times
    }

    pub(crate) fn reset_hits(&mut self) {
        self.hit_title.clear();
        self.hit_times = 0;
    }
}

/// A command node.
#[derive(Debug, Clone)]
pub struct Command {
    pub base: BaseOpt,

    // Hierarchy, stamped by the tree.
    pub(crate) owner: Option<CmdId>,
    pub(crate) root: CmdId,
    pub(crate) children: Vec<CmdId>,
    pub(crate) flags: Vec<FlagId>,

    // Behavior
    pub(crate) pre_actions: Vec<Action>,
    pub(crate) post_actions: Vec<Action>,
    pub(crate) action: Option<Action>,
    pub(crate) on_matched: Vec<CommandMatchedHook>,
    pub redirect_to: Option<String>,
    pub(crate) dynamic_commands: Option<DynamicSource<Command, CmdId>>,
    pub(crate) dynamic_flags: Option<DynamicSource<Flag, FlagId>>,

    // Lookup indices, built lazily.
    pub(crate) xref: Option<CommandXref>,
}

impl Command {
    /// A command titled `long`.
    pub fn new(long: &str) -> Self {
        Self {
            base: BaseOpt::titled(long),
            owner: None,
            root: CmdId(0),
            children: Vec::new(),
            flags: Vec::new(),
            pre_actions: Vec::new(),
            post_actions: Vec::new(),
            action: None,
            on_matched: Vec::new(),
            redirect_to: None,
            dynamic_commands: None,
            dynamic_flags: None,
            xref: None,
        }
    }

    pub fn with_short(mut self, short: &str) -> Self {
        self.base.short = short.to_string();
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.base.aliases = aliases.iter().map(|a| (*a).to_string()).collect();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.base.name = name.to_string();
        self
    }

    pub fn with_description(mut self, text: &str) -> Self {
        self.base.description = text.to_string();
        self
    }

    pub fn with_long_description(mut self, text: &str) -> Self {
        self.base.long_description = text.to_string();
        self
    }

    pub fn with_examples(mut self, text: &str) -> Self {
        self.base.examples = text.to_string();
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.base.group = group.to_string();
        self
    }

    /// Marks the command deprecated; `hint` names what to use instead.
    pub fn with_deprecated(mut self, hint: &str) -> Self {
        self.base.deprecated = Some(hint.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.base.hidden = true;
        self
    }

    pub fn vendor_hidden(mut self) -> Self {
        self.base.vendor_hidden = true;
        self
    }

    /// Sets the invoke handler.
    pub fn with_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.action = Some(Hook(Rc::new(f)));
        self
    }

    pub fn with_pre_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.pre_actions.push(Hook(Rc::new(f)));
        self
    }

    pub fn with_post_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.post_actions.push(Hook(Rc::new(f)));
        self
    }

    pub fn with_on_matched<F>(mut self, f: F) -> Self
    where
        F: Fn(&Self, &str) -> Result<(), EngineError> + 'static,
    {
        self.on_matched.push(Hook(Rc::new(f)));
        self
    }

    /// Forwards matches of this command to the command at `dotted_path`.
    pub fn with_redirect_to(mut self, dotted_path: &str) -> Self {
        self.redirect_to = Some(dotted_path.to_string());
        self
    }

    /// Supplies extra subcommands at match time.
    pub fn with_dynamic_subcommands<F>(mut self, policy: EvalPolicy, f: F) -> Self
    where
        F: Fn(&Self) -> Vec<Self> + 'static,
    {
        self.dynamic_commands = Some(DynamicSource {
            policy,
            producer: Rc::new(f),
            cached: None,
            stale: false,
        });
        self
    }

    /// Supplies extra flags at match time.
    pub fn with_dynamic_flags<F>(mut self, policy: EvalPolicy, f: F) -> Self
    where
        F: Fn(&Self) -> Vec<Flag> + 'static,
    {
        self.dynamic_flags = Some(DynamicSource {
            policy,
            producer: Rc::new(f),
            cached: None,
            stale: false,
        });
        self
    }

    pub fn long(&self) -> &str {
        &self.base.long
    }

    pub fn owner(&self) -> Option<CmdId> {
        self.owner
    }

    pub fn root(&self) -> CmdId {
        self.root
    }

    pub fn children(&self) -> &[CmdId] {
        &self.children
    }

    pub fn flags(&self) -> &[FlagId] {
        &self.flags
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn has_dynamic_subcommands(&self) -> bool {
        self.dynamic_commands.is_some()
    }
}

/// A flag node. Its `default_value` variant is the schema its text is parsed
/// against.
#[derive(Debug, Clone)]
pub struct Flag {
    pub base: BaseOpt,
    pub(crate) owner: Option<CmdId>,

    // Values
    pub default_value: Value,
    pub(crate) value: Value,
    pub place_holder: String,
    pub env_vars: Vec<String>,
    /// Env var naming an editor, or the password sentinel.
    pub external_editor: Option<String>,
    pub valid_args: Vec<String>,
    pub range: Option<(f64, f64)>,

    // Behavior
    pub head_like: bool,
    pub required: bool,
    pub just_once: bool,
    pub toggle_group: Option<String>,
    pub mutual_exclusives: Vec<String>,
    pub prerequisites: Vec<String>,
    pub circuit_break: bool,
    pub dbl_tilde_only: bool,

    // Hooks
    pub(crate) on_parse_value: Option<ParseValueHook>,
    pub(crate) on_matched: Option<FlagHook>,
    pub(crate) on_changing: Option<FlagHook>,
    pub(crate) on_changed: Option<FlagHook>,
    pub(crate) on_set: Option<FlagHook>,

    pub(crate) builtin: Option<Builtin>,
}

impl Flag {
    /// A flag titled `long` whose values are shaped like `default`.
    pub fn new(long: &str, default: impl Into<Value>) -> Self {
        let default = default.into();
        Self {
            base: BaseOpt::titled(long),
            owner: None,
            value: default.clone(),
            default_value: default,
            place_holder: String::new(),
            env_vars: Vec::new(),
            external_editor: None,
            valid_args: Vec::new(),
            range: None,
            head_like: false,
            required: false,
            just_once: false,
            toggle_group: None,
            mutual_exclusives: Vec::new(),
            prerequisites: Vec::new(),
            circuit_break: false,
            dbl_tilde_only: false,
            on_parse_value: None,
            on_matched: None,
            on_changing: None,
            on_changed: None,
            on_set: None,
            builtin: None,
        }
    }

    pub fn with_short(mut self, short: &str) -> Self {
        self.base.short = short.to_string();
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.base.aliases = aliases.iter().map(|a| (*a).to_string()).collect();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.base.name = name.to_string();
        self
    }

    pub fn with_description(mut self, text: &str) -> Self {
        self.base.description = text.to_string();
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.base.group = group.to_string();
        self
    }

    pub fn with_deprecated(mut self, hint: &str) -> Self {
        self.base.deprecated = Some(hint.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.base.hidden = true;
        self
    }

    pub fn with_placeholder(mut self, text: &str) -> Self {
        self.place_holder = text.to_string();
        self
    }

    pub fn with_env_vars(mut self, vars: &[&str]) -> Self {
        self.env_vars = vars.iter().map(|v| (*v).to_string()).collect();
        self
    }

    /// Reads the value interactively. `source` is an env var naming the
    /// editor, or [`crate::constants::PASSWORD_HELPER`] for a hidden prompt.
    pub fn with_external_editor(mut self, source: &str) -> Self {
        self.external_editor = Some(source.to_string());
        self
    }

    pub fn with_valid_args(mut self, args: &[&str]) -> Self {
        self.valid_args = args.iter().map(|a| (*a).to_string()).collect();
        self
    }

    /// Constrains numeric values to `min..=max`.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Lets `-<number>` assign the number to this flag.
    pub fn head_like(mut self) -> Self {
        self.head_like = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn just_once(mut self) -> Self {
        self.just_once = true;
        self
    }

    pub fn with_toggle_group(mut self, group: &str) -> Self {
        self.toggle_group = Some(group.to_string());
        self
    }

    pub fn with_mutual_exclusives(mut self, titles: &[&str]) -> Self {
        self.mutual_exclusives = titles.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn with_prerequisites(mut self, titles: &[&str]) -> Self {
        self.prerequisites = titles.iter().map(|t| (*t).to_string()).collect();
        self
    }

    /// Stops parsing right after this flag is matched.
    pub fn circuit_break(mut self) -> Self {
        self.circuit_break = true;
        self
    }

    /// Only matches in `~~long` form.
    pub fn dbl_tilde_only(mut self) -> Self {
        self.dbl_tilde_only = true;
        self
    }

    pub fn with_on_parse_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Self, &str) -> Result<HookOutcome<Value>, EngineError> + 'static,
    {
        self.on_parse_value = Some(Hook(Rc::new(f)));
        self
    }

    pub fn with_on_matched<F>(mut self, f: F) -> Self
    where
        F: Fn(&FlagEvent<'_>) -> Result<HookOutcome<()>, EngineError> + 'static,
    {
        self.on_matched = Some(Hook(Rc::new(f)));
        self
    }

    pub fn with_on_changing<F>(mut self, f: F) -> Self
    where
        F: Fn(&FlagEvent<'_>) -> Result<HookOutcome<()>, EngineError> + 'static,
    {
        self.on_changing = Some(Hook(Rc::new(f)));
        self
    }

    pub fn with_on_changed<F>(mut self, f: F) -> Self
    where
        F: Fn(&FlagEvent<'_>) -> Result<HookOutcome<()>, EngineError> + 'static,
    {
        self.on_changed = Some(Hook(Rc::new(f)));
        self
    }

    pub fn with_on_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&FlagEvent<'_>) -> Result<HookOutcome<()>, EngineError> + 'static,
    {
        self.on_set = Some(Hook(Rc::new(f)));
        self
    }

    pub(crate) fn as_builtin(mut self, builtin: Builtin) -> Self {
        self.builtin = Some(builtin);
        self
    }

    pub fn long(&self) -> &str {
        &self.base.long
    }

    pub fn owner(&self) -> Option<CmdId> {
        self.owner
    }

    /// The current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn builtin(&self) -> Option<Builtin> {
        self.builtin
    }

    /// True when the default value is a boolean.
    pub fn is_bool(&self) -> bool {
        matches!(self.default_value, Value::Bool(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_skip_empty_entries() {
        let flag = Flag::new("verbose", false).with_aliases(&["loud", ""]);
        let titles: Vec<&str> = flag.base.titles().collect();
        assert_eq!(titles, vec!["verbose", "loud"]);
        assert!(flag.base.has_title("loud"));
        assert!(!flag.base.has_title(""));
    }

    #[test]
    fn test_new_flag_starts_at_default() {
        let flag = Flag::new("count", Value::I32(3));
        assert_eq!(flag.value(), &Value::I32(3));
        assert_eq!(flag.base.name, "count");
        assert!(!flag.is_bool());
    }

    #[test]
    fn test_builtin_bits_are_distinct() {
        let mut mask = 0;
        for b in Builtin::PRIORITY {
            assert_eq!(mask & b.bit(), 0);
            mask |= b.bit();
        }
    }
}
