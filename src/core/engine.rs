// src/core/engine.rs

//! The engine object: owns the tree, config, store, built-in registry and the
//! interactive input helper, and exposes [`Engine::parse`] and [`Engine::run`].

use crate::cli::builtins;
use crate::core::coerce;
use crate::core::config_loader::EngineConfig;
use crate::core::dispatcher::{self, Actions, Invocation};
use crate::core::errors::{EngineError, EngineResult};
use crate::core::matcher::Session;
use crate::core::session::ParseContext;
use crate::core::store::Store;
use crate::core::tree::CommandTree;
use crate::core::value::Value;
use crate::constants::NO_COLOR_TITLE;
use crate::models::{Action, Builtin, Hook};
use crate::system::input::{InputHelper, TerminalInput};
use std::fmt;
use std::rc::Rc;

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// A command-line resolution engine for one command tree.
pub struct Engine {
    tree: CommandTree,
    config: EngineConfig,
    store: Store,
    global_pre: Vec<Action>,
    global_post: Vec<Action>,
    builtins: Vec<(Builtin, Action)>,
    input: Box<dyn InputHelper>,
    env: EnvLookup,
    injected: bool,
    last: Option<ParseContext>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("injected", &self.injected)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// An engine over `tree`, with the default built-in actions and terminal input.
    pub fn new(tree: CommandTree, config: EngineConfig) -> Self {
        Self {
            tree,
            store: Store::new(&config.store_prefix),
            config,
            global_pre: Vec::new(),
            global_post: Vec::new(),
            builtins: builtins::default_actions(),
            input: Box::new(TerminalInput),
            env: Box::new(|name| std::env::var(name).ok()),
            injected: false,
            last: None,
        }
    }

    /// Replaces the interactive input helper.
    pub fn with_input(mut self, input: Box<dyn InputHelper>) -> Self {
        self.input = input;
        self
    }

    /// Replaces the environment lookup used for `env_vars` and editors.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Mutable access for late additions; lookup maps are rebuilt on the next parse.
    pub fn tree_mut(&mut self) -> &mut CommandTree {
        &mut self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Values written by the last parse, keyed by dotted flag path.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The context of the most recent parse.
    pub fn last_parse(&self) -> Option<&ParseContext> {
        self.last.as_ref()
    }

    /// Runs before every command's own pre-actions.
    pub fn add_global_pre_action<F>(&mut self, f: F)
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.global_pre.push(Hook(Rc::new(f)));
    }

    /// Runs after every command's own post-actions, even when the handler fails.
    pub fn add_global_post_action<F>(&mut self, f: F)
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.global_post.push(Hook(Rc::new(f)));
    }

    /// Registers (or replaces) the action run for `builtin`.
    pub fn register_builtin<F>(&mut self, builtin: Builtin, f: F)
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.builtins.retain(|(b, _)| *b != builtin);
        self.builtins.push((builtin, Hook(Rc::new(f))));
    }

    fn prepare(&mut self) {
        if self.config.builtins && !self.injected {
            builtins::inject(&mut self.tree);
            self.injected = true;
        }
        self.tree.ensure_tree();
        self.tree.ensure_xref();
    }

    /// Resets hit counters, values, toggle groups and stale dynamic sources so
    /// every parse starts clean.
    fn reset(&mut self) {
        for id in self.tree.command_ids() {
            self.tree[id].base.reset_hits();
        }
        for id in self.tree.flag_ids() {
            let flag = &mut self.tree[id];
            flag.base.reset_hits();
            flag.value = flag.default_value.clone();
        }
        self.tree.begin_parse();
        self.store.clear();
    }

    /// Writes every default to the store, then lets each flag's first present
    /// env var override it.
    fn preseed_from_env(&mut self, ctx: &mut ParseContext) -> EngineResult<()> {
        for id in self.tree.flag_ids() {
            let path = self.tree.flag_path(id);
            let flag = &self.tree[id];
            let default = flag.default_value.clone();

            let found = flag
                .env_vars
                .iter()
                .find_map(|name| (self.env)(name).map(|v| (name.clone(), v)));
            let value = match found {
                Some((name, text)) => {
                    let parsed = match &default {
                        Value::Bool(_) => Value::Bool(coerce::parse_bool(&text, true)),
                        Value::String(_) => Value::String(text),
                        shape => coerce::parse(&text, shape).map_err(|source| {
                            EngineError::InvalidValue {
                                flag: flag.long().to_string(),
                                source,
                            }
                        })?,
                    };
                    log::debug!("Flag '{}' seeded from ${}.", path, name);
                    ctx.env_seeded.insert(id);
                    self.tree[id].value = parsed.clone();
                    parsed
                }
                None => default,
            };
            self.store.set(&path, value);
        }
        Ok(())
    }

    /// Resolves `argv` (program name first) without running any action.
    pub fn parse<I, S>(&mut self, argv: I) -> EngineResult<&ParseContext>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = argv.into_iter().skip(1).map(Into::into).collect();
        log::debug!("Parsing {:?}", args);

        self.prepare();
        self.reset();
        self.last = None;

        let mut ctx = ParseContext::new(self.tree.root());
        self.preseed_from_env(&mut ctx)?;

        {
            let mut session = Session {
                tree: &mut self.tree,
                ctx: &mut ctx,
                store: &mut self.store,
                config: &self.config,
                input: self.input.as_ref(),
                env: self.env.as_ref(),
            };
            session.scan(&args)?;
        }

        if self.config.no_color || self.store.get_bool(NO_COLOR_TITLE) {
            colored::control::set_override(false);
        }
        Ok(self.last.insert(ctx))
    }

    /// Parses `argv` and dispatches the resolved command.
    pub fn run<I, S>(&mut self, argv: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.config.no_color {
            colored::control::set_override(false);
        }
        self.parse(argv)?;
        let Some(parse) = self.last.as_ref() else {
            return Ok(());
        };

        let inv = Invocation {
            tree: &self.tree,
            command: parse.command(),
            store: &self.store,
            parse,
            config: &self.config,
        };
        let actions = Actions {
            global_pre: &self.global_pre,
            global_post: &self.global_post,
            builtins: &self.builtins,
        };
        dispatcher::dispatch(&inv, &actions)
    }
}
