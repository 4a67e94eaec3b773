// src/core/dispatcher.rs

//! # Action Dispatcher
//!
//! Runs after a successful parse:
//!
//! 1. required flags are checked from the resolved command up to the root
//!    (skipped when a built-in such as `--help` stopped the parse);
//! 2. global then command-local pre-actions run; an error ends dispatch
//!    before any handler or post-action;
//! 3. the handler runs, or the requested built-in, or the help screen;
//! 4. command-local then global post-actions always run from a
//!    `scopeguard`, even when step 3 failed.
//!
//! Errors from steps 3 and 4 are collected and surfaced once.

use crate::core::config_loader::EngineConfig;
use crate::core::errors::{EngineError, EngineResult, ErrorCollector};
use crate::core::session::ParseContext;
use crate::core::store::Store;
use crate::core::tree::CommandTree;
use crate::core::value::Value;
use crate::models::{Action, Builtin, CmdId, Command};
use std::cell::RefCell;

/// What a handler, pre-action or post-action sees.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub tree: &'a CommandTree,
    /// The resolved command.
    pub command: CmdId,
    pub store: &'a Store,
    pub parse: &'a ParseContext,
    pub config: &'a EngineConfig,
}

impl<'a> Invocation<'a> {
    /// The resolved command node.
    pub fn node(&self) -> &'a Command {
        &self.tree[self.command]
    }

    /// Positional arguments.
    pub fn args(&self) -> &'a [String] {
        self.parse.positional()
    }

    /// Current value of the flag titled `title` on the command chain.
    pub fn value(&self, title: &str) -> Option<&'a Value> {
        self.tree
            .find_flag_in_chain(self.command, title)
            .map(|f| self.tree[f].value())
    }

    /// True when the flag titled `title` was given or seeded from env.
    pub fn is_set(&self, title: &str) -> bool {
        self.tree
            .find_flag_in_chain(self.command, title)
            .is_some_and(|f| self.parse.is_set(f))
    }

    pub fn get_bool(&self, title: &str) -> bool {
        self.value(title).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_str(&self, title: &str) -> Option<&'a str> {
        self.value(title).and_then(Value::as_str)
    }
}

/// The action sources dispatch draws from.
#[derive(Debug)]
pub(crate) struct Actions<'a> {
    pub(crate) global_pre: &'a [Action],
    pub(crate) global_post: &'a [Action],
    pub(crate) builtins: &'a [(Builtin, Action)],
}

/// Validates and runs the parsed invocation.
pub(crate) fn dispatch(inv: &Invocation<'_>, actions: &Actions<'_>) -> EngineResult<()> {
    if inv.parse.stopped_by_builtin() {
        log::debug!("Parse stopped by a built-in; skipping required checks.");
    } else {
        check_required(inv)?;
    }

    let cmd = inv.node();
    for action in actions.global_pre.iter().chain(&cmd.pre_actions) {
        if let Err(err) = (action.0)(inv) {
            let err = EngineError::from_handler(err);
            if err.is_signal() {
                log::debug!("Pre-action requested {}; nothing else runs.", err);
                return Ok(());
            }
            return Err(err);
        }
    }

    let collector = RefCell::new(ErrorCollector::default());
    {
        let _post = scopeguard::guard((), |()| {
            for action in cmd.post_actions.iter().chain(actions.global_post) {
                if let Err(err) = (action.0)(inv) {
                    log::error!("Post-action of '{}' failed: {}", inv.tree.dotted_path(inv.command), err);
                    collector.borrow_mut().push(EngineError::from_handler(err));
                }
            }
        });

        if let Err(err) = run_main(inv, actions) {
            collector.borrow_mut().push(err);
        }
    }
    collector.into_inner().into_result()
}

/// Fails on the first required flag, from the resolved command upward, that
/// was neither given nor seeded.
pub(crate) fn check_required(inv: &Invocation<'_>) -> EngineResult<()> {
    for cmd in inv.tree.ancestors(inv.command) {
        for &fid in inv.tree[cmd].flags() {
            let flag = &inv.tree[fid];
            if flag.required && !inv.parse.is_set(fid) {
                return Err(EngineError::RequiredFlagMissing {
                    flag: flag.long().to_string(),
                    command: inv.tree.dotted_path(cmd),
                });
            }
        }
    }
    Ok(())
}

fn run_main(inv: &Invocation<'_>, actions: &Actions<'_>) -> EngineResult<()> {
    let mask = inv.parse.builtins();

    let ran = if inv.parse.stopped_by_builtin()
        && let Some(builtin) = mask.first()
    {
        run_builtin(builtin, inv, actions)?;
        Some(builtin)
    } else if let Some(action) = &inv.node().action {
        match (action.0)(inv).map_err(EngineError::from_handler) {
            Err(EngineError::ShouldFallback) => {
                log::debug!("Handler asked for the default behavior.");
                let builtin = mask.first().unwrap_or(Builtin::Help);
                run_builtin(builtin, inv, actions)?;
                Some(builtin)
            }
            Err(err) => return Err(err),
            Ok(()) => None,
        }
    } else {
        let builtin = mask.first().unwrap_or(Builtin::Help);
        run_builtin(builtin, inv, actions)?;
        Some(builtin)
    };

    // `~~debug` does not stop parsing; it reports after whatever ran.
    if mask.contains(Builtin::Debug) && ran != Some(Builtin::Debug) {
        run_builtin(Builtin::Debug, inv, actions)?;
    }
    Ok(())
}

fn run_builtin(builtin: Builtin, inv: &Invocation<'_>, actions: &Actions<'_>) -> EngineResult<()> {
    let Some((_, action)) = actions.builtins.iter().find(|(b, _)| *b == builtin) else {
        log::warn!("No action registered for built-in {:?}.", builtin);
        return Ok(());
    };
    log::debug!("Running built-in {:?}.", builtin);
    (action.0)(inv).map_err(EngineError::from_handler)
}
