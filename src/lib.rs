//! # argot
//!
//! A command-line argument resolution engine. Applications declare a tree of
//! commands and typed flags; the engine walks the argument vector, matches
//! tokens against the tree, coerces flag text into typed [`Value`]s, runs the
//! flag hooks and finally dispatches the resolved command's action.
//!
//! ```no_run
//! use argot::{Command, CommandTree, Engine, EngineConfig, Flag};
//!
//! let mut tree = CommandTree::new(Command::new("app"));
//! let root = tree.root();
//! let serve = tree
//!     .add_subcommand(root, Command::new("serve").with_action(|inv| {
//!         println!("port = {:?}", inv.value("port"));
//!         Ok(())
//!     }))
//!     .expect("fresh title");
//! tree.add_flag(serve, Flag::new("port", 8080_i64).with_short("p"));
//!
//! let mut engine = Engine::new(tree, EngineConfig::default());
//! engine.run(["app", "serve", "-p", "9000"]).expect("run");
//! ```

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

pub use crate::core::coerce::{CoerceError, Strictness};
pub use crate::core::config_loader::{ConfigError, EngineConfig};
pub use crate::core::dispatcher::Invocation;
pub use crate::core::engine::Engine;
pub use crate::core::errors::{EngineError, EngineResult};
pub use crate::core::session::{MatchState, ParseContext};
pub use crate::core::store::Store;
pub use crate::core::tree::CommandTree;
pub use crate::core::value::{TextValue, Value};
pub use crate::models::{
    Builtin, CmdId, Command, EvalPolicy, Flag, FlagEvent, FlagId, HookOutcome, NodeRef,
};
pub use crate::system::input::InputHelper;
