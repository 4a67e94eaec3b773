// src/cli/builtins.rs

//! Built-in flags and commands injected onto the root, and the default actions
//! that answer them.

use crate::cli::{debug_view, help, tree_view};
use crate::constants::{
    BUILD_INFO_TITLE, BUILTIN_GROUP, DEBUG_TITLE, HELP_TITLE, NO_COLOR_TITLE, TREE_TITLE,
    VERSION_TITLE,
};
use crate::core::config_loader::EngineConfig;
use crate::core::dispatcher::Invocation;
use crate::core::tree::CommandTree;
use crate::models::{Action, Builtin, Command, Flag, Hook};
use colored::Colorize;
use std::rc::Rc;

fn builtin_flag(long: &str, short: &str, description: &str, builtin: Builtin) -> Flag {
    Flag::new(long, false)
        .with_short(short)
        .with_description(description)
        .with_group(BUILTIN_GROUP)
        .as_builtin(builtin)
}

/// Adds the built-in flags and commands to the root. Titles already taken by
/// the application are left alone.
pub fn inject(tree: &mut CommandTree) {
    let root = tree.root();

    let flags = [
        builtin_flag(HELP_TITLE, "h", t!("builtin.help"), Builtin::Help).circuit_break(),
        builtin_flag("help-alt", "?", t!("builtin.help_alt"), Builtin::Help)
            .circuit_break()
            .hidden(),
        builtin_flag(VERSION_TITLE, "V", t!("builtin.version"), Builtin::Version).circuit_break(),
        builtin_flag(BUILD_INFO_TITLE, "#", t!("builtin.build_info"), Builtin::BuildInfo)
            .circuit_break(),
        builtin_flag(TREE_TITLE, "", t!("builtin.tree"), Builtin::Tree).circuit_break(),
        builtin_flag(DEBUG_TITLE, "", t!("builtin.debug"), Builtin::Debug).dbl_tilde_only(),
        Flag::new(NO_COLOR_TITLE, false)
            .with_description(t!("builtin.no_color"))
            .with_group(BUILTIN_GROUP)
            .with_env_vars(&["NO_COLOR"]),
    ];
    for flag in flags {
        let long = flag.long().to_string();
        let taken = tree.find_flag_in_chain(root, &long).is_some();
        if taken || tree.add_flag(root, flag).is_none() {
            log::debug!("Built-in flag '--{}' already declared; skipping.", long);
        }
    }

    let commands = [
        Command::new(HELP_TITLE)
            .with_description(t!("builtin.help_command"))
            .with_group(BUILTIN_GROUP)
            .with_action(help_command),
        Command::new(VERSION_TITLE)
            .with_description(t!("builtin.version_command"))
            .with_group(BUILTIN_GROUP)
            .with_action(|inv| {
                println!("{}", version_line(inv.config));
                Ok(())
            }),
    ];
    for cmd in commands {
        let long = cmd.long().to_string();
        let taken = tree[root].children().iter().any(|&c| tree[c].base.has_title(&long));
        if taken || tree.add_subcommand(root, cmd).is_none() {
            log::debug!("Built-in command '{}' already declared; skipping.", long);
        }
    }

    tree.ensure_tree();
}

/// `help [path...]`: help of the command at the given path.
fn help_command(inv: &Invocation<'_>) -> anyhow::Result<()> {
    let path = inv.args().join(".");
    match inv.tree.find_command_by_path(&path) {
        Some(target) => println!("{}", help::render_help(inv.tree, target, inv.config)),
        None => {
            eprintln!("{}", format!(t!("help.unknown_path"), path = path).red());
            println!("{}", help::render_help(inv.tree, inv.tree.root(), inv.config));
        }
    }
    Ok(())
}

/// `<app> <version>`.
pub fn version_line(config: &EngineConfig) -> String {
    format!(t!("version.line"), app = config.app_name, version = config.version)
}

/// `label: value` lines describing the running build.
pub fn build_info_lines(config: &EngineConfig) -> Vec<String> {
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);
    let engine = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    [
        (t!("build_info.app"), config.app_name.clone()),
        (t!("build_info.version"), config.version.clone()),
        (t!("build_info.engine"), engine),
        (t!("build_info.target"), target),
        (t!("build_info.profile"), profile.to_string()),
    ]
    .into_iter()
    .map(|(label, value)| format!("{:<10} {}", label.blue(), value))
    .collect()
}

fn action<F>(f: F) -> Action
where
    F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
{
    Hook(Rc::new(f))
}

/// The default action of every built-in.
pub fn default_actions() -> Vec<(Builtin, Action)> {
    vec![
        (
            Builtin::Help,
            action(|inv| {
                println!("{}", help::render_help(inv.tree, inv.command, inv.config));
                Ok(())
            }),
        ),
        (
            Builtin::Version,
            action(|inv| {
                println!("{}", version_line(inv.config));
                Ok(())
            }),
        ),
        (
            Builtin::BuildInfo,
            action(|inv| {
                for line in build_info_lines(inv.config) {
                    println!("{line}");
                }
                Ok(())
            }),
        ),
        (
            Builtin::Tree,
            action(|inv| {
                println!("{}", tree_view::render_tree(inv.tree, inv.tree.root()));
                Ok(())
            }),
        ),
        (
            Builtin::Debug,
            action(|inv| {
                println!("{}", debug_view::render_debug(inv));
                Ok(())
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_adds_builtins_once() {
        let mut tree = CommandTree::new(Command::new("app"));
        inject(&mut tree);
        let before = tree[tree.root()].flags().len();
        inject(&mut tree);
        assert_eq!(tree[tree.root()].flags().len(), before);

        let help = tree.find_flag_by_path("help").unwrap();
        assert_eq!(tree[help].builtin(), Some(Builtin::Help));
        assert!(tree[help].circuit_break);
        let debug = tree.find_flag_by_path("debug").unwrap();
        assert!(tree[debug].dbl_tilde_only);
        assert!(tree.find_command_by_path("version").is_some());
    }

    #[test]
    fn test_user_titles_win() {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        tree.add_flag(root, Flag::new("version", "1.0"));
        inject(&mut tree);
        let version = tree.find_flag_by_path("version").unwrap();
        assert_eq!(tree[version].builtin(), None);
    }

    #[test]
    fn test_version_line_uses_config() {
        let config = EngineConfig {
            app_name: "demo".into(),
            version: "2.1.0".into(),
            ..EngineConfig::default()
        };
        assert_eq!(version_line(&config), "demo 2.1.0");
        assert_eq!(build_info_lines(&config).len(), 5);
    }
}
