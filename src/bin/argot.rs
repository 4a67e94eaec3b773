// src/bin/argot.rs

//! `argot`: a small demo application showing the engine's features end to
//! end. Try `argot --tree`, `argot server start -p9000 --tag a,b`, or
//! `argot ~~debug client -129`.

use anyhow::Result;
use argot::{
    Command, CommandTree, Engine, EngineConfig, EngineError, EvalPolicy, Flag, Value,
    core::timefmt,
};
use chrono::TimeDelta;
use colored::*;

// --- Demo Tree ---

fn server_commands(tree: &mut CommandTree) -> Result<()> {
    let root = tree.root();
    let server = tree
        .add_subcommand(
            root,
            Command::new("server")
                .with_short("s")
                .with_aliases(&["srv"])
                .with_description("Manage the demo server"),
        )
        .ok_or_else(|| anyhow::anyhow!("duplicate command 'server'"))?;

    tree.add_flag(
        server,
        Flag::new("host", "127.0.0.1")
            .with_short("H")
            .with_description("Address to bind")
            .with_env_vars(&["ARGOT_DEMO_HOST"]),
    );

    let start = tree
        .add_subcommand(
            server,
            Command::new("start")
                .with_description("Start the server")
                .with_examples("argot server start -p 9000 --tag a,b\nargot s start +d")
                .with_action(|inv| {
                    let port = inv.value("port").cloned().unwrap_or(Value::U16(0));
                    let host = inv.get_str("host").unwrap_or_default();
                    println!("{} {}:{}", "starting".green().bold(), host, port);
                    if let Some(tags) = inv.value("tag") {
                        println!("  tags     {tags}");
                    }
                    if let Some(limits) = inv.value("limit") {
                        println!("  limits   {limits}");
                    }
                    if let Some(Value::Duration(d)) = inv.value("timeout") {
                        println!("  timeout  {}", timefmt::format_duration(*d));
                    }
                    println!("  detached {}", inv.get_bool("detach"));
                    Ok(())
                }),
        )
        .ok_or_else(|| anyhow::anyhow!("duplicate command 'start'"))?;

    tree.add_flag(
        start,
        Flag::new("port", Value::U16(8080))
            .with_short("p")
            .with_group("Network")
            .with_range(1.0, 65535.0),
    );
    tree.add_flag(
        start,
        Flag::new("tag", Value::slice_of(Value::from("")))
            .with_short("t")
            .with_description("Tags to attach; repeatable"),
    );
    tree.add_flag(
        start,
        Flag::new("limit", Value::map_of(Value::from(""), Value::I64(0)))
            .with_description("Per-resource limits, e.g. cpu=2,mem=512"),
    );
    tree.add_flag(
        start,
        Flag::new("timeout", Value::Duration(TimeDelta::seconds(30)))
            .with_description("Shutdown timeout"),
    );
    tree.add_flag(start, Flag::new("detach", false).with_short("d"));
    tree.add_flag(
        start,
        Flag::new("mode", "dev")
            .with_short("m")
            .with_valid_args(&["dev", "prod"])
            .just_once(),
    );

    tree.add_subcommand(
        server,
        Command::new("stop")
            .with_description("Stop the server")
            .with_action(|_| {
                println!("{}", "stopping".yellow().bold());
                Ok(())
            }),
    );
    tree.add_subcommand(
        server,
        Command::new("halt")
            .with_description("Same as 'server stop'")
            .with_redirect_to("server.stop")
            .hidden(),
    );
    Ok(())
}

fn client_commands(tree: &mut CommandTree) -> Result<()> {
    let root = tree.root();
    let client = tree
        .add_subcommand(
            root,
            Command::new("client")
                .with_short("c")
                .with_description("Talk to the demo server")
                .with_action(|inv| {
                    let lines = inv.value("lines").and_then(Value::as_i64).unwrap_or(10);
                    let format = ["json", "yaml", "text"]
                        .into_iter()
                        .find(|f| inv.get_bool(f))
                        .unwrap_or("text");
                    println!("last {lines} lines as {format}: {:?}", inv.args());
                    Ok(())
                }),
        )
        .ok_or_else(|| anyhow::anyhow!("duplicate command 'client'"))?;

    tree.add_flag(client, Flag::new("lines", 10_i64).head_like());
    for format in ["json", "yaml", "text"] {
        tree.add_flag(
            client,
            Flag::new(format, false)
                .with_group("Output")
                .with_toggle_group("format"),
        );
    }
    tree.add_flag(
        client,
        Flag::new("token", "")
            .with_description("API token")
            .with_external_editor(argot::constants::PASSWORD_HELPER)
            .with_prerequisites(&["user"]),
    );
    tree.add_flag(client, Flag::new("user", "").with_short("u"));
    Ok(())
}

fn plugin_commands(tree: &mut CommandTree) {
    let root = tree.root();
    tree.add_subcommand(
        root,
        Command::new("plugin")
            .with_description("Plugins discovered at run time")
            .with_dynamic_subcommands(EvalPolicy::Once, |_| {
                ["lint", "fmt"]
                    .into_iter()
                    .map(|name| {
                        Command::new(name)
                            .with_description("Discovered plugin")
                            .with_action(move |inv| {
                                println!("plugin {name} {:?}", inv.args());
                                Ok(())
                            })
                    })
                    .collect()
            }),
    );
}

fn build_tree() -> Result<CommandTree> {
    let mut tree = CommandTree::new(
        Command::new("argot").with_description("Demo of the argot resolution engine"),
    );
    let root = tree.root();
    tree.add_flag(
        root,
        Flag::new("verbose", false)
            .with_short("v")
            .with_description("Print the resolved command before running it"),
    );
    server_commands(&mut tree)?;
    client_commands(&mut tree)?;
    plugin_commands(&mut tree);
    Ok(tree)
}

fn load_config() -> EngineConfig {
    let mut config = EngineConfig::load_default("argot").unwrap_or_else(|e| {
        log::debug!("Using default configuration: {}", e);
        EngineConfig::default()
    });
    config.apply_env();
    config
}

fn run() -> Result<(), EngineError> {
    let tree = build_tree().map_err(EngineError::from_handler)?;
    let mut engine = Engine::new(tree, load_config());
    engine.add_global_pre_action(|inv| {
        if inv.get_bool("verbose") {
            eprintln!("{} '{}'", "resolved".dimmed(), inv.tree.dotted_path(inv.command));
        }
        Ok(())
    });
    engine.run(std::env::args())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("\n{}: {}", argot::t!("error.label").red().bold(), e);
        std::process::exit(1);
    }
}
