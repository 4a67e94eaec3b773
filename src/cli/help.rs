// src/cli/help.rs

//! The default help screen.

use crate::core::config_loader::EngineConfig;
use crate::core::tree::CommandTree;
use crate::models::{CmdId, Flag, FlagId};
use colored::Colorize;
use std::collections::BTreeMap;

/// Replaces the semantic tags used in translated strings (`<title>`, `<cmd>`,
/// `<dim>`, ...) with ANSI styles, or strips them when colors are off.
pub fn apply_style_tags(template: &str) -> String {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();
    let style = |code: &'static str| if use_colors { code } else { "" };

    let title = style("\x1b[1;33m"); // Bold Yellow
    let hl = style("\x1b[1;36m"); // Bold Cyan
    let cmd = style("\x1b[36m"); // Cyan
    let group = style("\x1b[1;32m"); // Bold Green
    let err = style("\x1b[91m"); // Bright Red
    let dim = style("\x1b[2m");
    let reset = style("\x1b[0m");

    template
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<group>", group)
        .replace("</group>", reset)
        .replace("<err>", err)
        .replace("</err>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset)
}

fn flag_titles(flag: &Flag) -> String {
    let long_prefix = if flag.dbl_tilde_only { "~~" } else { "--" };
    let mut parts = Vec::new();
    if !flag.base.short.is_empty() {
        parts.push(format!("-{}", flag.base.short));
    }
    parts.push(format!("{}{}", long_prefix, flag.base.long));
    for alias in &flag.base.aliases {
        parts.push(format!("{long_prefix}{alias}"));
    }
    let mut titles = parts.join(", ");
    if !flag.is_bool() {
        let holder = if flag.place_holder.is_empty() {
            flag.default_value.kind_name().to_uppercase()
        } else {
            flag.place_holder.clone()
        };
        titles.push_str(&format!("=<{holder}>"));
    }
    titles
}

fn flag_notes(flag: &Flag) -> String {
    let mut notes = Vec::new();
    if flag.required {
        notes.push(t!("help.required").to_string());
    }
    if !flag.is_bool() {
        let shown = flag.default_value.to_string();
        if !shown.is_empty() {
            notes.push(format!(t!("help.default"), value = shown));
        }
    }
    if !flag.valid_args.is_empty() {
        notes.push(format!(t!("help.choices"), choices = flag.valid_args.join(", ")));
    }
    if !flag.env_vars.is_empty() {
        notes.push(format!(t!("help.env"), vars = flag.env_vars.join(", ")));
    }
    if let Some(hint) = &flag.base.deprecated {
        notes.push(format!(t!("help.deprecated"), hint = hint));
    }
    notes.join(" ")
}

fn visible_flags(tree: &CommandTree, id: CmdId) -> Vec<FlagId> {
    tree[id]
        .flags()
        .iter()
        .copied()
        .filter(|&f| !tree[f].base.hidden && !tree[f].base.vendor_hidden)
        .collect()
}

fn push_flag_groups(out: &mut Vec<String>, tree: &CommandTree, flags: &[FlagId]) {
    let mut groups: BTreeMap<&str, Vec<FlagId>> = BTreeMap::new();
    for &f in flags {
        groups.entry(tree[f].base.group.as_str()).or_default().push(f);
    }
    for (group, members) in groups {
        let name = if group.is_empty() {
            t!("help.default_group")
        } else {
            group
        };
        out.push(format!("  {}", name.green().bold()));
        for f in members {
            let flag = &tree[f];
            out.push(format!(
                "    {:<28} {} {}",
                flag_titles(flag).cyan(),
                flag.base.description,
                flag_notes(flag).dimmed()
            ));
        }
    }
}

/// Renders the help screen of command `id`.
pub fn render_help(tree: &CommandTree, id: CmdId, config: &EngineConfig) -> String {
    let cmd = &tree[id];
    let mut out = Vec::new();

    let path = tree.dotted_path(id).replace('.', " ");
    let mut usage = format!("{} {}", apply_style_tags(t!("help.usage")), config.app_name);
    if !path.is_empty() {
        usage.push(' ');
        usage.push_str(&path);
    }
    if !tree.is_leaf(id) {
        usage.push(' ');
        usage.push_str(t!("help.usage_commands"));
    }
    usage.push_str(&format!(" {} {}", t!("help.usage_flags"), t!("help.usage_args")));
    out.push(usage);

    let description = if !cmd.base.long_description.is_empty() {
        cmd.base.long_description.as_str()
    } else if id == tree.root() && !config.description.is_empty() {
        config.description.as_str()
    } else {
        cmd.base.description.as_str()
    };
    if !description.is_empty() {
        out.push(String::new());
        out.push(apply_style_tags(t!("help.description")));
        out.push(format!("  {description}"));
    }

    let commands: Vec<CmdId> = cmd
        .children()
        .iter()
        .copied()
        .filter(|&c| !tree[c].base.hidden && !tree[c].base.vendor_hidden)
        .collect();
    if !commands.is_empty() {
        out.push(String::new());
        out.push(apply_style_tags(t!("help.commands")));
        for c in commands {
            let base = &tree[c].base;
            let titles: Vec<&str> = base.titles().collect();
            let mut line = format!("  {:<28} {}", titles.join(", ").cyan(), base.description);
            if let Some(hint) = &base.deprecated {
                line.push(' ');
                line.push_str(&format!(t!("help.deprecated"), hint = hint).dimmed().to_string());
            }
            out.push(line);
        }
    }

    let own = visible_flags(tree, id);
    if !own.is_empty() {
        out.push(String::new());
        out.push(apply_style_tags(t!("help.flags")));
        push_flag_groups(&mut out, tree, &own);
    }

    let inherited: Vec<FlagId> = tree
        .ancestors(id)
        .skip(1)
        .flat_map(|a| visible_flags(tree, a))
        .collect();
    if !inherited.is_empty() {
        out.push(String::new());
        out.push(apply_style_tags(t!("help.inherited_flags")));
        push_flag_groups(&mut out, tree, &inherited);
    }

    if !cmd.base.examples.is_empty() {
        out.push(String::new());
        out.push(apply_style_tags(t!("help.examples")));
        for line in cmd.base.examples.lines() {
            out.push(format!("  {line}"));
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use crate::models::Command;

    fn sample() -> (CommandTree, CmdId) {
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        tree.add_flag(root, Flag::new("verbose", false).with_short("v").with_description("Talk more"));
        let server = tree
            .add_subcommand(root, Command::new("server").with_description("Run the server"))
            .unwrap();
        tree.add_subcommand(root, Command::new("secret").hidden());
        tree.add_flag(
            server,
            Flag::new("port", Value::U16(8080))
                .with_short("p")
                .with_group("Network")
                .required(),
        );
        (tree, server)
    }

    #[test]
    fn test_style_tags_are_consumed() {
        let rendered = apply_style_tags("<title>Hi</title> <dim>x</dim>");
        assert!(!rendered.contains("<title>"));
        assert!(rendered.contains("Hi"));
    }

    #[test]
    fn test_root_help_lists_visible_commands() {
        let (tree, _) = sample();
        let text = render_help(&tree, tree.root(), &EngineConfig::default());
        assert!(text.contains("server"));
        assert!(text.contains("Run the server"));
        assert!(!text.contains("secret"));
        assert!(text.contains("--verbose"));
    }

    #[test]
    fn test_sub_help_shows_own_and_inherited_flags() {
        let (tree, server) = sample();
        let text = render_help(&tree, server, &EngineConfig::default());
        assert!(text.contains("--port"));
        assert!(text.contains("8080"));
        assert!(text.contains("Network"));
        assert!(text.contains(t!("help.required")));
        assert!(text.contains("--verbose"));
    }
}
