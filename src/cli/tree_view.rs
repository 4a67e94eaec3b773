// src/cli/tree_view.rs

use crate::cli::help::apply_style_tags;
use crate::core::tree::CommandTree;
use crate::models::CmdId;
use colored::Colorize;

/// Renders an ASCII tree of `start` and its visible subcommands.
pub fn render_tree(tree: &CommandTree, start: CmdId) -> String {
    let mut lines = vec![apply_style_tags(t!("tree.header"))];
    lines.push(node_label(tree, start));

    let children = visible_children(tree, start);
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        push_node(tree, *child, "", is_last, &mut lines);
    }
    lines.join("\n")
}

fn visible_children(tree: &CommandTree, id: CmdId) -> Vec<CmdId> {
    tree[id]
        .children()
        .iter()
        .copied()
        .filter(|&c| !tree[c].base.hidden && !tree[c].base.vendor_hidden)
        .collect()
}

fn node_label(tree: &CommandTree, id: CmdId) -> String {
    let base = &tree[id].base;
    let mut label = base.long.bold().to_string();
    let others: Vec<&str> = base.titles().skip(1).collect();
    if !others.is_empty() {
        label.push_str(&format!(" ({})", others.join(", ")).dimmed().to_string());
    }
    if !base.description.is_empty() {
        label.push_str(&format!("  {}", base.description));
    }
    label
}

/// Recursive function to render a node and its descendants.
fn push_node(tree: &CommandTree, id: CmdId, prefix: &str, is_last: bool, lines: &mut Vec<String>) {
    let connector = if is_last { "└─" } else { "├─" };
    lines.push(format!("{}{} {}", prefix, connector, node_label(tree, id)));

    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    let children = visible_children(tree, id);
    for (i, child) in children.iter().enumerate() {
        let is_last_child = i + 1 == children.len();
        push_node(tree, *child, &child_prefix, is_last_child, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Command;

    #[test]
    fn test_connectors_follow_position() {
        colored::control::set_override(false);
        let mut tree = CommandTree::new(Command::new("app"));
        let root = tree.root();
        let server = tree.add_subcommand(root, Command::new("server")).unwrap();
        tree.add_subcommand(server, Command::new("start"));
        tree.add_subcommand(root, Command::new("client").with_short("c"));

        let text = render_tree(&tree, root);
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec!["app", "├─ server", "│  └─ start", "└─ client (c)"]
        );
    }
}
