//! Plain-text renderings of the list and tree views.

use std::fmt::Write;

use outreach_flow::workflow::tree_view::TreeNode;
use outreach_flow::{ListView, TreeView};

fn delay_text(delay: Option<u32>) -> String {
    match delay {
        Some(1) => "wait 1 day".to_string(),
        Some(days) => format!("wait {} days", days),
        None => "immediately".to_string(),
    }
}

pub fn list(view: &ListView) -> String {
    let mut out = String::new();
    for row in &view.rows {
        let marker = if row.selected { "*" } else { " " };
        let _ = writeln!(
            out,
            "{}{:>3}. {:<28} [{}] ({})",
            marker,
            row.index,
            row.label,
            row.kind,
            delay_text(row.delay)
        );
        for slot in &row.branch_slots {
            let _ = writeln!(out, "       {}: {} step(s)", slot.caption, slot.step_count);
        }
    }
    let disabled: Vec<&str> = view
        .add_menu
        .options
        .iter()
        .filter(|o| !o.enabled)
        .map(|o| o.label)
        .collect();
    if !disabled.is_empty() {
        let _ = writeln!(out, "  (Add New: {} disabled)", disabled.join(", "));
    }
    out
}

enum Line<'a> {
    Node(&'a TreeNode),
    Caption(usize, &'static str),
}

pub fn tree(view: &TreeView) -> String {
    let mut out = String::new();
    if view.empty_add.is_some() {
        out.push_str("(empty workflow)\n");
    }

    let roots: Vec<&TreeNode> = view.root_nodes().collect();
    let mut stack: Vec<Line> = roots.into_iter().rev().map(Line::Node).collect();
    while let Some(line) = stack.pop() {
        match line {
            Line::Caption(depth, caption) => {
                let _ = writeln!(out, "{}    {}:", indent(depth), caption);
            }
            Line::Node(node) => {
                let marker = if node.selected { "*" } else { "-" };
                let _ = writeln!(
                    out,
                    "{}{} {} [{}] ({})",
                    indent(node.depth),
                    marker,
                    node.label,
                    node.kind,
                    delay_text(node.delay)
                );
                for column in node.branches.iter().rev() {
                    let children: Vec<&TreeNode> = view.column_nodes(column).collect();
                    stack.extend(children.into_iter().rev().map(Line::Node));
                    stack.push(Line::Caption(node.depth, column.caption));
                }
            }
        }
    }

    if view.trailing_add.is_some() {
        out.push_str("+ Add New\n");
    }
    out
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth * 2)
}
