use crate::tree::DirectoryNode;

pub const BRANCH_GLYPH: &str = "├─ ";
pub const INDENT_WIDTH: usize = 3;

/// Indented outline of every node, checked or not, depth-first in scan order.
pub fn render_tree(nodes: &[DirectoryNode], level: usize) -> String {
    let mut out = String::new();
    render_into(nodes, level, &mut out);
    out
}

fn render_into(nodes: &[DirectoryNode], level: usize, out: &mut String) {
    for node in nodes {
        out.push_str(&" ".repeat(level * INDENT_WIDTH));
        out.push_str(BRANCH_GLYPH);
        out.push_str(node.name());
        out.push('\n');
        render_into(node.children(), level + 1, out);
    }
}
