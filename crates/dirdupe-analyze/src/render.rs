//! Tree dumps for inspection: indented text, Graphviz DOT and GraphML.

use std::fmt::Write as _;

use dirdupe_core::{NodeId, NodeKind, PathNode, PathTree};

/// Tree dump formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeFormat {
    /// Indented listing.
    #[default]
    Text,
    /// Graphviz DOT.
    Dot,
    /// GraphML XML.
    GraphMl,
}

/// Render the attached part of `tree` in `format`.
pub fn render_tree(tree: &PathTree, format: TreeFormat) -> String {
    match format {
        TreeFormat::Text => render_text(tree),
        TreeFormat::Dot => render_dot(tree),
        TreeFormat::GraphMl => render_graphml(tree),
    }
}

/// Indented listing, one node per line, annotated with group ids,
/// classification and short fingerprints.
pub fn render_text(tree: &PathTree) -> String {
    let mut out = String::new();
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let node = tree.node(id);
        let name = if id == tree.root() { "/" } else { node.name.as_str() };
        let _ = write!(out, "{}{}", "  ".repeat(depth), name);
        if node.is_dir() && id != tree.root() {
            out.push('/');
        }
        let _ = writeln!(out, "  {}", annotation(node));

        for &child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

/// Graphviz DOT digraph with one edge per parent/child link.
pub fn render_dot(tree: &PathTree) -> String {
    let mut out = String::from("digraph dirdupe {\n");
    for id in tree.pre_order() {
        let node = tree.node(id);
        let shape = if node.is_dir() { "folder" } else { "note" };
        let _ = writeln!(
            out,
            "  {} [label=\"{}\", shape={shape}];",
            node_key(id),
            escape_dot(&label(tree, id))
        );
        for &child in &node.children {
            let _ = writeln!(out, "  {} -> {};", node_key(id), node_key(child));
        }
    }
    out.push_str("}\n");
    out
}

/// GraphML document with `name`, `kind`, `group` and `duplicate` node data.
pub fn render_graphml(tree: &PathTree) -> String {
    let mut out = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n",
        "  <key id=\"name\" for=\"node\" attr.name=\"name\" attr.type=\"string\"/>\n",
        "  <key id=\"kind\" for=\"node\" attr.name=\"kind\" attr.type=\"string\"/>\n",
        "  <key id=\"group\" for=\"node\" attr.name=\"group\" attr.type=\"long\"/>\n",
        "  <key id=\"duplicate\" for=\"node\" attr.name=\"duplicate\" attr.type=\"boolean\"/>\n",
        "  <graph id=\"dirdupe\" edgedefault=\"directed\">\n",
    ));

    let order = tree.pre_order();
    for &id in &order {
        let node = tree.node(id);
        let _ = writeln!(out, "    <node id=\"{}\">", node_key(id));
        let _ = writeln!(out, "      <data key=\"name\">{}</data>", escape_xml(&label(tree, id)));
        let kind = if node.is_dir() { "directory" } else { "file" };
        let _ = writeln!(out, "      <data key=\"kind\">{kind}</data>");
        if let NodeKind::File { group } = node.kind {
            let _ = writeln!(out, "      <data key=\"group\">{}</data>", group.0);
        }
        let _ = writeln!(
            out,
            "      <data key=\"duplicate\">{}</data>",
            node.potential_duplicate
        );
        out.push_str("    </node>\n");
    }
    for &id in &order {
        for &child in tree.children(id) {
            let _ = writeln!(
                out,
                "    <edge source=\"{}\" target=\"{}\"/>",
                node_key(id),
                node_key(child)
            );
        }
    }

    out.push_str("  </graph>\n</graphml>\n");
    out
}

fn annotation(node: &PathNode) -> String {
    let mut parts = Vec::new();
    if let NodeKind::File { group } = node.kind {
        parts.push(format!("group {group}"));
    }
    parts.push(if node.potential_duplicate { "candidate" } else { "unique" }.to_string());
    match node.fingerprint {
        Some(f) if f.is_sentinel() => parts.push("fp sentinel".to_string()),
        Some(f) => parts.push(format!("fp {}", f.short_hex())),
        None => {}
    }
    format!("[{}]", parts.join(", "))
}

fn node_key(id: NodeId) -> String {
    format!("n{}", id.0)
}

fn label(tree: &PathTree, id: NodeId) -> String {
    if id == tree.root() {
        "/".to_string()
    } else {
        tree.node(id).name.to_string()
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
