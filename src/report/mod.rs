use std::fmt::Write;

use anyhow::{Context, Result};
use itertools::Itertools;
use petgraph::visit::Bfs;
use serde::Serialize;

use crate::{
    analysis::{ClassAggregate, Statistics, aggregate_by_class},
    graph::{
        EdgeType, HeapSnapshot, JsKind, Node, NodeType, SerializedNode,
        kind::{containment_edges, retaining_edges},
    },
    types::SnapshotObjectId,
    utils::{format_bytes, print_safe},
};

/// Classes listed in the text report.
pub const TEXT_CLASS_LIMIT: usize = 20;

/// What to put in a report besides the statistics.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub roots: bool,
    pub user_roots: bool,
    pub classes: bool,
    pub node: Option<SnapshotObjectId>,
    pub show_hidden: bool,
}

fn find_child<'a>(node: Node<'a>, typ: EdgeType, name: &str) -> Option<Node<'a>> {
    node.edges()
        .find(|e| e.typ() == typ && e.name().is_str(name))
        .map(|e| e.node())
}

fn leaf_repr(node: Node<'_>) -> String {
    match node.typ() {
        NodeType::String | NodeType::ConcatString | NodeType::SlicedString => {
            format!("\"{}\"", print_safe(&node.name(), 30))
        }
        NodeType::Number => "<a number>".to_string(),
        NodeType::BigInt => "<a bigint>".to_string(),
        _ => format!("{}@{}", node.class_name(), node.id()),
    }
}

/// One line describing a node, looking one level into its edges where that
/// helps (arrays, plain objects, symbols).
pub fn minimal_node_repr(node: Node<'_>) -> String {
    match node.typ() {
        NodeType::String | NodeType::ConcatString => print_safe(&node.name(), 30),
        NodeType::Synthetic => node.name().to_string(),
        NodeType::SlicedString => match find_child(node, EdgeType::Internal, "parent") {
            Some(parent) => format!("<slice of {}>", leaf_repr(parent)),
            None => print_safe(node.raw_name(), 30),
        },
        NodeType::Number => "<a number>".to_string(),
        NodeType::BigInt => "<a bigint>".to_string(),
        NodeType::Closure => format!("function {}()", node.name()),
        NodeType::Symbol => match find_child(node, EdgeType::Internal, "name") {
            Some(name) => format!("symbol {}", leaf_repr(name)),
            None => "unnamed symbol".to_string(),
        },
        NodeType::Object => {
            if find_child(node, EdgeType::Internal, "elements").is_some() {
                // Array or array-like
                return format!(
                    "{} [ {} ]",
                    node.name(),
                    node.edges()
                        .filter(|e| e.is_element())
                        .map(|e| leaf_repr(e.node()))
                        .join(", ")
                );
            }
            format!(
                "{} {{ {} }}",
                node.name(),
                node.edges()
                    .filter(|e| e.typ() == EdgeType::Property)
                    .map(|e| e.name().to_string())
                    .join(", ")
            )
        }
        _ => format!("{}:{}", node.type_name(), print_safe(&node.name(), 30)),
    }
}

/// Breadth-first dump of the graph from the root, `limit` nodes at most.
pub fn format_graph(snapshot: &HeapSnapshot, limit: usize, show_hidden: bool) -> String {
    let mut ret = String::new();
    let root = snapshot.root_node().ordinal();
    let mut bfs = Bfs::new(snapshot, root);
    let mut printed = 0;

    while let Some(nx) = bfs.next(snapshot) {
        if printed == limit {
            let _ = writeln!(&mut ret, "... (stopped after {} nodes)", limit);
            break;
        }
        printed += 1;

        let node = snapshot.node_by_ordinal(nx);
        let _ = writeln!(
            &mut ret,
            "node {} type={} name={} id={} self_size={}",
            nx,
            node.type_name(),
            print_safe(&node.name(), 40),
            node.id(),
            node.self_size(),
        );
        let _ = writeln!(&mut ret, "    {}", minimal_node_repr(node));

        for edge in containment_edges(&JsKind, node, show_hidden) {
            let _ = writeln!(
                &mut ret,
                "    --[{}:{}]--> {}  {}",
                edge.type_name(),
                edge,
                edge.node().ordinal(),
                minimal_node_repr(edge.node()),
            );
        }
        let _ = writeln!(&mut ret);
    }
    ret
}

pub fn format_statistics(stats: &Statistics) -> String {
    let rows = [
        ("Total", stats.total),
        ("V8 heap", stats.v8heap),
        ("Native", stats.native),
        ("Code", stats.code),
        ("JS arrays", stats.js_arrays),
        ("Strings", stats.strings),
    ];
    rows.iter()
        .map(|(label, size)| format!("{:<12} {}", format!("{}:", label), format_bytes(*size)))
        .join("\n")
}

fn format_root_line(node: Node<'_>) -> String {
    format!(
        "@{}  {}  {}",
        node.id(),
        node.class_name(),
        minimal_node_repr(node)
    )
}

pub fn format_roots(snapshot: &HeapSnapshot, user_roots_only: bool) -> String {
    let mut lines = Vec::new();
    snapshot.for_each_root(|node| lines.push(format_root_line(node)), user_roots_only);
    lines.join("\n")
}

pub fn format_classes(aggregates: &[ClassAggregate], limit: usize) -> String {
    aggregates
        .iter()
        .take(limit)
        .map(|a| {
            format!(
                "{:>10}  {:>8}  {}",
                format_bytes(a.self_size),
                a.count,
                print_safe(&a.name, 60)
            )
        })
        .join("\n")
}

/// A node with its visible outgoing edges and its retainers.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDetails {
    pub node: SerializedNode,
    pub edges: Vec<String>,
    pub retainers: Vec<String>,
}

impl NodeDetails {
    pub fn new(node: Node<'_>, show_hidden: bool) -> Self {
        let edges = containment_edges(&JsKind, node, show_hidden)
            .into_iter()
            .map(|e| format!("{} @{}", e, e.node().id()))
            .collect();
        let retainers = retaining_edges(&JsKind, node, show_hidden)
            .into_iter()
            .map(|r| format!("@{}{}", r.node().id(), r))
            .collect();
        NodeDetails {
            node: node.serialize(),
            edges,
            retainers,
        }
    }

    pub fn format(&self) -> String {
        let mut ret = String::new();
        let _ = writeln!(
            &mut ret,
            "@{} {} \"{}\" self_size={}",
            self.node.id,
            self.node.typ,
            print_safe(&self.node.name, 60),
            self.node.self_size
        );
        let _ = writeln!(&mut ret, "  edges:");
        for edge in &self.edges {
            let _ = writeln!(&mut ret, "    {}", edge);
        }
        let _ = writeln!(&mut ret, "  retainers:");
        for retainer in &self.retainers {
            let _ = writeln!(&mut ret, "    {}", retainer);
        }
        ret
    }
}

fn node_details(snapshot: &HeapSnapshot, id: SnapshotObjectId, show_hidden: bool) -> Result<NodeDetails> {
    let node = snapshot
        .find_node_by_id(id)
        .with_context(|| format!("No node with id @{}", id))?;
    Ok(NodeDetails::new(node, show_hidden))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<SerializedNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassAggregate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeDetails>,
}

impl JsonReport {
    pub fn new(snapshot: &HeapSnapshot, options: &ReportOptions) -> Result<Self> {
        let roots = (options.roots || options.user_roots).then(|| {
            let mut roots = Vec::new();
            snapshot.for_each_root(|node| roots.push(node.serialize()), options.user_roots);
            roots
        });
        let classes = options
            .classes
            .then(|| aggregate_by_class(snapshot, &JsKind));
        let node = options
            .node
            .map(|id| node_details(snapshot, id, options.show_hidden))
            .transpose()?;

        Ok(JsonReport {
            node_count: snapshot.node_count(),
            edge_count: snapshot.edge_count(),
            statistics: snapshot.statistics().clone(),
            roots,
            classes,
            node,
        })
    }
}

pub fn generate_json_report(snapshot: &HeapSnapshot, options: &ReportOptions) -> Result<String> {
    let report = JsonReport::new(snapshot, options)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn generate_text_report(snapshot: &HeapSnapshot, options: &ReportOptions) -> Result<String> {
    let mut ret = String::new();
    let _ = writeln!(&mut ret, "Nodes:       {}", snapshot.node_count());
    let _ = writeln!(&mut ret, "Edges:       {}", snapshot.edge_count());
    let _ = writeln!(&mut ret, "Memory used: {}", format_bytes(snapshot.mem_size() as u64));
    let _ = writeln!(&mut ret);
    let _ = writeln!(&mut ret, "{}", format_statistics(snapshot.statistics()));

    if options.roots || options.user_roots {
        let title = if options.user_roots { "User roots" } else { "Roots" };
        let _ = writeln!(&mut ret, "\n{}:", title);
        let _ = writeln!(&mut ret, "{}", format_roots(snapshot, options.user_roots));
    }

    if options.classes {
        let aggregates = aggregate_by_class(snapshot, &JsKind);
        let _ = writeln!(&mut ret, "\nClasses (top {} by self size):", TEXT_CLASS_LIMIT);
        let _ = writeln!(&mut ret, "{}", format_classes(&aggregates, TEXT_CLASS_LIMIT));
    }

    if let Some(id) = options.node {
        let details = node_details(snapshot, id, options.show_hidden)?;
        let _ = write!(&mut ret, "\n{}", details.format());
    }

    Ok(ret)
}
