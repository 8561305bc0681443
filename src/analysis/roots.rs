use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::graph::{HeapSnapshot, Node};

pub const GC_ROOTS_NAME: &str = "(GC roots)";
pub const NATIVE_CONTEXT_LINK: &str = "native_context";

/// First direct child of `node` whose own name is `name`.
fn child_node_by_name<'a>(node: Node<'a>, name: &str) -> Option<Node<'a>> {
    node.edges().map(|e| e.node()).find(|child| child.name() == name)
}

/// Target of the first edge of `node` named `name`.
fn child_node_by_link_name<'a>(node: Node<'a>, name: &str) -> Option<Node<'a>> {
    node.edges().find(|e| e.name().is_str(name)).map(|e| e.node())
}

impl HeapSnapshot {
    pub fn gc_roots_node(&self) -> Option<Node<'_>> {
        child_node_by_name(self.root_node(), GC_ROOTS_NAME)
    }

    /// Calls `action` once per root node.
    ///
    /// With `user_roots_only` unset this covers the engine's GC roots (each
    /// sub-root's children, then the sub-root itself) followed by every
    /// direct child of the synthetic root. With it set, only the root's
    /// children that belong to the page are visited: the document DOM trees
    /// root, and each user root, represented by its native context when it
    /// has one.
    ///
    /// Snapshots without a "(GC roots)" node have no roots.
    pub fn for_each_root<'a>(&'a self, mut action: impl FnMut(Node<'a>), user_roots_only: bool) {
        let Some(gc_roots) = self.gc_roots_node() else {
            debug!("no (GC roots) node, skipping root enumeration");
            return;
        };

        let mut visited = FixedBitSet::with_capacity(self.node_count());
        let mut do_action = |node: Node<'a>| {
            if !visited.put(node.ordinal() as usize) {
                action(node);
            }
        };

        let root = self.root_node();
        if user_roots_only {
            for node in root.edges().map(|e| e.node()) {
                if node.is_document_dom_trees_root() {
                    do_action(node);
                } else if node.is_user_root() {
                    match child_node_by_link_name(node, NATIVE_CONTEXT_LINK) {
                        Some(native_context) => do_action(native_context),
                        None => do_action(node),
                    }
                }
            }
        } else {
            for sub_root in gc_roots.edges().map(|e| e.node()) {
                for child in sub_root.edges() {
                    do_action(child.node());
                }
                do_action(sub_root);
            }
            for child in root.edges() {
                do_action(child.node());
            }
        }
    }

    pub fn user_roots(&self) -> Vec<Node<'_>> {
        let mut roots = Vec::new();
        self.for_each_root(|node| roots.push(node), true);
        roots
    }
}
