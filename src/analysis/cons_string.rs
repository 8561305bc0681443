use tracing::debug;

use crate::graph::{HeapSnapshot, NameOrIndex, NodeType};
use crate::types::NodeIndex;

/// Resolved rope names are cut off at this many characters.
pub const MAX_CONS_STRING_LENGTH: usize = 1024;

impl HeapSnapshot {
    /// Display text of a concatenated string node, memoized per node.
    pub(crate) fn cons_string_name(&self, node_index: NodeIndex) -> String {
        if let Some(name) = self.lazy_string_cache.borrow().get(&node_index) {
            return name.clone();
        }
        let name = self.flatten_cons_string(node_index);
        self.lazy_string_cache
            .borrow_mut()
            .insert(node_index, name.clone());
        name
    }

    fn flatten_cons_string(&self, node_index: NodeIndex) -> String {
        let mut result = String::new();
        let mut length = 0usize;
        // Ropes may share sub-ropes, so only the depth of a path is bounded:
        // a path longer than the node count must run through a cycle.
        let max_depth = self.node_count();
        let mut stack = vec![(node_index, 0usize)];

        while let Some((index, depth)) = stack.pop() {
            if length >= MAX_CONS_STRING_LENGTH {
                break;
            }
            if depth > max_depth {
                debug!(node_index, "cyclic cons string, giving up");
                break;
            }

            let node = self.node(index);
            if node.typ() != NodeType::ConcatString {
                let fragment = node.raw_name();
                let remaining = MAX_CONS_STRING_LENGTH - length;
                match fragment.char_indices().nth(remaining) {
                    Some((cut, _)) => {
                        result.push_str(&fragment[..cut]);
                        length = MAX_CONS_STRING_LENGTH;
                    }
                    None => {
                        result.push_str(fragment);
                        length += fragment.chars().count();
                    }
                }
                continue;
            }

            let mut first = None;
            let mut second = None;
            for edge in node.edges().filter(|e| e.is_internal()) {
                match edge.name() {
                    NameOrIndex::Name("first") => first = Some(edge.node_index()),
                    NameOrIndex::Name("second") => second = Some(edge.node_index()),
                    _ => {}
                }
            }
            // Second goes first so that the left fragment is popped next.
            stack.extend(second.map(|i| (i, depth + 1)));
            stack.extend(first.map(|i| (i, depth + 1)));
        }

        result
    }
}
