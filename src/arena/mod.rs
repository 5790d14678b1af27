use std::ops::{Index, IndexMut};

use smol_str::SmolStr;

use crate::comments::Comments;
use crate::error::Mark;
use crate::event::ScalarStyle;

/// Identity of a node inside its [`Arena`]. Two aliases to the same anchor
/// share one `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub key: NodeId,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Scalar {
        value: String,
        style: Option<ScalarStyle>,
        fold_positions: Option<Vec<usize>>,
    },
    Sequence {
        items: Vec<NodeId>,
        flow_style: Option<bool>,
    },
    Mapping {
        pairs: Vec<Pair>,
        flow_style: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    /// The tag has to be written out even where resolution would imply it.
    pub explicit_tag: bool,
    pub data: NodeData,
    pub anchor: Option<SmolStr>,
    pub start_mark: Option<Mark>,
    pub end_mark: Option<Mark>,
    pub comments: Option<Box<Comments>>,
    /// Comments on the closing bracket of a flow collection.
    pub end_comments: Option<Box<Comments>>,
}

impl Node {
    pub fn scalar(tag: impl Into<String>, value: impl Into<String>, style: Option<ScalarStyle>) -> Self {
        Self::with_data(
            tag,
            NodeData::Scalar {
                value: value.into(),
                style,
                fold_positions: None,
            },
        )
    }

    pub fn sequence(tag: impl Into<String>, flow_style: Option<bool>) -> Self {
        Self::with_data(
            tag,
            NodeData::Sequence {
                items: Vec::new(),
                flow_style,
            },
        )
    }

    pub fn mapping(tag: impl Into<String>, flow_style: Option<bool>) -> Self {
        Self::with_data(
            tag,
            NodeData::Mapping {
                pairs: Vec::new(),
                flow_style,
            },
        )
    }

    fn with_data(tag: impl Into<String>, data: NodeData) -> Self {
        Self {
            tag: tag.into(),
            explicit_tag: false,
            data,
            anchor: None,
            start_mark: None,
            end_mark: None,
            comments: None,
            end_comments: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Scalar { .. } => NodeKind::Scalar,
            NodeData::Sequence { .. } => NodeKind::Sequence,
            NodeData::Mapping { .. } => NodeKind::Mapping,
        }
    }

    pub fn scalar_value(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn scalar_style(&self) -> Option<ScalarStyle> {
        match self.data {
            NodeData::Scalar { style, .. } => style,
            _ => None,
        }
    }

    pub fn items(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Sequence { items, .. } => items,
            _ => &[],
        }
    }

    pub fn pairs(&self) -> &[Pair] {
        match &self.data {
            NodeData::Mapping { pairs, .. } => pairs,
            _ => &[],
        }
    }

    pub fn flow_style(&self) -> Option<bool> {
        match self.data {
            NodeData::Sequence { flow_style, .. } | NodeData::Mapping { flow_style, .. } => {
                flow_style
            }
            NodeData::Scalar { .. } => None,
        }
    }

    pub fn with_explicit_tag(mut self, explicit_tag: bool) -> Self {
        self.explicit_tag = explicit_tag;
        self
    }

    pub fn with_anchor(mut self, anchor: Option<SmolStr>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_comments(mut self, comments: Option<Box<Comments>>) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_marks(mut self, start_mark: Option<Mark>, end_mark: Option<Mark>) -> Self {
        self.start_mark = start_mark;
        self.end_mark = end_mark;
        self
    }
}

/// Flat storage for the nodes of one document.
///
/// Collections are pushed before their children so that a child can refer
/// back to an ancestor; the children are attached afterwards with
/// [`Arena::push_item`] and [`Arena::push_pair`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn push_item(&mut self, sequence: NodeId, item: NodeId) {
        if let Some(NodeData::Sequence { items, .. }) = self.get_mut(sequence).map(|node| &mut node.data) {
            items.push(item);
        }
    }

    pub fn push_pair(&mut self, mapping: NodeId, key: NodeId, value: NodeId) {
        if let Some(NodeData::Mapping { pairs, .. }) = self.get_mut(mapping).map(|node| &mut node.data) {
            pairs.push(Pair { key, value });
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// One YAML document as a node graph plus the document-level details a
/// round trip needs to reproduce.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Document {
    pub arena: Arena,
    pub root: Option<NodeId>,
    pub explicit_start: bool,
    pub explicit_end: bool,
    pub version: Option<(u32, u32)>,
    pub tags: Vec<(String, String)>,
    /// Comments on the `---` line.
    pub start_comments: Option<Box<Comments>>,
    /// Comments after the last node of the document.
    pub end_comments: Option<Box<Comments>>,
    /// Whether block sequences under a mapping key sit at the key's column.
    pub indentless_sequences: Option<bool>,
}

impl Document {
    pub fn new(arena: Arena, root: NodeId) -> Self {
        Self {
            arena,
            root: Some(root),
            ..Self::default()
        }
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.root.and_then(|root| self.arena.get(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TAG_MAP, TAG_SEQ, TAG_STR};
    use rstest::rstest;

    #[rstest]
    fn test_collection_can_contain_itself() {
        let mut arena = Arena::new();
        let seq = arena.push(Node::sequence(TAG_SEQ, Some(true)));
        let item = arena.push(Node::scalar(TAG_STR, "a", None));
        arena.push_item(seq, item);
        arena.push_item(seq, seq);
        assert_eq!(arena[seq].items(), &[item, seq]);
        assert_eq!(arena[seq].flow_style(), Some(true));
        assert_eq!(arena.len(), 2);
    }

    #[rstest]
    fn test_mapping_pairs_keep_insertion_order() {
        let mut arena = Arena::with_capacity(5);
        let map = arena.push(Node::mapping(TAG_MAP, None));
        for key in ["b", "a"] {
            let key_id = arena.push(Node::scalar(TAG_STR, key, None));
            let value_id = arena.push(Node::scalar(TAG_STR, "v", None));
            arena.push_pair(map, key_id, value_id);
        }
        let keys: Vec<&str> = arena[map]
            .pairs()
            .iter()
            .filter_map(|pair| arena[pair.key].scalar_value())
            .collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(arena[map].kind(), NodeKind::Mapping);
    }
}
