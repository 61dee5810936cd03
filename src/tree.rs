//! Dependency parse data structures
//!
//! A parsed passage is a sequence of sentences; each sentence is a [`Tree`]
//! of [`Node`]s carrying the CoNLL-U columns the counters and the cache need.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Index of a node within its sentence
pub type NodeId = usize;

/// Morphological features (`Key=Value` pairs), kept sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features(Vec<(String, String)>);

impl Features {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a feature, replacing any existing value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.binary_search_by(|(k, _)| k.as_str().cmp(&key)) {
            Ok(i) => self.0[i].1 = value,
            Err(i) => self.0.insert(i, (key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| self.0[i].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A node in a dependency tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: Option<String>,
    pub feats: Features,
    pub deprel: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub misc: Features,
}

impl Node {
    /// Create a new node with the given attributes
    pub fn new(id: NodeId, form: &str, lemma: &str, upos: &str, deprel: &str) -> Self {
        Self {
            id,
            form: form.to_string(),
            lemma: lemma.to_string(),
            upos: upos.to_string(),
            xpos: None,
            feats: Features::new(),
            deprel: deprel.to_string(),
            parent: None,
            children: Vec::new(),
            misc: Features::new(),
        }
    }

    /// Builder-style feature setter, handy for constructing test trees
    pub fn with_feature(mut self, key: &str, value: &str) -> Self {
        self.feats.insert(key, value);
        self
    }

    /// True unless MISC carries `SpaceAfter=No`
    pub fn space_after(&self) -> bool {
        self.misc.get("SpaceAfter") != Some("No")
    }
}

/// A dependency tree (sentence)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub root_id: Option<NodeId>,
    pub sentence_text: Option<String>,
    pub metadata: FxHashMap<String, String>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(sentence_text: Option<String>, metadata: FxHashMap<String, String>) -> Self {
        Self {
            sentence_text,
            metadata,
            ..Self::default()
        }
    }

    /// Add a node to the tree
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Set the parent of a node
    pub fn set_parent(&mut self, child_id: NodeId, parent_id: NodeId) {
        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent = Some(parent_id);
        }
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            if !parent.children.contains(&child_id) {
                parent.children.push(child_id);
            }
        }
    }

    /// Get the children of a node
    pub fn children(&self, node_id: NodeId) -> impl Iterator<Item = &Node> {
        self.get_node(node_id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&id| self.get_node(id))
    }

    pub fn parent(&self, node_id: NodeId) -> Option<&Node> {
        self.get_node(node_id)
            .and_then(|node| node.parent)
            .and_then(|parent_id| self.get_node(parent_id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Surface text: the `# text` comment when present, otherwise rebuilt
    /// from forms and `SpaceAfter=No`
    pub fn text(&self) -> String {
        if let Some(text) = &self.sentence_text {
            return text.clone();
        }
        let mut text = String::new();
        for node in &self.nodes {
            text.push_str(&node.form);
            if node.space_after() {
                text.push(' ');
            }
        }
        text.truncate(text.trim_end().len());
        text
    }
}

/// The parse of one passage: its sentences in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPassage {
    pub sentences: Vec<Tree>,
}

impl ParsedPassage {
    pub fn new(sentences: Vec<Tree>) -> Self {
        Self { sentences }
    }

    /// All tokens in document order, paired with their sentence
    pub fn tokens(&self) -> impl Iterator<Item = (&Tree, &Node)> {
        self.sentences
            .iter()
            .flat_map(|tree| tree.nodes.iter().map(move |node| (tree, node)))
    }

    /// Total number of tokens
    pub fn len(&self) -> usize {
        self.sentences.iter().map(Tree::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sentence texts joined by single spaces
    pub fn text(&self) -> String {
        self.sentences
            .iter()
            .map(Tree::text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
