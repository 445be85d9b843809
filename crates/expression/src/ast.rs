//! The typed expression tree, stored as an arena of nodes.
//!
//! Nodes refer to their children by [`NodeId`]. A `match` output reachable from
//! several labels is a single node referenced from several map entries.

use crate::signature::{Definition, Signature};
use mapstyle_types::{Type, Value};
use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpolation {
    Step,
    /// `linear` is exponential interpolation with base 1.
    Exponential { base: f64 },
}

impl Interpolation {
    pub const LINEAR: Interpolation = Interpolation::Exponential { base: 1.0 };
}

/// Flattened label-to-output table of a `match` node.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchCases {
    Number(HashMap<i64, NodeId>),
    String(HashMap<String, NodeId>),
}

/// Largest magnitude a numeric branch label may have. Beyond it `f64`
/// cannot tell neighbouring integers apart.
pub(crate) const MAX_LABEL: f64 = 9_007_199_254_740_991.0;

/// The integer key for a numeric label or input, if it has one.
pub(crate) fn integer_label(n: f64) -> Option<i64> {
    (n == n.ceil() && n.abs() <= MAX_LABEL).then_some(n as i64)
}

impl MatchCases {
    pub fn input_type(&self) -> Type {
        match self {
            MatchCases::Number(_) => Type::Number,
            MatchCases::String(_) => Type::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MatchCases::Number(cases) => cases.len(),
            MatchCases::String(cases) => cases.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A call to a registered operator, bound to one of its signatures.
#[derive(Debug, Clone)]
pub struct Compound {
    pub definition: Arc<Definition>,
    pub signature: usize,
    pub args: Vec<NodeId>,
}

impl Compound {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn signature(&self) -> &Signature {
        &self.definition.signatures[self.signature]
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Literal(Value),
    Compound(Compound),
    /// Runtime check that `input` conforms to the node's type. Produced by
    /// `["array", ...]` and when a `Value` is passed where a concrete type is required.
    Assertion { input: NodeId },
    Case { branches: Vec<(NodeId, NodeId)>, otherwise: NodeId },
    Coalesce { args: Vec<NodeId> },
    Match {
        input: NodeId,
        cases: MatchCases,
        /// Distinct outputs in branch order.
        outputs: Vec<NodeId>,
        otherwise: NodeId,
    },
    Curve {
        interpolation: Interpolation,
        input: NodeId,
        /// Strictly ascending by label.
        stops: Vec<(f64, NodeId)>,
    },
}

impl NodeKind {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Literal(_) => Vec::new(),
            NodeKind::Compound(compound) => compound.args.clone(),
            NodeKind::Assertion { input } => vec![*input],
            NodeKind::Case { branches, otherwise } => branches
                .iter()
                .flat_map(|(condition, output)| [*condition, *output])
                .chain(std::iter::once(*otherwise))
                .collect(),
            NodeKind::Coalesce { args } => args.clone(),
            NodeKind::Match { input, outputs, otherwise, .. } => std::iter::once(*input)
                .chain(outputs.iter().copied())
                .chain(std::iter::once(*otherwise))
                .collect(),
            NodeKind::Curve { input, stops, .. } => std::iter::once(*input)
                .chain(stops.iter().map(|(_, output)| *output))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub key: String,
    pub ty: Type,
    pub kind: NodeKind,
    feature_constant: bool,
    zoom_constant: bool,
}

impl Node {
    pub fn is_feature_constant(&self) -> bool {
        self.feature_constant
    }

    pub fn is_zoom_constant(&self) -> bool {
        self.zoom_constant
    }
}

/// Node storage used while building and checking a tree.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    /// Appends a node; its constancy flags are derived from its children.
    pub fn push(&mut self, key: impl Into<String>, ty: Type, kind: NodeKind) -> NodeId {
        let children = kind.children();
        let (mut feature_constant, mut zoom_constant) = match &kind {
            NodeKind::Compound(compound) => {
                let signature = compound.signature();
                (signature.feature_constant, signature.zoom_constant)
            }
            _ => (true, true),
        };
        for child in children {
            feature_constant &= self[child].feature_constant;
            zoom_constant &= self[child].zoom_constant;
        }
        self.nodes.push(Node { key: key.into(), ty, kind, feature_constant, zoom_constant });
        NodeId(self.nodes.len() - 1)
    }

    pub fn literal(&mut self, key: impl Into<String>, value: Value) -> NodeId {
        let ty = mapstyle_types::type_of(&value);
        self.push(key, ty, NodeKind::Literal(value))
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// A parsed and type-checked expression. Immutable; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Expression {
    arena: Arena,
    root: NodeId,
}

impl Expression {
    pub(crate) fn new(arena: Arena, root: NodeId) -> Self {
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    pub fn ty(&self) -> &Type {
        &self.arena[self.root].ty
    }

    pub fn is_feature_constant(&self) -> bool {
        self.arena[self.root].feature_constant
    }

    pub fn is_zoom_constant(&self) -> bool {
        self.arena[self.root].zoom_constant
    }

    /// The curve over `["zoom"]` at the root or inside nested `coalesce` nodes.
    pub fn find_zoom_curve(&self) -> Option<NodeId> {
        self.zoom_curve_from(self.root)
    }

    fn zoom_curve_from(&self, id: NodeId) -> Option<NodeId> {
        match &self.arena[id].kind {
            NodeKind::Curve { input, .. } => self.is_zoom(*input).then_some(id),
            NodeKind::Coalesce { args } => args.iter().find_map(|arg| self.zoom_curve_from(*arg)),
            NodeKind::Literal(_)
            | NodeKind::Compound(_)
            | NodeKind::Assertion { .. }
            | NodeKind::Case { .. }
            | NodeKind::Match { .. } => None,
        }
    }

    fn is_zoom(&self, id: NodeId) -> bool {
        matches!(&self.arena[id].kind, NodeKind::Compound(compound) if compound.name() == "zoom")
    }
}

impl Index<NodeId> for Expression {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }
}
