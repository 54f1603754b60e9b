// ir.rs — Function graphs of structured-value nodes
//
// A `Function` owns an arena of nodes referenced by stable `NodeId` handles.
// Nodes never own their operands; they refer to earlier nodes by id, and the
// function derives and maintains the reverse (user) sets. The graph is
// acyclic by construction: builder methods can only reference nodes that
// already exist.
//
// Preconditions: builder calls must pass type-compatible operands (asserted).
// Postconditions: user sets and the return slot are kept consistent across
//                 all mutations.
// Failure modes: builder type assertions (programmer error, panics).
// Side effects: none outside the owned arena.

use std::collections::BTreeSet;
use std::fmt;

use crate::ty::Type;
use crate::value::Value;

// ── Node identity and kinds ─────────────────────────────────────────────────

/// Stable handle for a node within one `Function`. Ids are never reused,
/// so a `NodeId` stays valid (as an identity) across rewrites; dereferencing
/// a removed node is a programmer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// The operation a node performs. Operand layout conventions:
/// `ArrayIndex` is `[base, index]`, `ArrayUpdate` is `[base, value, index]`,
/// `Select` is `[selector, case...]`, `PrioritySelect` is
/// `[selector, case..., default]`.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Param,
    Literal(Value),
    Identity,
    Tuple,
    TupleIndex(usize),
    Array,
    ArrayIndex,
    ArrayUpdate,
    Select,
    PrioritySelect,
    /// Wrapping addition. Stands in for the open set of opaque scalar ops
    /// the optimizer does not reason about.
    Add,
    /// Bitwise complement. Opaque to the optimizer, like `Add`.
    Not,
}

impl NodeKind {
    /// Mnemonic used for auto-generated node names and listings.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            NodeKind::Param => "param",
            NodeKind::Literal(_) => "literal",
            NodeKind::Identity => "identity",
            NodeKind::Tuple => "tuple",
            NodeKind::TupleIndex(_) => "tuple_index",
            NodeKind::Array => "array",
            NodeKind::ArrayIndex => "array_index",
            NodeKind::ArrayUpdate => "array_update",
            NodeKind::Select => "sel",
            NodeKind::PrioritySelect => "priority_sel",
            NodeKind::Add => "add",
            NodeKind::Not => "not",
        }
    }
}

/// A node in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub operands: Vec<NodeId>,
    pub ty: Type,
    pub name: String,
}

// ── Function ────────────────────────────────────────────────────────────────

/// A function body: an arena of nodes, the parameter list, and the node
/// whose value the function returns.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    /// Arena slots; `None` marks a removed node (ids are never reused).
    nodes: Vec<Option<Node>>,
    /// Per-slot user sets, maintained by the graph on every mutation.
    users: Vec<BTreeSet<NodeId>>,
    params: Vec<NodeId>,
    ret: Option<NodeId>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Function {
        Function {
            name: name.into(),
            nodes: Vec::new(),
            users: Vec::new(),
            params: Vec::new(),
            ret: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Access ──────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> &Node {
        self.try_node(id)
            .unwrap_or_else(|| panic!("node {id:?} has been removed"))
    }

    pub fn try_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.try_node(id).is_some()
    }

    /// Live nodes in id (creation) order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    pub fn params(&self) -> &[NodeId] {
        &self.params
    }

    pub fn return_node(&self) -> Option<NodeId> {
        self.ret
    }

    /// The function returns the value of `id`. Counts as a use for the
    /// purpose of `remove_node`, though it is tracked separately from the
    /// operand user sets.
    pub fn set_return(&mut self, id: NodeId) {
        assert!(self.is_live(id), "return node {id:?} is not live");
        self.ret = Some(id);
    }

    /// Nodes that use `id` as an operand. Does not include the return slot.
    pub fn users(&self, id: NodeId) -> &BTreeSet<NodeId> {
        &self.users[id.0 as usize]
    }

    /// True if nothing references `id`: no operand uses and not the return.
    pub fn is_unused(&self, id: NodeId) -> bool {
        self.users(id).is_empty() && self.ret != Some(id)
    }

    /// If `id` is a scalar literal, its bit value; otherwise `None`. This is
    /// the static-index introspection used to classify array operations.
    pub fn static_index(&self, id: NodeId) -> Option<u64> {
        match &self.node(id).kind {
            NodeKind::Literal(value) => value.as_bits(),
            _ => None,
        }
    }

    // ── Builders ────────────────────────────────────────────────────────

    fn add_node(&mut self, kind: NodeKind, operands: Vec<NodeId>, ty: Type) -> NodeId {
        for &op in &operands {
            assert!(self.is_live(op), "operand {op:?} is not live");
        }
        let id = NodeId(self.nodes.len() as u32);
        let name = format!("{}.{}", kind.mnemonic(), id.0);
        for &op in &operands {
            self.users[op.0 as usize].insert(id);
        }
        self.nodes.push(Some(Node {
            id,
            kind,
            operands,
            ty,
            name,
        }));
        self.users.push(BTreeSet::new());
        id
    }

    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> NodeId {
        let id = self.add_node(NodeKind::Param, vec![], ty);
        self.nodes[id.0 as usize].as_mut().unwrap().name = name.into();
        self.params.push(id);
        id
    }

    pub fn literal(&mut self, value: Value) -> NodeId {
        let ty = value.ty();
        self.add_node(NodeKind::Literal(value), vec![], ty)
    }

    pub fn identity(&mut self, x: NodeId) -> NodeId {
        let ty = self.node(x).ty.clone();
        self.add_node(NodeKind::Identity, vec![x], ty)
    }

    pub fn tuple(&mut self, fields: Vec<NodeId>) -> NodeId {
        let ty = Type::tuple(fields.iter().map(|&f| self.node(f).ty.clone()).collect());
        self.add_node(NodeKind::Tuple, fields, ty)
    }

    pub fn tuple_index(&mut self, tuple: NodeId, index: usize) -> NodeId {
        let fields = self
            .node(tuple)
            .ty
            .tuple_fields()
            .unwrap_or_else(|| panic!("tuple_index operand {tuple:?} is not a tuple"));
        assert!(
            index < fields.len(),
            "tuple_index {index} out of range for {}",
            self.node(tuple).ty
        );
        let ty = fields[index].clone();
        self.add_node(NodeKind::TupleIndex(index), vec![tuple], ty)
    }

    pub fn array(&mut self, elements: Vec<NodeId>) -> NodeId {
        assert!(!elements.is_empty(), "array construction needs elements");
        let elem_ty = self.node(elements[0]).ty.clone();
        for &e in &elements[1..] {
            assert_eq!(
                self.node(e).ty,
                elem_ty,
                "array elements must share a type"
            );
        }
        let size = elements.len();
        self.add_node(NodeKind::Array, elements, Type::array(elem_ty, size))
    }

    pub fn array_index(&mut self, base: NodeId, index: NodeId) -> NodeId {
        let (elem_ty, _) = self
            .node(base)
            .ty
            .array_parts()
            .unwrap_or_else(|| panic!("array_index base {base:?} is not an array"));
        assert!(self.node(index).ty.is_bits(), "array index must be scalar");
        let ty = elem_ty.clone();
        self.add_node(NodeKind::ArrayIndex, vec![base, index], ty)
    }

    pub fn array_update(&mut self, base: NodeId, value: NodeId, index: NodeId) -> NodeId {
        let base_ty = self.node(base).ty.clone();
        let (elem_ty, _) = base_ty
            .array_parts()
            .unwrap_or_else(|| panic!("array_update base {base:?} is not an array"));
        assert_eq!(
            self.node(value).ty,
            *elem_ty,
            "array_update value type must match element type"
        );
        assert!(self.node(index).ty.is_bits(), "array index must be scalar");
        self.add_node(NodeKind::ArrayUpdate, vec![base, value, index], base_ty)
    }

    pub fn select(&mut self, selector: NodeId, cases: Vec<NodeId>) -> NodeId {
        assert!(!cases.is_empty(), "select needs at least one case");
        assert!(self.node(selector).ty.is_bits(), "selector must be scalar");
        let ty = self.node(cases[0]).ty.clone();
        for &c in &cases[1..] {
            assert_eq!(self.node(c).ty, ty, "select cases must share a type");
        }
        let mut operands = vec![selector];
        operands.extend(cases);
        self.add_node(NodeKind::Select, operands, ty)
    }

    pub fn priority_select(
        &mut self,
        selector: NodeId,
        cases: Vec<NodeId>,
        default: NodeId,
    ) -> NodeId {
        assert!(!cases.is_empty(), "priority_sel needs at least one case");
        assert_eq!(
            self.node(selector).ty,
            Type::bits(cases.len() as u32),
            "priority_sel selector width must equal the case count"
        );
        let ty = self.node(cases[0]).ty.clone();
        for &c in &cases[1..] {
            assert_eq!(self.node(c).ty, ty, "priority_sel cases must share a type");
        }
        assert_eq!(self.node(default).ty, ty, "priority_sel default type");
        let mut operands = vec![selector];
        operands.extend(cases);
        operands.push(default);
        self.add_node(NodeKind::PrioritySelect, operands, ty)
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let ty = self.node(a).ty.clone();
        assert!(ty.is_bits(), "add operands must be scalar");
        assert_eq!(self.node(b).ty, ty, "add operands must share a width");
        self.add_node(NodeKind::Add, vec![a, b], ty)
    }

    pub fn not(&mut self, a: NodeId) -> NodeId {
        let ty = self.node(a).ty.clone();
        assert!(ty.is_bits(), "not operand must be scalar");
        self.add_node(NodeKind::Not, vec![a], ty)
    }

    /// Build the tuple_index/array_index chain that extracts the value at
    /// structural path `prefix` out of `base`. Steps with an equivalent
    /// extraction node already in the graph reuse it; fresh array steps
    /// index with 32-bit literals. Returns `base` itself for an empty
    /// prefix.
    pub fn index_chain(&mut self, base: NodeId, prefix: &[usize]) -> NodeId {
        let mut cur = base;
        for &step in prefix {
            if let Some(existing) = self.find_index_user(cur, step) {
                cur = existing;
                continue;
            }
            let ty = self.node(cur).ty.clone();
            cur = match ty {
                Type::Tuple(_) => self.tuple_index(cur, step),
                Type::Array { .. } => {
                    let idx = self.literal(Value::bits(32, step as u64));
                    self.array_index(cur, idx)
                }
                Type::Bits(_) => panic!("index chain step {step} descends into scalar {ty}"),
            };
        }
        cur
    }

    /// An existing user of `base` that extracts exactly child `step` of it,
    /// if any (lowest id wins, for determinism).
    fn find_index_user(&self, base: NodeId, step: usize) -> Option<NodeId> {
        self.users(base).iter().copied().find(|&u| {
            let n = self.node(u);
            match n.kind {
                NodeKind::TupleIndex(i) => i == step && n.operands[0] == base,
                NodeKind::ArrayIndex => {
                    n.operands[0] == base
                        && self.static_index(n.operands[1]) == Some(step as u64)
                }
                _ => false,
            }
        })
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Redirect every use of `from` (operand slots and the return slot) to
    /// `to`. User sets are updated; `from` itself is left in place.
    pub fn replace_uses_with(&mut self, from: NodeId, to: NodeId) {
        assert!(self.is_live(to), "replacement node {to:?} is not live");
        assert_ne!(from, to, "cannot replace a node with itself");
        let user_ids: Vec<NodeId> = self.users(from).iter().copied().collect();
        for u in user_ids {
            let node = self.nodes[u.0 as usize]
                .as_mut()
                .unwrap_or_else(|| panic!("user {u:?} of {from:?} is not live"));
            for op in &mut node.operands {
                if *op == from {
                    *op = to;
                }
            }
            self.users[from.0 as usize].remove(&u);
            self.users[to.0 as usize].insert(u);
        }
        if self.ret == Some(from) {
            self.ret = Some(to);
        }
    }

    /// Detach an unused node from the graph. Panics if anything still
    /// references it.
    pub fn remove_node(&mut self, id: NodeId) {
        assert!(
            self.is_unused(id),
            "cannot remove {id:?}: it still has uses"
        );
        let node = self.nodes[id.0 as usize]
            .take()
            .unwrap_or_else(|| panic!("node {id:?} already removed"));
        for op in node.operands {
            self.users[op.0 as usize].remove(&id);
        }
        self.params.retain(|&p| p != id);
    }

    /// Corrupt a node's declared type, bypassing builder checks. Exists so
    /// tests can exercise malformed-graph detection; upstream producers are
    /// what this guards against in practice.
    #[cfg(test)]
    pub(crate) fn corrupt_type_for_test(&mut self, id: NodeId, ty: Type) {
        self.nodes[id.0 as usize].as_mut().unwrap().ty = ty;
    }

    // ── Traversal ───────────────────────────────────────────────────────

    /// Live nodes in a dependency-respecting order: every operand appears
    /// before its users. Deterministic (ties broken by id).
    pub fn topo_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        for node in self.nodes() {
            self.topo_visit(node.id, &mut visited, &mut order);
        }
        order
    }

    fn topo_visit(&self, id: NodeId, visited: &mut [bool], order: &mut Vec<NodeId>) {
        if visited[id.0 as usize] {
            return;
        }
        visited[id.0 as usize] = true;
        for &op in &self.node(id).operands {
            self.topo_visit(op, visited, order);
        }
        order.push(id);
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, &p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let node = self.node(p);
            write!(f, "{}: {}", node.name, node.ty)?;
        }
        writeln!(f, ") {{")?;
        for node in self.nodes() {
            if matches!(node.kind, NodeKind::Param) {
                continue;
            }
            write!(f, "  {}: {} = {}(", node.name, node.ty, node.kind.mnemonic())?;
            let mut first = true;
            if let NodeKind::Literal(value) = &node.kind {
                write!(f, "{value}")?;
                first = false;
            }
            for &op in &node.operands {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.node(op).name)?;
                first = false;
            }
            if let NodeKind::TupleIndex(i) = node.kind {
                write!(f, ", index={i}")?;
            }
            writeln!(f, ")")?;
        }
        if let Some(ret) = self.ret {
            writeln!(f, "  ret {}", self.node(ret).name)?;
        }
        write!(f, "}}")
    }
}
