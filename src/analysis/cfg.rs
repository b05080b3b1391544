//! Interprocedural control-flow graph and DFS edge classification.
//!
//! Every function owns an entry and a return node. Calls made from expression
//! statements jump to the callee's entry and continue from its return node, so
//! the graph reachable from `main` covers every function it calls.

use crate::language::{ast::*, builtins::is_builtin};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Entry(String),
    Return(String),
    If,
    For,
    LoopBody,
    Join,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeStats {
    pub tree: usize,
    pub back: usize,
    /// Edges to already finished nodes, forward and cross alike.
    pub forward: usize,
}

#[derive(Clone, Debug)]
pub struct Cfg {
    nodes: Vec<Node>,
    entries: HashMap<String, NodeId>,
    returns: HashMap<String, NodeId>,
    entry: Option<NodeId>,
}

impl Cfg {
    pub fn build(program: &Program) -> Self {
        let mut cfg = Cfg {
            nodes: Vec::new(),
            entries: HashMap::new(),
            returns: HashMap::new(),
            entry: None,
        };
        for def in program.functions() {
            let entry = cfg.add_node(NodeKind::Entry(def.name.clone()));
            let ret = cfg.add_node(NodeKind::Return(def.name.clone()));
            cfg.entries.insert(def.name.clone(), entry);
            cfg.returns.insert(def.name.clone(), ret);
        }
        for def in program.functions() {
            cfg.add_function(def);
        }
        cfg.entry = cfg.entries.get("main").copied();
        debug!(
            nodes = cfg.nodes.len(),
            edges = cfg.edge_count(),
            has_main = cfg.entry.is_some(),
            "built control-flow graph"
        );
        cfg
    }

    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    pub fn function_entry(&self, name: &str) -> Option<NodeId> {
        self.entries.get(name).copied()
    }

    pub fn function_return(&self, name: &str) -> Option<NodeId> {
        self.returns.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.successors.len()).sum()
    }

    /// Classifies every edge reachable from `main` with a depth-first search
    /// that visits successors in insertion order.
    pub fn edge_stats(&self) -> EdgeStats {
        let mut stats = EdgeStats::default();
        let Some(root) = self.entry else {
            return stats;
        };
        let mut discovered = vec![false; self.nodes.len()];
        let mut finished = vec![false; self.nodes.len()];
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        discovered[root.0] = true;

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            match self.nodes[node.0].successors.get(next) {
                Some(&child) => {
                    top.1 += 1;
                    if !discovered[child.0] {
                        stats.tree += 1;
                        discovered[child.0] = true;
                        stack.push((child, 0));
                    } else if !finished[child.0] {
                        stats.back += 1;
                    } else {
                        stats.forward += 1;
                    }
                }
                None => {
                    finished[node.0] = true;
                    stack.pop();
                }
            }
        }
        stats
    }

    /// Graphviz rendering, one `n<index>` vertex per node.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph cfg {\n");
        for (index, node) in self.nodes.iter().enumerate() {
            let label = match &node.kind {
                NodeKind::Entry(name) => format!("entry {name}"),
                NodeKind::Return(name) => format!("return {name}"),
                NodeKind::If => "if".to_string(),
                NodeKind::For => "for".to_string(),
                NodeKind::LoopBody => "body".to_string(),
                NodeKind::Join => "join".to_string(),
            };
            let _ = writeln!(out, "  n{index} [label=\"{label}\"];");
        }
        for (index, node) in self.nodes.iter().enumerate() {
            for succ in &node.successors {
                let _ = writeln!(out, "  n{index} -> n{};", succ.0);
            }
        }
        out.push_str("}\n");
        out
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            successors: Vec::new(),
            predecessors: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.0].successors.push(to);
        self.nodes[to.0].predecessors.push(from);
    }

    fn add_function(&mut self, def: &FunctionDecl) {
        let entry = self.function_entry(&def.name);
        let (Some(entry), Some(ret)) = (entry, self.function_return(&def.name)) else {
            return;
        };
        let last = self.walk_statement(&def.body, entry, ret);
        if last != ret {
            self.connect(last, ret);
        }
    }

    fn walk_statement(&mut self, stmt: &Statement, current: NodeId, ret: NodeId) -> NodeId {
        match stmt {
            Statement::Block(body) => body
                .iter()
                .fold(current, |node, next| self.walk_statement(next, node, ret)),
            Statement::If(stmt) => {
                let branch = self.add_node(NodeKind::If);
                self.connect(current, branch);
                let then_exit = self.walk_statement(&stmt.body, branch, ret);
                let join = self.add_node(NodeKind::Join);
                self.connect(then_exit, join);
                self.connect(current, join);
                join
            }
            Statement::For(stmt) => {
                let init_exit = self.walk_statement(&stmt.init, current, ret);
                let test = self.add_node(NodeKind::For);
                let body = self.add_node(NodeKind::LoopBody);
                let end = self.add_node(NodeKind::Join);
                self.connect(init_exit, test);
                self.connect(test, end);
                self.connect(test, body);
                let body_exit = self.walk_statement(&stmt.body, body, ret);
                let update_exit = self.walk_statement(&stmt.update, body_exit, ret);
                self.connect(update_exit, test);
                end
            }
            Statement::Return(_) => {
                self.connect(current, ret);
                ret
            }
            Statement::Expr(expr) => self.walk_expr(expr, current),
            Statement::Set(_) => current,
        }
    }

    fn walk_expr(&mut self, expr: &Expr, current: NodeId) -> NodeId {
        let Expr::Call(call) = expr else {
            return current;
        };
        let current = call
            .args
            .iter()
            .fold(current, |node, arg| self.walk_expr(arg, node));
        if is_builtin(&call.func) {
            return current;
        }
        let entry = self.function_entry(&call.func);
        match (entry, self.function_return(&call.func)) {
            (Some(entry), Some(ret)) => {
                self.connect(current, entry);
                ret
            }
            _ => current,
        }
    }
}
