//! Semantics-preserving program transformations, used to check that the
//! similarity scorer sees through superficial edits.

use crate::language::{ast::*, errors::SyntaxError};
use std::collections::HashSet;

/// Default methods rebuild the tree unchanged; implementors override the
/// nodes they care about and call the `walk_*` helpers to keep recursing.
pub trait Rewrite {
    fn rewrite_program(&mut self, program: &Program) -> Result<Program, SyntaxError> {
        let items = program
            .items()
            .iter()
            .map(|item| match item {
                Item::Function(def) => Item::Function(self.rewrite_function(def)),
                Item::Global(def) => Item::Global(GlobalDecl {
                    name: self.rewrite_variable(&def.name),
                }),
            })
            .collect();
        Program::new(items)
    }

    fn rewrite_function(&mut self, def: &FunctionDecl) -> FunctionDecl {
        walk_function(self, def)
    }

    fn rewrite_statement(&mut self, stmt: &Statement) -> Statement {
        walk_statement(self, stmt)
    }

    fn rewrite_expr(&mut self, expr: &Expr) -> Expr {
        walk_expr(self, expr)
    }

    /// Applied to every variable occurrence: parameters, assignment targets,
    /// reads and global declarations.
    fn rewrite_variable(&mut self, name: &str) -> String {
        name.to_string()
    }
}

pub fn walk_function<R: Rewrite + ?Sized>(rewriter: &mut R, def: &FunctionDecl) -> FunctionDecl {
    FunctionDecl {
        name: def.name.clone(),
        params: def
            .params
            .iter()
            .map(|param| rewriter.rewrite_variable(param))
            .collect(),
        body: rewriter.rewrite_statement(&def.body),
    }
}

pub fn walk_statement<R: Rewrite + ?Sized>(rewriter: &mut R, stmt: &Statement) -> Statement {
    match stmt {
        Statement::Block(body) => Statement::Block(
            body.iter()
                .map(|inner| rewriter.rewrite_statement(inner))
                .collect(),
        ),
        Statement::Set(set) => {
            let value = rewriter.rewrite_expr(&set.value);
            Statement::set(rewriter.rewrite_variable(&set.name), value)
        }
        Statement::If(stmt) => {
            let condition = rewriter.rewrite_expr(&stmt.condition);
            Statement::if_then(condition, rewriter.rewrite_statement(&stmt.body))
        }
        Statement::For(stmt) => {
            let init = rewriter.rewrite_statement(&stmt.init);
            let test = rewriter.rewrite_expr(&stmt.test);
            let update = rewriter.rewrite_statement(&stmt.update);
            let body = rewriter.rewrite_statement(&stmt.body);
            Statement::for_loop(init, test, update, body)
        }
        Statement::Return(value) => Statement::Return(rewriter.rewrite_expr(value)),
        Statement::Expr(expr) => Statement::Expr(rewriter.rewrite_expr(expr)),
    }
}

pub fn walk_expr<R: Rewrite + ?Sized>(rewriter: &mut R, expr: &Expr) -> Expr {
    match expr {
        Expr::Int(value) => Expr::Int(*value),
        Expr::Variable(name) => Expr::Variable(rewriter.rewrite_variable(name)),
        Expr::Call(call) => Expr::call(
            call.func.clone(),
            call.args
                .iter()
                .map(|arg| rewriter.rewrite_expr(arg))
                .collect(),
        ),
    }
}

/// Prefixes every variable name. Function names are kept.
pub struct RenameVariables {
    pub prefix: String,
}

impl RenameVariables {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for RenameVariables {
    fn default() -> Self {
        Self::new("ppca-")
    }
}

impl Rewrite for RenameVariables {
    fn rewrite_variable(&mut self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}

/// Wraps every statement of every block in `(if (== a b) ...)` where `a` and
/// `b` are fresh locals both set to 0 on function entry.
#[derive(Default)]
pub struct DeadBranchInsertion {
    guards: Option<(String, String)>,
}

impl DeadBranchInsertion {
    fn guard(&self) -> Expr {
        match &self.guards {
            Some((a, b)) => Expr::call("==", vec![Expr::var(a.clone()), Expr::var(b.clone())]),
            None => Expr::Int(1),
        }
    }
}

impl Rewrite for DeadBranchInsertion {
    fn rewrite_program(&mut self, program: &Program) -> Result<Program, SyntaxError> {
        let used = used_names(program);
        let mut fresh = (0..)
            .map(|n| format!("guard-{n}"))
            .filter(|name| !used.contains(name));
        if let (Some(a), Some(b)) = (fresh.next(), fresh.next()) {
            self.guards = Some((a, b));
        }
        let items = program
            .items()
            .iter()
            .map(|item| match item {
                Item::Function(def) => Item::Function(self.rewrite_function(def)),
                Item::Global(def) => Item::Global(def.clone()),
            })
            .collect();
        Program::new(items)
    }

    fn rewrite_function(&mut self, def: &FunctionDecl) -> FunctionDecl {
        let Some((a, b)) = self.guards.clone() else {
            return def.clone();
        };
        let mut body = vec![
            Statement::set(a, Expr::Int(0)),
            Statement::set(b, Expr::Int(0)),
        ];
        match self.rewrite_statement(&def.body) {
            Statement::Block(inner) => body.extend(inner),
            other => body.push(Statement::if_then(self.guard(), other)),
        }
        FunctionDecl {
            name: def.name.clone(),
            params: def.params.clone(),
            body: Statement::Block(body),
        }
    }

    fn rewrite_statement(&mut self, stmt: &Statement) -> Statement {
        match stmt {
            Statement::Block(body) => Statement::Block(
                body.iter()
                    .map(|inner| {
                        let inner = self.rewrite_statement(inner);
                        Statement::if_then(self.guard(), inner)
                    })
                    .collect(),
            ),
            _ => walk_statement(self, stmt),
        }
    }
}

/// Replaces literals and `+`/`-` calls with arithmetically equal forms:
/// `n` becomes `(+ 1 n-1)`, `(- a b)` becomes `(+ a (- 0 b))` and `(+ a b)`
/// becomes `(- a (- 0 b))`.
#[derive(Default)]
pub struct IdentityExpansion;

impl Rewrite for IdentityExpansion {
    fn rewrite_expr(&mut self, expr: &Expr) -> Expr {
        match walk_expr(self, expr) {
            Expr::Int(value) => {
                Expr::call("+", vec![Expr::Int(1), Expr::Int(value.wrapping_sub(1))])
            }
            Expr::Call(call) if call.args.len() == 2 && (call.func == "-" || call.func == "+") => {
                let [lhs, rhs]: [Expr; 2] = match call.args.try_into() {
                    Ok(pair) => pair,
                    Err(args) => return Expr::call(call.func, args),
                };
                let negated = Expr::call("-", vec![Expr::Int(0), rhs]);
                let func = if call.func == "-" { "+" } else { "-" };
                Expr::call(func, vec![lhs, negated])
            }
            other => other,
        }
    }
}

/// Every identifier the program mentions: declarations, parameters and
/// variable occurrences.
pub fn used_names(program: &Program) -> HashSet<String> {
    struct Collector(HashSet<String>);

    impl Rewrite for Collector {
        fn rewrite_variable(&mut self, name: &str) -> String {
            self.0.insert(name.to_string());
            name.to_string()
        }
    }

    let mut collector = Collector(HashSet::new());
    for item in program.items() {
        collector.0.insert(item.name().to_string());
        if let Item::Function(def) = item {
            collector.rewrite_function(def);
        }
    }
    collector.0
}
