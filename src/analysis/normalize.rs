//! Constant propagation and dead-branch removal, run to a fixed point so that
//! inserted guards and folded arithmetic compare equal to the plain program.
//!
//! Parameters and globals are never treated as constants. A local counts as
//! constant when every assignment to it in the function stores the same
//! integer literal. Division and modulo by a literal zero are left unfolded.

use crate::language::{ast::*, builtins::Builtin};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub fn normalize_program(program: &Program) -> Program {
    let globals: HashSet<String> = program.globals().map(|def| def.name.clone()).collect();
    program.map_bodies(|f| normalize_function(f, &globals).body)
}

pub fn normalize_function(def: &FunctionDecl, globals: &HashSet<String>) -> FunctionDecl {
    let mut current = def.clone();
    let mut passes = 1;
    loop {
        let next = normalize_once(&current, globals);
        if next == current {
            debug!(function = %def.name, passes, "normalization reached a fixed point");
            return next;
        }
        current = next;
        passes += 1;
    }
}

fn normalize_once(def: &FunctionDecl, globals: &HashSet<String>) -> FunctionDecl {
    let constants = constant_locals(def, globals);
    let folder = Folder {
        constants: &constants,
    };
    FunctionDecl {
        name: def.name.clone(),
        params: def.params.clone(),
        body: folder
            .statement(&def.body)
            .unwrap_or_else(|| Statement::Block(Vec::new())),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Assigned {
    Constant(i32),
    Varies,
}

fn constant_locals(def: &FunctionDecl, globals: &HashSet<String>) -> HashMap<String, i32> {
    let mut seen = HashMap::new();
    collect_assignments(&def.body, &mut seen);
    seen.into_iter()
        .filter(|(name, _)| !globals.contains(*name))
        .filter(|(name, _)| !def.params.iter().any(|p| p == name))
        .filter_map(|(name, assigned)| match assigned {
            Assigned::Constant(value) => Some((name.to_string(), value)),
            Assigned::Varies => None,
        })
        .collect()
}

fn collect_assignments<'a>(stmt: &'a Statement, seen: &mut HashMap<&'a str, Assigned>) {
    match stmt {
        Statement::Block(body) => {
            for inner in body {
                collect_assignments(inner, seen);
            }
        }
        Statement::Set(set) => {
            let assigned = match set.value.as_int() {
                Some(value) => Assigned::Constant(value),
                None => Assigned::Varies,
            };
            seen.entry(set.name.as_str())
                .and_modify(|previous| {
                    if *previous != assigned {
                        *previous = Assigned::Varies;
                    }
                })
                .or_insert(assigned);
        }
        Statement::If(stmt) => collect_assignments(&stmt.body, seen),
        Statement::For(stmt) => {
            collect_assignments(&stmt.init, seen);
            collect_assignments(&stmt.update, seen);
            collect_assignments(&stmt.body, seen);
        }
        Statement::Return(_) | Statement::Expr(_) => {}
    }
}

/// True when evaluating `expr` can do more than read variables: call a user
/// function, perform I/O, touch an array, or divide.
pub fn has_side_effects(expr: &Expr) -> bool {
    match expr {
        Expr::Int(_) | Expr::Variable(_) => false,
        Expr::Call(call) => {
            let pure_operator = match Builtin::from_name(&call.func) {
                Some(Builtin::Div | Builtin::Rem) | None => false,
                Some(builtin) => builtin.is_operator(),
            };
            !pure_operator || call.args.iter().any(has_side_effects)
        }
    }
}

struct Folder<'c> {
    constants: &'c HashMap<String, i32>,
}

impl Folder<'_> {
    fn expr(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Int(_) => expr.clone(),
            Expr::Variable(name) => match self.constants.get(name) {
                Some(value) => Expr::Int(*value),
                None => expr.clone(),
            },
            Expr::Call(call) => {
                let args: Vec<Expr> = call.args.iter().map(|arg| self.expr(arg)).collect();
                let folded = Builtin::from_name(&call.func)
                    .filter(|op| op.is_operator() && op.arity() == args.len())
                    .and_then(|builtin| {
                        let literals = args.iter().map(Expr::as_int).collect::<Option<Vec<_>>>()?;
                        builtin.apply_operator(&literals)
                    });
                match folded {
                    Some(value) => Expr::Int(value),
                    None => Expr::call(call.func.clone(), args),
                }
            }
        }
    }

    /// Rewrites one statement; `None` means it has no remaining effect.
    fn statement(&self, stmt: &Statement) -> Option<Statement> {
        match stmt {
            Statement::Block(body) => Some(Statement::Block(
                body.iter().filter_map(|s| self.statement(s)).collect(),
            )),
            Statement::Set(set) => Some(Statement::set(set.name.clone(), self.expr(&set.value))),
            Statement::If(stmt) => {
                let condition = self.expr(&stmt.condition);
                match condition.as_int() {
                    Some(0) => None,
                    Some(_) => self.statement(&stmt.body),
                    None => match self.statement(&stmt.body) {
                        Some(body) => Some(Statement::if_then(condition, body)),
                        None if has_side_effects(&condition) => Some(Statement::Expr(condition)),
                        None => None,
                    },
                }
            }
            Statement::For(stmt) => {
                let position = |s: &Statement| self.statement(s).unwrap_or_else(Statement::no_op);
                Some(Statement::for_loop(
                    position(&stmt.init),
                    self.expr(&stmt.test),
                    position(&stmt.update),
                    position(&stmt.body),
                ))
            }
            Statement::Return(value) => Some(Statement::Return(self.expr(value))),
            Statement::Expr(expr) => {
                let expr = self.expr(expr);
                match expr {
                    Expr::Int(_) => None,
                    _ => Some(Statement::Expr(expr)),
                }
            }
        }
    }
}
