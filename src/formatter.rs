use crate::language::ast::*;
use std::fmt;

/// Canonical text form: nested statements on their own lines, indented two
/// spaces per level, and a blank line after every declaration.
pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for item in program.items() {
        match item {
            Item::Function(def) => out.push_str(&format_function(def)),
            Item::Global(def) => out.push_str(&format!("(global {})", def.name)),
        }
        out.push_str("\n\n");
    }
    out
}

pub fn format_function(def: &FunctionDecl) -> String {
    let mut header = def.name.clone();
    for param in &def.params {
        header.push(' ');
        header.push_str(param);
    }
    format!(
        "(function ({header}){}",
        nested(&format_statement(&def.body))
    )
}

pub fn format_statement(stmt: &Statement) -> String {
    match stmt {
        Statement::Block(body) => {
            let mut out = String::from("(block");
            for inner in body {
                out.push_str(&nested(&format_statement(inner)));
            }
            out.push(')');
            out
        }
        Statement::Set(set) => format!("(set {} {})", set.name, format_expr(&set.value)),
        Statement::If(stmt) => format!(
            "(if {}{})",
            format_expr(&stmt.condition),
            nested(&format_statement(&stmt.body))
        ),
        Statement::For(stmt) => format!(
            "(for{}{}{}{})",
            nested(&format_statement(&stmt.init)),
            nested(&format_expr(&stmt.test)),
            nested(&format_statement(&stmt.update)),
            nested(&format_statement(&stmt.body))
        ),
        Statement::Return(value) => format!("(return {})", format_expr(value)),
        Statement::Expr(expr) => format_expr(expr),
    }
}

pub fn format_expr(expr: &Expr) -> String {
    match expr {
        Expr::Int(value) => value.to_string(),
        Expr::Variable(name) => name.clone(),
        Expr::Call(call) => format_call(call),
    }
}

pub fn format_call(call: &CallExpr) -> String {
    let mut out = format!("({}", call.func);
    for arg in &call.args {
        out.push(' ');
        out.push_str(&format_expr(arg));
    }
    out.push(')');
    out
}

/// Starts `text` on a fresh line and shifts every line of it right by two.
fn nested(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 3);
    out.push_str("\n  ");
    out.push_str(&text.replace('\n', "\n  "));
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_expr(self))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_statement(self))
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_function(self))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_program(self))
    }
}
