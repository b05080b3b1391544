use crate::language::{ast::*, builtins::Builtin};
use std::fmt;

/// Static call-site counts of the array builtins, in
/// [`Builtin::ARRAY_OPERATIONS`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    counts: [usize; 5],
}

impl CallCounts {
    pub fn from_program(program: &Program) -> Self {
        let mut counts = CallCounts::default();
        for def in program.functions() {
            counts.visit_statement(&def.body);
        }
        counts
    }

    pub fn get(&self, builtin: Builtin) -> usize {
        Self::slot(builtin).map_or(0, |slot| self.counts[slot])
    }

    pub fn as_array(&self) -> [usize; 5] {
        self.counts
    }

    fn slot(builtin: Builtin) -> Option<usize> {
        Builtin::ARRAY_OPERATIONS
            .iter()
            .position(|candidate| *candidate == builtin)
    }

    /// `for` bodies are visited twice and `for` initializers never. Return
    /// values are not inspected.
    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(body) => body.iter().for_each(|inner| self.visit_statement(inner)),
            Statement::Set(set) => self.visit_expr(&set.value),
            Statement::If(stmt) => {
                self.visit_expr(&stmt.condition);
                self.visit_statement(&stmt.body);
            }
            Statement::For(stmt) => {
                self.visit_statement(&stmt.body);
                self.visit_expr(&stmt.test);
                self.visit_statement(&stmt.update);
                self.visit_statement(&stmt.body);
            }
            Statement::Return(_) => {}
            Statement::Expr(value) => self.visit_expr(value),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Call(call) = expr {
            if let Some(slot) = Builtin::from_name(&call.func).and_then(Self::slot) {
                self.counts[slot] += 1;
            }
            call.args.iter().for_each(|arg| self.visit_expr(arg));
        }
    }
}

impl fmt::Display for CallCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, builtin) in Builtin::ARRAY_OPERATIONS.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", builtin.name(), self.counts[idx])?;
        }
        Ok(())
    }
}
