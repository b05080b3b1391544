use crate::language::{builtins::is_builtin, errors::SyntaxError, span::Span};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Int(i32),
    Variable(String),
    Call(CallExpr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallExpr {
    pub func: String,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(CallExpr {
            func: func.into(),
            args,
        })
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Expr::Int(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Block(Vec<Statement>),
    Set(SetStmt),
    If(IfStmt),
    For(ForStmt),
    Return(Expr),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetStmt {
    pub name: String,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfStmt {
    pub condition: Expr,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForStmt {
    pub init: Box<Statement>,
    pub test: Expr,
    pub update: Box<Statement>,
    pub body: Box<Statement>,
}

impl Statement {
    pub fn set(name: impl Into<String>, value: Expr) -> Self {
        Statement::Set(SetStmt {
            name: name.into(),
            value,
        })
    }

    pub fn if_then(condition: Expr, body: Statement) -> Self {
        Statement::If(IfStmt {
            condition,
            body: Box::new(body),
        })
    }

    pub fn for_loop(init: Statement, test: Expr, update: Statement, body: Statement) -> Self {
        Statement::For(ForStmt {
            init: Box::new(init),
            test,
            update: Box::new(update),
            body: Box::new(body),
        })
    }

    /// `(== 0 0)`: keeps a statement position well formed without doing anything.
    pub fn no_op() -> Self {
        Statement::Expr(Expr::call("==", vec![Expr::Int(0), Expr::Int(0)]))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Statement,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalDecl {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Function(FunctionDecl),
    Global(GlobalDecl),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Function(def) => &def.name,
            Item::Global(def) => &def.name,
        }
    }
}

/// A validated program. Declaration order is kept for display only.
#[derive(Clone, Debug)]
pub struct Program {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Program {}

impl Program {
    pub fn new(items: Vec<Item>) -> Result<Self, SyntaxError> {
        let mut index = HashMap::new();
        for (position, item) in items.iter().enumerate() {
            let name = item.name();
            if is_builtin(name) {
                return Err(SyntaxError::new(
                    format!("Redefining built-in construct: {name}"),
                    Span::default(),
                )
                .with_token(name));
            }
            if index.insert(name.to_string(), position).is_some() {
                return Err(SyntaxError::new(
                    format!("Duplicate program element: {name}"),
                    Span::default(),
                )
                .with_token(name));
            }
        }

        let globals: HashSet<&str> = items
            .iter()
            .filter_map(|item| match item {
                Item::Global(def) => Some(def.name.as_str()),
                Item::Function(_) => None,
            })
            .collect();
        for item in &items {
            let Item::Function(def) = item else {
                continue;
            };
            let mut seen = HashSet::new();
            for param in &def.params {
                if !seen.insert(param.as_str()) {
                    return Err(SyntaxError::new(
                        format!("Duplicate parameter `{param}` in function {}", def.name),
                        Span::default(),
                    )
                    .with_token(param.as_str()));
                }
                if globals.contains(param.as_str()) {
                    return Err(SyntaxError::new(
                        format!("Parameter `{param}` of {} shadows a global", def.name),
                        Span::default(),
                    )
                    .with_token(param.as_str()));
                }
            }
        }

        Ok(Self { items, index })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(def) => Some(def),
            Item::Global(_) => None,
        })
    }

    pub fn globals(&self) -> impl Iterator<Item = &GlobalDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Global(def) => Some(def),
            Item::Function(_) => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        match self.index.get(name).map(|&position| &self.items[position]) {
            Some(Item::Function(def)) => Some(def),
            _ => None,
        }
    }

    pub fn is_global(&self, name: &str) -> bool {
        matches!(
            self.index.get(name).map(|&position| &self.items[position]),
            Some(Item::Global(_))
        )
    }

    /// True when `name` is a declared function or global.
    pub fn declares(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Rebuilds every function body. Names and parameters are untouched so the
    /// declaration invariants still hold.
    pub fn map_bodies(&self, mut f: impl FnMut(&FunctionDecl) -> Statement) -> Program {
        let items = self
            .items
            .iter()
            .map(|item| match item {
                Item::Function(def) => Item::Function(FunctionDecl {
                    name: def.name.clone(),
                    params: def.params.clone(),
                    body: f(def),
                }),
                Item::Global(def) => Item::Global(def.clone()),
            })
            .collect();
        Program {
            items,
            index: self.index.clone(),
        }
    }

    /// Program length as the size signal measures it: one per expression
    /// node and per non-block statement. A `return` counts once whatever its
    /// value, a `for` counts its body twice and skips its initializer.
    pub fn length(&self) -> usize {
        self.functions().map(|f| statement_length(&f.body)).sum()
    }
}

fn statement_length(stmt: &Statement) -> usize {
    match stmt {
        Statement::Block(body) => body.iter().map(statement_length).sum(),
        Statement::Set(set) => 1 + expr_length(&set.value),
        Statement::If(stmt) => 1 + expr_length(&stmt.condition) + statement_length(&stmt.body),
        Statement::For(stmt) => {
            1 + expr_length(&stmt.test)
                + statement_length(&stmt.update)
                + 2 * statement_length(&stmt.body)
        }
        Statement::Return(_) => 1,
        Statement::Expr(value) => 1 + expr_length(value),
    }
}

fn expr_length(expr: &Expr) -> usize {
    match expr {
        Expr::Int(_) | Expr::Variable(_) => 1,
        Expr::Call(call) => 1 + call.args.iter().map(expr_length).sum::<usize>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_returning(value: i32) -> Item {
        Item::Function(FunctionDecl {
            name: "main".into(),
            params: Vec::new(),
            body: Statement::Return(Expr::Int(value)),
        })
    }

    #[test]
    fn rejects_duplicate_declarations() {
        let items = vec![main_returning(0), main_returning(1)];
        let err = Program::new(items).unwrap_err();
        assert!(err.message.contains("Duplicate program element"));
    }

    #[test]
    fn rejects_builtin_redefinition() {
        let err = Program::new(vec![Item::Global(GlobalDecl {
            name: "array.get".into(),
        })])
        .unwrap_err();
        assert!(err.message.contains("Redefining built-in"));
    }

    #[test]
    fn rejects_parameter_shadowing_global() {
        let err = Program::new(vec![
            Item::Global(GlobalDecl { name: "n".into() }),
            Item::Function(FunctionDecl {
                name: "f".into(),
                params: vec!["n".into()],
                body: Statement::Block(Vec::new()),
            }),
        ])
        .unwrap_err();
        assert!(err.message.contains("shadows a global"));
    }

    #[test]
    fn lookups_distinguish_functions_and_globals() {
        let program = Program::new(vec![
            Item::Global(GlobalDecl { name: "g".into() }),
            main_returning(0),
        ])
        .unwrap();
        assert!(program.function("main").is_some());
        assert!(program.function("g").is_none());
        assert!(program.is_global("g"));
        assert!(!program.is_global("main"));
        assert_eq!(program.length(), 1);
    }

    #[test]
    fn length_weighs_loops_and_ignores_blocks() {
        let counter = |n: i32| {
            Statement::set("i", Expr::call("+", vec![Expr::var("i"), Expr::Int(n)]))
        };
        let print = Statement::Expr(Expr::call("print", vec![Expr::var("i")]));
        let body = Statement::Block(vec![Statement::for_loop(
            counter(0),
            Expr::call("<", vec![Expr::var("i"), Expr::Int(3)]),
            counter(1),
            Statement::Block(vec![print]),
        )]);
        let program = Program::new(vec![Item::Function(FunctionDecl {
            name: "main".into(),
            params: Vec::new(),
            body,
        })])
        .unwrap();
        // for 1, test 3, update 4, body 2 * (statement 1 + call 2)
        assert_eq!(program.length(), 14);
    }
}
