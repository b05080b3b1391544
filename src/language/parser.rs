use crate::language::{
    ast::*,
    errors::SyntaxError,
    lexer::{is_literal, is_valid_identifier, looks_numeric, raw_token, trivia},
    span::{Span, Spanned},
};

/// Identifier that ends a program early so several programs (and trailing
/// input) can share one stream.
pub const PROGRAM_SENTINEL: &str = "endprogram";

const MAX_NESTING: usize = 1_000;

/// One top-level result of [`Scanner::next_construct`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Construct {
    Expr(Expr),
    Statement(Statement),
    Function(FunctionDecl),
    Global(GlobalDecl),
}

impl Construct {
    fn kind(&self) -> &'static str {
        match self {
            Construct::Expr(_) => "expression",
            Construct::Statement(_) => "statement",
            Construct::Function(_) => "function declaration",
            Construct::Global(_) => "global declaration",
        }
    }
}

pub fn parse_program(source: &str) -> Result<Program, SyntaxError> {
    Scanner::new(source).scan_program()
}

/// Recursive-descent reader over a source string. Input is consumed lazily,
/// one construct per call.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Reads declarations until end of input or the sentinel identifier.
    pub fn scan_program(&mut self) -> Result<Program, SyntaxError> {
        let mut items = Vec::new();
        let mut spans = Vec::new();
        while let Some(construct) = self.next_construct()? {
            let item = match construct.node {
                Construct::Function(def) => Item::Function(def),
                Construct::Global(def) => Item::Global(def),
                Construct::Expr(Expr::Variable(name)) if name == PROGRAM_SENTINEL => break,
                other => {
                    return Err(SyntaxError::new("Invalid program element", construct.span)
                        .with_help(format!(
                            "only `function` and `global` may appear at top level, found a {}",
                            other.kind()
                        )));
                }
            };
            items.push(item);
            spans.push(construct.span);
        }
        Program::new(items.clone()).map_err(|mut err| {
            if let Some(token) = &err.token {
                if let Some(position) = items.iter().rposition(|item| item.name() == token) {
                    err.span = spans[position];
                }
            }
            err
        })
    }

    /// Produces the next construct, or `None` at end of input.
    pub fn next_construct(&mut self) -> Result<Option<Spanned<Construct>>, SyntaxError> {
        self.skip_trivia();
        match self.peek() {
            None => Ok(None),
            Some(_) => self.scan_construct().map(Some),
        }
    }

    fn scan_construct(&mut self) -> Result<Spanned<Construct>, SyntaxError> {
        self.skip_trivia();
        let start = self.pos;
        match self.peek() {
            None => Err(self.unexpected_eof()),
            Some('(') => {
                self.bump();
                if self.depth >= MAX_NESTING {
                    return Err(SyntaxError::new(
                        "Constructs nested too deeply",
                        Span::point(start),
                    ));
                }
                self.depth += 1;
                let result = self.scan_compound(start);
                self.depth -= 1;
                result
            }
            Some(_) => self.scan_atom().map(|atom| atom.map(Construct::Expr)),
        }
    }

    fn scan_atom(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let (token, span) = self.take_token();
        if token.is_empty() {
            let found = self.peek().map(String::from).unwrap_or_default();
            let err = SyntaxError::new(format!("Unexpected `{found}`"), Span::point(span.start));
            return Err(err.with_token(found));
        }
        if looks_numeric(token) {
            if !is_literal(token) {
                return Err(invalid_token("literal", token, span));
            }
            return token
                .parse::<i32>()
                .map(|value| Spanned::new(Expr::Int(value), span))
                .map_err(|_| {
                    invalid_token("literal", token, span)
                        .with_help("integer literals must fit in 32 bits")
                });
        }
        if is_valid_identifier(token) {
            return Ok(Spanned::new(Expr::Variable(token.to_string()), span));
        }
        Err(invalid_token("identifier", token, span))
    }

    fn scan_compound(&mut self, start: usize) -> Result<Spanned<Construct>, SyntaxError> {
        let (head, head_span) = self.take_token();
        let construct = match head {
            "set" => self.scan_set().map_err(|err| err.within("set"))?,
            "if" => self.scan_if().map_err(|err| err.within("if"))?,
            "for" => self.scan_for().map_err(|err| err.within("for"))?,
            "block" => self.scan_block().map_err(|err| err.within("block"))?,
            "return" => self.scan_return().map_err(|err| err.within("return"))?,
            "function" => self.scan_function().map_err(|err| err.within("function"))?,
            "global" => self.scan_global().map_err(|err| err.within("global"))?,
            _ => {
                if !is_valid_identifier(head) {
                    return Err(invalid_token("identifier", head, head_span));
                }
                self.scan_call(head).map_err(|err| err.within(head))?
            }
        };
        Ok(Spanned::new(construct, Span::new(start, self.pos)))
    }

    fn scan_set(&mut self) -> Result<Construct, SyntaxError> {
        let (name, _) = self.expect_identifier()?;
        let value = self.expect_expression()?;
        self.expect_close()?;
        Ok(Construct::Statement(Statement::set(name, value)))
    }

    fn scan_if(&mut self) -> Result<Construct, SyntaxError> {
        let condition = self.expect_expression()?;
        let body = self.expect_statement()?;
        self.expect_close()?;
        Ok(Construct::Statement(Statement::if_then(condition, body)))
    }

    fn scan_for(&mut self) -> Result<Construct, SyntaxError> {
        let init = self.expect_statement()?;
        let test = self.expect_expression()?;
        let update = self.expect_statement()?;
        let body = self.expect_statement()?;
        self.expect_close()?;
        let stmt = Statement::for_loop(init, test, update, body);
        Ok(Construct::Statement(stmt))
    }

    fn scan_block(&mut self) -> Result<Construct, SyntaxError> {
        let mut body = Vec::new();
        while !self.at_close()? {
            body.push(self.expect_statement()?);
        }
        self.expect_close()?;
        Ok(Construct::Statement(Statement::Block(body)))
    }

    fn scan_return(&mut self) -> Result<Construct, SyntaxError> {
        let value = self.expect_expression()?;
        self.expect_close()?;
        Ok(Construct::Statement(Statement::Return(value)))
    }

    fn scan_function(&mut self) -> Result<Construct, SyntaxError> {
        self.skip_trivia();
        match self.peek() {
            Some('(') => {
                self.bump();
            }
            None => return Err(self.unexpected_eof()),
            Some(found) => {
                return Err(SyntaxError::new(
                    "Opening parenthesis expected",
                    Span::new(self.pos, self.pos + found.len_utf8()),
                )
                .with_token(found.to_string()));
            }
        }
        let (name, _) = self.expect_identifier()?;
        let mut params = Vec::new();
        while !self.at_close()? {
            let (param, _) = self.expect_identifier()?;
            params.push(param);
        }
        self.expect_close()?;
        let body = self.expect_statement()?;
        self.expect_close()?;
        Ok(Construct::Function(FunctionDecl { name, params, body }))
    }

    fn scan_global(&mut self) -> Result<Construct, SyntaxError> {
        let (name, _) = self.expect_identifier()?;
        self.expect_close()?;
        Ok(Construct::Global(GlobalDecl { name }))
    }

    fn scan_call(&mut self, func: &str) -> Result<Construct, SyntaxError> {
        let mut args = Vec::new();
        while !self.at_close()? {
            args.push(self.expect_expression()?);
        }
        self.expect_close()?;
        Ok(Construct::Expr(Expr::call(func, args)))
    }

    fn expect_expression(&mut self) -> Result<Expr, SyntaxError> {
        let construct = self.scan_construct()?;
        match construct.node {
            Construct::Expr(expr) => Ok(expr),
            other => Err(self.wrong_kind(other.kind(), "expression", construct.span)),
        }
    }

    /// Expressions are accepted where a statement is expected and become
    /// expression statements.
    fn expect_statement(&mut self) -> Result<Statement, SyntaxError> {
        let construct = self.scan_construct()?;
        match construct.node {
            Construct::Statement(stmt) => Ok(stmt),
            Construct::Expr(expr) => Ok(Statement::Expr(expr)),
            other => Err(self.wrong_kind(other.kind(), "statement", construct.span)),
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), SyntaxError> {
        let (token, span) = self.take_token();
        if token.is_empty() && self.peek().is_none() {
            return Err(self.unexpected_eof());
        }
        if !is_valid_identifier(token) {
            return Err(invalid_token("identifier", token, span));
        }
        Ok((token.to_string(), span))
    }

    fn expect_close(&mut self) -> Result<usize, SyntaxError> {
        self.skip_trivia();
        match self.peek() {
            Some(')') => {
                self.bump();
                Ok(self.pos)
            }
            None => Err(SyntaxError::new(
                "Closing parenthesis expected, got end of input",
                Span::point(self.pos),
            )),
            Some(_) => {
                let start = self.pos;
                let (token, span) = self.take_token();
                let token = if token.is_empty() {
                    let rest = &self.src[start..];
                    rest.chars().next().map(String::from).unwrap_or_default()
                } else {
                    token.to_string()
                };
                Err(SyntaxError::new(
                    format!("Closing parenthesis expected, got {token}"),
                    span,
                )
                .with_token(token))
            }
        }
    }

    /// Whether the next significant character closes the current construct.
    fn at_close(&mut self) -> Result<bool, SyntaxError> {
        self.skip_trivia();
        match self.peek() {
            Some(ch) => Ok(ch == ')'),
            None => Err(self.unexpected_eof()),
        }
    }

    fn take_token(&mut self) -> (&'a str, Span) {
        self.skip_trivia();
        let start = self.pos;
        let token = match raw_token(self.rest()) {
            Ok((_, token)) => token,
            Err(_) => "",
        };
        self.pos += token.len();
        (token, Span::new(start, self.pos))
    }

    fn skip_trivia(&mut self) {
        if let Ok((rest, _)) = trivia(self.rest()) {
            self.pos = self.src.len() - rest.len();
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn unexpected_eof(&self) -> SyntaxError {
        SyntaxError::new("Unexpected EOF", Span::point(self.pos))
    }

    fn wrong_kind(&self, found: &str, expected: &str, span: Span) -> SyntaxError {
        SyntaxError::new(
            format!("Wrong construct type; {found} found, {expected} expected"),
            span,
        )
    }
}

/// `Invalid literal: 12ab` and friends, pointing at the token.
fn invalid_token(what: &str, token: &str, span: Span) -> SyntaxError {
    SyntaxError::new(format!("Invalid {what}: {token}"), span).with_token(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::stack::with_deep_stack;

    fn parse_err(source: &str) -> SyntaxError {
        parse_program(source).expect_err("source should be rejected")
    }

    /// `function` and `return` take two levels, the sum chain the rest.
    fn nested_sum(levels: usize) -> String {
        let chain = levels - 2;
        format!(
            "(function (main) (return {}1{}))",
            "(+ 1 ".repeat(chain),
            ")".repeat(chain)
        )
    }

    #[test]
    fn parses_function_with_nested_statements() {
        let program = parse_program(
            "; sum the first n numbers\n\
             (function (sum n)\n\
               (block\n\
                 (set acc 0)\n\
                 (for (set i 0) (< i n) (set i (+ i 1))\n\
                   (set acc (+ acc i)))\n\
                 (return acc)))",
        )
        .expect("parse");
        let def = program.function("sum").expect("sum declared");
        assert_eq!(def.params, vec!["n".to_string()]);
        let Statement::Block(body) = &def.body else {
            panic!("expected block body");
        };
        assert_eq!(body.len(), 3);
        assert!(matches!(body[1], Statement::For(_)));
        assert_eq!(body[2], Statement::Return(Expr::var("acc")));
    }

    #[test]
    fn expressions_become_statements() {
        let program = parse_program("(function (main) (print -5))").unwrap();
        assert_eq!(
            program.function("main").unwrap().body,
            Statement::Expr(Expr::call("print", vec![Expr::Int(-5)]))
        );
    }

    #[test]
    fn bare_minus_is_an_identifier() {
        let program = parse_program("(function (main) (return (- 3 -)))").unwrap();
        assert_eq!(
            program.function("main").unwrap().body,
            Statement::Return(Expr::call("-", vec![Expr::Int(3), Expr::var("-")]))
        );
        let program = parse_program("(function (main x) (return (- x -2)))").unwrap();
        assert_eq!(
            program.function("main").unwrap().body,
            Statement::Return(Expr::call("-", vec![Expr::var("x"), Expr::Int(-2)]))
        );
    }

    #[test]
    fn globals_and_sentinel() {
        let mut scanner = Scanner::new("(global g) (function (main) (return g)) endprogram 1 2 3");
        let program = scanner.scan_program().unwrap();
        assert!(program.is_global("g"));
        assert_eq!(scanner.rest().trim(), "1 2 3");
    }

    #[test]
    fn next_construct_reads_one_at_a_time() {
        let mut scanner = Scanner::new("x (+ 1 2) (set y 3)");
        let first = scanner.next_construct().unwrap().unwrap();
        assert_eq!(first.node, Construct::Expr(Expr::var("x")));
        assert_eq!(first.span, Span::new(0, 1));
        let second = scanner.next_construct().unwrap().unwrap();
        assert_eq!(
            second.node,
            Construct::Expr(Expr::call("+", vec![Expr::Int(1), Expr::Int(2)]))
        );
        let third = scanner.next_construct().unwrap().unwrap();
        assert_eq!(
            third.node,
            Construct::Statement(Statement::set("y", Expr::Int(3)))
        );
        assert!(scanner.next_construct().unwrap().is_none());
    }

    #[test]
    fn reports_invalid_literal() {
        let err = parse_err("(function (main) (return 12ab))");
        assert_eq!(err.message, "Invalid literal: 12ab");
        assert_eq!(err.token.as_deref(), Some("12ab"));
        assert_eq!(err.context.as_deref(), Some("return"));
    }

    #[test]
    fn reports_out_of_range_literal() {
        let err = parse_err("(function (main) (return 99999999999))");
        assert!(err.message.starts_with("Invalid literal"));
    }

    #[test]
    fn reports_missing_parenthesis() {
        let err = parse_err("(function (main) (return 0)");
        assert!(err.message.contains("Closing parenthesis"), "{err}");
        let err = parse_err("(function (main) (block (set x 1)");
        assert_eq!(err.message, "Unexpected EOF");
        assert_eq!(err.context.as_deref(), Some("block"));
    }

    #[test]
    fn reports_keyword_as_identifier() {
        let err = parse_err("(function (main) (set for 1))");
        assert_eq!(err.message, "Invalid identifier: for");
        assert_eq!(err.context.as_deref(), Some("set"));
    }

    #[test]
    fn reports_statement_in_expression_position() {
        let err = parse_err("(function (main) (return (set x 1)))");
        assert!(err.message.starts_with("Wrong construct type"), "{err}");
    }

    #[test]
    fn rejects_non_declarations_at_top_level() {
        let err = parse_err("(set x 1)");
        assert_eq!(err.message, "Invalid program element");
    }

    #[test]
    fn duplicate_declaration_points_at_second_item() {
        let source = "(function (main) (return 0))\n(function (main) (return 1))";
        let err = parse_err(source);
        assert!(err.message.contains("Duplicate"));
        assert_eq!(err.span.start, source.find("\n(").unwrap() + 1);
    }

    #[test]
    fn nesting_limit_is_reported() {
        let length = |levels| parse_program(&nested_sum(levels)).map(|p| p.length());
        let lengths = || (length(MAX_NESTING), length(MAX_NESTING + 1));
        let (within, beyond) = with_deep_stack(lengths).expect("spawn worker");
        assert_eq!(within.map_err(|err| err.message), Ok(1));
        let err = beyond.unwrap_err();
        assert_eq!(err.message, "Constructs nested too deeply");
    }

    #[test]
    fn missing_function_header_parenthesis() {
        let err = parse_err("(function main (return 0))");
        assert_eq!(err.message, "Opening parenthesis expected");
    }
}
