use crate::formatter::format_call;
use crate::language::{ast::*, builtins::Builtin};
use crate::runtime::{
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    input::IntReader,
    trace::TraceEvent,
    value::{ArrayValue, Value, MAX_ARRAY_LEN},
};
use std::io::{BufRead, Write};
use tracing::debug;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalOptions {
    /// Evaluation units allowed before the run fails; `None` is unlimited.
    pub budget: Option<u64>,
    pub max_call_depth: usize,
    pub record_trace: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            budget: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            record_trace: false,
        }
    }
}

impl EvalOptions {
    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn tracing(mut self) -> Self {
        self.record_trace = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    /// Value returned by `main`.
    pub value: Value,
    pub instructions: u64,
}

enum Flow {
    Continue,
    Return(Value),
}

pub struct Interpreter<'p, R, W> {
    program: &'p Program,
    env: Environment,
    options: EvalOptions,
    input: IntReader<R>,
    output: W,
    instructions: u64,
    trace: Vec<TraceEvent>,
}

impl<'p, R: BufRead, W: Write> Interpreter<'p, R, W> {
    pub fn new(program: &'p Program, options: EvalOptions, input: R, output: W) -> Self {
        Self {
            program,
            env: Environment::new(program.globals().map(|def| def.name.as_str())),
            options,
            input: IntReader::new(input),
            output,
            instructions: 0,
            trace: Vec::new(),
        }
    }

    pub fn run(&mut self) -> RuntimeResult<Execution> {
        let program = self.program;
        let main = program
            .function("main")
            .ok_or_else(|| RuntimeError::UnknownFunction {
                name: "main".into(),
            })?;
        let result = self.call_function(main, Vec::new());
        self.output.flush()?;
        let value = result?;
        debug!(instructions = self.instructions, "evaluation finished");
        Ok(Execution {
            value,
            instructions: self.instructions,
        })
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Events recorded so far. Still valid after a failed run.
    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<TraceEvent> {
        self.trace
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn tick(&mut self, event: TraceEvent) -> RuntimeResult<()> {
        self.instructions += 1;
        if let Some(budget) = self.options.budget {
            if self.instructions > budget {
                return Err(RuntimeError::TimeLimitExceeded);
            }
        }
        if self.options.record_trace {
            self.trace.push(event);
        }
        Ok(())
    }

    fn call_function(&mut self, def: &'p FunctionDecl, args: Vec<Value>) -> RuntimeResult<Value> {
        if args.len() != def.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: def.name.clone(),
                expected: def.params.len(),
                received: args.len(),
            });
        }
        if self.env.depth() >= self.options.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.options.max_call_depth,
            });
        }
        self.env.push_frame(def.params.iter().cloned().zip(args));
        let flow = self.exec_statement(&def.body);
        self.env.pop_frame();
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Ok(Value::Int(0)),
        }
    }

    fn exec_statement(&mut self, stmt: &'p Statement) -> RuntimeResult<Flow> {
        match stmt {
            Statement::Block(body) => {
                self.tick(TraceEvent::Block)?;
                for inner in body {
                    if let Flow::Return(value) = self.exec_statement(inner)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Continue)
            }
            Statement::Set(set) => {
                self.tick(TraceEvent::Set)?;
                let value = self.eval_expr(&set.value)?;
                if self.program.function(&set.name).is_some()
                    || Builtin::from_name(&set.name).is_some()
                {
                    return Err(RuntimeError::AssignToReserved {
                        name: set.name.clone(),
                    });
                }
                self.env.assign(&set.name, value)?;
                Ok(Flow::Continue)
            }
            Statement::If(stmt) => {
                self.tick(TraceEvent::If)?;
                if self.eval_condition(&stmt.condition, "if condition")? != 0 {
                    return self.exec_statement(&stmt.body);
                }
                Ok(Flow::Continue)
            }
            Statement::For(stmt) => {
                self.tick(TraceEvent::For)?;
                if let Flow::Return(value) = self.exec_statement(&stmt.init)? {
                    return Ok(Flow::Return(value));
                }
                while self.eval_condition(&stmt.test, "for condition")? != 0 {
                    if let Flow::Return(value) = self.exec_statement(&stmt.body)? {
                        return Ok(Flow::Return(value));
                    }
                    if let Flow::Return(value) = self.exec_statement(&stmt.update)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Continue)
            }
            Statement::Return(value) => {
                self.tick(TraceEvent::Return)?;
                Ok(Flow::Return(self.eval_expr(value)?))
            }
            Statement::Expr(expr) => {
                self.tick(TraceEvent::ExprStatement)?;
                self.eval_expr(expr)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn eval_condition(&mut self, expr: &'p Expr, position: &str) -> RuntimeResult<i32> {
        let value = self.eval_expr(expr)?;
        value
            .as_int()
            .ok_or_else(|| RuntimeError::int_expected(value.type_name(), position))
    }

    fn eval_expr(&mut self, expr: &'p Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Int(value) => {
                self.tick(TraceEvent::Literal)?;
                Ok(Value::Int(*value))
            }
            Expr::Variable(name) => {
                self.tick(TraceEvent::Variable)?;
                self.env.lookup(name)
            }
            Expr::Call(call) => {
                self.tick(TraceEvent::Call)?;
                self.eval_call(call)
                    .map_err(|err| err.at(|| format_call(call)))
            }
        }
    }

    fn eval_call(&mut self, call: &'p CallExpr) -> RuntimeResult<Value> {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval_expr(arg)?);
        }
        if let Some(builtin) = Builtin::from_name(&call.func) {
            return self.apply_builtin(builtin, args);
        }
        let program = self.program;
        match program.function(&call.func) {
            Some(def) => self.call_function(def, args),
            None => Err(RuntimeError::UnknownFunction {
                name: call.func.clone(),
            }),
        }
    }

    fn apply_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> RuntimeResult<Value> {
        if args.len() != builtin.arity() {
            return Err(RuntimeError::ArityMismatch {
                name: builtin.name().to_string(),
                expected: builtin.arity(),
                received: args.len(),
            });
        }
        let name = builtin.name();
        if builtin.is_operator() {
            let ints = args
                .iter()
                .map(|value| int_arg(value, name))
                .collect::<RuntimeResult<Vec<_>>>()?;
            return builtin
                .apply_operator(&ints)
                .map(Value::Int)
                .ok_or(match builtin {
                    Builtin::Rem => RuntimeError::ModuloByZero,
                    _ => RuntimeError::DivideByZero,
                });
        }

        match (builtin, args.as_slice()) {
            (Builtin::Scan, []) => Ok(Value::Int(self.input.next_int()?)),
            (Builtin::Print, [value]) => {
                let value = int_arg(value, name)?;
                writeln!(self.output, "{value}")?;
                Ok(Value::Int(0))
            }
            (Builtin::ArrayCreate, [len]) => {
                let len = checked_len(int_arg(len, name)?)?;
                Ok(Value::Array(ArrayValue::zeroed(len)))
            }
            (Builtin::ArrayGet, [array, index]) => {
                let array = array_arg(array, name)?;
                let index = int_arg(index, name)?;
                array
                    .get(index)
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::IndexOutOfBounds {
                        index,
                        len: array.len(),
                    })
            }
            (Builtin::ArraySet, [array, index, value]) => {
                let array = array_arg(array, name)?;
                let index = int_arg(index, name)?;
                let value = int_arg(value, name)?;
                if !array.set(index, value) {
                    return Err(RuntimeError::IndexOutOfBounds {
                        index,
                        len: array.len(),
                    });
                }
                Ok(Value::Int(0))
            }
            (Builtin::ArrayScan, [len]) => {
                let len = checked_len(int_arg(len, name)?)?;
                let mut cells = Vec::with_capacity(len);
                for _ in 0..len {
                    cells.push(self.input.next_int()?);
                }
                Ok(Value::Array(ArrayValue::from_vec(cells)))
            }
            (Builtin::ArrayPrint, [array]) => {
                let array = array_arg(array, name)?;
                for cell in array.to_vec() {
                    writeln!(self.output, "{cell}")?;
                }
                Ok(Value::Int(0))
            }
            _ => Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: builtin.arity(),
                received: args.len(),
            }),
        }
    }
}

fn int_arg(value: &Value, builtin: &str) -> RuntimeResult<i32> {
    value
        .as_int()
        .ok_or_else(|| RuntimeError::int_expected(value.type_name(), builtin))
}

fn array_arg<'v>(value: &'v Value, builtin: &str) -> RuntimeResult<&'v ArrayValue> {
    match value {
        Value::Array(array) => Ok(array),
        Value::Int(_) => Err(RuntimeError::array_expected(value.type_name(), builtin)),
    }
}

fn checked_len(requested: i32) -> RuntimeResult<usize> {
    let len = usize::try_from(requested).map_err(|_| RuntimeError::NegativeLength { requested })?;
    if len > MAX_ARRAY_LEN {
        return Err(RuntimeError::OutOfMemory { requested });
    }
    Ok(len)
}
