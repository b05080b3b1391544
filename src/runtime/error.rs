use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Use of undefined variable `{name}`")]
    UndefinedVariable { name: String },
    #[error("Use of uninitialized variable `{name}`")]
    UninitializedVariable { name: String },
    #[error("No such function: {name}")]
    UnknownFunction { name: String },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Assigning to function `{name}`")]
    AssignToReserved { name: String },
    #[error("Type error: {message}")]
    TypeMismatch { message: String },
    #[error("Divide by zero")]
    DivideByZero,
    #[error("Mod by zero")]
    ModuloByZero,
    #[error("Index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: i32, len: usize },
    #[error("Invalid array length {requested}")]
    NegativeLength { requested: i32 },
    #[error("Out of memory: {requested} elements requested")]
    OutOfMemory { requested: i32 },
    #[error("Time limit exceeded")]
    TimeLimitExceeded,
    #[error("Call depth limit of {limit} exceeded")]
    StackOverflow { limit: usize },
    #[error("Input error: {message}")]
    Input { message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{source}\n  at {location}")]
    At {
        location: String,
        #[source]
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// The underlying failure with call-site locations peeled off.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::At { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            RuntimeError::At { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Attaches a call-site location unless an inner call already supplied one.
    pub fn at(self, location: impl FnOnce() -> String) -> RuntimeError {
        match self {
            located @ RuntimeError::At { .. } => located,
            other => RuntimeError::At {
                location: location(),
                source: Box::new(other),
            },
        }
    }

    pub fn int_expected(found: &str, position: &str) -> RuntimeError {
        RuntimeError::TypeMismatch {
            message: format!("int expected for {position}, found {found}"),
        }
    }

    pub fn array_expected(found: &str, position: &str) -> RuntimeError {
        RuntimeError::TypeMismatch {
            message: format!("array expected for {position}, found {found}"),
        }
    }
}
