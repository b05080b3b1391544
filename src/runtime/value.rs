use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Largest array `array.create` and `array.scan` will allocate.
pub const MAX_ARRAY_LEN: usize = 1_000_000;

#[derive(Clone, Debug)]
pub enum Value {
    Int(i32),
    Array(ArrayValue),
}

/// Fixed-length integer buffer. Clones share the same cells.
#[derive(Clone, Debug)]
pub struct ArrayValue {
    cells: Rc<RefCell<Vec<i32>>>,
}

impl ArrayValue {
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    pub fn from_vec(cells: Vec<i32>) -> Self {
        Self {
            cells: Rc::new(RefCell::new(cells)),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }

    pub fn get(&self, index: i32) -> Option<i32> {
        let index = usize::try_from(index).ok()?;
        self.cells.borrow().get(index).copied()
    }

    /// Stores `value` at `index`; false when the index is out of bounds.
    pub fn set(&self, index: i32, value: i32) -> bool {
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        match self.cells.borrow_mut().get_mut(index) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.cells.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ArrayValue) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Array(_) => "array",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Array(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Array(array) => {
                write!(f, "[")?;
                for (idx, cell) in array.cells.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{cell}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}
