use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::collections::HashMap;

/// Global slots plus one frame of locals per active call. Lookups never
/// reach into a caller's frame.
pub struct Environment {
    globals: HashMap<String, Option<Value>>,
    frames: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub fn new<'a>(globals: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            globals: globals
                .into_iter()
                .map(|name| (name.to_string(), None))
                .collect(),
            frames: Vec::new(),
        }
    }

    pub fn push_frame(&mut self, bindings: impl IntoIterator<Item = (String, Value)>) {
        self.frames.push(bindings.into_iter().collect());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        if let Some(slot) = self.globals.get(name) {
            return slot
                .clone()
                .ok_or_else(|| RuntimeError::UninitializedVariable {
                    name: name.to_string(),
                });
        }
        self.frames
            .last()
            .and_then(|locals| locals.get(name))
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Writes a global when `name` is declared as one, otherwise a local of
    /// the current frame.
    pub fn assign(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        if let Some(slot) = self.globals.get_mut(name) {
            *slot = Some(value);
            return Ok(());
        }
        match self.frames.last_mut() {
            Some(locals) => {
                locals.insert(name.to_string(), value);
                Ok(())
            }
            None => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_start_uninitialized() {
        let mut env = Environment::new(["g"]);
        env.push_frame(Vec::new());
        assert!(matches!(
            env.lookup("g"),
            Err(RuntimeError::UninitializedVariable { .. })
        ));
        env.assign("g", Value::Int(4)).unwrap();
        assert_eq!(env.lookup("g").unwrap(), Value::Int(4));
    }

    #[test]
    fn frames_do_not_see_caller_locals() {
        let mut env = Environment::new(Vec::<&str>::new());
        env.push_frame(vec![("x".to_string(), Value::Int(1))]);
        env.push_frame(Vec::new());
        assert_eq!(env.depth(), 2);
        assert!(matches!(
            env.lookup("x"),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
        env.pop_frame();
        assert_eq!(env.lookup("x").unwrap(), Value::Int(1));
    }
}
