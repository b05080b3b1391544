//! Parsing, evaluation and the AST passes recurse once per nesting level or
//! call. The nesting and call-depth limits are sized for this stack, not for
//! the platform's default thread stack.

use std::{io, panic, thread};

/// Stack reserved for a worker. Pages are only committed as they are touched.
pub const WORKER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Runs `f` to completion on a scoped worker thread with
/// [`WORKER_STACK_SIZE`] bytes of stack. A panic in `f` resumes on the caller.
pub fn with_deep_stack<'env, T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> T + Send + 'env,
    T: Send + 'env,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("judge-worker".into())
            .stack_size(WORKER_STACK_SIZE)
            .spawn_scoped(scope, f)?;
        match handle.join() {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: u32) -> u32 {
        let pad = std::hint::black_box([1u8; 4096]);
        if n == 0 {
            0
        } else {
            depth(n - 1) + u32::from(pad[n as usize % pad.len()])
        }
    }

    #[test]
    fn worker_outlasts_default_stack() {
        let result = with_deep_stack(|| depth(10_000)).expect("spawn worker");
        assert_eq!(result, 10_000);
    }

    #[test]
    fn borrows_from_caller() {
        let words = vec!["a".to_string(), "b".to_string()];
        let joined = with_deep_stack(|| words.join("+")).expect("spawn worker");
        assert_eq!(joined, "a+b");
    }
}
