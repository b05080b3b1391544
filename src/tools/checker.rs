use crate::{
    config::DEFAULT_BUDGET,
    language::{ast::Program, parser::parse_program},
    runtime::{
        error::{RuntimeError, RuntimeResult},
        interpreter::{EvalOptions, Execution, Interpreter},
        stack::with_deep_stack,
    },
};
use std::{fmt, io::Cursor};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError(String),
    CompileError(String),
    /// The reference solution itself failed; the submission was not judged.
    ReferenceFailed(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "Accepted"),
            Verdict::WrongAnswer => write!(f, "Wrong Answer"),
            Verdict::TimeLimitExceeded => write!(f, "Time Limit Exceeded"),
            Verdict::RuntimeError(reason) => write!(f, "Runtime Error: {reason}"),
            Verdict::CompileError(reason) => write!(f, "Compile Error: {reason}"),
            Verdict::ReferenceFailed(reason) => write!(f, "Reference Failed: {reason}"),
        }
    }
}

pub struct Checker {
    options: EvalOptions,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(EvalOptions::default().with_budget(DEFAULT_BUDGET))
    }
}

impl Checker {
    pub fn new(options: EvalOptions) -> Self {
        Self { options }
    }

    /// Parses both sources and runs [`Checker::check`]. A reference that does
    /// not parse is reported as [`Verdict::ReferenceFailed`].
    pub fn check_sources(&self, reference: &str, submission: &str, input: &str) -> Verdict {
        let judge = || {
            let reference = match parse_program(reference) {
                Ok(program) => program,
                Err(err) => return Verdict::ReferenceFailed(err.to_string()),
            };
            match parse_program(submission) {
                Ok(submission) => self.compare(&reference, &submission, input),
                Err(err) => Verdict::CompileError(err.to_string()),
            }
        };
        self.on_worker(judge)
    }

    /// Runs both programs on `input` and compares their output byte for byte.
    pub fn check(&self, reference: &Program, submission: &Program, input: &str) -> Verdict {
        self.on_worker(|| self.compare(reference, submission, input))
    }

    fn on_worker(&self, judge: impl Fn() -> Verdict + Sync) -> Verdict {
        with_deep_stack(&judge).unwrap_or_else(|err| {
            warn!(error = %err, "no worker thread, judging on the caller's stack");
            judge()
        })
    }

    fn compare(&self, reference: &Program, submission: &Program, input: &str) -> Verdict {
        let (expected, result) = self.execute(reference, input);
        if let Err(err) = result {
            return Verdict::ReferenceFailed(err.to_string());
        }
        let (received, result) = self.execute(submission, input);
        match result {
            Err(err) => match err.root() {
                RuntimeError::TimeLimitExceeded => Verdict::TimeLimitExceeded,
                _ => Verdict::RuntimeError(err.to_string()),
            },
            Ok(_) if received == expected => Verdict::Accepted,
            Ok(_) => Verdict::WrongAnswer,
        }
    }

    fn execute(&self, program: &Program, input: &str) -> (Vec<u8>, RuntimeResult<Execution>) {
        let mut interpreter = Interpreter::new(
            program,
            self.options.clone(),
            Cursor::new(input.as_bytes()),
            Vec::new(),
        );
        let result = interpreter.run();
        if let Ok(execution) = &result {
            debug!(instructions = execution.instructions, "program finished");
        }
        (interpreter.into_output(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "(function (main) (block (set n (scan)) (print (* n n))))";

    #[test]
    fn accepts_matching_output() {
        let submission = "(function (sq x) (return (* x x))) (function (main) (print (sq (scan))))";
        assert_eq!(
            Checker::default().check_sources(REFERENCE, submission, "7"),
            Verdict::Accepted
        );
    }

    #[test]
    fn wrong_answer_on_different_output() {
        let submission = "(function (main) (print (+ (scan) 1)))";
        assert_eq!(
            Checker::default().check_sources(REFERENCE, submission, "7"),
            Verdict::WrongAnswer
        );
    }

    #[test]
    fn infinite_loop_hits_time_limit() {
        let submission = "(function (main) (for (set i 0) 1 (set i i) (block)))";
        let checker = Checker::new(EvalOptions::default().with_budget(1000));
        assert_eq!(
            checker.check_sources(REFERENCE, submission, "3"),
            Verdict::TimeLimitExceeded
        );
    }

    #[test]
    fn syntax_and_runtime_failures_become_verdicts() {
        let checker = Checker::default();
        let verdict = |submission| checker.check_sources(REFERENCE, submission, "3");
        assert!(matches!(
            verdict("(function (main) (print 1)"),
            Verdict::CompileError(_)
        ));
        assert!(matches!(
            verdict("(function (main) (print (/ 1 0)))"),
            Verdict::RuntimeError(_)
        ));
        let reads_nothing = "(function (main) (print (scan)))";
        assert!(matches!(
            checker.check_sources(reads_nothing, REFERENCE, ""),
            Verdict::ReferenceFailed(_)
        ));
    }

    #[test]
    fn runaway_recursion_is_a_runtime_error() {
        let submission = "(function (down n) (return (down (+ n 1))))
                          (function (main) (print (down 0)))";
        let reason = match Checker::default().check_sources(REFERENCE, submission, "3") {
            Verdict::RuntimeError(reason) => reason,
            other => panic!("expected a runtime error, got {other}"),
        };
        assert!(reason.contains("Call depth limit of 1000"), "{reason}");
    }
}
