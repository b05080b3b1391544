use crate::{
    analysis::{
        cfg::Cfg,
        frequency::CallCounts,
        normalize::normalize_program,
        scorer::{Preset, Scorer},
        similarity::{frequency_similarity, structural_similarity},
    },
    formatter::format_program,
    language::{ast::Program, parser::parse_program},
    rewrite::{DeadBranchInsertion, IdentityExpansion, RenameVariables, Rewrite},
    runtime::{
        error::RuntimeError,
        interpreter::{EvalOptions, Interpreter},
        value::Value,
    },
};
use std::io::Cursor;

const SUM: &str = "
; read n numbers and print their sum
(function (main) (block
    (set n (scan))
    (set acc 0)
    (for (set i 0) (< i n) (set i (+ i 1))
        (set acc (+ acc (scan))))
    (print acc)))";

const BUBBLE_SORT: &str = "
(function (sort a n) (block
    (for (set i 0) (< i n) (set i (+ i 1))
        (for (set j 0) (< j (- (- n i) 1)) (set j (+ j 1))
            (if (> (array.get a j) (array.get a (+ j 1)))
                (block
                    (set t (array.get a j))
                    (array.set a j (array.get a (+ j 1)))
                    (array.set a (+ j 1) t)))))
    (return a)))
(function (main) (block
    (set n (scan))
    (set a (array.scan n))
    (sort a n)
    (array.print a)))";

const FIBONACCI: &str = "
(function (fib n) (block
    (if (< n 2) (return n))
    (return (+ (fib (- n 1)) (fib (- n 2))))))
(function (main) (print (fib (scan))))";

const GLOBALS: &str = "
(global calls)
(function (tick) (set calls (+ calls 1)))
(function (main) (block
    (set calls 0)
    (set limit (scan))
    (for (set i 0) (< i limit) (set i (+ i 1)) (tick))
    (set debug 0)
    (if debug (print 999))
    (if (&& debug (scan)) (print 998))
    (print calls)))";

const CORPUS: [&str; 4] = [SUM, BUBBLE_SORT, FIBONACCI, GLOBALS];

const INPUTS: [&str; 3] = ["5 4 1 3 2 0", "3 9 8 7", "7 1 2 3 4 5 6 7"];

fn parse(source: &str) -> Program {
    parse_program(source).expect("corpus program should parse")
}

fn run(
    program: &Program,
    input: &str,
    options: EvalOptions,
) -> (Result<Value, RuntimeError>, String) {
    let mut interpreter = Interpreter::new(program, options, Cursor::new(input), Vec::new());
    let result = interpreter.run().map(|execution| execution.value);
    let output = String::from_utf8(interpreter.into_output()).expect("utf8 output");
    (result, output)
}

fn budgeted() -> EvalOptions {
    EvalOptions::default().with_budget(1_000_000)
}

/// Renaming, dead branches and identity expansion, in the order `rewrite` applies them.
fn disguise(program: &Program) -> Program {
    let mut rename = RenameVariables::default();
    let mut insertion = DeadBranchInsertion::default();
    let renamed = rename.rewrite_program(program).unwrap();
    let guarded = insertion.rewrite_program(&renamed).unwrap();
    IdentityExpansion.rewrite_program(&guarded).unwrap()
}

#[test]
fn printing_round_trips() {
    for source in CORPUS {
        let program = parse(source);
        let printed = format_program(&program);
        assert_eq!(parse(&printed), program, "{printed}");
        assert_eq!(format_program(&parse(&printed)), printed);
    }
}

#[test]
fn normalization_is_idempotent() {
    for source in CORPUS {
        let once = normalize_program(&parse(source));
        let twice = normalize_program(&once);
        assert_eq!(once, twice, "{}", format_program(&once));
    }
}

#[test]
fn normalization_preserves_behaviour() {
    for source in CORPUS {
        let program = parse(source);
        let normalized = normalize_program(&program);
        for input in INPUTS {
            let (before, before_out) = run(&program, input, budgeted());
            let (after, after_out) = run(&normalized, input, budgeted());
            assert_eq!(before_out, after_out, "output differs on {input:?}");
            assert_eq!(
                before.map_err(|err| err.root().to_string()),
                after.map_err(|err| err.root().to_string()),
            );
        }
    }
}

#[test]
fn normalization_removes_dead_debug_branches() {
    let normalized = normalize_program(&parse(GLOBALS));
    let printed = format_program(&normalized);
    assert!(!printed.contains("999"), "{printed}");
    assert!(printed.contains("(&& 0 (scan))"), "{printed}");
}

#[test]
fn rewrites_preserve_behaviour() {
    for source in CORPUS {
        let program = parse(source);
        let expanded = disguise(&program);
        for input in INPUTS {
            let (expected, expected_out) = run(&program, input, budgeted());
            let (actual, actual_out) = run(&expanded, input, EvalOptions::default());
            assert_eq!(expected_out, actual_out);
            assert_eq!(expected.is_ok(), actual.is_ok());
        }
    }
}

#[test]
fn static_preset_sees_through_rewrites() {
    let scorer = Scorer::from_preset(Preset::Static);
    for source in CORPUS {
        let program = parse(source);
        let expanded = disguise(&program);
        let score = scorer.score(&program, &expanded, "");
        assert_eq!(score.value, 1.0, "{}", format_program(&expanded));
    }
}

#[test]
fn self_similarity_is_one() {
    for source in CORPUS {
        let program = parse(source);
        let stats = Cfg::build(&program).edge_stats();
        assert_eq!(structural_similarity(&stats, &stats), 1.0);
        let counts = CallCounts::from_program(&program);
        assert_eq!(frequency_similarity(&counts, &counts), 1.0);
    }
}

#[test]
fn different_algorithms_score_lower() {
    let scorer = Scorer::from_preset(Preset::Static);
    let score = scorer.score(&parse(BUBBLE_SORT), &parse(FIBONACCI), "");
    assert!(score.value < 0.5, "{score:?}");
}

#[test]
fn edge_classification_scenarios() {
    let program = parse("(function (main) (for (set i 0) (< i 10) (set i (+ i 1)) (block)))");
    let counting = Cfg::build(&program).edge_stats();
    assert_eq!((counting.back, counting.forward), (1, 0));
    let summing = Cfg::build(&parse(SUM)).edge_stats();
    assert_eq!((summing.back, summing.forward), (1, 0));
    let program = parse("(function (main) (if (scan) (block)))");
    let branching = Cfg::build(&program).edge_stats();
    assert_eq!(branching.back, 0);
    let nested = Cfg::build(&parse(BUBBLE_SORT)).edge_stats();
    assert_eq!(nested.back, 2);
}

#[test]
fn sample_programs_compute_expected_output() {
    let (_, output) = run(&parse(SUM), "4 1 2 3 4", budgeted());
    assert_eq!(output, "10\n");
    let (_, output) = run(&parse(BUBBLE_SORT), "5 4 1 3 2 0", budgeted());
    assert_eq!(output, "0\n1\n2\n3\n4\n");
    let (result, output) = run(&parse(FIBONACCI), "15", budgeted());
    assert_eq!(result.unwrap(), Value::Int(0));
    assert_eq!(output, "610\n");
    let (_, output) = run(&parse(GLOBALS), "3 1", budgeted());
    assert_eq!(output, "3\n");
}

#[test]
fn divide_by_zero_scenario() {
    let program = parse("(function (main) (block (set d (scan)) (print (/ 10 d))))");
    let (result, output) = run(&program, "0", budgeted());
    assert!(matches!(
        result.unwrap_err().root(),
        RuntimeError::DivideByZero
    ));
    assert!(output.is_empty());
}

#[test]
fn budget_exhaustion_scenario() {
    let program = parse("(function (main) (for (set i 0) 1 (set i (+ i 1)) (block)))");
    let mut interpreter = Interpreter::new(
        &program,
        EvalOptions::default().with_budget(1000),
        Cursor::new(""),
        Vec::new(),
    );
    let err = interpreter.run().unwrap_err();
    assert!(matches!(err.root(), RuntimeError::TimeLimitExceeded));
    assert_eq!(interpreter.instructions(), 1001);
}

#[test]
fn array_bounds_scenario() {
    let program = parse("(function (main) (block (set a (array.create 3)) (array.set a 3 1)))");
    let (result, _) = run(&program, "", budgeted());
    let err = result.unwrap_err();
    assert!(matches!(
        err.root(),
        RuntimeError::IndexOutOfBounds { index: 3, len: 3 }
    ));
    assert_eq!(err.location(), Some("(array.set a 3 1)"));
}
