use clap::{Parser, Subcommand};
use lang_judge::{
    analysis::{
        cfg::Cfg,
        normalize::normalize_program,
        scorer::{Preset, Scorer},
    },
    config::JudgeConfig,
    error::{JudgeError, Result},
    formatter::format_program,
    language::{ast::Program, errors::SyntaxError, parser::Scanner},
    rewrite::{DeadBranchInsertion, IdentityExpansion, RenameVariables, Rewrite},
    runtime::{interpreter::Interpreter, stack::with_deep_stack, trace::render_tags},
    tools::{
        checker::Checker,
        diagnostics::{emit_syntax_error, report_io_error, report_runtime_error},
    },
};
use std::{
    fs,
    io::{self, BufWriter, Cursor, Read},
    path::{Path, PathBuf},
    process::{ExitCode, Termination},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "judge",
    version,
    about = "Run, normalize and compare contest submissions"
)]
struct Cli {
    /// Judge configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute `main`. Without FILE the program is read from stdin, ended by
    /// `endprogram`, and the rest of stdin is its input.
    Run {
        file: Option<PathBuf>,
        /// Read program input from a file instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Override the configured instruction budget
        #[arg(long)]
        budget: Option<u64>,
        /// Print the evaluation trace to stderr
        #[arg(long)]
        trace: bool,
    },
    /// Print a program in canonical form
    Fmt { file: Option<PathBuf> },
    /// Print a program after dead-code normalization
    Normalize { file: Option<PathBuf> },
    /// Report control-flow edge statistics
    Cfg {
        file: Option<PathBuf>,
        /// Emit the graph in Graphviz format instead
        #[arg(long)]
        dot: bool,
    },
    /// Score the similarity of two programs. Without files both programs are
    /// read from stdin, each ended by `endprogram`, followed by trace input.
    Score {
        first: Option<PathBuf>,
        second: Option<PathBuf>,
        #[arg(long)]
        preset: Option<Preset>,
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Also print each signal's value
        #[arg(long)]
        explain: bool,
    },
    /// Compare a submission's output against a reference solution
    Check {
        reference: PathBuf,
        submission: PathBuf,
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Apply semantics-preserving rewrites; all of them when none is selected
    Rewrite {
        file: Option<PathBuf>,
        #[arg(long, value_name = "PREFIX")]
        rename: Option<String>,
        #[arg(long)]
        dead_code: bool,
        #[arg(long)]
        identity: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum JudgeExit {
    Success = 0,
    Error = 1,
    InvalidInput = 2,
    Rejected = 3,
}

impl Termination for JudgeExit {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

fn main() -> JudgeExit {
    init_tracing();
    let cli = Cli::parse();
    let outcome = match with_deep_stack(move || execute(cli)) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("Failed to start worker thread: {err}");
            return JudgeExit::Error;
        }
    };
    match outcome {
        Ok(code) => code,
        // Already rendered with its source by `parse_named`.
        Err(JudgeError::Syntax(_)) => JudgeExit::InvalidInput,
        Err(JudgeError::Runtime(err)) => {
            report_runtime_error(&err);
            JudgeExit::Error
        }
        Err(JudgeError::Io { source, path }) => {
            report_io_error(&path, &source);
            JudgeExit::Error
        }
        Err(JudgeError::Usage(message)) => {
            eprintln!("{message}");
            JudgeExit::InvalidInput
        }
        Err(err) => {
            eprintln!("{err}");
            JudgeExit::Error
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LANG_JUDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<JudgeExit> {
    let config = JudgeConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Run {
            file,
            input,
            budget,
            trace,
        } => {
            let (name, source) = read_source(file.as_deref())?;
            let mut scanner = Scanner::new(&source);
            let program = parse_named(&name, &source, &mut scanner)?;
            let program_on_stdin = file.as_deref().map_or(true, |path| path == Path::new("-"));
            let input = match input {
                Some(path) => read_file(&path)?,
                None if program_on_stdin => scanner.rest().to_string(),
                None => read_stdin()?,
            };
            let mut options = config.eval_options();
            if let Some(budget) = budget {
                options.budget = Some(budget);
            }
            options.record_trace = trace;
            let stdout = io::stdout();
            let mut interpreter = Interpreter::new(
                &program,
                options,
                Cursor::new(input.as_bytes()),
                BufWriter::new(stdout.lock()),
            );
            let result = interpreter.run();
            if trace {
                eprintln!("trace: {}", render_tags(interpreter.trace()));
            }
            result?;
            Ok(JudgeExit::Success)
        }
        Commands::Fmt { file } => {
            let program = load_program(file.as_deref())?;
            print!("{}", format_program(&program));
            Ok(JudgeExit::Success)
        }
        Commands::Normalize { file } => {
            let program = load_program(file.as_deref())?;
            print!("{}", format_program(&normalize_program(&program)));
            Ok(JudgeExit::Success)
        }
        Commands::Cfg { file, dot } => {
            let program = load_program(file.as_deref())?;
            let cfg = Cfg::build(&program);
            if dot {
                print!("{}", cfg.to_dot());
            } else {
                let stats = cfg.edge_stats();
                println!("nodes {}", cfg.len());
                println!("tree {}", stats.tree);
                println!("back {}", stats.back);
                println!("forward {}", stats.forward);
            }
            Ok(JudgeExit::Success)
        }
        Commands::Score {
            first,
            second,
            preset,
            input,
            explain,
        } => {
            let (first, second, trace_input) = match (first, second) {
                (Some(first), Some(second)) => {
                    let input = match input {
                        Some(path) => read_file(&path)?,
                        None => String::new(),
                    };
                    (
                        load_program(Some(&first))?,
                        load_program(Some(&second))?,
                        input,
                    )
                }
                (None, None) => {
                    let source = read_stdin()?;
                    let mut scanner = Scanner::new(&source);
                    let first = parse_named("<stdin>", &source, &mut scanner)?;
                    let second = parse_named("<stdin>", &source, &mut scanner)?;
                    let input = match input {
                        Some(path) => read_file(&path)?,
                        None => scanner.rest().to_string(),
                    };
                    (first, second, input)
                }
                _ => {
                    return Err(JudgeError::Usage(
                        "score takes either two program files or none".into(),
                    ))
                }
            };
            let scorer = Scorer::new(config.scorer_config(preset));
            let score = scorer.score(&first, &second, &trace_input);
            println!("{}", score.value);
            if explain {
                for signal in &score.signals {
                    println!("{} {}", signal.kind.name(), signal.value);
                }
            }
            Ok(JudgeExit::Success)
        }
        Commands::Check {
            reference,
            submission,
            input,
        } => {
            let reference = read_file(&reference)?;
            let submission = read_file(&submission)?;
            let input = match input {
                Some(path) => read_file(&path)?,
                None => read_stdin()?,
            };
            let checker = Checker::new(config.eval_options());
            let verdict = checker.check_sources(&reference, &submission, &input);
            println!("{verdict}");
            Ok(if verdict.is_accepted() {
                JudgeExit::Success
            } else {
                JudgeExit::Rejected
            })
        }
        Commands::Rewrite {
            file,
            rename,
            dead_code,
            identity,
        } => {
            let program = load_program(file.as_deref())?;
            let program = rewrite(program, rename, dead_code, identity)
                .map_err(|err| JudgeError::Usage(format!("Rewrite failed: {err}")))?;
            print!("{}", format_program(&program));
            Ok(JudgeExit::Success)
        }
    }
}

fn rewrite(
    mut program: Program,
    rename: Option<String>,
    dead_code: bool,
    identity: bool,
) -> std::result::Result<Program, SyntaxError> {
    let all = rename.is_none() && !dead_code && !identity;
    if all || rename.is_some() {
        let mut rewriter = rename.map(RenameVariables::new).unwrap_or_default();
        program = rewriter.rewrite_program(&program)?;
    }
    if all || dead_code {
        program = DeadBranchInsertion::default().rewrite_program(&program)?;
    }
    if all || identity {
        program = IdentityExpansion.rewrite_program(&program)?;
    }
    Ok(program)
}

fn load_program(path: Option<&Path>) -> Result<Program> {
    let (name, source) = read_source(path)?;
    parse_named(&name, &source, &mut Scanner::new(&source))
}

fn parse_named(name: &str, source: &str, scanner: &mut Scanner<'_>) -> Result<Program> {
    scanner.scan_program().map_err(|err| {
        emit_syntax_error(name, source, &err);
        JudgeError::Syntax(err)
    })
}

fn read_source(path: Option<&Path>) -> Result<(String, String)> {
    match path {
        Some(path) if path != Path::new("-") => Ok((path.display().to_string(), read_file(path)?)),
        _ => Ok(("<stdin>".to_string(), read_stdin()?)),
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| JudgeError::io(path, err))
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| JudgeError::io("<stdin>", err))?;
    Ok(buffer)
}
