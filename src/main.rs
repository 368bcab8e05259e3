// memstep: step through stack and heap memory one instruction at a time

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use memstep::config::{
    GrowthPolicy, RunConfig, DEFAULT_MAX_ALLOC_CELLS, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STEPS, DEFAULT_SEED,
};
use memstep::interpreter::{HaltReason, Interpreter, StepOutcome};
use memstep::parser::parse;
use memstep::programs::{self, EXAMPLES};
use memstep::snapshot::{SnapshotHistory, DEFAULT_HISTORY_LIMIT};
use memstep::ui::App;

/// Step through a small Rust-like program and watch its stack and heap.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Program to run
    file: Option<PathBuf>,

    /// Run a built-in scenario instead of a file
    #[arg(short, long, value_name = "NAME", conflicts_with = "file")]
    example: Option<String>,

    /// List the built-in scenarios and exit
    #[arg(long)]
    list_examples: bool,

    /// Run to completion without the TUI and print the output
    #[arg(long)]
    headless: bool,

    /// With --headless, print the final snapshot as JSON
    #[arg(long, requires = "headless")]
    json: bool,

    /// Vector growth policy: `double` or `+N`
    #[arg(long, default_value_t = GrowthPolicy::Double)]
    growth: GrowthPolicy,

    /// Maximum number of frames on the call stack
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,

    /// Largest array or heap block, in cells
    #[arg(long, value_name = "CELLS", default_value_t = DEFAULT_MAX_ALLOC_CELLS)]
    max_alloc: usize,

    /// Step budget for --headless and for Enter in the TUI
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,

    /// Seed for rand_int
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `memstep::interpreter=trace` (overrides RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            growth: self.growth,
            max_call_depth: self.max_depth,
            max_alloc_cells: self.max_alloc,
            max_steps: self.max_steps,
            seed: self.seed,
        }
    }

    /// Display name and text of the program to run
    fn load_source(&self) -> Result<(String, String)> {
        if let Some(name) = &self.example {
            let example = programs::example(name).with_context(|| {
                format!("unknown example '{}' (see --list-examples)", name)
            })?;
            return Ok((example.name.to_string(), example.source.to_string()));
        }

        let Some(path) = &self.file else {
            bail!("no input: pass a FILE or --example NAME (see --help)");
        };
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Ok((path.display().to_string(), source))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.list_examples {
        for example in EXAMPLES {
            println!("{:<20} {}", example.name, example.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(&cli)?;

    let (name, source) = cli.load_source()?;
    let program = parse(&source).with_context(|| format!("failed to parse {}", name))?;
    info!(program = %name, functions = program.len(), "parsed");

    let interpreter = Interpreter::new(program, cli.run_config());

    if cli.headless {
        run_headless(interpreter, cli.json)
    } else {
        run_tui(interpreter, source)?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Logs go to `--log-file` if given, to stderr in headless mode, and nowhere
/// otherwise so they cannot draw over the TUI.
fn init_logging(cli: &Cli) -> Result<()> {
    let filter = match &cli.log_level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter '{}'", directives))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file '{}'", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if cli.headless => builder.with_writer(io::stderr).init(),
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

fn run_headless(mut interpreter: Interpreter, json: bool) -> Result<ExitCode> {
    let budget = interpreter.config().max_steps;
    let outcome = interpreter.run_to_end(budget);

    if json {
        let snapshot = interpreter.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for line in interpreter.output().get_output() {
            println!("{}", line);
        }
    }

    match outcome {
        StepOutcome::Halted(HaltReason::Finished) => {
            eprintln!("finished after {} steps", interpreter.steps_taken());
            Ok(ExitCode::SUCCESS)
        }
        StepOutcome::Halted(HaltReason::Error(err)) => {
            eprintln!("error: {}", err);
            Ok(ExitCode::FAILURE)
        }
        StepOutcome::Continued => {
            eprintln!("stopped: step budget of {} exhausted", budget);
            Ok(ExitCode::from(2))
        }
    }
}

fn run_tui(interpreter: Interpreter, source: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(interpreter, source, SnapshotHistory::new(DEFAULT_HISTORY_LIMIT));
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.context("terminal UI failed")
}
