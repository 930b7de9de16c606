//! Terrarium CLI - terminal front end for the simulated environment.
//!
//! Usage:
//!   terrarium                          # Interactive session
//!   terrarium -c 'echo hello'          # Run one line and exit
//!   terrarium tour.sh arg1 arg2        # Import a script and run it
//!   terrarium --state world.json       # Persist across invocations
//!   terrarium --config settings.conf   # Apply a configuration overlay

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use terrarium::vfs::Mode;
use terrarium::{
    DisplayStyle, ExecOutcome, JsonFileStore, StateStore, Submission, Terrarium,
};

/// Terrarium - a simulated operating environment
#[derive(Parser, Debug)]
#[command(name = "terrarium")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the given line and exit
    #[arg(short = 'c')]
    command: Option<String>,

    /// Script file to import into the environment and run
    #[arg()]
    script: Option<PathBuf>,

    /// Arguments to pass to the script
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Back the environment with a JSON file instead of memory
    #[arg(long)]
    state: Option<PathBuf>,

    /// Configuration overlay file (key = value lines)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let terra = build_environment(&args).await?;

    if let Some(line) = &args.command {
        let code = run_one_shot(&terra, line).await?;
        drain_notices(&terra).await;
        std::process::exit(code);
    }

    if let Some(script_path) = &args.script {
        let code = run_script_file(&terra, script_path, &args.args).await?;
        drain_notices(&terra).await;
        std::process::exit(code);
    }

    run_repl(&terra).await
}

async fn build_environment(args: &Args) -> Result<Terrarium> {
    let mut builder = Terrarium::builder();
    if let Some(path) = &args.state {
        let store: Arc<dyn StateStore> = Arc::new(
            JsonFileStore::open(path)
                .await
                .with_context(|| format!("failed to open state file: {}", path.display()))?,
        );
        builder = builder.store(store);
    }
    if let Some(path) = &args.config {
        let overlay = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        builder = builder.config_overlay(overlay);
    }
    builder.build().await.context("failed to build environment")
}

/// Print an outcome the way a terminal would: output to stdout,
/// failures to stderr, clears as an ANSI wipe.
fn print_outcome(outcome: &ExecOutcome) {
    if outcome.style == DisplayStyle::Clear {
        print!("\x1b[2J\x1b[1;1H");
        return;
    }
    if outcome.ok {
        print!("{}", outcome.output);
    } else {
        eprint!("{}", ensure_newline(&outcome.output));
    }
}

fn ensure_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

async fn drain_notices(terra: &Terrarium) {
    for notice in terra.take_notices().await {
        println!("{}", notice.trim_end_matches('\n'));
    }
}

async fn run_one_shot(terra: &Terrarium, line: &str) -> Result<i32> {
    match terra.submit(line).await? {
        Submission::Done(outcome) => {
            print_outcome(&outcome);
            Ok(if outcome.ok { 0 } else { 1 })
        }
        Submission::Prompt(request) => {
            eprintln!("terrarium: '{}' needs interactive input", request.message.trim_end());
            Ok(1)
        }
    }
}

/// Copy a host script into the guest's home and run it there.
async fn run_script_file(terra: &Terrarium, path: &PathBuf, args: &[String]) -> Result<i32> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("script path has no usable file name")?;
    let dest = format!("/home/guest/{name}");
    let user = terra.current_user();
    terra.vfs().write_file(&dest, &user, &source, false)?;
    let runnable = Mode::new(0o75).context("script mode out of range")?;
    terra.vfs().chmod(&dest, &user, runnable)?;

    let mut line = format!("run {name}");
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    run_one_shot(terra, &line).await
}

async fn run_repl(terra: &Terrarium) -> Result<()> {
    println!("terrarium v{}", env!("CARGO_PKG_VERSION"));
    println!("Ctrl-D or 'exit' leaves the session.");

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("failed to create line editor")?;

    loop {
        drain_notices(terra).await;
        match rl.readline(&terra.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "exit" {
                    break;
                }
                if !trimmed.is_empty() {
                    if let Err(err) = rl.add_history_entry(trimmed) {
                        tracing::warn!("could not record history entry: {err}");
                    }
                }
                match terra.submit(&line).await {
                    Ok(Submission::Done(outcome)) => print_outcome(&outcome),
                    Ok(Submission::Prompt(request)) => answer_prompt(terra, &mut rl, request).await,
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("terrarium: {err}");
                break;
            }
        }
    }
    Ok(())
}

/// Collect the answer to a pending prompt and resume the command.
async fn answer_prompt(
    terra: &Terrarium,
    rl: &mut Editor<(), DefaultHistory>,
    request: terrarium::PromptRequest,
) {
    while terra.awaiting_input() {
        let answer = match rl.readline(&request.message) {
            Ok(answer) => answer,
            Err(_) => String::new(),
        };
        match terra.respond(&answer).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(err) => eprintln!("{err}"),
        }
    }
}
