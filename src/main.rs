use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use cellisp::config::{Config, DEFAULT_CELLS, DEFAULT_MAX_DEPTH, DEFAULT_STORAGE};
use cellisp::Machine;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Heap capacity in cells.
    #[arg(long, default_value_t = DEFAULT_CELLS)]
    cells: usize,

    /// Maximum closure-call nesting before evaluation is aborted.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// File used by :SAVE and :LOAD.
    #[arg(long, default_value = DEFAULT_STORAGE)]
    storage: PathBuf,

    /// Evaluate every line of this file before the first prompt.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Show each parsed form before its value.
    #[arg(long)]
    echo: bool,
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Config {
            cells: cli.cells,
            max_depth: cli.max_depth,
            storage: cli.storage.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CELLISP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from(&cli);
    let mut machine = Machine::new(&config).context("failed to initialize the heap")?;

    if let Some(path) = &cli.load {
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        for line in input.lines().filter(|l| !l.trim().is_empty()) {
            machine.collect();
            if let Err(e) = machine.run_line(line) {
                eprintln!("{}", e);
            }
        }
    }

    println!("cellisp ({} cells, storage {})", config.cells, config.storage.display());
    run_interactive(&mut machine, cli.echo)
}

/// The driving loop: collect, show the free-cell count, read a line,
/// evaluate it, print the value. A fatal error only ends the current cycle.
fn run_interactive(machine: &mut Machine, echo: bool) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let free = machine.collect();
        let prompt = format!("[{}] > ", free);

        let readline = match machine.take_edit() {
            Some(text) => rl.readline_with_initial(&prompt, (text.as_str(), "")),
            None => rl.readline(&prompt),
        };
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        match machine.run_line(&line) {
            Ok(cycle) => {
                if echo {
                    println!("{}", cycle.form);
                }
                println!("{}", cycle.value);
            }
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}
