//! Study Deck - weighted topic scheduler TUI
//!
//! Draws one topic per subject from weight-balanced decks, sets a revision
//! deadline and tracks the batch until it is done.

mod config;
mod deck;
mod error;
mod logging;
mod models;
mod progress;
mod prompt;
mod scheduler;
mod session;
mod storage;
mod syllabus;
mod ui;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{error, info};

use config::Config;
use prompt::{Answered, TerminalPrompt};
use session::{CompletionOutcome, DrawOutcome, StudySession};
use storage::FileStore;
use syllabus::Syllabus;
use ui::theme::icons;
use ui::App;

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "studydeck")]
#[command(author, version, about = "Weighted study deck scheduler", long_about = None)]
struct Args {
    /// Directory holding the state file and logs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Syllabus JSON file to use instead of the bundled one
    #[arg(short, long)]
    syllabus: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the active batch, deadline and cycle progress
    Status,
    /// Draw a new batch, one topic per subject
    Draw,
    /// Toggle the done mark of a batch card
    Toggle {
        /// Card number as shown by `status` (starting at 1)
        index: usize,
    },
    /// Complete the active batch
    Complete {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show per-subject and per-topic cycle progress
    Syllabus,
    /// Rebuild one subject's deck from the syllabus
    Refill {
        subject: String,
    },
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    let args = Args::parse();

    // Load config
    let config = Config::load().unwrap_or_default();

    // Determine data directory
    let data_dir = args.data_dir.unwrap_or_else(FileStore::default_path);
    let store = FileStore::new(data_dir)?;

    let _log_guard = logging::setup_logging(store.data_dir(), &config.log_level)?;

    let syllabus_path = args.syllabus.or_else(|| config.syllabus_path.clone());
    let syllabus = load_syllabus(syllabus_path)
        .inspect_err(|err| error!(error = %err, "Cannot start without a syllabus"))?;

    let session = StudySession::open(syllabus, Box::new(store))?;

    match args.command {
        None => run_tui(session, config),
        Some(command) => run_command(session, command),
    }
}

fn load_syllabus(path: Option<PathBuf>) -> Result<Syllabus> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading syllabus");
            Syllabus::load(&path).with_context(|| format!("Failed to load syllabus {:?}", path))
        }
        None => Syllabus::bundled().context("Bundled syllabus is invalid"),
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Subcommands
// ══════════════════════════════════════════════════════════════════════════

fn run_command(mut session: StudySession, command: Command) -> Result<()> {
    match command {
        Command::Status => print_status(&session),
        Command::Draw => match session.draw_new_batch()? {
            DrawOutcome::Drawn { total_weight, days } => {
                println!("{} New batch drawn (total weight {}, {} days)", icons::CHECK, total_weight, days);
                print_status(&session);
            }
            DrawOutcome::AlreadyActive => {
                println!("A batch is already active. Finish it before drawing another.");
            }
        },
        Command::Toggle { index } => {
            let toggled = match index.checked_sub(1) {
                Some(i) => session.toggle_topic(i)?,
                None => false,
            };
            if !toggled {
                anyhow::bail!(
                    "No card {} in the current batch (1..={})",
                    index,
                    session.state().current_batch.len()
                );
            }
            print_batch(&session);
        }
        Command::Complete { yes } => {
            let outcome = if yes {
                let mut answered = Answered::yes();
                let outcome = session.complete_batch(&mut answered)?;
                for notice in &answered.notices {
                    println!("{}", notice);
                }
                outcome
            } else {
                session.complete_batch(&mut TerminalPrompt::stdio())?
            };
            match outcome {
                CompletionOutcome::Completed => {
                    println!("{} Batch complete. Draw the next set when ready.", icons::CHECK)
                }
                CompletionOutcome::Unfinished { remaining } => {
                    println!("{} topic(s) still open.", remaining)
                }
                CompletionOutcome::Cancelled => println!("Batch left open."),
                CompletionOutcome::NoActiveBatch => println!("No active batch."),
            }
        }
        Command::Syllabus => print_syllabus(&session),
        Command::Refill { subject } => {
            session.refill_deck(&subject)?;
            let left = session.state().deck(&subject).map_or(0, |d| d.len());
            println!("{} Refilled {} ({} cards)", icons::CHECK, subject, left);
        }
    }
    Ok(())
}

fn print_batch(session: &StudySession) {
    for (i, card) in session.state().current_batch.iter().enumerate() {
        println!(
            "{:>2}. {} {} - {} (W{})",
            i + 1,
            if card.done { icons::CHECKED } else { icons::UNCHECKED },
            card.subject,
            card.name,
            card.weight
        );
    }
}

fn print_status(session: &StudySession) {
    let state = session.state();
    if state.active {
        print_batch(session);
        println!();
        if let Some(countdown) = session.countdown_at(Local::now()) {
            println!("{}: {}", countdown.badge(), countdown.headline(&state.range_str));
        }
    } else {
        println!("No active batch. Run `studydeck draw` to start one.");
    }

    let stats = session.aggregate_stats();
    println!(
        "Cycle: {}/{} cards drawn ({}%), {} left in decks",
        stats.completed,
        stats.total_cards_in_cycle,
        stats.percent_done(),
        stats.current_cards_left
    );
}

fn print_syllabus(session: &StudySession) {
    let options = textwrap::Options::new(78)
        .initial_indent("    ")
        .subsequent_indent("    ");

    for subject in session.subject_progress() {
        println!(
            "{} - {}% ({} of {} cards left)",
            subject.subject, subject.percent, subject.cards_left, subject.cycle_weight
        );
        let topics = subject
            .topics
            .iter()
            .map(|t| format!("{} {}% [{}]", t.name, t.percent, t.status.label()))
            .collect::<Vec<_>>()
            .join("; ");
        println!("{}", textwrap::fill(&topics, &options));
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Terminal UI
// ══════════════════════════════════════════════════════════════════════════

fn run_tui(session: StudySession, config: Config) -> Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let mut app = App::new(session, config);
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal before reporting anything.
    let restored = restore_terminal(&mut terminal);
    if let Err(err) = &result {
        error!(error = %err, "TUI exited with an error");
        eprintln!("Error: {:#}", err);
    }
    result.and(restored)
}

fn restore_terminal<B: Backend + io::Write>(terminal: &mut Terminal<B>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|frame| app.render(frame))?;
        app.handle_events()?;
    }
    Ok(())
}
