#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays the Trivia Maze in a terminal.

mod config;
mod input;
mod text_view;

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trivia_maze_core::Command;
use trivia_maze_question_bank::QuestionBank;
use trivia_maze_world::{apply, query, Observer, Outcome, Session};

use crate::{
    config::CliConfig,
    input::{resolve_choice, Input, HELP},
    text_view::{render_map, TextView},
};

/// Environment variable holding the tracing filter directives.
const LOG_ENV: &str = "TRIVIA_MAZE_LOG";

/// Answer trivia questions to open doors and find the exit.
#[derive(Debug, Parser)]
#[command(name = "trivia-maze", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of room columns
    #[arg(long)]
    width: Option<u32>,

    /// Number of room rows
    #[arg(long)]
    height: Option<u32>,

    /// Seed for maze generation and question order
    #[arg(long)]
    seed: Option<u64>,

    /// Chance of each extra door, in basis points
    #[arg(long = "extra-doors")]
    extra_doors: Option<u16>,

    /// Number of items hidden in the maze
    #[arg(long)]
    items: Option<u32>,

    /// Only ask questions from this category
    #[arg(long)]
    category: Option<String>,

    /// Question bank to use instead of the bundled one
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Save file used by the `save` and `load` commands
    #[arg(long)]
    save_path: Option<PathBuf>,

    /// Resume the game stored in this save file
    #[arg(long)]
    load: Option<PathBuf>,
}

impl Args {
    /// Overlays explicitly passed flags on top of the file configuration.
    fn overlay(&self, config: &mut CliConfig) {
        let game = &mut config.game;
        if let Some(width) = self.width {
            game.width = width;
        }
        if let Some(height) = self.height {
            game.height = height;
        }
        if self.seed.is_some() {
            game.seed = self.seed;
        }
        if let Some(bps) = self.extra_doors {
            game.extra_door_density_bps = bps;
        }
        if let Some(items) = self.items {
            game.item_count = items;
        }
        if self.category.is_some() {
            game.category.clone_from(&self.category);
        }
        if self.questions.is_some() {
            config.questions.clone_from(&self.questions);
        }
        if let Some(path) = &self.save_path {
            config.save_path.clone_from(path);
        }
    }
}

/// Entry point for the Trivia Maze command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CliConfig::from_path(path)?,
        None => CliConfig::default(),
    };
    args.overlay(&mut config);

    let question_seed = config.game.seed.unwrap_or_else(rand::random);
    let bank = question_bank(&config, question_seed)?;
    let mut session = match &args.load {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("could not read save file {}", path.display()))?;
            Session::load(&bytes, Box::new(bank))
                .with_context(|| format!("could not load save file {}", path.display()))?
        }
        None => Session::new(config.game.clone(), Box::new(bank))
            .context("could not start a new game")?,
    };

    let view: Rc<dyn Observer> = Rc::new(TextView);
    let _ = session.register(view);

    println!("{}", query::welcome_banner(&session));
    println!("Type `help` for a list of commands.\n");
    print!("{}", render_map(query::maze(&session)));

    let stdin = io::stdin();
    play(&mut session, &config, stdin.lock())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn question_bank(config: &CliConfig, seed: u64) -> Result<QuestionBank> {
    match &config.questions {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("could not read question bank {}", path.display()))?;
            QuestionBank::from_toml_str(&contents, seed)
                .with_context(|| format!("invalid question bank {}", path.display()))
        }
        None => QuestionBank::bundled(seed).context("bundled question bank is invalid"),
    }
}

/// Reads commands line by line until `quit` or end of input.
fn play(session: &mut Session, config: &CliConfig, input: impl BufRead) -> Result<()> {
    let mut stdout = io::stdout();
    prompt(&mut stdout)?;

    for line in input.lines() {
        let line = line.context("could not read from stdin")?;
        let challenge = query::pending_challenge(session);

        match Input::parse(&line, challenge.as_ref()) {
            Ok(Input::Quit) => break,
            Ok(Input::Help) => println!("{HELP}"),
            Ok(Input::Map) => print!("{}", render_map(query::maze(session))),
            Ok(Input::Inventory) => print_inventory(session),
            Ok(Input::NewGame) => match session.new_game(config.game.clone()) {
                Ok(()) => print!("{}", render_map(query::maze(session))),
                Err(error) => println!("{error}"),
            },
            Ok(Input::Save(path)) => {
                let path = path.unwrap_or_else(|| config.save_path.clone());
                match save(session, &path) {
                    Ok(()) => println!("Saved to {}.", path.display()),
                    Err(error) => println!("{error:#}"),
                }
            }
            Ok(Input::Load(path)) => {
                let path = path.unwrap_or_else(|| config.save_path.clone());
                match restore(session, &path) {
                    Ok(()) => {
                        println!("Loaded {}.", path.display());
                        print!("{}", render_map(query::maze(session)));
                    }
                    Err(error) => println!("{error:#}"),
                }
            }
            Ok(Input::Command(command)) => run_command(session, command),
            Err(message) => println!("{message}"),
        }

        prompt(&mut stdout)?;
    }

    Ok(())
}

fn run_command(session: &mut Session, command: Command) {
    let command = match command {
        Command::SubmitAnswer { answer } => Command::SubmitAnswer {
            answer: resolve_choice(answer, query::pending_challenge(session).as_ref()),
        },
        other => other,
    };

    match apply(session, command) {
        Ok(Outcome::Moved { .. }) => print!("{}", render_map(query::maze(session))),
        Ok(_) => {}
        Err(error) => println!("{error}"),
    }

    if query::status(session).is_terminal() {
        println!("Type `new` to play again or `quit` to leave.");
    }
}

fn print_inventory(session: &Session) {
    let inventory = query::inventory(session);
    if inventory.is_empty() {
        println!("You carry nothing.");
        return;
    }
    for (item, count) in inventory {
        println!("  {item} x{count}");
    }
}

fn save(session: &Session, path: &Path) -> Result<()> {
    fs::write(path, session.save())
        .with_context(|| format!("could not write save file {}", path.display()))?;
    tracing::info!(path = %path.display(), turn = query::turn(session), "game saved");
    Ok(())
}

fn restore(session: &mut Session, path: &Path) -> Result<()> {
    let bytes =
        fs::read(path).with_context(|| format!("could not read save file {}", path.display()))?;
    session
        .restore(&bytes)
        .with_context(|| format!("could not load save file {}", path.display()))
}

fn prompt(stdout: &mut io::Stdout) -> Result<()> {
    print!("> ");
    stdout.flush().context("could not flush stdout")
}
