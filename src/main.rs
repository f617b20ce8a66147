//! # Delve Headless Runner
//!
//! Generates levels and plays them without a presentation layer, driven by a key
//! script or by the autoplay input. Useful for soak tests and for eyeballing layouts.

use clap::Parser;
use delve::{
    render_ascii, render_status, AutoplayInput, CompletionState, DelveResult, GameConfig,
    InputSource, LevelSession, MessageLog, ScriptedInput, SessionEvent,
};
use std::path::PathBuf;

/// Command line arguments for the Delve runner.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Headless runner for the Delve dungeon crawler simulation")]
#[command(version)]
struct Args {
    /// Random seed for the run (overrides the config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON configuration file with `generation` and `rules` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid width in cells
    #[arg(long)]
    width: Option<u32>,

    /// Grid height in cells
    #[arg(long)]
    height: Option<u32>,

    /// Rooms per level
    #[arg(long)]
    rooms: Option<u32>,

    /// Stop after this many completed turns
    #[arg(short, long, default_value_t = 200)]
    turns: u64,

    /// Key script to play (w/a/s/d or h/j/k/l to move, f or . to skip)
    #[arg(long, conflicts_with = "autoplay")]
    script: Option<String>,

    /// Let the computer play (the default when no script is given)
    #[arg(long)]
    autoplay: bool,

    /// Print the map whenever a level starts and when the run ends
    #[arg(long)]
    dump: bool,

    /// Save a session snapshot to this file when the run ends
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    log::info!("Starting Delve v{}", delve::VERSION);
    if let Err(err) = run(&args) {
        log::error!("Run failed: {}", err);
        std::process::exit(1);
    }
}

/// Installs env_logger at the requested level unless RUST_LOG overrides it.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .try_init();
}

fn load_config(args: &Args) -> DelveResult<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.generation.seed = seed;
    }
    if let Some(width) = args.width {
        config.generation.width = width;
    }
    if let Some(height) = args.height {
        config.generation.height = height;
    }
    if let Some(rooms) = args.rooms {
        config.generation.num_rooms = rooms;
    }
    config.generation.validate()?;
    Ok(config)
}

fn run(args: &Args) -> DelveResult<()> {
    let config = load_config(args)?;
    log::info!(
        "Seed {}, {}x{} grid, {} rooms",
        config.generation.seed,
        config.generation.width,
        config.generation.height,
        config.generation.num_rooms
    );

    let frame = 1.0 / config.rules.move_speed;
    let mut session = LevelSession::new(config)?;
    let mut input: Box<dyn InputSource> = match &args.script {
        Some(script) => Box::new(ScriptedInput::from_script(script)?),
        None => {
            if !args.autoplay {
                log::info!("No script given, autoplay takes the controls");
            }
            Box::new(AutoplayInput::new())
        }
    };
    let mut log = MessageLog::default();

    while session.statistics().turns < args.turns {
        match session.completion() {
            CompletionState::LevelComplete => {
                session.advance_level()?;
                continue;
            }
            CompletionState::PlayerDied => {
                session.restart_level()?;
                continue;
            }
            CompletionState::Playing => {}
        }

        let events = session.tick(frame, input.as_mut())?;
        if args.dump && events.iter().any(|e| matches!(e, SessionEvent::LevelGenerated { .. })) {
            print!(
                "{}",
                render_ascii(session.grid(), session.placements(), session.actors())
            );
        }
        log.record(&events, session.player_id());

        if events.is_empty() && session.is_awaiting_input() {
            log::info!("Input ran out after {} turns", session.statistics().turns);
            break;
        }
    }

    if args.dump {
        print!(
            "{}",
            render_ascii(session.grid(), session.placements(), session.actors())
        );
    }
    for message in log.recent(10) {
        println!("{}", message);
    }
    println!("{}", render_status(&session));
    println!("{}", serde_json::to_string_pretty(session.statistics())?);

    if let Some(path) = &args.save {
        session.snapshot().save_to_file(path)?;
        log::info!("Saved session to {}", path.display());
    }
    Ok(())
}
