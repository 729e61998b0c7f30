#![allow(unused)]

mod command;
mod config;
mod rusty;
mod session;
mod trace;

use std::env;
use std::io::{stdin, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;

use txkv::storage::log_cask::LogCask;
use txkv::storage::memory::Memory;
use txkv::txn::manager::Manager;

use crate::config::ConfigLoad;
use crate::session::Session;

#[derive(Debug, Parser)]
#[command(version, author, about)]
pub struct Args {
    #[clap(short, long, help = "debug mode")]
    debug: bool,

    /// Where to store data; omit for an in-memory, non-persistent table set.
    #[clap(long = "storage-path")]
    storage_path: Option<PathBuf>,

    #[clap(long = "log-dir")]
    log_dir: Option<PathBuf>,

    #[clap(short = 'l', long = "log-level")]
    log_level: Option<String>,

    #[clap(long = "quiet", short = 'q', default_value = "false")]
    quiet: bool,

    #[clap(short = 'n', long, help = "Force non-interactive mode", default_value = "false")]
    non_interactive: bool,

    #[clap(long, require_equals = true, help = "Single command to execute, then exit")]
    query: Option<String>,
}

pub fn main() -> Result<()> {
    setup_panic_hooks();

    let args = Args::parse();
    if !args.quiet {
        eprintln!();
        eprintln!("██  ██  █        █");
        eprintln!("██ ██   ██      ██");
        eprintln!("███      ██    ██");
        eprintln!("██ ██     ██  ██");
        eprintln!("██  ██     ████  txkv CLI");
        eprintln!();
    }

    if args.debug {
        println!("{args:?}");
    }

    let mut settings = ConfigLoad::new();
    settings.apply_args(&args);

    let log_dir = settings
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(env::var("HOME").unwrap_or_else(|_| ".".to_string())).join(".txkv-cli"));
    let level = settings.log_level.parse().unwrap_or(log::LevelFilter::Warn);
    trace::init_logging(&log_dir, level)?;
    info!("txkv-cli start args: {args:?}");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("received Ctrl+C!");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let is_terminal = stdin().is_terminal();
    let is_repl = is_terminal && !args.non_interactive && args.query.is_none();
    if is_repl {
        settings.terminal_update();
    }

    match settings.storage_path.clone() {
        Some(path) => run(Manager::new(LogCask::new(path)?), settings, is_repl, args.query),
        None => run(Manager::new(Memory::new()), settings, is_repl, args.query),
    }
}

fn run<E: txkv::storage::engine::Engine>(
    manager: Manager<E>,
    settings: ConfigLoad,
    is_repl: bool,
    query: Option<String>,
) -> Result<()> {
    let mut session = Session::new(manager, settings);

    if is_repl {
        session.handle_repl();
        return Ok(());
    }

    match query {
        None => session.handle_reader(stdin().lock()),
        Some(query) => session.handle_reader(std::io::Cursor::new(query)),
    }
}

fn setup_panic_hooks() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();
    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);
            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta).expect("human-panic: printing error message to console failed");
        }));
    }
}
