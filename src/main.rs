use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

use clipboard_manager::app::App;
use clipboard_manager::clipboard_history::{HistoryEngine, SystemClipboard};
use clipboard_manager::config::{self, Config};
use clipboard_manager::error::ResultExt;
use clipboard_manager::logging;
use clipboard_manager::panel::{Panel, PanelCommand, PanelOutcome};

#[derive(Debug, Parser)]
#[command(
    name = "clipboard-manager",
    version,
    about = "Encrypted clipboard history with pinning and a global hotkey"
)]
struct Args {
    /// Config file (default: ~/.clipboard_manager_config.json)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Monitor the clipboard and answer the hotkey (default)
    Run,
    /// Print the history in panel order
    List,
    /// Toggle the pin on entry N (1-based, as shown by `list`)
    Pin { index: usize },
    /// Delete entry N
    Remove { index: usize },
    /// Copy entry N back to the clipboard
    Select { index: usize },
    /// Delete every entry, pinned ones included
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init();

    let config = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&config),
        Command::List => {
            print!("{}", open_panel(&config)?.render());
            Ok(())
        }
        Command::Pin { index } => one_shot(&config, index, PanelCommand::TogglePin),
        Command::Remove { index } => one_shot(&config, index, PanelCommand::Remove),
        Command::Select { index } => one_shot(&config, index, PanelCommand::Select),
        Command::Clear => {
            let mut panel = open_panel(&config)?;
            panel.apply(PanelCommand::Clear)?;
            print!("{}", panel.render());
            Ok(())
        }
    }
}

fn open_panel(config: &Config) -> Result<Panel<SystemClipboard>> {
    let engine = HistoryEngine::open(config).context("Failed to open clipboard history")?;
    Ok(Panel::new(Arc::new(engine), SystemClipboard::new()))
}

fn one_shot(config: &Config, index: usize, command: fn(String) -> PanelCommand) -> Result<()> {
    let mut panel = open_panel(config)?;
    let Some(text) = panel.text_at(index) else {
        bail!("No history entry at position {}", index);
    };
    if panel.apply(command(text))? != PanelOutcome::Dismiss {
        print!("{}", panel.render());
    }
    Ok(())
}

/// Events for the terminal front-end, merged from stdin and the hotkey.
enum FrontendEvent {
    Line(String),
    ShowPanel,
    InputClosed,
}

#[derive(Debug, PartialEq, Eq)]
enum LineCommand {
    List,
    Pin(usize),
    Remove(usize),
    Select(usize),
    Clear,
    Quit,
    Help,
}

fn parse_line(line: &str) -> Option<LineCommand> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let Some(arg) = arg else {
        return match verb {
            "list" | "ls" => Some(LineCommand::List),
            "clear" => Some(LineCommand::Clear),
            "quit" | "exit" | "q" => Some(LineCommand::Quit),
            "help" | "?" => Some(LineCommand::Help),
            _ => None,
        };
    };

    // Every verb that takes an argument takes exactly one display index
    let index = arg.parse::<usize>().ok()?;
    match verb {
        "pin" => Some(LineCommand::Pin(index)),
        "rm" | "remove" => Some(LineCommand::Remove(index)),
        "sel" | "select" => Some(LineCommand::Select(index)),
        _ => None,
    }
}

const HELP: &str = "commands: list | pin N | rm N | sel N | clear | quit";

fn run(config: &Config) -> Result<()> {
    let app = App::start(config)?;
    let mut panel = Panel::new(Arc::clone(app.engine()), SystemClipboard::new());
    let (events_tx, events_rx) = async_channel::unbounded();

    let triggers = app.triggers().clone();
    let forward_tx = events_tx.clone();
    thread::Builder::new()
        .name("panel-triggers".to_string())
        .spawn(move || {
            while triggers.recv_blocking().is_ok() {
                if forward_tx.send_blocking(FrontendEvent::ShowPanel).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn trigger forwarder")?;

    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if events_tx.send_blocking(FrontendEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = events_tx.send_blocking(FrontendEvent::InputClosed);
        })
        .context("Failed to spawn stdin reader")?;

    println!(
        "Watching the clipboard. Press {} to show history. {}",
        config.get_hotkey().to_shortcut_string(),
        HELP
    );

    while let Ok(event) = events_rx.recv_blocking() {
        let line = match event {
            FrontendEvent::ShowPanel => {
                print!("{}", panel.render());
                io::stdout().flush().ok();
                continue;
            }
            FrontendEvent::InputClosed => break,
            FrontendEvent::Line(line) => line,
        };

        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse_line(&line) else {
            println!("{}", HELP);
            continue;
        };

        let (index, build): (usize, fn(String) -> PanelCommand) = match command {
            LineCommand::Quit => break,
            LineCommand::Help => {
                println!("{}", HELP);
                continue;
            }
            LineCommand::List => {
                print!("{}", panel.render());
                continue;
            }
            LineCommand::Clear => {
                panel.apply(PanelCommand::Clear).warn_on_err();
                print!("{}", panel.render());
                continue;
            }
            LineCommand::Pin(n) => (n, PanelCommand::TogglePin),
            LineCommand::Remove(n) => (n, PanelCommand::Remove),
            LineCommand::Select(n) => (n, PanelCommand::Select),
        };

        let Some(text) = panel.text_at(index) else {
            println!("No history entry at position {}", index);
            continue;
        };
        match panel.apply(build(text)) {
            Ok(PanelOutcome::Dismiss) => println!("Copied entry {} to the clipboard", index),
            Ok(_) => print!("{}", panel.render()),
            Err(e) => {
                warn!(error = %e, "Panel command failed");
                println!("{}", e);
            }
        }
    }

    info!("Front-end exiting");
    app.shutdown()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_commands() {
        assert_eq!(parse_line("list"), Some(LineCommand::List));
        assert_eq!(parse_line("  pin 2 "), Some(LineCommand::Pin(2)));
        assert_eq!(parse_line("rm 1"), Some(LineCommand::Remove(1)));
        assert_eq!(parse_line("sel 3"), Some(LineCommand::Select(3)));
        assert_eq!(parse_line("clear"), Some(LineCommand::Clear));
        assert_eq!(parse_line("q"), Some(LineCommand::Quit));
    }

    #[test]
    fn test_parse_line_rejects_malformed_input() {
        assert_eq!(parse_line("pin"), None);
        assert_eq!(parse_line("pin x"), None);
        assert_eq!(parse_line("list 1"), None);
        assert_eq!(parse_line("sel 1 2"), None);
        assert_eq!(parse_line("paste"), None);
        assert_eq!(parse_line("list x"), None);
        assert_eq!(parse_line("clear foo"), None);
        assert_eq!(parse_line("clear 1"), None);
        assert_eq!(parse_line("quit now"), None);
    }

    #[test]
    fn test_args_default_to_run() {
        let args = Args::try_parse_from(["clipboard-manager"]).unwrap();
        assert!(args.command.is_none());

        let args = Args::try_parse_from(["clipboard-manager", "pin", "4"]).unwrap();
        assert!(matches!(args.command, Some(Command::Pin { index: 4 })));
    }
}
