use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use ubudchat::chatbot::{
    BookingForm, BookingPopup, Bubble, ChatController, Collaborators, HttpRelay, MemoryStorage, SlotStorage,
    SqliteStorage, TerminalBell, TerminalRenderer,
};
use ubudchat::config::Config;

/// How long to wait for input when nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_secs(3600);

/// Announces popup changes on the terminal.
struct TerminalPopup;

impl BookingPopup for TerminalPopup {
    fn open(&mut self) {
        println!("[booking form opened] submit with: /submit Full Name=...; Email=...");
    }

    fn close(&mut self) {
        println!("[booking form closed]");
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <text>                 chat with the assistant");
    println!("  /1 .. /4               tap a quick reply");
    println!("  /book                  press a page \"Book Now\" button");
    println!("  /button                press the \"Book Now\" button in the chat");
    println!("  /open, /close          show or hide the chat panel");
    println!("  /submit K=V; K=V       submit the booking form");
    println!("  /html                  print the conversation as page markup");
    println!("  /quit");
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ubudchat.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("ubudchat.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::WARN.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("Starting ubudchat...");
    info!("Loaded config from {config_path}");

    let storage: Box<dyn SlotStorage> = match SqliteStorage::open(&config.database_path()) {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            warn!("Chat history storage unavailable, keeping this session in memory: {e}");
            Box::new(MemoryStorage::new())
        }
    };

    let relay = Arc::new(HttpRelay::new(config.relay_endpoint.clone()));
    info!("Relaying booking requests to {}", relay.endpoint());
    let parts = Collaborators::new(storage, Box::new(TerminalRenderer::new(std::io::stdout())), relay)
        .with_popup(Box::new(TerminalPopup))
        .with_audio(Box::new(TerminalBell));

    let mut chat = ChatController::new(parts, config.controller_settings());
    chat.start();
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_tick = Instant::now();

    loop {
        let wait = chat.time_until_next_task().unwrap_or(IDLE_POLL);

        tokio::select! {
            line = lines.next_line() => {
                let now = Instant::now();
                chat.advance(now - last_tick);
                last_tick = now;

                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read input: {e}");
                        break;
                    }
                };
                if !handle_line(&mut chat, &line).await {
                    break;
                }
            }
            _ = tokio::time::sleep(wait) => {
                let now = Instant::now();
                chat.advance(now - last_tick);
                last_tick = now;
            }
        }
    }

    info!("Shutting down");
}

/// Apply one line of input. Returns false to quit.
async fn handle_line(chat: &mut ChatController, line: &str) -> bool {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        chat.submit_text(line);
        return true;
    };

    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "quit" | "exit" => return false,
        "help" => print_help(),
        "book" => chat.book_now(),
        "button" => chat.press_booking_button(),
        "open" => chat.open_panel(),
        "close" => chat.close_panel(),
        "html" => {
            for msg in chat.messages() {
                println!("{}", Bubble::from_message(msg).to_html());
            }
        }
        "submit" => {
            let form = BookingForm::parse(rest);
            // Failures are already reported to the visitor
            let _ = chat.submit_booking(&form).await;
        }
        _ => match name.parse::<usize>() {
            Ok(n) if n >= 1 => {
                if !chat.tap_quick_reply(n - 1) {
                    println!("No quick reply /{n}");
                }
            }
            _ => println!("Unknown command /{name} (try /help)"),
        },
    }
    true
}
