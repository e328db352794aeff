//! Interactive purchase view.
//!
//! A blocking rustyline thread feeds command lines into the async loop,
//! which also renders session notifications as they arrive.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::{
    domain::SeatNumber,
    session::{PurchaseSession, Route, SessionEvent},
    usecase::{HoldOutcome, PurchaseOutcome},
};

use super::formatter::{SeatFormatter, SeatLine};

const PROMPT: &str = "encuentro> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Seats,
    Hold(SeatNumber),
    Buy,
    Totals,
    History,
    Help,
    Quit,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let argument = words.next();

    match (command.as_str(), argument) {
        ("seats" | "ls", None) => Ok(Command::Seats),
        ("hold", Some(raw)) => raw
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not a seat number", raw))
            .and_then(|n| SeatNumber::try_from(n).map_err(|e| e.to_string()))
            .map(Command::Hold),
        ("hold", None) => Err("usage: hold <seat number>".to_string()),
        ("buy", None) => Ok(Command::Buy),
        ("totals", None) => Ok(Command::Totals),
        ("history", None) => Ok(Command::History),
        ("help" | "?", None) => Ok(Command::Help),
        ("quit" | "exit", None) => Ok(Command::Quit),
        _ => Err(format!("unknown command '{}'", line.trim())),
    }
}

fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}

/// Run the view until the user quits, then dispose the session.
pub async fn run_purchase_view(session: PurchaseSession) {
    let mut events = session.subscribe();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    print!("{}", SeatFormatter::format_help());

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => print!("{}", execute(&session, command).await),
                    Err(message) => println!("{}", message),
                }
            }
            event = events.recv() => {
                match event {
                    Ok(SessionEvent::Navigate(Route::PurchaseHistory)) => {
                        print!("{}", execute(&session, Command::History).await);
                        redisplay_prompt();
                    }
                    Ok(event) => {
                        if let Some(text) = SeatFormatter::format_session_event(&event) {
                            print!("{}", text);
                            redisplay_prompt();
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("View skipped {} session events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    session.dispose().await;
}

async fn execute(session: &PurchaseSession, command: Command) -> String {
    match command {
        Command::Seats => SeatFormatter::format_seat_map(&seat_lines(session).await),
        Command::Hold(number) => match session.hold(number).await {
            Ok(HoldOutcome::Held(number)) => format!("Seat {} held\n", number),
            Ok(HoldOutcome::Ignored(reason)) => format!("Seat {} not held: {}\n", number, reason),
            Err(e) => format!("{}\n", e),
        },
        Command::Buy => match session.purchase().await {
            Ok(PurchaseOutcome::Purchased(_)) => String::new(),
            Ok(PurchaseOutcome::Disabled(reason)) => format!("Purchase unavailable: {}\n", reason),
            Err(e) => format!("Purchase failed: {}\n", e),
        },
        Command::Totals => SeatFormatter::format_totals(session.totals().await.as_ref()),
        Command::History => match session.history().await {
            Ok(records) => SeatFormatter::format_history(&records),
            Err(e) => format!("Could not load purchases: {}\n", e),
        },
        Command::Help | Command::Quit => SeatFormatter::format_help(),
    }
}

async fn seat_lines(session: &PurchaseSession) -> Vec<SeatLine> {
    let selection = session.selection().await;
    let mut lines = Vec::new();
    for seat in session.seats().await {
        let number = seat.number;
        lines.push(SeatLine {
            selected: selection.contains(&number),
            remaining_secs: session.remaining_secs(number).await,
            hold_pending: session.is_hold_in_flight(number).await,
            error: session.hold_error(number).await,
            seat,
        });
    }
    lines
}
