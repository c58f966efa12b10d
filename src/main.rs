use anyhow::Result;
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::env;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant};

mod utils;

use parley::chat::rest::RestApi;
use parley::chat::{ChatClient, ClientEvent};
use parley::session::{load_session, save_session, Session};

/// Command line arguments for Parley
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Parley: a terminal chat client with live presence and typing indicators."
)]
struct Args {
    /// Base URL of the REST API
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// Base URL of the push channel
    #[arg(long, default_value = "ws://127.0.0.1:8000")]
    ws_url: String,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Commands typed at the prompt.
enum Command {
    Select(i64),
    Contacts,
    Say(String),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix("/select ") {
        match rest.trim().parse() {
            Ok(peer_id) => return Some(Command::Select(peer_id)),
            Err(_) => {
                eprintln!("Usage: /select <contact id>");
                return None;
            }
        }
    }
    match line {
        "/contacts" => Some(Command::Contacts),
        "/quit" => Some(Command::Quit),
        _ if line.starts_with('/') => {
            eprintln!("Unknown command: {}", line);
            None
        }
        _ => Some(Command::Say(line.to_string())),
    }
}

/// Resolve the session: environment variables first, then the saved session
/// file, then an interactive prompt. Login itself belongs to the auth
/// collaborator; this binary only needs the resulting {user id, token}.
fn resolve_session() -> Result<(Session, bool)> {
    if let (Ok(user_id), Ok(token)) = (env::var("PARLEY_USER_ID"), env::var("PARLEY_TOKEN")) {
        let user_id = user_id.parse()?;
        return Ok((Session::new(user_id, &token), true));
    }

    if let Some(session) = load_session()? {
        info!("Using saved session for user {}", session.user_id);
        return Ok((session, false));
    }

    eprintln!("Enter user id:");
    let user_id = utils::read_line()?.parse()?;
    eprintln!("Enter access token:");
    let token = utils::read_line()?;
    Ok((Session::new(user_id, &token), false))
}

fn print_contacts(client: &ChatClient, query: &str) {
    let visible = client.contacts().visible(query);
    if visible.is_empty() {
        println!("(no contacts)");
        return;
    }
    for contact in visible {
        let presence = if contact.online { "*" } else { " " };
        let unread = if contact.unread { " [unread]" } else { "" };
        let typing = if contact.typing { " (typing...)" } else { "" };
        let preview = contact.last_message_preview.as_deref().unwrap_or("");
        println!(
            "{} {:>4}  {}{}{}  {}",
            presence, contact.id, contact.display_name, unread, typing, preview
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    utils::setup_logging(
        args.log_file.as_deref().and_then(|p| p.to_str()),
        args.log_level,
    )?;
    info!("Parley chat client starting up");

    let (session, session_from_env) = resolve_session()?;
    let token = session.token().unwrap_or_default();
    if token.is_empty() {
        warn!("No bearer token available; REST calls will be rejected");
    }

    let api = RestApi::new(&args.api_url, &token);
    let (mut client, mut event_rx) = ChatClient::new(session.user_id, api);

    println!("Connecting as user {}...", session.user_id);
    match client.start(&args.ws_url).await {
        Ok(()) => {
            if !session_from_env {
                if let Err(e) = save_session(&session) {
                    eprintln!("Warning: failed to save session: {}", e);
                }
            }
        }
        Err(e) => {
            error!("Could not open the push channel: {}", e);
            eprintln!("Could not connect: {}", e);
            return Err(e);
        }
    }

    println!("Connected. /contacts lists peers, /select <id> opens a conversation, /quit exits.");

    // Blocking stdin reader feeding the dispatch loop
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(16);
    std::thread::spawn(move || loop {
        match utils::read_line() {
            Ok(line) => {
                if let Some(cmd) = parse_command(&line) {
                    if cmd_tx.blocking_send(cmd).is_err() {
                        break;
                    }
                }
            }
            Err(_) => break,
        }
    });

    // The dispatch loop: push events, REST completions, user commands and
    // the housekeeping tick all apply here, one at a time.
    let mut ticker = interval(Duration::from_millis(250));
    let mut printed = 0usize;
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                if matches!(&event, ClientEvent::ConnectionClosed) {
                    println!("(connection lost; messages will no longer arrive live)");
                }
                client.handle_event(event, Instant::now());

                // Show anything newly appended to the open conversation
                let messages = client.conversation().messages();
                for msg in messages.iter().skip(printed) {
                    let who = if msg.sender_id == client.user_id() { "me" } else { "them" };
                    println!("[{}] {}: {}", msg.created_at.format("%H:%M"), who, msg.content);
                }
                printed = messages.len();
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Select(peer_id)) => {
                        client.select_contact(peer_id);
                        printed = 0;
                        println!("-- conversation with {} --", peer_id);
                    }
                    Some(Command::Contacts) => print_contacts(&client, ""),
                    Some(Command::Say(text)) => {
                        client.keystroke(Instant::now());
                        client.send_message(&text);
                    }
                    Some(Command::Quit) | None => break,
                }
            }
            _ = ticker.tick() => {
                client.tick(Instant::now());
            }
        }
    }

    client.shutdown();
    info!("Parley shut down cleanly");
    Ok(())
}
