// src/main.rs
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chess_sync::check::legal_moves;
use chess_sync::{
    Config, GameError, InMemoryRoomStore, Move, ParseMoveError, PlayerId, RoomClient,
    RoomRecord, RoomStore,
};

#[derive(Debug, Error)]
enum CommandError {
    #[error("unknown command '{0}'; type 'help' for commands")]
    UnknownCommand(String),
    #[error(transparent)]
    Move(#[from] ParseMoveError),
}

#[derive(Debug)]
enum UserInput {
    Move(Move),
    Command(Command),
}

#[derive(Debug)]
enum Command {
    Help,
    Fen,
    Moves,
    History,
    Sync,
    SaveStats(String),
    Quit,
}

fn parse_user_input(input: &str, default_stats: &str) -> Result<UserInput, CommandError> {
    let trimmed = input.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let word = parts.next().unwrap_or("").to_lowercase();
    let argument = parts.next().unwrap_or("").trim();

    let command = match word.as_str() {
        "help" | "?" => Command::Help,
        "fen" => Command::Fen,
        "moves" => Command::Moves,
        "history" => Command::History,
        "sync" => Command::Sync,
        "quit" | "exit" => Command::Quit,
        "savestats" => {
            let filename = if argument.is_empty() { default_stats } else { argument };
            Command::SaveStats(filename.to_string())
        }
        _ if (4..=5).contains(&trimmed.len()) => return Ok(UserInput::Move(trimmed.parse()?)),
        _ => return Err(CommandError::UnknownCommand(trimmed.to_string())),
    };
    Ok(UserInput::Command(command))
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

type Client = RoomClient<InMemoryRoomStore>;

/// The client whose colour is to move, after bringing both up to date.
fn client_to_move<'a>(clients: &'a mut [Client; 2]) -> Result<&'a mut Client, GameError> {
    for client in clients.iter_mut() {
        client.sync()?;
    }
    let turn = clients[0].session().position().turn;
    let index = if clients[0].color() == turn { 0 } else { 1 };
    Ok(&mut clients[index])
}

fn main() -> Result<(), Box<dyn Error>> {
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(Path::new))?;
    init_tracing(&config);

    let store = Arc::new(InMemoryRoomStore::new());
    store.create(&config.room_id, RoomRecord::new_game())?;
    let mut clients: [Client; 2] = [
        RoomClient::join(Arc::clone(&store), &config.room_id, PlayerId(config.white_player.clone()), config.draw_rules)?,
        RoomClient::join(Arc::clone(&store), &config.room_id, PlayerId(config.black_player.clone()), config.draw_rules)?,
    ];
    info!(room = %config.room_id, "local game started");

    println!("==============================");
    println!("|        Chess Sync          |");
    println!("==============================");
    print_help(&config.stats_filename);

    'game_loop: loop {
        let client = match client_to_move(&mut clients) {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Error: {}", e);
                break 'game_loop;
            }
        };
        let session = client.session();

        println!("------------------------------------------");
        println!("{}", session);
        if session.status().is_terminal() {
            println!("\n=== GAME OVER: {}. ===", session.status());
            if let Err(e) = session.save_history(&config.stats_filename) {
                eprintln!("Error: Failed to save game history: {}", e);
            } else {
                println!("Game history saved to '{}'.", config.stats_filename);
            }
            break 'game_loop;
        }

        print!("\n{} ({}) to move. Enter move (e.g. e2e4, a7a8q) or command: ", client.color(), client.identity());
        io::stdout().flush()?;

        let mut input_line = String::new();
        match io::stdin().read_line(&mut input_line) {
            Ok(0) => {
                println!("\nEnd of input detected. Quitting game.");
                break 'game_loop;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}. Try again or use 'quit'.", e);
                continue 'game_loop;
            }
        }
        if input_line.trim().is_empty() {
            continue 'game_loop;
        }

        match parse_user_input(&input_line, &config.stats_filename) {
            Ok(UserInput::Move(mv)) => match client.play(mv) {
                Ok(outcome) => println!("{} played {} ({}).", outcome.player, outcome.mv, outcome.status),
                Err(e) if e.is_fatal_to_session() => {
                    eprintln!("Error: {}", e);
                    break 'game_loop;
                }
                Err(e) => println!("Error making move: {}", e),
            },
            Ok(UserInput::Command(command)) => match command {
                Command::Help => print_help(&config.stats_filename),
                Command::Fen => println!("{}", client.session().fen()),
                Command::Moves => {
                    let position = client.session().position();
                    let moves: Vec<String> = legal_moves(position, position.turn)
                        .iter()
                        .map(Move::to_string)
                        .collect();
                    println!("{} legal moves: {}", moves.len(), moves.join(" "));
                }
                Command::History => {
                    for (i, record) in client.session().history().iter().enumerate() {
                        println!("{:>3}. {} {} -> {}", i + 1, record.player, record.mv, record.fen_after);
                    }
                }
                Command::Sync => match client.refresh() {
                    Ok(changed) => println!("Room re-read ({}).", if changed { "updated" } else { "no change" }),
                    Err(e) => println!("Error: {}", e),
                },
                Command::SaveStats(filename) => match client.session().save_history(&filename) {
                    Ok(()) => println!("Game history saved to '{}'.", filename),
                    Err(e) => println!("Error saving game history: {}", e),
                },
                Command::Quit => {
                    if let Err(e) = client.session().save_history(&config.stats_filename) {
                        warn!(error = %e, "could not save history on quit");
                    }
                    println!("Exiting game.");
                    break 'game_loop;
                }
            },
            Err(e) => println!("Input Error: {}", e),
        }
    }

    if let Err(e) = store.remove(&config.room_id) {
        warn!(error = %e, "room cleanup failed");
    }
    println!("\nGame session finished.");
    Ok(())
}

fn print_help(stats_filename: &str) {
    println!("\nAvailable Commands:");
    println!("  <move>           Coordinate notation (e.g. e2e4). A pawn reaching the last rank");
    println!("                   becomes a queen unless a piece letter follows (a7a8n).");
    println!("  moves            List the legal moves for the side to move.");
    println!("  fen              Print the current position as FEN.");
    println!("  history          Show each committed move with the FEN after it.");
    println!("  sync             Re-read the room record.");
    println!("  savestats [file] Save the game history as JSON (default: {}).", stats_filename);
    println!("  help             Show this help message.");
    println!("  quit / exit      Exit the game.");
    println!();
}
