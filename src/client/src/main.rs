use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use common::{
    error::{Error, Result},
    model::game::{GameMode, Move, Slot},
    utility::init_tracing,
};
use rps_client::{
    channel::Channel,
    entrypoint::{connect, ClientConfig},
    service::{protocol::SessionProtocol, session::GameSession},
};
use tracing::{error, info};

const DEFAULT_CONFIG: &str = "rps-client.json";
const HELP: &str = "commands: new <MAN_VS_MAN|MAN_VS_AI|AI_VS_AI> [name1] [name2], \
move <1|2> <ROCK|PAPER|SCISSORS>, play, status, save <path>, load <path>, exit";

fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_owned());
    let config = match ClientConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_level);

    let mut protocol = match connect(&config) {
        Ok(protocol) => protocol,
        Err(e) => {
            error!("{}", e);
            eprintln!("Connection with server failed!");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let result = run(&config, &mut protocol, stdin.lock(), &mut io::stdout());
    protocol.close();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Console loop failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

enum Flow {
    Continue,
    Exit,
}

/// Line-oriented front-end. Failed commands print a notice and the loop
/// goes on; only console I/O errors end it.
fn run<C: Channel>(
    config: &ClientConfig,
    protocol: &mut SessionProtocol<C>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let mut session: Option<GameSession> = None;
    writeln!(out, "{HELP}")?;
    for line in input.lines() {
        let line = line?;
        match handle(config, protocol, &mut session, line.trim(), out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => writeln!(out, "{}", notice(&e))?,
        }
    }
    info!("Console loop finished");
    Ok(())
}

fn handle<C: Channel>(
    config: &ClientConfig,
    protocol: &mut SessionProtocol<C>,
    session: &mut Option<GameSession>,
    line: &str,
    out: &mut impl Write,
) -> Result<Flow> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => {}
        ["exit"] => return Ok(Flow::Exit),
        ["new", mode, names @ ..] => {
            let mode: GameMode = mode.to_uppercase().parse()?;
            let name = |i: usize, default: &str| {
                names
                    .get(i)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| default.to_owned())
            };
            let created = match mode {
                GameMode::ManVsMan => {
                    GameSession::man_vs_man(name(0, "Player 1"), name(1, "Player 2"))
                }
                GameMode::ManVsAi => GameSession::man_vs_ai(name(0, "Player 1")),
                GameMode::AiVsAi => GameSession::ai_vs_ai(),
            };
            let created = created.with_player_one_tag(config.player_one_tag.clone());
            writeln!(
                out,
                "New {} game: {} vs {}",
                mode,
                created.player1().name,
                created.player2().name
            )?;
            *session = Some(created);
        }
        ["move", slot, value] => {
            let slot = match *slot {
                "1" => Slot::One,
                "2" => Slot::Two,
                other => return Err(Error::invalid_state(format!("no player {other}"))),
            };
            let value: Move = value.to_uppercase().parse()?;
            let session = current(session)?;
            session.make_move(slot, value)?;
            writeln!(out, "{} has made their move!", session.player(slot).name)?;
        }
        ["play"] => {
            let session = current(session)?;
            let response = session.play_round(protocol)?;
            writeln!(
                out,
                "Result: {}. Moves: {} put {}, {} put {}",
                session.winner().unwrap_or_default(),
                session.player1().name,
                response.move1,
                session.player2().name,
                response.move2
            )?;
        }
        ["status"] => {
            let session = current(session)?;
            let show = |value: Option<Move>| value.map_or("-", |m| m.as_str());
            writeln!(
                out,
                "{}: {} ({}) vs {} ({}), winner: {}",
                session.mode(),
                session.player1().name,
                show(session.player1().current_move),
                session.player2().name,
                show(session.player2().current_move),
                session.winner().unwrap_or("-")
            )?;
        }
        ["save", path] => {
            current(session)?.save(path)?;
            writeln!(out, "Game saved to {path}")?;
        }
        ["load", path] => {
            let loaded =
                GameSession::resume(path)?.with_player_one_tag(config.player_one_tag.clone());
            writeln!(
                out,
                "Loaded game: {} vs {}",
                loaded.player1().name,
                loaded.player2().name
            )?;
            *session = Some(loaded);
        }
        _ => writeln!(out, "{HELP}")?,
    }
    Ok(Flow::Continue)
}

fn current(session: &mut Option<GameSession>) -> Result<&mut GameSession> {
    session
        .as_mut()
        .ok_or_else(|| Error::invalid_state("no game in progress, start one with `new`"))
}

fn notice(error: &Error) -> String {
    match error {
        Error::Connection { .. } | Error::Io(_) | Error::PeerDisconnected => {
            format!("Server connection failed: {error}")
        }
        Error::Protocol {
            source: Some(cause),
            ..
        } => format!("Server connection failed: {cause}"),
        Error::Protocol { .. } | Error::InvalidState(_) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rps_client::test::{temp_path, ScriptedChannel};

    use super::*;

    fn console(incoming: &str, commands: &str) -> (String, SessionProtocol<ScriptedChannel>) {
        let config = ClientConfig {
            port: "scripted".to_owned(),
            ..ClientConfig::default()
        };
        let mut protocol =
            SessionProtocol::new(ScriptedChannel::opened().with_incoming(incoming.as_bytes()));
        let mut out = Vec::new();
        run(&config, &mut protocol, Cursor::new(commands.to_owned()), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), protocol)
    }

    #[test]
    fn plays_a_round() {
        let (out, protocol) = console(
            "Player 1,ROCK,SCISSORS|",
            "new man_vs_man Alice Bob\nmove 1 rock\nmove 2 SCISSORS\nplay\nexit\nplay\n",
        );
        assert!(out.contains("Result: Alice. Moves: Alice put ROCK, Bob put SCISSORS"), "{out}");
        assert_eq!(
            protocol.transport().channel().written_str(),
            "MAN_VS_MAN,ROCK,SCISSORS\n"
        );
    }

    #[test]
    fn errors_become_notices() {
        let (out, _) = console(
            "DRAW,PA",
            "play\nnew man_vs_ai Alice\nplay\nmove 1 LIZARD\nmove 1 PAPER\nplay\n",
        );
        assert!(out.contains("no game in progress"), "{out}");
        assert!(out.contains("player 1 must make a move"), "{out}");
        assert!(out.contains("invalid move name"), "{out}");
        assert!(out.contains("Server connection failed: peer disconnected"), "{out}");
    }

    #[test]
    fn save_and_load() {
        let path = temp_path("ini");
        let path = path.display();
        let (out, _) = console(
            "",
            &format!("new man_vs_man Alice Bob\nmove 2 PAPER\nsave {path}\nload {path}\nstatus\n"),
        );
        assert!(out.contains("Loaded game: Alice vs Bob"), "{out}");
        assert!(out.contains("MAN_VS_MAN: Alice (-) vs Bob (PAPER), winner: -"), "{out}");
        std::fs::remove_file(path.to_string()).unwrap();
    }
}
