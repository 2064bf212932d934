//! Line-oriented frontend: stdin in, appended lines out.
//!
//! A terminal without raw mode cannot see keystrokes, so every line is
//! submitted as a message and typing indicators are only ever received,
//! never sent. Rendering is incremental: each render prints only what changed
//! since the previous one.

use std::io::{self, Stdout, Write};

use chatline_client::{
    Environment, Notice, Session,
    runtime::{Frontend, UserInput},
    transport::WsTransport,
};
use chatline_proto::Message;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

/// Frontend failures.
#[derive(Error, Debug)]
pub enum FrontendError {
    /// Writing to the terminal failed
    #[error("terminal write failed: {0}")]
    Io(#[from] io::Error),
}

/// Turn one line of user input into a command.
///
/// Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<UserInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let input = match line.split_once(' ').unwrap_or((line, "")) {
        ("/quit" | "/exit", _) => UserInput::Quit,
        ("/name", name) => UserInput::SetUsername(name.trim().to_string()),
        ("/away", _) => UserInput::Follow(false),
        ("/back", _) => UserInput::Follow(true),
        _ => UserInput::Send(line.to_string()),
    };
    Some(input)
}

/// Wall-clock `HH:MM` (UTC) for a millisecond timestamp.
fn clock(timestamp_ms: u64) -> String {
    let minutes = timestamp_ms / 60_000;
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

fn format_message(message: &Message, own: bool) -> String {
    if message.is_system() {
        return format!("-- {} --", message.text);
    }
    let you = if own { " (you)" } else { "" };
    format!("[{}] {}{you}: {}", clock(message.timestamp), message.sender, message.text)
}

/// Terminal frontend writing to `W`.
pub struct LineFrontend<W = Stdout> {
    inputs: mpsc::Receiver<UserInput>,
    out: W,
    /// ID of the newest message already printed
    last_seen: Option<String>,
    status: Option<&'static str>,
    typing: Vec<String>,
    queued: usize,
}

impl LineFrontend {
    /// Start reading stdin on a background task.
    ///
    /// `name`, when given, is submitted before any typed input.
    pub fn spawn(name: Option<String>) -> Self {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            if let Some(name) = name
                && tx.send(UserInput::SetUsername(name)).await.is_err()
            {
                return;
            }

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(input) = parse_line(&line) else { continue };
                        if tx.send(input).await.is_err() {
                            break;
                        }
                    },
                    Ok(None) => break,
                    Err(error) => {
                        tracing::warn!(%error, "stdin read failed");
                        break;
                    },
                }
            }
        });

        Self::new(rx, io::stdout())
    }
}

impl<W: Write> LineFrontend<W> {
    /// Frontend fed from `inputs`, writing to `out`.
    pub fn new(inputs: mpsc::Receiver<UserInput>, out: W) -> Self {
        Self { inputs, out, last_seen: None, status: None, typing: Vec::new(), queued: 0 }
    }

    fn draw<T, E>(&mut self, session: &Session<T, E>) -> io::Result<()>
    where
        T: chatline_client::Transport,
        E: Environment,
    {
        let status = session.status();
        if self.status != Some(status) {
            writeln!(self.out, "* {status}")?;
            self.status = Some(status);
        }

        let messages: Vec<&Message> = session.messages().collect();
        let start = self
            .last_seen
            .as_ref()
            .and_then(|id| messages.iter().position(|m| &m.id == id))
            .map_or(0, |index| index + 1);
        for message in &messages[start..] {
            writeln!(self.out, "{}", format_message(message, session.is_own(message)))?;
        }
        if let Some(last) = messages.last() {
            self.last_seen = Some(last.id.clone());
        }

        let typing: Vec<String> =
            session.typing_users().iter().map(|user| user.username.clone()).collect();
        if typing != self.typing {
            if !typing.is_empty() {
                writeln!(self.out, "* {} typing...", typing.join(", "))?;
            }
            self.typing = typing;
        }

        let queued = session.queued_count();
        if queued != self.queued {
            if queued > 0 {
                writeln!(self.out, "* {queued} queued")?;
            }
            self.queued = queued;
        }

        if !session.is_following() && session.unread() > 0 {
            writeln!(self.out, "* {} unread", session.unread())?;
        }

        self.out.flush()
    }
}

impl<W, E> Frontend<E> for LineFrontend<W>
where
    W: Write + Send,
    E: Environment,
{
    type Error = FrontendError;

    async fn next_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        Ok(self.inputs.recv().await)
    }

    fn render(&mut self, session: &Session<WsTransport, E>) -> Result<(), Self::Error> {
        Ok(self.draw(session)?)
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), Self::Error> {
        writeln!(self.out, "! {notice}")?;
        Ok(self.out.flush()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chatline_client::SessionConfig;
    use chatline_core::ClientIdentity;
    use chatline_harness::{SimEnv, SimTransport};
    use chatline_proto::ServerEvent;

    use super::*;

    fn message(id: &str, sender: &str, text: &str) -> Message {
        Message {
            id: id.to_string(),
            text: text.to_string(),
            sender: sender.to_string(),
            timestamp: 45_000_000,
        }
    }

    fn frontend() -> LineFrontend<Vec<u8>> {
        let (_tx, rx) = mpsc::channel(1);
        LineFrontend::new(rx, Vec::new())
    }

    fn output(frontend: &mut LineFrontend<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut frontend.out)).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("/quit"), Some(UserInput::Quit));
        assert_eq!(parse_line("/name  ada "), Some(UserInput::SetUsername("ada".to_string())));
        assert_eq!(parse_line("/away"), Some(UserInput::Follow(false)));
        assert_eq!(parse_line("hello there"), Some(UserInput::Send("hello there".to_string())));
    }

    #[test]
    fn formats_messages() {
        assert_eq!(format_message(&message("1", "bob", "hi"), false), "[12:30] bob: hi");
        assert_eq!(format_message(&message("2", "ada", "yo"), true), "[12:30] ada (you): yo");
        let system = message("3", "system", "bob joined");
        assert_eq!(format_message(&system, false), "-- bob joined --");
    }

    #[test]
    fn renders_only_what_changed() {
        let env = SimEnv::with_seed(1);
        let mut session: Session<SimTransport, SimEnv> = Session::with_identity(
            env.clone(),
            SessionConfig::default(),
            ClientIdentity::with_user_id("u-1"),
        );
        session.set_username("ada", env.now()).unwrap();
        let mut frontend = frontend();

        session.receive(ServerEvent::History(vec![
            message("1", "bob", "hi"),
            message("2", "ada", "hello"),
        ]));
        frontend.draw(&session).unwrap();
        insta::assert_snapshot!(output(&mut frontend), @r"
        * connecting
        [12:30] bob: hi
        [12:30] ada (you): hello
        ");

        session.receive(ServerEvent::NewMessage(message("3", "bob", "how are you")));
        frontend.draw(&session).unwrap();
        assert_eq!(output(&mut frontend), "[12:30] bob: how are you\n");

        frontend.draw(&session).unwrap();
        assert_eq!(output(&mut frontend), "");
    }
}
