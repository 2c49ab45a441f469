use std::{
    io::{self, BufRead},
    sync::mpsc::Sender,
    thread,
};

use tracing::{debug, warn};

use crate::profile::Direction;

/// A request typed on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    SelectProfile(usize),
    Step(Direction),
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line: a profile index, `n`/`next`, `p`/`prev`, or `q`/`quit`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "n" | "next" => Some(ConsoleCommand::Step(Direction::Next)),
            "p" | "prev" => Some(ConsoleCommand::Step(Direction::Prev)),
            "q" | "quit" | "exit" => Some(ConsoleCommand::Quit),
            other => other.parse().ok().map(ConsoleCommand::SelectProfile),
        }
    }
}

/// Read commands from stdin on a background thread and forward them through
/// `map` to `tx`. The thread ends when stdin closes or the receiver is gone.
pub fn spawn<T, F>(tx: Sender<T>, map: F) -> io::Result<()>
where
    T: Send + 'static,
    F: Fn(ConsoleCommand) -> T + Send + 'static,
{
    thread::Builder::new().name("console".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match ConsoleCommand::parse(&line) {
                Some(command) => {
                    if tx.send(map(command)).is_err() {
                        break;
                    }
                }
                None => warn!("unknown command \"{}\" (use a profile number, n, p or q)", line.trim()),
            }
        }
        debug!("console input closed");
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(ConsoleCommand::parse("2"), Some(ConsoleCommand::SelectProfile(2)));
        assert_eq!(ConsoleCommand::parse(" Next \n"), Some(ConsoleCommand::Step(Direction::Next)));
        assert_eq!(ConsoleCommand::parse("p"), Some(ConsoleCommand::Step(Direction::Prev)));
        assert_eq!(ConsoleCommand::parse("q"), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("-1"), None);
        assert_eq!(ConsoleCommand::parse("volume"), None);
    }
}
