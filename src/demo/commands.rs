//! Line commands for the `surf` driver and the text it prints back.

use std::fmt;
use std::str::FromStr;

use crate::browser::{Element, MemoryHistory};
use crate::demo::setup::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `go <path>`: navigate directly.
    Go(String),
    /// `click <href>`: click a link, as the user would.
    Click(String),
    Back,
    Forward,
    /// Print the page: title, active path and every surface.
    Show,
    History,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    MissingArgument(&'static str),
    Unknown(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "no command"),
            ParseError::MissingArgument(cmd) => write!(f, "{cmd} needs an argument"),
            ParseError::Unknown(cmd) => write!(f, "unknown command: {cmd} (try help)"),
        }
    }
}

impl std::error::Error for ParseError {}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = |name: &'static str| {
            if rest.is_empty() {
                Err(ParseError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            // `go` with nothing after it is the empty path
            "go" => Ok(Command::Go(rest.to_string())),
            "click" => argument("click").map(Command::Click),
            "back" => Ok(Command::Back),
            "forward" => Ok(Command::Forward),
            "show" => Ok(Command::Show),
            "history" => Ok(Command::History),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

pub const HELP: &str = "\
commands:
  go <path>       navigate to a path under the base path
  click <href>    click a link with this href
  back, forward   move through history
  show            print the page
  history         print the history stack
  quit";

/// Adds a link with `href` to the page and returns it, ready to be clicked.
pub fn make_link(page: &Page, href: &str) -> Element {
    let link = Element::new("a");
    link.set_attribute("href", href);
    link.append_text(href);
    page.document.body().append_child(&link);
    link
}

pub fn describe_page(page: &Page) -> String {
    let mut out = format!("title: {}\n", page.document.title());
    let active = page.app.active_path();
    out.push_str(&format!(
        "path:  {}\n",
        active.as_deref().unwrap_or("(none)")
    ));
    for id in page.app.surface_ids() {
        let text = page
            .app
            .active_wrapper(&id)
            .map(|w| w.text_content())
            .unwrap_or_default();
        out.push_str(&format!("[{}] {}\n", id, text));
    }
    out
}

pub fn describe_history(history: &MemoryHistory) -> String {
    let current = history.index();
    history
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let marker = if i == current { ">" } else { " " };
            format!("{} {} {:?}", marker, entry.url, entry.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{History, HistoryState};

    #[test]
    fn test_parse_commands() {
        assert_eq!("go test.html".parse::<Command>(), Ok(Command::Go("test.html".into())));
        assert_eq!("  GO   a b ".parse::<Command>(), Ok(Command::Go("a b".into())));
        assert_eq!("go".parse::<Command>(), Ok(Command::Go(String::new())));
        assert_eq!("click /x".parse::<Command>(), Ok(Command::Click("/x".into())));
        assert_eq!("back".parse::<Command>(), Ok(Command::Back));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
        assert_eq!("?".parse::<Command>(), Ok(Command::Help));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "click".parse::<Command>(),
            Err(ParseError::MissingArgument("click"))
        );
        let err = "dance".parse::<Command>().unwrap_err();
        assert_eq!(err.to_string(), "unknown command: dance (try help)");
    }

    #[test]
    fn test_describe_history_marks_current() {
        let history = MemoryHistory::new("/");
        history
            .push_state(HistoryState::navigate("a"), "A", "/a")
            .unwrap();
        history.back();
        assert_eq!(describe_history(&history), "> / \"\"\n  /a \"A\"");
    }
}
