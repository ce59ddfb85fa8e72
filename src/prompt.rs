//! Confirmation and notification capabilities handed to the session.

use std::io::{self, BufRead, Write};

/// Yes/no questions and one-way notices to the person studying.
pub trait Prompt {
    fn confirm(&mut self, question: &str) -> bool;
    fn notify(&mut self, message: &str);
}

/// Interactive prompt on stdin/stdout.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
        }
    }
}

#[cfg(test)]
impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        if write!(self.output, "{} [y/N] ", question)
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }

        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn notify(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }
}

/// A prompt whose answer was already collected, e.g. from a TUI dialog or a
/// `--yes` flag. Notifications are kept for the caller to show.
#[derive(Debug, Default)]
pub struct Answered {
    answer: bool,
    pub notices: Vec<String>,
}

impl Answered {
    pub fn yes() -> Self {
        Self {
            answer: true,
            notices: Vec::new(),
        }
    }

    pub fn no() -> Self {
        Self::default()
    }
}

impl Prompt for Answered {
    fn confirm(&mut self, _question: &str) -> bool {
        self.answer
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
