//! Operator prompting.
//!
//! Prompts are expressed as [`Step`]s (question text plus parser) and run
//! against a [`Prompter`], so the same flow can be driven by a terminal or by
//! a scripted list of answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crossterm::style::{style, Stylize};

use crate::constants;
use crate::error::SelectionError;

/// Line-oriented operator I/O.
pub trait Prompter {
    /// Shows a line of output.
    fn say(&mut self, line: &str);

    /// Shows a warning line.
    fn warn(&mut self, line: &str) {
        self.say(line);
    }

    /// Asks a question and returns the answer, or `None` at end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Prompter backed by stdin and stdout.
pub struct TerminalPrompter {
    styled: bool,
}

impl TerminalPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            styled: crossterm::tty::IsTty::is_tty(&io::stdout()),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn say(&mut self, line: &str) {
        println!("{line}");
    }

    fn warn(&mut self, line: &str) {
        if self.styled {
            println!("{}", style(line).yellow().bold());
        } else {
            println!("{line}");
        }
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question}\n> ");
        io::stdout().flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Prompter that replays canned answers and keeps a transcript.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Everything shown or asked, in order.
    #[must_use]
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Answers not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn warn(&mut self, line: &str) {
        self.transcript.push(format!("WARNING: {line}"));
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        self.transcript.push(format!("? {question}"));
        Ok(self.answers.pop_front())
    }
}

/// One question and the parser that validates its answer.
pub struct Step<'a, T> {
    pub question: &'a str,
    pub parse: Box<dyn Fn(&str) -> Result<T, SelectionError> + 'a>,
}

impl<'a, T> Step<'a, T> {
    pub fn new(question: &'a str, parse: impl Fn(&str) -> Result<T, SelectionError> + 'a) -> Self {
        Self {
            question,
            parse: Box::new(parse),
        }
    }

    /// Asks until the answer parses.
    ///
    /// An invalid answer is reported and asked again, up to
    /// [`constants::MAX_PROMPT_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EndOfInput`] when input closes and
    /// [`SelectionError::Exhausted`] when every attempt was invalid.
    pub fn run(&self, prompter: &mut dyn Prompter) -> Result<T, SelectionError> {
        for _ in 0..constants::MAX_PROMPT_ATTEMPTS {
            let Some(answer) = prompter.ask(self.question)? else {
                return Err(SelectionError::EndOfInput);
            };
            match (self.parse)(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => prompter.warn(&format!("Invalid input: {e}")),
            }
        }
        Err(SelectionError::Exhausted(constants::MAX_PROMPT_ATTEMPTS))
    }
}

/// Asks a yes/no question. Anything but an explicit yes declines.
///
/// # Errors
///
/// Returns an error if input cannot be read.
pub fn confirm(prompter: &mut dyn Prompter, question: &str) -> io::Result<bool> {
    let answer = prompter.ask(question)?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
