//! Interactive console input.
//!
//! All prompts go through the [`Prompter`] trait so the session can be driven
//! by stdin in production and by a scripted sequence of answers in tests.

use std::io::{self, BufRead, Write};

/// Source of interactive answers.
pub trait Prompter {
    /// Print `prompt` (without a newline) and read one line of input.
    ///
    /// The trailing line ending is stripped. Returns
    /// [`io::ErrorKind::UnexpectedEof`] once input is exhausted.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Prompter backed by the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Prompter for StdConsole {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Prompter that replays a fixed list of answers and records every prompt.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: std::collections::VecDeque<String>,
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedConsole {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

/// Read the raw search query and start date.
///
/// No validation happens here; an empty date is passed through as-is.
pub fn collect_input<P: Prompter>(console: &mut P, today: &str) -> io::Result<(String, String)> {
    let query = console.ask("Enter your search: ")?;
    println!(" ");
    println!("Click Enter to search from today's date: {today}");
    let date_from = console.ask("Enter a start date YYYY-MM-DD: ")?;
    Ok((query, date_from))
}

/// Ask a yes/no question until the answer is exactly `yes` or `no`
/// (case-insensitive, surrounding whitespace ignored).
pub fn confirm<P: Prompter>(console: &mut P, question: &str) -> io::Result<bool> {
    loop {
        let answer = console.ask(question)?.trim().to_lowercase();
        match answer.as_str() {
            "yes" => return Ok(true),
            "no" => return Ok(false),
            _ => println!("Incorrect input, please enter yes or no."),
        }
    }
}
