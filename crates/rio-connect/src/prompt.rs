//! Interactive questions.

use std::io::{self, BufRead, Write};

/// Asks the user for missing settings.
pub trait Prompt: Send {
    /// Show a line of text.
    ///
    /// # Errors
    /// Returns error if the terminal cannot be written.
    fn notice(&mut self, message: &str) -> io::Result<()>;

    /// Ask a question and return the answer, trimmed.
    ///
    /// # Errors
    /// Returns error if input ends or cannot be read.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Prompt on the process's stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(io::stdout(), "{message}")
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(answer.trim().to_string())
    }
}
