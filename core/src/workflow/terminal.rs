//! Line-oriented user interaction.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::Result;

/// Where workflows read user input and show progress.
#[async_trait]
pub trait Terminal: Send {
    /// Shows `question` and reads one line of input, trimmed.
    ///
    /// Returns `None` at end of input.
    async fn ask(&mut self, question: &str) -> Result<Option<String>>;

    /// Shows a message to the user.
    fn say(&mut self, message: &str);
}

/// Terminal backed by the process's stdin and stdout.
pub struct StdTerminal {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for StdTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl StdTerminal {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl Terminal for StdTerminal {
    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "\n{}\n> ", question)?;
            stdout.flush()?;
        }

        let line = self.lines.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    fn say(&mut self, message: &str) {
        println!("\n{}", message);
    }
}
