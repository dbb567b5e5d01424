use std::io::{self, Read, Write};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// Blocking single-line prompt for the one-shot commands.
pub fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

pub fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf.trim_end().to_owned()))
}

/// Async line reader for the interactive flow, so timers keep running while
/// the user is typing.
pub struct LinePrompt {
    lines: Lines<BufReader<Stdin>>,
}

impl LinePrompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` once stdin is closed.
    pub async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{label}: ").as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?.map(|line| line.trim_end().to_owned()))
    }

    pub async fn confirm(&mut self, label: &str) -> Result<bool> {
        let answer = self.ask(&format!("{label} [Y/n]")).await?;
        Ok(match answer {
            Some(answer) => !matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no"),
            None => false,
        })
    }
}
