use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::runner::Confirm;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, command_line: &str) -> Result<bool> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "Run `{command_line}`? [y/N]: ")?;
        stderr.flush()?;

        let mut input = String::new();
        let mut stdin = io::stdin().lock();
        let n = stdin.read_line(&mut input)?;
        if n == 0 {
            return Ok(false);
        }
        Ok(parse_yes(&input))
    }
}

pub(crate) fn parse_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
