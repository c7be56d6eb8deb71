//! `file:line[:column]` arguments
//!
//! The CLI speaks 1-indexed positions; [`ParsedLocation::position`] converts
//! to the 0-indexed form the servers use.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::models::lsp::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl ParsedLocation {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Location cannot be empty");
        }

        let (file, rest) = split_path(input)?;
        let mut parts = rest.splitn(2, ':');
        let line = parse_index(parts.next().unwrap_or_default(), "line")?;
        let column = match parts.next() {
            Some(col) => parse_index(col, "column")?,
            None => 1,
        };

        Ok(Self {
            file: PathBuf::from(file),
            line,
            column,
        })
    }

    /// 0-indexed position for server queries
    pub fn position(&self) -> Position {
        Position::from_cli(self.line, self.column)
    }

    /// Absolute, canonical file path; relative paths resolve against `root`
    pub fn resolve(mut self, root: &Path) -> Result<Self> {
        self.file = resolve_file(&self.file, root)?;
        Ok(self)
    }

    /// Reject positions past the end of the file
    pub fn validate_against(&self, content: &str) -> Result<()> {
        let line_count = content.lines().count().max(1);
        if self.line as usize > line_count {
            bail!("Line {} exceeds file length ({} lines)", self.line, line_count);
        }
        if let Some(text) = content.lines().nth(self.line as usize - 1) {
            let width = text.chars().count();
            if self.column as usize > width + 1 {
                bail!(
                    "Column {} exceeds line length ({} chars) at line {}",
                    self.column,
                    width,
                    self.line
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ParsedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Canonical path of an existing file, relative paths joined to `root`
pub fn resolve_file(file: &Path, root: &Path) -> Result<PathBuf> {
    let joined = if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    };
    joined
        .canonicalize()
        .map_err(|_| anyhow::anyhow!("File not found: {}", joined.display()))
}

/// Split at the first `:` followed by a digit or `-`, skipping a drive letter
fn split_path(input: &str) -> Result<(&str, &str)> {
    let bytes = input.as_bytes();
    let start = if bytes.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        2
    } else {
        0
    };

    let split = input[start..].char_indices().find_map(|(i, c)| {
        let at = start + i;
        let next = input[at + 1..].chars().next();
        (c == ':' && next.is_some_and(|n| n.is_ascii_digit() || n == '-')).then_some((at, next))
    });

    match split {
        Some((_, Some('-'))) => bail!(
            "Invalid line number: negative values not allowed. Positions are 1-indexed.\nExample: src/main.rs:10:5"
        ),
        Some((at, _)) => Ok((&input[..at], &input[at + 1..])),
        None => bail!("Invalid location format. Expected: file:line[:column]\nExample: src/main.rs:10:5"),
    }
}

fn parse_index(value: &str, what: &str) -> Result<u32> {
    let n: u32 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {} number '{}': must be a positive integer (1-indexed)", what, value))?;
    if n == 0 {
        bail!("{} number must be >= 1 (got 0). Positions are 1-indexed.", capitalize(what));
    }
    Ok(n)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
