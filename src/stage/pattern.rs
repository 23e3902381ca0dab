//! Pattern file parser.
//!
//! A pattern file holds one frame per line, each a mapping literal from
//! group id to command:
//!
//! ```text
//! {0: (1.0, 0.0), 2: true}
//! {0: (1.0, 1.0), 2: false}
//! ```
//!
//! Group 0 (carriage) takes an `(x, y)` pair, written as a tuple or a list.
//! Groups 1 and 2 (platform, nozzle) take `true`/`false` (`True`/`False`
//! also accepted). Blank lines are skipped.

use std::fs;
use std::path::Path;

use crate::error::{bounded, Error, RecipeError, Result};
use crate::group::{Command, GroupId};

use super::step::Step;

/// Read and parse a pattern file.
///
/// # Errors
///
/// `RecipeError::Io` if the file cannot be read, otherwise any error from
/// [`parse_pattern`].
pub fn load_pattern<P: AsRef<Path>>(path: P) -> Result<Vec<Step>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Recipe(RecipeError::Io {
            path: bounded(&path.display().to_string()),
            message: bounded(&e.to_string()),
        })
    })?;
    parse_pattern(&content)
}

/// Parse every non-blank line of `content` into a frame.
///
/// # Errors
///
/// The first failing line aborts the parse; `RecipeError::Parse` carries
/// its 1-based number.
pub fn parse_pattern(content: &str) -> Result<Vec<Step>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_frame(line).map_err(|e| match e {
                Error::Recipe(RecipeError::Parse { message, .. }) => {
                    Error::Recipe(RecipeError::Parse { line: index + 1, message })
                }
                other => other,
            })
        })
        .collect()
}

/// Parse a single frame literal.
///
/// # Errors
///
/// - `RecipeError::Parse` (line 0) for malformed text
/// - `RecipeError::UnknownGroup` for an id outside 0..=2
/// - `RecipeError::CommandMismatch` when the value does not fit the group
pub fn parse_frame(text: &str) -> Result<Step> {
    let mut cursor = Cursor::new(text);
    let step = cursor.frame()?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(syntax("trailing characters after '}'"));
    }
    Ok(step)
}

fn syntax(message: &str) -> Error {
    Error::Recipe(RecipeError::Parse {
        line: 0,
        message: bounded(message),
    })
}

enum Value {
    Bool(bool),
    Pair(f64, f64),
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    /// Consume `c` if it is the next non-blank character.
    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, message: &str) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(syntax(message))
        }
    }

    /// Consume the longest run of characters matching `accept`.
    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn frame(&mut self) -> Result<Step> {
        self.expect('{', "expected '{'")?;
        let mut step = Step::new();

        loop {
            if self.eat('}') {
                return Ok(step);
            }

            let group = self.group_id()?;
            self.expect(':', "expected ':' after group id")?;
            let command = match (group, self.value()?) {
                (GroupId::Carriage, Value::Pair(x, y)) => Command::Move { x, y },
                (GroupId::Carriage, Value::Bool(_)) => {
                    return Err(RecipeError::CommandMismatch {
                        group: group.id(),
                        expected: "coordinate",
                    }
                    .into())
                }
                (_, Value::Bool(on)) => Command::Switch(on),
                (_, Value::Pair(..)) => {
                    return Err(RecipeError::CommandMismatch {
                        group: group.id(),
                        expected: "boolean",
                    }
                    .into())
                }
            };
            step.insert(group, command);

            if !self.eat(',') {
                self.expect('}', "expected ',' or '}'")?;
                return Ok(step);
            }
        }
    }

    fn group_id(&mut self) -> Result<GroupId> {
        self.skip_ws();
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(syntax("expected a group id"));
        }
        let id: u8 = digits
            .parse()
            .map_err(|_| syntax("group id out of range"))?;
        GroupId::try_from(id).map_err(|id| RecipeError::UnknownGroup(id).into())
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            Some('(') => self.pair('(', ')'),
            Some('[') => self.pair('[', ']'),
            Some(c) if c.is_ascii_alphabetic() => {
                match self.take_while(|c| c.is_ascii_alphanumeric() || c == '_') {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    _ => Err(syntax("expected true or false")),
                }
            }
            _ => Err(syntax("expected a boolean or coordinate")),
        }
    }

    fn pair(&mut self, open: char, close: char) -> Result<Value> {
        self.expect(open, "expected coordinate")?;
        let x = self.number()?;
        self.expect(',', "expected ',' between coordinates")?;
        let y = self.number()?;
        self.eat(',');
        self.expect(close, "coordinate must have exactly two numbers")?;
        Ok(Value::Pair(x, y))
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_ws();
        let token = self.take_while(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
        token
            .parse::<f64>()
            .map_err(|_| syntax("expected a number"))
    }
}
