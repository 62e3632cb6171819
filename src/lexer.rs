//! Splitting of raw input lines into command tokens.

use crate::command::ExecutionMode;
use crate::config::Limits;
use crate::error::ShellError;

/// Marker that, as the last token, sends a command to the background.
pub const BACKGROUND_MARKER: &str = "&";

fn is_delimiter(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n')
}

struct Tokenizer<'a> {
    limits: &'a Limits,
    tokens: Vec<String>,
}

impl<'a> Tokenizer<'a> {
    fn new(limits: &'a Limits) -> Self {
        Tokenizer {
            limits,
            tokens: Vec::new(),
        }
    }

    fn make_tokens(mut self, line: &str) -> Result<Vec<String>, ShellError> {
        for word in line.split(is_delimiter) {
            self.push_token(word)?;
        }
        Ok(self.tokens)
    }

    /// Appends one word; repeated delimiters produce empty words, which leave nothing behind.
    fn push_token(&mut self, word: &str) -> Result<(), ShellError> {
        if word.is_empty() {
            return Ok(());
        }
        if word.len() > self.limits.max_token_len {
            return Err(ShellError::TokenTooLong {
                len: word.len(),
                max: self.limits.max_token_len,
            });
        }
        if self.tokens.len() == self.limits.max_tokens {
            return Err(ShellError::TooManyTokens {
                max: self.limits.max_tokens,
            });
        }
        self.tokens.push(word.to_string());
        Ok(())
    }
}

/// Splits `line` on spaces, tabs and newlines.
///
/// Empty tokens are discarded, so a blank line produces an empty vector which the
/// caller treats as a no-op.
///
/// # Errors
/// [`ShellError::TokenTooLong`] or [`ShellError::TooManyTokens`] when the line exceeds `limits`.
pub fn tokenize(line: &str, limits: &Limits) -> Result<Vec<String>, ShellError> {
    Tokenizer::new(limits).make_tokens(line)
}

/// Strips a trailing [`BACKGROUND_MARKER`] and reports how the command should run.
pub fn split_background(mut tokens: Vec<String>) -> (Vec<String>, ExecutionMode) {
    if tokens.last().map(String::as_str) == Some(BACKGROUND_MARKER) {
        tokens.pop();
        (tokens, ExecutionMode::Background)
    } else {
        (tokens, ExecutionMode::Foreground)
    }
}
