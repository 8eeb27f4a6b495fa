//! Line tokenizer for save files and test scripts.
//!
//! A line is a sequence of space-separated tokens. `#` starts a comment that
//! runs to the end of the line. A token that starts with `"` runs to the
//! matching unescaped `"` and may contain spaces; `\"` and `\\` are the only
//! escapes. Columns are one-based and count characters.

use crate::error::{Diagnostic, ReplayError};

/// One token and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The raw text, quotes included for quoted strings.
    pub text: String,
    /// One-based column of the first character.
    pub column: usize,
}

impl Token {
    /// Build a diagnostic pointing at this token.
    pub fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(self.column, message)
    }
}

/// A non-empty tokenized line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// One-based line number in the file.
    pub number: usize,
    /// The tokens; never empty.
    pub tokens: Vec<Token>,
}

impl Line {
    /// The first token: a directive or action name.
    pub fn keyword(&self) -> &str {
        self.tokens.first().map_or("", |token| token.text.as_str())
    }

    /// Every token after the keyword.
    pub fn args(&self) -> &[Token] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// The arguments, checked to be exactly `count` of them.
    ///
    /// # Errors
    ///
    /// Reports the mismatch at column 1.
    pub fn expect_args(&self, count: usize) -> Result<&[Token], Diagnostic> {
        let args = self.args();
        if args.len() == count {
            Ok(args)
        } else {
            Err(Diagnostic::line(format!(
                "expected {count} arguments. got {} arguments.",
                args.len()
            )))
        }
    }
}

/// Split one line of text into tokens.
///
/// # Errors
///
/// Reports an unterminated quoted string at its opening quote.
pub fn tokenize(text: &str) -> Result<Vec<Token>, Diagnostic> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().enumerate().peekable();
    while let Some(&(index, c)) = chars.peek() {
        let column = index.saturating_add(1);
        match c {
            '#' => break,
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '"' => {
                let mut raw = String::from('"');
                chars.next();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    raw.push(c);
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                raw.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Err(Diagnostic::new(column, "unterminated quoted string"));
                }
                tokens.push(Token { text: raw, column });
            }
            _ => {
                let mut raw = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if matches!(c, ' ' | '\t' | '\r' | '#') {
                        break;
                    }
                    raw.push(c);
                    chars.next();
                }
                tokens.push(Token { text: raw, column });
            }
        }
    }
    Ok(tokens)
}

/// A whole file held in memory with a read cursor.
#[derive(Debug, Clone)]
pub struct Script {
    path: String,
    lines: Vec<String>,
    cursor: usize,
}

impl Script {
    /// Load a script's text.
    ///
    /// # Errors
    ///
    /// Non-empty text must end with a newline.
    pub fn parse(path: impl Into<String>, text: &str) -> Result<Self, ReplayError> {
        let path = path.into();
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        if !text.is_empty() && !text.ends_with('\n') {
            let last = lines.last().map_or(0, |line| line.chars().count());
            return Err(ReplayError::Parse {
                path,
                line: lines.len(),
                column: last.saturating_add(1),
                message: "expected newline at end of file".to_owned(),
            });
        }
        Ok(Self {
            path,
            lines,
            cursor: 0,
        })
    }

    /// A script with no lines.
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
            cursor: 0,
        }
    }

    /// The file name used in diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The next line with any tokens on it, skipping blanks and comments.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer errors, located.
    pub fn next_line(&mut self) -> Result<Option<Line>, ReplayError> {
        while let Some(text) = self.lines.get(self.cursor) {
            self.cursor = self.cursor.saturating_add(1);
            let number = self.cursor;
            let tokens = tokenize(text).map_err(|diagnostic| self.locate(number, diagnostic))?;
            if !tokens.is_empty() {
                return Ok(Some(Line { number, tokens }));
            }
        }
        Ok(None)
    }

    /// Whether every remaining line is blank or a comment.
    pub fn is_exhausted(&self) -> bool {
        self.lines
            .get(self.cursor..)
            .unwrap_or_default()
            .iter()
            .all(|text| tokenize(text).is_ok_and(|tokens| tokens.is_empty()))
    }

    /// Number of the last line handed out, or 0 before the first.
    pub const fn current_line(&self) -> usize {
        self.cursor
    }

    /// Attach this file and a line number to a diagnostic.
    pub fn locate(&self, line: usize, diagnostic: Diagnostic) -> ReplayError {
        ReplayError::Parse {
            path: self.path.clone(),
            line,
            column: diagnostic.column,
            message: diagnostic.message,
        }
    }

    /// Attach this file and the line to a diagnostic.
    pub fn error(&self, line: &Line, diagnostic: Diagnostic) -> ReplayError {
        self.locate(line.number, diagnostic)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .map(|token| token.text)
            .collect()
    }

    #[test]
    fn splits_on_spaces_and_drops_comments() {
        assert_eq!(texts("move 1 -1 # step"), vec!["move", "1", "-1"]);
        assert!(texts("   # nothing here").is_empty());
    }

    #[test]
    fn quoted_strings_keep_spaces_and_escapes() {
        let tokens = tokenize(r#"@expect_event "you see \"it\" # here" x"#).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, r#""you see \"it\" # here""#);
        assert_eq!(tokens[1].column, 15);
        assert_eq!(tokens[2].column, 39);
    }

    #[test]
    fn unterminated_quote_points_at_the_quote() {
        let error = tokenize(r#"@expect_event "oops"#).unwrap_err();
        assert_eq!(error.column, 15);
        assert_eq!(error.message, "unterminated quoted string");
    }

    #[test]
    fn script_skips_blank_lines_and_counts_numbers() {
        let mut script = Script::parse("s", "@test\n\n# comment\nwait\n").unwrap();
        assert_eq!(script.next_line().unwrap().unwrap().number, 1);
        let line = script.next_line().unwrap().unwrap();
        assert_eq!((line.number, line.keyword()), (4, "wait"));
        assert!(script.next_line().unwrap().is_none());
        assert!(script.is_exhausted());
    }

    #[test]
    fn missing_final_newline_is_an_error() {
        let error = Script::parse("s", "@test\nwait").unwrap_err();
        assert_eq!(error.to_string(), "s:2:5: error: expected newline at end of file");
    }

    #[test]
    fn argument_count_is_checked() {
        let mut script = Script::parse("s", "move 1\n").unwrap();
        let line = script.next_line().unwrap().unwrap();
        let error = line.expect_args(2).unwrap_err();
        assert_eq!(error.message, "expected 2 arguments. got 1 arguments.");
        assert_eq!(error.column, 1);
    }
}
