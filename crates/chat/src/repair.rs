//! Best-effort repair of almost-JSON text produced by language models.
//!
//! Handles the usual defects: code fences, trailing commas, single-quoted
//! strings, Python literals, unquoted keys, unescaped inner quotes, missing
//! commas between values, unterminated strings and brackets, and prose after
//! the closing bracket.

use ragchat_core::{AppError, AppResult};
use serde_json::Value;

/// Parse `text` as JSON, repairing it when a strict parse fails.
///
/// Code fences around the value are stripped first. Anything after the
/// first complete value is ignored.
pub fn parse_json_blob(text: &str) -> AppResult<Value> {
    let body = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }
    if let Some(Ok(value)) = serde_json::Deserializer::from_str(body)
        .into_iter::<Value>()
        .next()
    {
        return Ok(value);
    }
    repair_json(body)
}

/// Rewrite `text` into valid JSON starting at its first `{` or `[` and parse it.
pub fn repair_json(text: &str) -> AppResult<Value> {
    let start = text
        .find(|c: char| c == '{' || c == '[')
        .ok_or_else(|| AppError::Extraction("No JSON object found in model output".to_string()))?;

    let repaired = Repairer::new(&text[start..]).run();
    tracing::debug!(repaired = %repaired, "Repaired model JSON");

    serde_json::from_str(&repaired)
        .map_err(|e| AppError::Extraction(format!("Could not repair model JSON: {}", e)))
}

/// Remove a surrounding Markdown code fence, with or without a language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

struct Repairer {
    chars: Vec<char>,
    pos: usize,
    out: String,
    stack: Vec<char>,
}

impl Repairer {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            out: String::with_capacity(text.len() + 16),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> String {
        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                '"' | '\'' => {
                    self.insert_missing_comma();
                    self.string(c);
                }
                '{' | '[' => {
                    self.insert_missing_comma();
                    self.stack.push(c);
                    self.out.push(c);
                    self.pos += 1;
                }
                '}' | ']' => {
                    self.pos += 1;
                    if self.close(c) {
                        // Anything after the outermost value is prose.
                        break;
                    }
                }
                ',' => {
                    self.pos += 1;
                    if !matches!(self.peek_significant(self.pos), None | Some('}') | Some(']')) {
                        self.out.push(',');
                    }
                }
                c if c.is_ascii_digit() || c == '-' => {
                    self.insert_missing_comma();
                    self.number();
                }
                c if c.is_alphabetic() || c == '_' => {
                    self.insert_missing_comma();
                    self.word();
                }
                _ => {
                    self.out.push(c);
                    self.pos += 1;
                }
            }
        }
        self.finish()
    }

    fn peek_significant(&self, from: usize) -> Option<char> {
        self.chars[from.min(self.chars.len())..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    fn last_significant(&self) -> Option<char> {
        self.out.trim_end().chars().last()
    }

    /// A value starting right after another value needs a separator.
    fn insert_missing_comma(&mut self) {
        if self.stack.is_empty() {
            return;
        }
        if let Some(last) = self.last_significant() {
            if last == '"' || last == '}' || last == ']' || last.is_ascii_alphanumeric() {
                self.out.push(',');
            }
        }
    }

    /// Whether the quote at `self.pos` ends the current string.
    fn closes_string(&self) -> bool {
        let mut saw_newline = false;
        for &c in &self.chars[self.pos + 1..] {
            if c == '\n' {
                saw_newline = true;
            } else if !c.is_whitespace() {
                return matches!(c, ',' | '}' | ']' | ':') || (saw_newline && c == '"');
            }
        }
        true
    }

    fn string(&mut self, quote: char) {
        self.pos += 1;
        self.out.push('"');

        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                '\\' => {
                    match self.chars.get(self.pos + 1).copied() {
                        Some('\'') => self.out.push('\''),
                        Some(next)
                            if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') =>
                        {
                            self.out.push('\\');
                            self.out.push(next);
                        }
                        Some(next) => {
                            self.out.push_str("\\\\");
                            self.out.push(next);
                        }
                        None => {}
                    }
                    self.pos += 2;
                }
                c if c == quote => {
                    if self.closes_string() {
                        self.out.push('"');
                        self.pos += 1;
                        return;
                    }
                    if quote == '"' {
                        self.out.push_str("\\\"");
                    } else {
                        self.out.push('\'');
                    }
                    self.pos += 1;
                }
                '"' => {
                    self.out.push_str("\\\"");
                    self.pos += 1;
                }
                '\n' => {
                    self.out.push_str("\\n");
                    self.pos += 1;
                }
                '\r' => {
                    self.out.push_str("\\r");
                    self.pos += 1;
                }
                '\t' => {
                    self.out.push_str("\\t");
                    self.pos += 1;
                }
                _ => {
                    self.out.push(c);
                    self.pos += 1;
                }
            }
        }

        // Unterminated string.
        self.out.push('"');
    }

    fn number(&mut self) {
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-') {
                self.out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        match word.as_str() {
            "true" | "True" => self.out.push_str("true"),
            "false" | "False" => self.out.push_str("false"),
            "null" | "None" | "undefined" => self.out.push_str("null"),
            _ => {
                // Bare text: quote it up to the next structural character.
                while let Some(&c) = self.chars.get(self.pos) {
                    if matches!(c, ',' | '}' | ']' | ':' | '\n' | '"' | '\'' | '{' | '[') {
                        break;
                    }
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                self.out.push('"');
                self.out.push_str(text.trim_end());
                self.out.push('"');
            }
        }
    }

    fn trim_dangling(&mut self) {
        let trimmed_len = self.out.trim_end().len();
        if self.out[..trimmed_len].ends_with(',') {
            self.out.truncate(trimmed_len - 1);
        } else if self.out[..trimmed_len].ends_with(':') {
            self.out.push_str(" null");
        }
    }

    /// Close brackets up to the matching opener. Returns true when the
    /// outermost value is complete.
    fn close(&mut self, closer: char) -> bool {
        let opener = if closer == '}' { '{' } else { '[' };
        if !self.stack.contains(&opener) {
            return false;
        }
        while let Some(top) = self.stack.pop() {
            self.trim_dangling();
            self.out.push(closing_for(top));
            if top == opener {
                break;
            }
        }
        self.stack.is_empty()
    }

    fn finish(mut self) -> String {
        while let Some(top) = self.stack.pop() {
            self.trim_dangling();
            self.out.push(closing_for(top));
        }
        self.out
    }
}

fn closing_for(opener: char) -> char {
    if opener == '{' {
        '}'
    } else {
        ']'
    }
}
