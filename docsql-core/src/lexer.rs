//! Quote-aware tokenizer for WHERE clauses.
//!
//! The tokenizer only splits text; it does not classify tokens. Field names,
//! operators, values and the `AND`/`OR` connectives all come out as plain
//! strings, with quotes kept on quoted values.

use once_cell::sync::Lazy;
use regex::Regex;

/// Identifier immediately followed by a comparison operator and an optional
/// value, e.g. `age>25` or `name='Ada'`.
static GLUED_CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)(!=|<=|>=|=|<|>)(.*)$")
        .expect("valid glued condition pattern")
});

pub struct PredicateLexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl PredicateLexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    /// Split on whitespace outside quotes and outside `(...)` / `[...]`
    /// lists. Quote characters stay in the token.
    fn scan(&mut self) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut depth = 0usize;

        while let Some(ch) = self.current_char {
            match quote {
                Some(open) => {
                    current.push(ch);
                    if ch == open {
                        quote = None;
                    }
                }
                None => match ch {
                    '\'' | '"' => {
                        quote = Some(ch);
                        current.push(ch);
                    }
                    '(' | '[' => {
                        depth += 1;
                        current.push(ch);
                    }
                    ')' | ']' => {
                        depth = depth.saturating_sub(1);
                        current.push(ch);
                    }
                    c if c.is_whitespace() && depth == 0 => {
                        if !current.is_empty() {
                            tokens.push(std::mem::take(&mut current));
                        }
                    }
                    c => current.push(c),
                },
            }
            self.advance();
        }

        if !current.is_empty() {
            tokens.push(current);
        }
        tokens
    }

    pub fn tokenize(&mut self) -> Vec<String> {
        let raw = self.scan();
        merge_not_in(split_glued_operators(raw))
    }
}

/// Tokenize a WHERE clause.
pub fn tokenize(input: &str) -> Vec<String> {
    PredicateLexer::new(input).tokenize()
}

fn split_glued_operators(tokens: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match GLUED_CONDITION.captures(&token) {
            Some(caps) => {
                out.push(caps[1].to_string());
                out.push(caps[2].to_string());
                if !caps[3].is_empty() {
                    out.push(caps[3].to_string());
                }
            }
            None => out.push(token),
        }
    }
    out
}

fn merge_not_in(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let follows_not = out
            .last()
            .map(|prev| prev.eq_ignore_ascii_case("NOT"))
            .unwrap_or(false);
        if follows_not && token.eq_ignore_ascii_case("IN") {
            out.pop();
            out.push("NOT IN".to_string());
        } else {
            out.push(token);
        }
    }
    out
}
