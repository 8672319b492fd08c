use nu_ansi_term::Color;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};
use sable_vm::create_native_registry;
use std::borrow::Cow;

const KEYWORDS: &[&str] = &[
    "let", "const", "function", "return", "if", "else", "for", "of", "in", "while", "do", "break",
    "continue", "switch", "case", "default", "try", "catch", "finally", "throw", "class", "enum",
    "import", "export", "new", "delete", "true", "false", "null", "undefined", "this",
];

pub struct ReplHelper {
    words: Vec<String>,
}

impl ReplHelper {
    pub fn new() -> Self {
        let natives = create_native_registry();
        let mut words: Vec<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();
        words.extend(
            natives
                .iter()
                .filter(|n| !n.is_property() && !n.name.contains(".prototype."))
                .map(|n| n.name.clone()),
        );
        words.sort();
        words.dedup();
        Self { words }
    }

    fn word_start(line: &str, pos: usize) -> usize {
        line[..pos]
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::word_start(line, pos);
        let prefix = &line[start..pos];
        if prefix.is_empty() {
            return Ok((start, Vec::new()));
        }

        let candidates = self
            .words
            .iter()
            .filter(|w| w.starts_with(prefix))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let start = Self::word_start(line, pos);
        let prefix = &line[start..pos];
        if prefix.len() < 2 {
            return None;
        }
        self.words
            .iter()
            .find(|w| w.starts_with(prefix) && w.len() > prefix.len())
            .map(|w| w[prefix.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut out = String::with_capacity(line.len());
        let mut word = String::new();

        let flush = |word: &mut String, out: &mut String| {
            if KEYWORDS.contains(&word.as_str()) {
                out.push_str(&Color::Blue.bold().paint(word.as_str()).to_string());
            } else if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit() || c == '.') {
                out.push_str(&Color::Yellow.paint(word.as_str()).to_string());
            } else {
                out.push_str(word);
            }
            word.clear();
        };

        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
            } else {
                flush(&mut word, &mut out);
                out.push(c);
            }
        }
        flush(&mut word, &mut out);
        Cow::Owned(out)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, forced: bool) -> bool {
        forced
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(Color::DarkGray.paint(hint).to_string())
    }
}

/// Keeps reading lines while braces, brackets or parens are open.
impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0i32;
        let mut quote: Option<char> = None;
        let mut escaped = false;

        for c in ctx.input().chars() {
            if let Some(q) = quote {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    _ if c == q => quote = None,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' | '\'' | '`' => quote = Some(c),
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_start() {
        assert_eq!(ReplHelper::word_start("let x = Math.ma", 15), 8);
        assert_eq!(ReplHelper::word_start("pri", 3), 0);
    }

    #[test]
    fn test_words_include_natives() {
        let helper = ReplHelper::new();
        assert!(helper.words.iter().any(|w| w == "Math.max"));
        assert!(helper.words.iter().any(|w| w == "function"));
        assert!(!helper.words.iter().any(|w| w.contains("prototype")));
    }
}
