//! String helpers shared by the parser and the label generator.

use crate::errors::GrammarError;

fn depth_delta(c: char) -> i32 {
    match c {
        '[' | '(' => 1,
        ']' | ')' => -1,
        _ => 0,
    }
}

/// Split `text` on `sep`, ignoring separators nested inside `[...]` or `(...)`.
///
/// Whitespace directly after a separator is dropped, so `"a=1, b=2"` splits
/// into `["a=1", "b=2"]`. Balance is not checked here; see [`check_balanced`].
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if c == sep && depth <= 0 {
            parts.push(&text[start..idx]);
            start = idx + c.len_utf8();
        } else {
            depth += depth_delta(c);
        }
    }
    parts.push(&text[start..]);
    for part in parts.iter_mut().skip(1) {
        *part = part.trim_start();
    }
    parts
}

/// Fails if brackets/parens in `text` close before opening or never close.
pub fn check_balanced(text: &str) -> Result<(), GrammarError> {
    let mut depth: i32 = 0;
    for c in text.chars() {
        depth += depth_delta(c);
        if depth < 0 {
            break;
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(GrammarError::UnbalancedBrackets {
            text: text.to_string(),
        })
    }
}

/// Apply each `(search, replacement)` pair in order.
pub fn multi_replace(text: &str, pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .fold(text.to_string(), |acc, (search, repl)| acc.replace(search, repl))
}

/// Greedy whitespace wrapping to at most `width` characters per line.
///
/// Words longer than `width` are broken across lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let current_len = current.chars().count();
            let needed = if current.is_empty() { word.len() } else { current_len + 1 + word.len() };
            if needed <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.extend(word.iter());
                break;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                continue;
            }
            // word alone is too long
            let rest = word.split_off(width);
            lines.push(word.iter().collect());
            word = rest;
            if word.is_empty() {
                break;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
