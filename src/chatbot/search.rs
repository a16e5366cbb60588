//! Keyword relevance search over the knowledge store.
//!
//! Used when no language model answered. Scoring counts raw substring
//! occurrences, so a token like "reg" also scores inside "registration".

use crate::chatbot::knowledge::{display_name, leading_chars, KnowledgeStore};

/// Tokens must be longer than this many chars.
const MIN_TOKEN_CHARS: usize = 2;

/// Max matching lines quoted from the winning document.
const MAX_LINES: usize = 4;

/// Chars of the document quoted when no single line matches.
const SNIPPET_CHARS: usize = 1000;

/// Line boundaries: `\n`, `\r`, vertical tab, form feed, the file/group/record
/// separators, NEL, and the Unicode line and paragraph separators.
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Split `text` into lines on any of `LINE_BREAKS`, dropping empty pieces.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(LINE_BREAKS).filter(|line| !line.is_empty())
}

/// Lowercased whitespace-separated tokens longer than two chars.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Sum of occurrence counts of every token in `text` (already lowercased).
pub fn relevance_score(lower_text: &str, tokens: &[String]) -> usize {
    tokens.iter().map(|t| lower_text.matches(t.as_str()).count()).sum()
}

/// Find the best-matching document and quote the relevant part of it.
pub fn search(store: &KnowledgeStore, query: &str) -> Option<String> {
    let tokens = tokenize(query);
    if tokens.is_empty() || store.is_empty() {
        return None;
    }

    let mut best: Option<(&str, &str, usize)> = None;
    for (name, text) in store.iter() {
        let score = relevance_score(&text.to_lowercase(), &tokens);
        // Strictly greater keeps the first document on ties.
        if score > 0 && best.is_none_or(|(_, _, top)| score > top) {
            best = Some((name, text, score));
        }
    }
    let (name, text, _) = best?;

    let lines: Vec<&str> = split_lines(text)
        .filter(|line| {
            let lower = line.to_lowercase();
            tokens.iter().any(|t| lower.contains(t.as_str()))
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_LINES)
        .collect();

    let header = format!("💡 Based on our AAU data ({}):\n\n", display_name(name));

    if !lines.is_empty() {
        return Some(header + &lines.join("\n"));
    }

    let snippet = leading_chars(text.trim(), SNIPPET_CHARS).trim();
    if snippet.is_empty() {
        return None;
    }
    Some(header + snippet)
}
