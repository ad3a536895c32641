//! Normalization and logos-based tokenization of raw filenames.
//!
//! The tokenizer is purely structural: it separates words, numbers, bracket
//! groups and hyphens. Tag classification happens in the rule table, which
//! scans the normalized string rather than individual tokens so that
//! multi-token patterns such as `Season 1 Episode 3` stay expressible.

use std::sync::LazyLock;

use logos::Logos;
use regex::Regex;

use crate::types::Span;

/// Container extensions stripped from the end of a filename.
pub const CONTAINER_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "ts", "m2ts", "flv", "webm", "m4v", "wmv",
];

static SITE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*www\.\S+?\.[a-z]{2,}\s*[-_]*\s*").expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Structural tokens of a normalized filename.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
pub enum Token<'src> {
    /// `[...]` group, brackets included.
    #[regex(r"\[[^\[\]]*\]", priority = 4)]
    Bracketed(&'src str),

    /// `(...)` group, parentheses included.
    #[regex(r"\([^()]*\)", priority = 4)]
    Parenthesized(&'src str),

    #[token("-")]
    Hyphen,

    #[regex(r"[0-9]+", priority = 3)]
    Number(&'src str),

    #[regex(r"[\p{L}\p{N}]+", priority = 2)]
    Word(&'src str),

    #[regex(r"[^\p{L}\p{N}\s\-\[\]()]", priority = 1)]
    Punct(&'src str),
}

impl<'src> Token<'src> {
    /// Text of alphanumeric tokens.
    pub fn text(&self) -> Option<&'src str> {
        match self {
            Self::Word(s) | Self::Number(s) => Some(s),
            _ => None,
        }
    }
}

/// A token with its byte span in the tokenized string.
#[derive(Debug, Clone)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

/// Tokenize a normalized string. Unrecognized characters are dropped.
pub fn tokenize(input: &str) -> Vec<SpannedToken<'_>> {
    Token::lexer(input)
        .spanned()
        .filter_map(|(result, span)| {
            result.ok().map(|token| SpannedToken {
                token,
                span: span.into(),
            })
        })
        .collect()
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Separator-free text the rule table runs over.
    pub text: String,
    /// Lowercased extension that was removed.
    pub extension: Option<String>,
    /// Contents of a leading `[Group]` prefix, kept as a release group
    /// candidate.
    pub leading_group: Option<String>,
}

/// Strip the container extension, a leading website prefix and a leading
/// bracketed group, then turn `.` and `_` into spaces and collapse
/// whitespace.
pub fn normalize(raw: &str) -> Normalized {
    let trimmed = raw.trim();
    let (stem, extension) = split_extension(trimmed);

    let stem = SITE_PREFIX.replace(stem, "");
    let spaced: String = stem
        .chars()
        .map(|c| if c == '.' || c == '_' { ' ' } else { c })
        .collect();
    let mut text = WHITESPACE.replace_all(spaced.trim(), " ").into_owned();

    let mut leading_group = None;
    if let Some(first) = tokenize(&text).first() {
        if let (Token::Bracketed(group), 0) = (first.token, first.span.start) {
            let inner = group[1..group.len() - 1].trim();
            if !inner.is_empty() {
                leading_group = Some(inner.to_string());
            }
            text = text[first.span.end..].trim_start_matches([' ', '-']).to_string();
        }
    }

    Normalized {
        text,
        extension,
        leading_group,
    }
}

fn split_extension(name: &str) -> (&str, Option<String>) {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        let ext = ext.to_ascii_lowercase();
        if CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
            return (stem, Some(ext));
        }
    }
    (name, None)
}
