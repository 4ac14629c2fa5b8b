//! Free-text phrase extraction.
//!
//! The `regex` crate has no look-around, so each phrase is found in two steps:
//! a keyword regex locates candidate starts, then [`scan_value`] walks the
//! alphanumeric words that follow until a boundary word or the end of text.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::filters::Filters;

static BRAND_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in\s+brand|brand|from|by)\s+").expect("brand keyword pattern is valid")
});

static CATEGORY_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in\s+category|category|under)\s+")
        .expect("category keyword pattern is valid")
});

const BRAND_BOUNDARIES: &[&str] = &["and", "or", "with", "for"];
const CATEGORY_BOUNDARIES: &[&str] = &["and", "or", "with", "for", "brand"];

/// Connective words that may be left dangling after a phrase is cut out.
const CONNECTIVES: &[&str] = &["and", "or", "with", "for"];

/// Output of [`QueryParser::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// Query text with extracted phrases removed.
    pub cleaned_query: String,
    /// Caller filters overlaid with anything extracted from the text.
    pub filters: Filters,
}

/// A located phrase: the byte span to cut and the captured value.
#[derive(Debug, Clone, PartialEq)]
struct PhraseMatch {
    span: Range<usize>,
    value: String,
}

struct PhrasePattern {
    keyword: &'static Lazy<Regex>,
    boundaries: &'static [&'static str],
}

impl PhrasePattern {
    /// Single left-to-right pass. A failed scan from word `w` fails at the same
    /// byte for every later word start before that byte, so keyword matches whose
    /// value would start there are skipped without rescanning.
    fn find(&self, text: &str) -> Option<PhraseMatch> {
        let mut dead_until = 0;
        for keyword in self.keyword.find_iter(text) {
            let start = keyword.end();
            if start < dead_until {
                continue;
            }
            let rest = &text[start..];
            match scan_value(rest, self.boundaries) {
                Ok(len) => {
                    return Some(PhraseMatch {
                        span: keyword.start()..start + len,
                        value: rest[..len].trim().to_string(),
                    });
                }
                Err(failed_at) => dead_until = start + failed_at,
            }
        }
        None
    }
}

/// Extracts brand and category mentions from product queries.
///
/// Recognised phrases:
/// - brand: `brand X`, `from X`, `by X`, `in brand X`
/// - category: `category X`, `in category X`, `under X`
///
/// `X` is one or more ASCII-alphanumeric words. It ends at the first boundary
/// word (`and`, `or`, `with`, `for`; category also stops at `brand`) or at the
/// end of the text. A candidate followed by punctuation is not a match.
pub struct QueryParser {
    brand: PhrasePattern,
    category: PhrasePattern,
}

impl QueryParser {
    pub fn new() -> Self {
        Self {
            brand: PhrasePattern {
                keyword: &BRAND_KEYWORD,
                boundaries: BRAND_BOUNDARIES,
            },
            category: PhrasePattern {
                keyword: &CATEGORY_KEYWORD,
                boundaries: CATEGORY_BOUNDARIES,
            },
        }
    }

    /// Parse `query`, extracting only the filter fields `existing` leaves unset.
    ///
    /// Brand is extracted first; category runs on the brand-trimmed text. If
    /// nothing is left after extraction the original text is returned as-is.
    /// Price bounds always pass through untouched.
    pub fn parse(&self, query: &str, existing: Option<&Filters>) -> ParsedQuery {
        let mut filters = existing.cloned().unwrap_or_default();

        if query.trim().is_empty() {
            return ParsedQuery {
                cleaned_query: query.to_string(),
                filters,
            };
        }

        let mut text = query.to_string();
        let mut extracted = false;

        if filters.brand().is_none() {
            if let Some(found) = self.brand.find(&text) {
                debug!(brand = %found.value, "extracted brand from query");
                filters.brand = Some(found.value);
                text.replace_range(found.span, "");
                extracted = true;
            }
        }

        if filters.category().is_none() {
            if let Some(found) = self.category.find(&text) {
                debug!(category = %found.value, "extracted category from query");
                filters.category = Some(found.value);
                text.replace_range(found.span, "");
                extracted = true;
            }
        }

        let mut cleaned = collapse_whitespace(&text);
        if extracted {
            cleaned = drop_dangling_connectives(&cleaned);
        }

        if cleaned.is_empty() {
            cleaned = query.to_string();
        }

        ParsedQuery {
            cleaned_query: cleaned,
            filters,
        }
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Length in bytes of the phrase value at the start of `rest`. When `rest` does
/// not start with a well-formed value, `Err` holds the offset where scanning
/// gave up.
fn scan_value(rest: &str, boundaries: &[&str]) -> Result<usize, usize> {
    let mut pos = 0;
    loop {
        let word_len = alnum_prefix_len(&rest[pos..]);
        if word_len == 0 {
            return Err(pos);
        }
        let word_end = pos + word_len;

        let tail = &rest[word_end..];
        let next = tail.trim_start();
        if next.is_empty() {
            return Ok(word_end);
        }
        if next.len() == tail.len() {
            // punctuation glued to the word
            return Err(word_end);
        }

        let next_word = &next[..alnum_prefix_len(next)];
        if !next_word.is_empty() && boundaries.iter().any(|b| next_word.eq_ignore_ascii_case(b)) {
            return Ok(word_end);
        }

        pos = word_end + (tail.len() - next.len());
    }
}

fn alnum_prefix_len(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_alphanumeric).count()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_connective(token: &str) -> bool {
    CONNECTIVES.iter().any(|c| token.eq_ignore_ascii_case(c))
}

/// Drop connectives orphaned by phrase removal: leading, trailing, and all but
/// the last of a consecutive run.
fn drop_dangling_connectives(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let start = tokens
        .iter()
        .position(|t| !is_connective(t))
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| !is_connective(t))
        .map_or(start, |idx| idx + 1);

    let kept = &tokens[start..end.max(start)];
    kept.iter()
        .enumerate()
        .filter(|(idx, token)| {
            !(is_connective(token) && kept.get(idx + 1).is_some_and(|next| is_connective(next)))
        })
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(" ")
}
