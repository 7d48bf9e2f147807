//! Text chunking and source-name normalization
//!
//! Splits document text into paragraph-respecting chunks under a maximum
//! length. The limit governs how paragraphs are grouped, not hard
//! truncation: a single paragraph longer than the limit is emitted whole.

use regex_lite::Regex;

/// Default maximum chunk length in characters
pub const DEFAULT_MAX_CHUNK_LEN: usize = 900;

/// Split text into chunks of paragraphs, each at most `max_len` characters
/// unless a single paragraph alone exceeds it.
///
/// Paragraph boundaries are runs of two or more consecutive newlines.
/// Paragraphs accumulate into a buffer joined by a blank line; when the
/// next paragraph would push the buffer past `max_len`, the buffer is
/// flushed (trimmed, skipped if empty) and the paragraph starts a new one.
/// Empty or whitespace-only input yields no chunks.
pub fn chunk(text: &str, max_len: usize) -> Vec<String> {
    let paragraph_break = Regex::new(r"\n{2,}").expect("hard-coded pattern");

    let mut chunks = Vec::new();
    let mut buf = String::new();

    for para in paragraph_break.split(text) {
        if buf.len() + 2 + para.len() > max_len {
            let flushed = buf.trim();
            if !flushed.is_empty() {
                chunks.push(flushed.to_string());
            }
            buf = para.to_string();
        } else if buf.is_empty() {
            buf = para.to_string();
        } else {
            buf.push_str("\n\n");
            buf.push_str(para);
        }
    }

    let tail = buf.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    chunks
}

/// Derive an identifier-safe topic slug from a source file name.
///
/// The `.md`/`.txt` extension is stripped, the rest is lowercased, and
/// every run of characters outside `[a-z0-9-]` collapses to one hyphen.
pub fn slugify(source_name: &str) -> String {
    let base = strip_extension(source_name).to_lowercase();

    let mut slug = String::with_capacity(base.len());
    let mut pending_hyphen = false;
    for ch in base.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Derive a human-readable title from a source file name:
/// extension stripped, `-` and `_` replaced with spaces.
pub fn title_from(source_name: &str) -> String {
    strip_extension(source_name)
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect()
}

fn strip_extension(source_name: &str) -> &str {
    let lower = source_name.to_lowercase();
    for ext in [".md", ".txt"] {
        if lower.ends_with(ext) {
            return &source_name[..source_name.len() - ext.len()];
        }
    }
    source_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", DEFAULT_MAX_CHUNK_LEN).is_empty());
        assert!(chunk("   \n\n   \n\n ", DEFAULT_MAX_CHUNK_LEN).is_empty());
    }

    #[test]
    fn short_paragraphs_group_into_one_chunk() {
        let text = "First paragraph.\n\nSecond paragraph.\n\n\nThird.";
        let chunks = chunk(text, 900);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "First paragraph.\n\nSecond paragraph.\n\nThird.");
    }

    #[test]
    fn buffer_flushes_before_exceeding_limit() {
        let a = "a".repeat(500);
        let b = "b".repeat(500);
        let text = format!("{a}\n\n{b}");
        let chunks = chunk(&text, 900);
        assert_eq!(chunks, vec![a, b]);
    }

    #[test]
    fn oversized_paragraph_is_emitted_whole() {
        let big = "x".repeat(2000);
        let text = format!("intro\n\n{big}\n\noutro");
        let chunks = chunk(&text, 900);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], big);
        assert!(chunks[1].len() > 900);
        for c in [&chunks[0], &chunks[2]] {
            assert!(c.len() <= 900);
        }
    }

    #[test]
    fn no_text_is_lost_or_duplicated() {
        let text = "alpha beta\n\ngamma\n\n\n\ndelta epsilon\n\nzeta";
        let chunks = chunk(text, 20);
        let rejoined: String = chunks.join(" ");
        for word in ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"] {
            assert_eq!(rejoined.matches(word).count(), 1, "word {word}");
        }
    }

    #[test]
    fn chunk_order_is_reading_order() {
        let text = "one\n\ntwo\n\nthree";
        let chunks = chunk(text, 5);
        assert_eq!(chunks, vec!["one", "two", "three"]);
    }

    #[test]
    fn slugify_collapses_and_lowercases() {
        assert_eq!(slugify("Percentages Basics.md"), "percentages-basics");
        assert_eq!(slugify("unit_3  (draft).txt"), "unit-3-draft");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn title_replaces_separators() {
        assert_eq!(title_from("percentages-intro.md"), "percentages intro");
        assert_eq!(title_from("unit_3_review.txt"), "unit 3 review");
    }
}
