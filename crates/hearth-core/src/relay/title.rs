//! Conversation title synthesis.
//!
//! `synthesize_title` derives a short display label from the first user
//! utterance without any I/O: it drops a leading question/request word and
//! the filler that follows it, drops trailing question marks, keeps at most
//! seven words, and title-cases them.

/// Label used when nothing usable remains.
pub const FALLBACK_TITLE: &str = "New Conversation";

const MAX_TITLE_WORDS: usize = 7;

/// Leading interrogative/imperative words, stripped once.
const STOP_WORDS: &[&str] = &[
    "what", "how", "why", "when", "where", "who", "is", "are", "can", "could", "would", "should",
    "explain", "tell", "describe", "help", "show",
];

/// Auxiliaries, articles and pronouns skipped directly after a stop word.
const FILLER_WORDS: &[&str] = &[
    "is", "are", "was", "were", "do", "does", "did", "the", "a", "an", "you", "i", "we",
];

/// Derive a display title from the first user utterance.
///
/// Total: every input, including empty or whitespace-only text, yields a
/// title.
pub fn synthesize_title(first_message: &str) -> String {
    let mut rest = first_message.trim();

    if let Some(tail) = strip_leading_word(rest, STOP_WORDS) {
        rest = tail;
        while let Some(tail) = strip_leading_word(rest, FILLER_WORDS) {
            rest = tail;
        }
    }

    let rest = rest.trim_end_matches('?');

    let words: Vec<String> = rest
        .split_whitespace()
        .take(MAX_TITLE_WORDS)
        .map(capitalize)
        .collect();

    if words.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    words.join(" ")
}

/// Strip the first word of `text` if it is in `set` and followed by whitespace.
fn strip_leading_word<'a>(text: &'a str, set: &[&str]) -> Option<&'a str> {
    let (first, tail) = text.split_once(char::is_whitespace)?;
    if set.contains(&first.to_lowercase().as_str()) {
        Some(tail.trim_start())
    } else {
        None
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_words_and_filler_are_dropped() {
        assert_eq!(
            synthesize_title("What is the capital of France?"),
            "Capital Of France"
        );
    }

    #[test]
    fn blank_input_uses_fallback() {
        assert_eq!(synthesize_title(""), FALLBACK_TITLE);
        assert_eq!(synthesize_title("   "), FALLBACK_TITLE);
        assert_eq!(synthesize_title("???"), FALLBACK_TITLE);
    }

    #[test]
    fn long_input_is_capped_at_seven_words() {
        let title =
            synthesize_title("Could you explain recursion in programming with examples please");
        assert_eq!(title, "Explain Recursion In Programming With Examples Please");

        let title = synthesize_title("one two three four five six seven eight nine");
        assert_eq!(title.split(' ').count(), 7);
        assert_eq!(title, "One Two Three Four Five Six Seven");
    }

    #[test]
    fn only_one_stop_word_is_stripped() {
        assert_eq!(synthesize_title("how can I learn Rust?"), "Can I Learn Rust");
    }

    #[test]
    fn stop_word_match_is_case_insensitive_and_whole_word() {
        assert_eq!(synthesize_title("WHY rust"), "Rust");
        assert_eq!(synthesize_title("Whatever works"), "Whatever Works");
    }

    #[test]
    fn lone_stop_word_is_kept() {
        assert_eq!(synthesize_title("Why?"), "Why");
    }

    #[test]
    fn casing_is_normalized() {
        assert_eq!(synthesize_title("tokio SELECT macro"), "Tokio Select Macro");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(synthesize_title("  sort \t a\n vector  "), "Sort A Vector");
    }

    #[test]
    fn non_ascii_is_handled() {
        assert_eq!(synthesize_title("élan vital"), "Élan Vital");
    }

    #[test]
    fn is_deterministic() {
        let input = "Describe the borrow checker";
        assert_eq!(synthesize_title(input), synthesize_title(input));
        assert_eq!(synthesize_title(input), "Borrow Checker");
    }
}
