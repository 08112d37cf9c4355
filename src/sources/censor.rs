use regex::{Captures, Regex};
use std::sync::LazyLock;

const SWEAR_WORDS: &[&str] = &["fuck", "shit", "damn"];

static SWEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let words = SWEAR_WORDS
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{words})\b")).expect("swear word pattern is valid")
});

/// Keeps the first letter of each swear word and masks the rest.
pub fn censor_text(text: &str) -> String {
    SWEAR_PATTERN
        .replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            let mut chars = word.chars();
            let first = chars.next().map(String::from).unwrap_or_default();
            first + &"*".repeat(chars.count())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_whole_words_case_insensitively() {
        assert_eq!(censor_text("Shit Happens"), "S*** Happens");
        assert_eq!(censor_text("DAMN right"), "D*** right");
        assert_eq!(censor_text("what the fuck?"), "what the f***?");
    }

    #[test]
    fn test_leaves_other_words_alone() {
        assert_eq!(censor_text("Shiitake Dreams"), "Shiitake Dreams");
        assert_eq!(censor_text("Amsterdam"), "Amsterdam");
        assert_eq!(censor_text(""), "");
    }
}
