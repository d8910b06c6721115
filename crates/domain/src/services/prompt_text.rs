//! Tokenized view of a user prompt for phrase matching.

/// Lowercased, tokenized prompt. Tokens are runs of alphanumerics and
/// apostrophes; everything else separates tokens, so phrase matches always
/// fall on word boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    raw: String,
    tokens: Vec<String>,
}

impl PromptText {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            tokens: tokenize(raw),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_blank(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token indices at which `phrase` starts.
    pub fn positions(&self, phrase: &str) -> Vec<usize> {
        let needle = tokenize(phrase);
        if needle.is_empty() || needle.len() > self.tokens.len() {
            return Vec::new();
        }
        self.tokens
            .windows(needle.len())
            .enumerate()
            .filter(|(_, window)| *window == needle.as_slice())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn contains(&self, phrase: &str) -> bool {
        !self.positions(phrase).is_empty()
    }

    /// Number of tokens in `phrase` after tokenization.
    pub fn phrase_len(phrase: &str) -> usize {
        tokenize(phrase).len()
    }
}

fn tokenize(raw: &str) -> Vec<String> {
    raw.to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        let text = PromptText::new("  Save my Battery, please!  ");
        assert_eq!(text.tokens(), &["save", "my", "battery", "please"]);
        assert_eq!(text.raw(), "Save my Battery, please!");
    }

    #[test]
    fn test_contains_respects_word_boundaries() {
        let text = PromptText::new("Please update my apps");
        assert!(!text.contains("data"));
        assert!(text.contains("my apps"));
    }

    #[test]
    fn test_positions_for_multi_word_phrase() {
        let text = PromptText::new("How can I save battery? How can I save data?");
        assert_eq!(text.positions("how can i"), vec![0, 5]);
    }

    #[test]
    fn test_apostrophes_are_kept_inside_words() {
        let text = PromptText::new("Don\u{2019}t optimize battery");
        assert!(text.contains("don't"));
    }

    #[test]
    fn test_blank_prompt() {
        assert!(PromptText::new("  ?! ").is_blank());
    }
}
