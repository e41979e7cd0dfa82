use nucleo_matcher::chars;

/// Rank reserved for "no match". Real ranks are always below it.
pub const NO_MATCH: u32 = u32::MAX;

/// Case-folds and strips diacritics so "Éditeur" and "editeur" compare equal.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(chars::normalize)
        .map(chars::to_lower_case)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    raw: String,
    normalized: String,
    words: Vec<String>,
}

impl Query {
    pub fn new(query: &str) -> Self {
        let mut result = Self::default();
        result.set(query);
        result
    }

    pub fn set(&mut self, query: &str) {
        self.raw = query.to_string();
        self.normalized = normalize(query.trim());
        self.words = self
            .normalized
            .split_whitespace()
            .map(str::to_string)
            .collect();
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.normalized.clear();
        self.words.clear();
    }

    /// Whitespace-only input counts as empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Matches an already normalized haystack.
    ///
    /// Every word has to occur somewhere in the haystack, in any order. The
    /// rank is the sum of the byte offsets of each word's first occurrence,
    /// so text that matches near its start sorts first.
    pub fn match_text(&self, haystack: &str) -> u32 {
        if self.words.is_empty() || haystack.is_empty() {
            return NO_MATCH;
        }

        let mut rank: u32 = 0;
        for word in &self.words {
            match haystack.find(word.as_str()) {
                Some(pos) => {
                    let pos = u32::try_from(pos).unwrap_or(NO_MATCH - 1);
                    rank = rank.saturating_add(pos);
                }
                None => return NO_MATCH,
            }
        }

        rank.min(NO_MATCH - 1)
    }

    /// True when every result of `self` is guaranteed to also match `previous`.
    ///
    /// Words never contain whitespace, so each word of the old query sits
    /// inside one word of the new query when the old text is a substring of
    /// the new text.
    pub fn narrows(&self, previous: &Query) -> bool {
        !previous.is_empty() && self.normalized.contains(previous.normalized.as_str())
    }
}
