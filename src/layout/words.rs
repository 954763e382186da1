//! High-frequency word list
//!
//! Data-driven splitting of tokens that OCR glued together ("ofthe",
//! "inthe"). The list is configuration, so other languages only need a
//! different word list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

const DEFAULT_WORDS: &[&str] = &[
    "the", "of", "and", "to", "in", "is", "it", "that", "for", "on", "was", "with", "as", "at",
    "by", "be", "this", "are", "or", "from", "an", "not", "but", "have", "has", "had", "we",
    "you", "he", "she", "they", "his", "her", "its", "our", "their", "all", "can", "will",
    "which", "there", "been", "were", "if", "no", "so", "do", "my", "up", "out", "one", "two",
    "new", "also", "than", "then", "them", "these", "those", "what", "when", "where", "who",
    "how", "more", "other", "some", "such", "only", "over", "any", "may", "would", "could",
    "should", "about", "after", "before", "here", "each", "between", "under", "your",
];

/// Real words that happen to decompose into list words
const DEFAULT_COMPOUNDS: &[&str] = &[
    "into", "onto", "upon", "within", "without", "another", "therein", "herein", "wherein",
    "someone", "anyone", "everyone", "nothing", "himself", "herself", "itself", "themselves",
    "theme", "hereby", "thereby", "whereas", "whereby", "cannot", "others", "therefore",
    "however", "whoever", "something", "anything", "everything", "somewhere", "nowhere",
    "outside", "inside", "notice", "heron", "bean", "inform", "attend", "often", "canon",
];

/// Shortest glued token the strict splitter will touch
const MIN_SPLIT_LEN: usize = 5;

/// Shortest list word the lenient segmenter will cut out
const MIN_LENIENT_WORD: usize = 3;

/// Shortest unknown fragment the lenient segmenter may leave behind
const MIN_UNKNOWN_RUN: usize = 4;

/// Serializable word list configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WordListConfig {
    /// High-frequency short words
    pub words: Vec<String>,
    /// Words that must never be split even though they decompose
    pub compounds: Vec<String>,
}

impl Default for WordListConfig {
    fn default() -> Self {
        Self {
            words: DEFAULT_WORDS.iter().map(|w| w.to_string()).collect(),
            compounds: DEFAULT_COMPOUNDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Lookup structure built from a [`WordListConfig`]
#[derive(Debug, Clone)]
pub struct WordList {
    words: HashSet<String>,
    compounds: HashSet<String>,
    max_len: usize,
}

impl Default for WordList {
    fn default() -> Self {
        Self::new(&WordListConfig::default())
    }
}

impl WordList {
    pub fn new(config: &WordListConfig) -> Self {
        // Single letters would let almost anything decompose
        let words: HashSet<String> = config
            .words
            .iter()
            .map(|w| w.trim().to_ascii_lowercase())
            .filter(|w| w.len() >= 2 && w.bytes().all(|b| b.is_ascii_alphabetic()))
            .collect();
        let compounds = config
            .compounds
            .iter()
            .map(|w| w.trim().to_ascii_lowercase())
            .collect();
        let max_len = words.iter().map(String::len).max().unwrap_or(0);

        Self {
            words,
            compounds,
            max_len,
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_ascii_lowercase())
    }

    /// Split a token that decomposes entirely into list words.
    ///
    /// Returns `None` when the token is short, is itself a word or a known
    /// compound, contains non-ASCII letters, or does not decompose. The
    /// returned parts keep the original casing and, being list words, are
    /// never split again.
    pub fn split_concatenated<'a>(&self, token: &'a str) -> Option<Vec<&'a str>> {
        if token.len() < MIN_SPLIT_LEN || !token.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        let lower = token.to_ascii_lowercase();
        if self.words.contains(&lower) || self.compounds.contains(&lower) {
            return None;
        }

        let n = lower.len();
        // best[i] = (parts, previous cut) for the prefix of length i
        let mut best: Vec<Option<(usize, usize)>> = vec![None; n + 1];
        best[0] = Some((0, 0));
        for end in 1..=n {
            let start_min = end.saturating_sub(self.max_len);
            for start in start_min..end {
                let Some((parts, _)) = best[start] else {
                    continue;
                };
                if !self.words.contains(&lower[start..end]) {
                    continue;
                }
                let candidate = parts + 1;
                if best[end].map_or(true, |(p, _)| candidate < p) {
                    best[end] = Some((candidate, start));
                }
            }
        }

        let (parts, _) = best[n]?;
        if parts < 2 {
            return None;
        }
        Some(Self::collect_cuts(token, &best))
    }

    /// Segment a glued token into list words and unknown fragments,
    /// preferring the fewest unknown characters. Only list words of three or
    /// more letters are cut out and unknown fragments must keep four letters,
    /// so most ordinary words are left whole.
    pub fn segment_lenient<'a>(&self, token: &'a str) -> Vec<&'a str> {
        if token.len() < MIN_SPLIT_LEN || !token.bytes().all(|b| b.is_ascii_alphabetic()) {
            return vec![token];
        }
        let lower = token.to_ascii_lowercase();
        if self.compounds.contains(&lower) {
            return vec![token];
        }

        let n = lower.len();
        // best[i] = ((unknown chars, parts), previous cut)
        let mut best: Vec<Option<((usize, usize), usize)>> = vec![None; n + 1];
        best[0] = Some(((0, 0), 0));
        for end in 1..=n {
            for start in 0..end {
                let Some(((unknown, parts), _)) = best[start] else {
                    continue;
                };
                let len = end - start;
                let cost = if len >= MIN_LENIENT_WORD
                    && len <= self.max_len
                    && self.words.contains(&lower[start..end])
                {
                    (unknown, parts + 1)
                } else if len >= MIN_UNKNOWN_RUN || len == n {
                    (unknown + len, parts + 1)
                } else {
                    continue;
                };
                if best[end].map_or(true, |(c, _)| cost < c) {
                    best[end] = Some((cost, start));
                }
            }
        }

        match best[n] {
            Some(_) => {
                let cuts: Vec<Option<(usize, usize)>> =
                    best.iter().map(|b| b.map(|(_, prev)| (0, prev))).collect();
                Self::collect_cuts(token, &cuts)
            }
            None => vec![token],
        }
    }

    fn collect_cuts<'a>(token: &'a str, best: &[Option<(usize, usize)>]) -> Vec<&'a str> {
        let mut parts = Vec::new();
        let mut end = token.len();
        while end > 0 {
            let Some((_, start)) = best[end] else {
                break;
            };
            parts.push(&token[start..end]);
            end = start;
        }
        parts.reverse();
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_glued_function_words() {
        let list = WordList::default();
        assert_eq!(list.split_concatenated("ofthe"), Some(vec!["of", "the"]));
        assert_eq!(list.split_concatenated("inthe"), Some(vec!["in", "the"]));
        assert_eq!(list.split_concatenated("Andthe"), Some(vec!["And", "the"]));
    }

    #[test]
    fn test_split_leaves_real_words() {
        let list = WordList::default();
        assert_eq!(list.split_concatenated("within"), None);
        assert_eq!(list.split_concatenated("another"), None);
        assert_eq!(list.split_concatenated("document"), None);
        assert_eq!(list.split_concatenated("there"), None);
        assert_eq!(list.split_concatenated("isit"), None);
    }

    #[test]
    fn test_split_parts_are_stable() {
        let list = WordList::default();
        let parts = list.split_concatenated("itisthe").unwrap();
        assert_eq!(parts, vec!["it", "is", "the"]);
        for part in parts {
            assert!(list.split_concatenated(part).is_none());
        }
    }

    #[test]
    fn test_lenient_segmentation() {
        let list = WordList::default();
        assert_eq!(
            list.segment_lenient("thequickbrownfox"),
            vec!["the", "quickbrownfox"]
        );
        assert_eq!(list.segment_lenient("other"), vec!["other"]);
        assert_eq!(list.segment_lenient("scanner"), vec!["scanner"]);
        assert_eq!(list.segment_lenient("Total"), vec!["Total"]);
        assert_eq!(list.segment_lenient("theinvoice"), vec!["the", "invoice"]);
    }

    #[test]
    fn test_custom_word_list() {
        let list = WordList::new(&WordListConfig {
            words: vec!["der".into(), "und".into(), "die".into()],
            compounds: Vec::new(),
        });
        assert_eq!(list.split_concatenated("derunddie"), Some(vec!["der", "und", "die"]));
        assert!(list.contains("UND"));
    }
}
