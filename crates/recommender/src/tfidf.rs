//! TF-IDF text vectorizer
//!
//! Tokens are lowercase runs of two or more word characters. English stopwords
//! are dropped. The vocabulary keeps the `max_features` terms with the highest
//! corpus frequency (ties by term) and is indexed alphabetically. Weights are
//! `count * (ln((1 + n) / (1 + df)) + 1)` and every row is scaled to unit
//! length, so a dot product between rows is their cosine similarity.

use crate::sparse::SparseMatrix;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("Failed to compile token regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
        "anywhere", "are", "around", "as", "at", "be", "became", "because", "become",
        "becomes", "been", "before", "beforehand", "behind", "being", "below", "beside",
        "besides", "between", "beyond", "both", "but", "by", "can", "cannot", "could", "do",
        "done", "down", "due", "during", "each", "either", "else", "elsewhere", "enough",
        "etc", "even", "ever", "every", "everyone", "everything", "everywhere", "except",
        "few", "for", "former", "formerly", "from", "further", "had", "has", "have", "he",
        "hence", "her", "here", "hereafter", "hereby", "herein", "hers", "herself", "him",
        "himself", "his", "how", "however", "ie", "if", "in", "indeed", "into", "is", "it",
        "its", "itself", "just", "last", "latter", "least", "less", "ltd", "many", "may", "me",
        "meanwhile", "might", "more", "moreover", "most", "mostly", "much", "must", "my",
        "myself", "namely", "neither", "never", "nevertheless", "next", "no", "nobody", "none",
        "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one",
        "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
        "over", "own", "per", "perhaps", "please", "rather", "same", "seem", "seemed",
        "seeming", "seems", "several", "she", "should", "since", "so", "some", "somehow",
        "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "than",
        "that", "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
        "thereby", "therefore", "therein", "these", "they", "this", "those", "though",
        "through", "throughout", "thru", "thus", "to", "together", "too", "toward", "towards",
        "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were",
        "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
        "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither",
        "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
        "would", "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Split text into lowercase, non-stopword tokens
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Vocabulary and inverse document frequencies learned from a corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and return the row-aligned weight matrix
    pub fn fit_transform<S: AsRef<str>>(documents: &[S], max_features: usize) -> (Self, SparseMatrix) {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            for token in tokens {
                *corpus_counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();
        let vocabulary: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(index, term)| (term.to_string(), index))
            .collect();

        let mut document_frequency = vec![0usize; vocabulary.len()];
        for tokens in &tokenized {
            let seen: HashSet<usize> = tokens.iter().filter_map(|t| vocabulary.get(t).copied()).collect();
            for column in seen {
                document_frequency[column] += 1;
            }
        }

        let n = tokenized.len() as f32;
        let idf = document_frequency
            .into_iter()
            .map(|df| ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        let vectorizer = Self { vocabulary, idf };
        let rows = tokenized.iter().map(|tokens| vectorizer.weigh(tokens)).collect();
        let matrix = SparseMatrix::from_rows(vectorizer.vocabulary.len(), rows);
        (vectorizer, matrix)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    fn weigh(&self, tokens: &[String]) -> Vec<(usize, f32)> {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut weights: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(column, count)| (column, count * self.idf[column]))
            .collect();

        let norm = weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut weights {
                *weight /= norm;
            }
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stopwords_and_short_tokens() {
        assert_eq!(
            tokenize("The Fast and the Furious: a car 2 race"),
            vec!["fast", "furious", "car", "race"]
        );
    }

    #[test]
    fn test_vocabulary_capped_by_frequency() {
        let docs = ["alpha alpha beta", "alpha gamma", "beta"];
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&docs, 2);

        assert_eq!(vectorizer.vocabulary_size(), 2);
        assert!(vectorizer.contains("alpha"));
        assert!(vectorizer.contains("beta"));
        assert!(!vectorizer.contains("gamma"));
        assert_eq!(matrix.shape(), (3, 2));
    }

    #[test]
    fn test_rows_are_unit_length() {
        let docs = ["action fast car", "drama slow romance"];
        let (_, matrix) = TfidfVectorizer::fit_transform(&docs, 100);

        for row in 0..matrix.num_rows() {
            let norm: f32 = matrix.row(row).map(|(_, w)| w * w).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_stopword_only_document_is_zero_row() {
        let docs = ["the and of", "space opera"];
        let (_, matrix) = TfidfVectorizer::fit_transform(&docs, 100);
        assert_eq!(matrix.row(0).count(), 0);
        assert_eq!(matrix.row_dot_all(0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let docs = ["action car", "action bike", "action boat"];
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&docs, 100);
        let action = vectorizer.vocabulary["action"];
        let car = vectorizer.vocabulary["car"];
        assert!(matrix.get(0, car) > matrix.get(0, action));
    }
}
