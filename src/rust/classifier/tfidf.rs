use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::normalize_vector;

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "if", "in", "into", "is",
        "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "nor", "not",
        "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
        "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that",
        "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
        "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we",
        "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
        "with", "would", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect();
}

/// Settings for building a TF-IDF vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Upper bound on vocabulary size; the most frequent terms are kept
    pub max_features: usize,
    /// Inclusive range of n-gram lengths
    pub ngram_range: (usize, usize),
    /// Drop English stop words before building n-grams
    pub remove_stop_words: bool,
}

impl TfidfConfig {
    /// Rejects settings that cannot produce a feature space.
    pub(crate) fn check(&self) -> Result<(), String> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("Invalid n-gram range ({}, {})", min_n, max_n));
        }
        if self.max_features == 0 {
            return Err("max_features must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            ngram_range: (1, 2),
            remove_stop_words: true,
        }
    }
}

/// Maps text to L2-normalized TF-IDF vectors over a fixed vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learns vocabulary and inverse document frequencies from a corpus.
    pub fn fit<S: AsRef<str>>(documents: &[S], config: TfidfConfig) -> Result<Self, ClassifierError> {
        config.check().map_err(ClassifierError::Validation)?;
        if documents.is_empty() {
            return Err(ClassifierError::Build("Cannot fit a vectorizer on an empty corpus".into()));
        }

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let terms = analyze(doc.as_ref(), &config);
            let mut seen = HashSet::new();
            for term in terms {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.clone()) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(ClassifierError::Build(
                "Corpus produced an empty vocabulary (only stop words or single characters?)".into(),
            ));
        }

        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(config.max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n_docs = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (index, term) in kept.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self { config, vocabulary, idf })
    }

    /// Converts text to a TF-IDF vector. Text with no known terms maps to the zero vector.
    pub fn transform(&self, text: &str) -> Array1<f64> {
        let mut vector = Array1::zeros(self.vocabulary.len());
        for term in analyze(text, &self.config) {
            if let Some(&index) = self.vocabulary.get(&term) {
                vector[index] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(self.idf.iter()) {
            *value *= idf;
        }
        normalize_vector(&vector)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn config(&self) -> &TfidfConfig {
        &self.config
    }

    /// Checks the internal invariants of a deserialized vectorizer.
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.config.check()?;
        if self.vocabulary.len() > self.config.max_features {
            return Err(format!(
                "vocabulary has {} terms but max_features is {}",
                self.vocabulary.len(),
                self.config.max_features
            ));
        }
        if self.vocabulary.is_empty() {
            return Err("vocabulary is empty".into());
        }
        if self.idf.len() != self.vocabulary.len() {
            return Err(format!(
                "idf has {} entries but vocabulary has {} terms",
                self.idf.len(),
                self.vocabulary.len()
            ));
        }
        let mut seen = vec![false; self.vocabulary.len()];
        for &index in self.vocabulary.values() {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(format!("vocabulary index {} is out of range or repeated", index)),
            }
        }
        if self.idf.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err("idf weights must be finite and positive".into());
        }
        Ok(())
    }
}

/// Splits text into lowercase word tokens of at least two characters.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Tokenizes, drops stop words and expands into the configured n-grams.
fn analyze(text: &str, config: &TfidfConfig) -> Vec<String> {
    let tokens: Vec<String> = tokenize(text)
        .into_iter()
        .filter(|t| !config.remove_stop_words || !STOP_WORDS.contains(t.as_str()))
        .collect();

    let (min_n, max_n) = config.ngram_range;
    let mut terms = Vec::new();
    for n in min_n..=max_n {
        if n > tokens.len() {
            break;
        }
        terms.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "Este producto es excelente",
            "Muy malo, no lo compren",
            "Producto excelente y barato",
        ]
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_short_tokens() {
        assert_eq!(tokenize("¡Muy BUENO, y barato!"), vec!["muy", "bueno", "barato"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_analyze_builds_bigrams_without_stop_words() {
        let terms = analyze("the quick fox", &TfidfConfig::default());
        assert_eq!(terms, vec!["quick", "fox", "quick fox"]);
    }

    #[test]
    fn test_fit_builds_sorted_vocabulary() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        assert!(vectorizer.vocabulary.contains_key("producto"));
        assert!(vectorizer.vocabulary.contains_key("este producto"));
        let indices: Vec<usize> = vectorizer.vocabulary.values().copied().collect();
        assert_eq!(indices, (0..vectorizer.vocabulary_size()).collect::<Vec<_>>());
        assert!(vectorizer.validate().is_ok());
    }

    #[test]
    fn test_max_features_keeps_most_frequent_terms() {
        let config = TfidfConfig {
            max_features: 2,
            ..TfidfConfig::default()
        };
        let vectorizer = TfidfVectorizer::fit(&corpus(), config).unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 2);
        assert!(vectorizer.vocabulary.contains_key("producto"));
        assert!(vectorizer.vocabulary.contains_key("excelente"));
    }

    #[test]
    fn test_transform_is_unit_length() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let v = vectorizer.transform("producto excelente");
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_text_is_zero_vector() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let v = vectorizer.transform("zzz qqq");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_invalid_ngram_range() {
        for ngram_range in [(0, 2), (3, 1)] {
            let config = TfidfConfig {
                ngram_range,
                ..TfidfConfig::default()
            };
            assert!(matches!(
                TfidfVectorizer::fit(&corpus(), config),
                Err(ClassifierError::Validation(_))
            ));

            let mut vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
            vectorizer.config.ngram_range = ngram_range;
            assert!(vectorizer.validate().is_err());
        }
    }

    #[test]
    fn test_fit_rejects_empty_vocabulary() {
        let result = TfidfVectorizer::fit(&["a b c", "the of"], TfidfConfig::default());
        assert!(matches!(result, Err(ClassifierError::Build(_))));
    }
}
