//! TF-IDF term weighting over unigrams and bigrams.
//!
//! Tokens are runs of at least two word characters. Stopwords are dropped
//! before bigrams are formed, so a bigram may span a removed word. Term
//! frequency is the raw count, idf is smoothed (`ln((1 + n) / (1 + df)) + 1`)
//! and every row is L2-normalized, which lets the index treat a dot product
//! as cosine similarity.

use super::error::RecommenderError;
use super::stopwords::is_stopword;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b").expect("valid token regex");
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TfidfSettings {
    /// Keep only the most frequent terms corpus-wide. `None` keeps all.
    pub max_features: Option<usize>,
    /// Inclusive n-gram range.
    pub ngram_range: (usize, usize),
}

impl Default for TfidfSettings {
    fn default() -> Self {
        Self {
            max_features: None,
            ngram_range: (1, 2),
        }
    }
}

/// One sparse row, indices strictly increasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseRow {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseRow {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn dot(&self, other: &SparseRow) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Tracks × vocabulary weights, one `SparseRow` per corpus document.
#[derive(Clone, Debug, Default)]
pub struct TermWeightMatrix {
    pub rows: Vec<SparseRow>,
    pub n_cols: usize,
}

impl TermWeightMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&SparseRow> {
        self.rows.get(index)
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(SparseRow::nnz).sum()
    }
}

/// Fitted vocabulary and idf weights.
#[derive(Clone, Debug)]
pub struct TfidfModel {
    settings: TfidfSettings,
    vocabulary: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl TfidfModel {
    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column_of(term).map(|col| self.idf[col])
    }

    /// Weights a document against the fitted vocabulary. Unknown terms are
    /// ignored.
    pub fn transform(&self, document: &str) -> SparseRow {
        let counts = count_terms(document, self.settings.ngram_range);
        self.weigh(&counts)
    }

    fn weigh(&self, counts: &HashMap<String, usize>) -> SparseRow {
        let mut entries: Vec<(usize, f64)> = counts
            .iter()
            .filter_map(|(term, &count)| {
                self.vocabulary
                    .get(term)
                    .map(|&col| (col, count as f64 * self.idf[col]))
            })
            .collect();
        entries.sort_unstable_by_key(|(col, _)| *col);

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        let (indices, values) = if norm > 0.0 {
            entries.into_iter().map(|(c, v)| (c, v / norm)).unzip()
        } else {
            (Vec::new(), Vec::new())
        };
        SparseRow { indices, values }
    }
}

/// Fits the model over `corpus` and returns it together with the weighted
/// rows, aligned with the corpus order.
pub fn fit<S: AsRef<str> + Sync>(
    corpus: &[S],
    settings: &TfidfSettings,
) -> Result<(TfidfModel, TermWeightMatrix), RecommenderError> {
    if corpus.is_empty() {
        return Err(RecommenderError::EmptyCatalog);
    }

    let per_document: Vec<HashMap<String, usize>> = corpus
        .par_iter()
        .map(|doc| count_terms(doc.as_ref(), settings.ngram_range))
        .collect();

    // term -> (corpus frequency, document frequency), ordered by term
    let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for counts in &per_document {
        for (term, &count) in counts {
            let entry = stats.entry(term.as_str()).or_insert((0, 0));
            entry.0 += count;
            entry.1 += 1;
        }
    }

    let mut kept: Vec<(&str, (usize, usize))> = stats.into_iter().collect();
    if let Some(limit) = settings.max_features {
        if kept.len() > limit {
            // Stable sort keeps the lexicographic order among equal frequencies.
            kept.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
            kept.truncate(limit);
            kept.sort_by(|a, b| a.0.cmp(b.0));
        }
    }

    let n_docs = corpus.len() as f64;
    let terms: Vec<String> = kept.iter().map(|(t, _)| t.to_string()).collect();
    let idf: Vec<f64> = kept
        .iter()
        .map(|(_, (_, df))| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
        .collect();
    let vocabulary = terms
        .iter()
        .enumerate()
        .map(|(col, term)| (term.clone(), col))
        .collect();

    let model = TfidfModel {
        settings: settings.clone(),
        vocabulary,
        terms,
        idf,
    };

    let rows = per_document.par_iter().map(|c| model.weigh(c)).collect();
    let matrix = TermWeightMatrix {
        rows,
        n_cols: model.vocabulary_size(),
    };
    Ok((model, matrix))
}

/// Tokenizes, drops stopwords and counts every n-gram in range.
pub fn count_terms(document: &str, ngram_range: (usize, usize)) -> HashMap<String, usize> {
    let lowered = document.to_lowercase();
    let tokens: Vec<&str> = TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !is_stopword(t))
        .collect();

    let (min_n, max_n) = ngram_range;
    let mut counts = HashMap::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}
