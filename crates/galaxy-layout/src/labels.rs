//! Cluster naming.
//!
//! Labels are re-derived from cluster membership on every run; the numeric
//! category index carries no meaning across runs, the label text does.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

use galaxy_core::{defaults, ClusterNames, Error, GenerationBackend, Note, Result};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("token pattern is a valid regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "has", "have", "him", "his", "how", "its", "may", "new",
        "now", "old", "see", "two", "way", "who", "did", "get", "got", "let", "say", "she",
        "too", "use", "with", "this", "that", "from", "they", "will", "would", "there",
        "their", "what", "about", "which", "when", "your", "them", "then", "than", "been",
        "were", "into", "just", "like", "some", "more", "very", "also", "only", "over",
        "such", "here", "where", "while", "these", "those", "because", "being", "does",
        "doing", "should", "could", "after", "before", "again", "each", "other", "most",
        "much", "many", "same", "why", "off", "own", "yet",
    ]
    .into_iter()
    .collect()
});

/// Fallback label for a category without usable terms.
pub fn fallback_label(category: usize) -> String {
    format!("Category {category}")
}

/// Distinct salient terms of `text`: lowercase alphanumeric words of at least
/// three characters, excluding stopwords and pure numbers.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() >= 3)
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn check_lengths(notes: &[Note], categories: &[usize]) -> Result<()> {
    if notes.len() != categories.len() {
        return Err(Error::InvalidInput(format!(
            "{} notes but {} category assignments",
            notes.len(),
            categories.len()
        )));
    }
    Ok(())
}

/// Member positions per category, in ascending category order.
fn members_by_category(categories: &[usize]) -> BTreeMap<usize, Vec<usize>> {
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (pos, &c) in categories.iter().enumerate() {
        members.entry(c).or_default().push(pos);
    }
    members
}

/// Names every category present in an assignment.
#[async_trait]
pub trait ClusterLabeler: Send + Sync {
    /// One label per distinct category in `categories` (parallel to `notes`).
    async fn label_clusters(&self, notes: &[Note], categories: &[usize]) -> Result<ClusterNames>;

    fn name(&self) -> &str;
}

/// Deterministic labels from distinctive member terms.
///
/// A term scores `(df_in_cluster / cluster_size) * (df_in_cluster / df_overall)`,
/// so terms shared by most members but rare elsewhere win. The top terms
/// (ties alphabetical) are title-cased and joined with a space.
#[derive(Debug, Clone)]
pub struct TermLabeler {
    terms_per_label: usize,
}

impl Default for TermLabeler {
    fn default() -> Self {
        Self { terms_per_label: 2 }
    }
}

impl TermLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous labeling; see the type docs for scoring.
    pub fn label(&self, notes: &[Note], categories: &[usize]) -> Result<ClusterNames> {
        check_lengths(notes, categories)?;

        let docs: Vec<BTreeSet<String>> = notes.iter().map(|n| tokenize(&n.text)).collect();
        let mut overall: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            for term in doc {
                *overall.entry(term.as_str()).or_default() += 1;
            }
        }

        let mut names = ClusterNames::new();
        for (category, members) in members_by_category(categories) {
            let mut local: BTreeMap<&str, usize> = BTreeMap::new();
            for &pos in &members {
                for term in &docs[pos] {
                    *local.entry(term.as_str()).or_default() += 1;
                }
            }

            let size = members.len() as f64;
            let mut scored: Vec<(f64, &str)> = local
                .into_iter()
                .map(|(term, df)| {
                    let total = overall.get(term).copied().unwrap_or(df).max(1) as f64;
                    let df = df as f64;
                    ((df / size) * (df / total), term)
                })
                .collect();
            scored.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.1.cmp(b.1))
            });

            let label = scored
                .iter()
                .take(self.terms_per_label)
                .map(|(_, term)| title_case(term))
                .collect::<Vec<_>>()
                .join(" ");
            names.insert(
                category,
                if label.is_empty() {
                    fallback_label(category)
                } else {
                    label
                },
            );
        }
        Ok(names)
    }
}

#[async_trait]
impl ClusterLabeler for TermLabeler {
    async fn label_clusters(&self, notes: &[Note], categories: &[usize]) -> Result<ClusterNames> {
        self.label(notes, categories)
    }

    fn name(&self) -> &str {
        "terms"
    }
}

/// Two-word titles from a generation backend, one request per cluster.
///
/// Any failed or empty generation falls back to the term label.
pub struct LlmLabeler {
    generator: Arc<dyn GenerationBackend>,
    fallback: TermLabeler,
    sample_size: usize,
}

impl LlmLabeler {
    pub fn new(generator: Arc<dyn GenerationBackend>) -> Self {
        Self {
            generator,
            fallback: TermLabeler::new(),
            sample_size: defaults::LABEL_SAMPLE_SIZE,
        }
    }

    /// Number of member notes included in each prompt.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    fn prompt(samples: &[&str]) -> String {
        let list = samples
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Generate a 2-word topic title for these notes:\n{list}\n\nReturn ONLY the 2-word title."
        )
    }

    /// First line of the answer, cut to at most two words.
    fn clean_title(raw: &str) -> Option<String> {
        let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
        let words: Vec<&str> = line
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '.' | ':')))
            .filter(|w| !w.is_empty())
            .take(2)
            .collect();
        if words.is_empty() {
            None
        } else {
            Some(words.join(" "))
        }
    }
}

#[async_trait]
impl ClusterLabeler for LlmLabeler {
    #[instrument(skip_all, fields(subsystem = "layout", component = "labels", op = "llm_label", note_count = notes.len()))]
    async fn label_clusters(&self, notes: &[Note], categories: &[usize]) -> Result<ClusterNames> {
        let mut names = self.fallback.label(notes, categories)?;

        for (category, members) in members_by_category(categories) {
            let samples: Vec<&str> = members
                .iter()
                .take(self.sample_size)
                .map(|&pos| notes[pos].text.as_str())
                .collect();

            match self.generator.generate(&Self::prompt(&samples)).await {
                Ok(raw) => match Self::clean_title(&raw) {
                    Some(title) => {
                        debug!(category, title = %title, "Cluster titled");
                        names.insert(category, title);
                    }
                    None => warn!(category, "Empty cluster title, keeping term label"),
                },
                Err(e) => {
                    warn!(category, error = %e, "Cluster title generation failed, keeping term label");
                }
            }
        }
        Ok(names)
    }

    fn name(&self) -> &str {
        "llm"
    }
}
