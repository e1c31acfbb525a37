//! Pipeline configuration.
//!
//! ## Configuration
//!
//! Environment variables (all optional):
//! - `GALAXY_CLUSTERS`: default K (default: 5)
//! - `GALAXY_SEED`: clustering seed (default: 42)
//! - `GALAXY_KMEANS_RESTARTS`: k-means restarts, best inertia wins (default: 10)
//! - `GALAXY_NEIGHBORS`: layout neighborhood size, clamped to `n - 1` (default: 10)
//! - `GALAXY_MIN_DIST`: minimum separation between layout points (default: 0.3)
//! - `GALAXY_SPREAD`: radius the 3D layout is scaled to (default: 10.0)
//! - `GALAXY_STABLE_CATEGORIES`: carry category indices across runs (default: true)
//! - `GALAXY_CLUSTER_NAMER`: `terms` or `llm` (default: terms)

use std::str::FromStr;

use galaxy_core::defaults;
use tracing::warn;

use crate::clustering::KMeansConfig;
use crate::spatial::LayoutParams;

/// How clusters are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterNamer {
    /// Deterministic distinctive-term labels.
    #[default]
    Terms,
    /// Generation backend titles, falling back to term labels.
    Llm,
}

impl ClusterNamer {
    /// Parse from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terms" | "term" | "tfidf" => Some(Self::Terms),
            "llm" | "ai" => Some(Self::Llm),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClusterNamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terms => write!(f, "terms"),
            Self::Llm => write!(f, "llm"),
        }
    }
}

/// Tunables for one [`GalaxyPipeline`](crate::GalaxyPipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Requested number of clusters before clamping to the note count.
    pub clusters: usize,
    pub seed: u64,
    pub kmeans_restarts: usize,
    pub kmeans_max_iterations: usize,
    pub neighbors: usize,
    pub min_dist: f32,
    pub spread: f32,
    pub epochs: usize,
    /// Match new clusters to the previous run's centroids to keep their index.
    pub stable_categories: bool,
    pub category_match_threshold: f32,
    pub namer: ClusterNamer,
    /// Member notes shown to the generation backend per cluster.
    pub label_sample_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clusters: defaults::CLUSTER_COUNT,
            seed: defaults::SEED,
            kmeans_restarts: defaults::KMEANS_RESTARTS,
            kmeans_max_iterations: defaults::KMEANS_MAX_ITERATIONS,
            neighbors: defaults::LAYOUT_NEIGHBORS,
            min_dist: defaults::LAYOUT_MIN_DIST,
            spread: defaults::LAYOUT_SPREAD,
            epochs: defaults::LAYOUT_EPOCHS,
            stable_categories: true,
            category_match_threshold: defaults::CATEGORY_MATCH_THRESHOLD,
            namer: ClusterNamer::Terms,
            label_sample_size: defaults::LABEL_SAMPLE_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.clusters = parse_or(&lookup, "GALAXY_CLUSTERS", config.clusters).max(1);
        config.seed = parse_or(&lookup, "GALAXY_SEED", config.seed);
        config.kmeans_restarts =
            parse_or(&lookup, "GALAXY_KMEANS_RESTARTS", config.kmeans_restarts).max(1);
        config.neighbors = parse_or(&lookup, "GALAXY_NEIGHBORS", config.neighbors).max(1);

        let min_dist = parse_or(&lookup, "GALAXY_MIN_DIST", config.min_dist);
        if min_dist.is_finite() && min_dist >= 0.0 {
            config.min_dist = min_dist;
        } else {
            warn!(value = min_dist, "Invalid GALAXY_MIN_DIST, using default");
        }

        let spread = parse_or(&lookup, "GALAXY_SPREAD", config.spread);
        if spread.is_finite() && spread > 0.0 {
            config.spread = spread;
        } else {
            warn!(value = spread, "Invalid GALAXY_SPREAD, using default");
        }

        if let Some(val) = lookup("GALAXY_STABLE_CATEGORIES") {
            config.stable_categories = val != "false" && val != "0";
        }

        if let Some(val) = lookup("GALAXY_CLUSTER_NAMER") {
            if let Some(namer) = ClusterNamer::from_str_loose(&val) {
                config.namer = namer;
            } else {
                warn!(value = %val, "Invalid GALAXY_CLUSTER_NAMER, using default");
            }
        }

        config
    }

    pub fn kmeans(&self) -> KMeansConfig {
        KMeansConfig {
            k: self.clusters,
            seed: self.seed,
            restarts: self.kmeans_restarts,
            max_iterations: self.kmeans_max_iterations,
        }
    }

    pub fn layout(&self) -> LayoutParams {
        LayoutParams {
            neighbors: self.neighbors,
            min_dist: self.min_dist,
            spread: self.spread,
            epochs: self.epochs,
        }
    }
}

fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) => match val.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(variable = name, value = %val, "Unparsable value, using default");
                default
            }
        },
        None => default,
    }
}
