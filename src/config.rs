//! Configuration management for the annotator

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub annotation: AnnotationConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationConfig {
    /// Suggestions scored below this are hidden
    pub min_score: f64,
    /// Classes marking overlays whose text cannot be annotated
    pub popup_classes: Vec<String>,
    /// Characters of context stored with each selector
    pub selector_context: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Resolved terms kept per session
    pub resolved_terms: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            min_score: 0.0,
            popup_classes: vec!["popover".to_string(), "dropdown-menu".to_string()],
            selector_context: 32,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { resolved_terms: 256 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            annotation: AnnotationConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Read overrides from `ANNOTATOR_*` variables; unset or unparseable
    /// values keep their defaults
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            annotation: AnnotationConfig {
                min_score: env::var("ANNOTATOR_MIN_SCORE")
                    .ok()
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.annotation.min_score),
                popup_classes: env::var("ANNOTATOR_POPUP_CLASSES")
                    .map(|v| parse_list(&v))
                    .unwrap_or(defaults.annotation.popup_classes),
                selector_context: env::var("ANNOTATOR_SELECTOR_CONTEXT")
                    .ok()
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.annotation.selector_context),
            },
            cache: CacheConfig {
                resolved_terms: env::var("ANNOTATOR_TERM_CACHE_SIZE")
                    .ok()
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.cache.resolved_terms),
            },
        }
    }
}

/// Comma or whitespace separated list
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
