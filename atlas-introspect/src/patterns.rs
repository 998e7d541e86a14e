//! Mining of recurring, order-sensitive middleware chains.
//!
//! Every (resource, operation, chain) triple contributes one usage of its
//! canonical chain key. Chains that clear the frequency and confidence
//! thresholds become [`Pattern`] records with synthesized names and
//! categories. Order matters: authorization before caching and caching
//! before authorization are different chains and never merge.

use crate::schema::{Pattern, PatternCategory, Schema};
use atlas_core::ExtractorConfig;
use std::collections::HashMap;
use tracing::debug;

/// Separator for canonical chain keys. Not a valid middleware name
/// character, so distinct chains cannot collide.
const CHAIN_KEY_SEPARATOR: &str = "|";

/// Discovers recurring middleware chains across a schema's resources.
pub struct PatternExtractor {
    config: ExtractorConfig,
}

struct ChainUsage {
    chain: Vec<String>,
    count: u32,
    examples: Vec<String>,
    /// Operation usage counts in first-seen order
    operations: Vec<(String, u32)>,
}

impl PatternExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Mine the schema for recurring chains and return scored patterns,
    /// sorted by descending frequency (ties broken by canonical key).
    pub fn extract(&self, schema: &Schema) -> Vec<Pattern> {
        let mut usages: HashMap<String, ChainUsage> = HashMap::new();

        for resource in &schema.resources {
            for (operation, chain) in &resource.middleware {
                if chain.is_empty() {
                    continue;
                }
                let key = canonical_chain_key(chain);
                let usage = usages.entry(key).or_insert_with(|| ChainUsage {
                    chain: chain.clone(),
                    count: 0,
                    examples: Vec::new(),
                    operations: Vec::new(),
                });
                usage.count += 1;
                usage.examples.push(format!("{}.{}", resource.name, operation));
                match usage
                    .operations
                    .iter_mut()
                    .find(|(op, _)| op == operation)
                {
                    Some((_, count)) => *count += 1,
                    None => usage.operations.push((operation.clone(), 1)),
                }
            }
        }

        let mut scored: Vec<(String, ChainUsage, f64)> = usages
            .into_iter()
            .filter(|(_, usage)| usage.count >= self.config.min_frequency)
            .filter_map(|(key, usage)| {
                let confidence = (f64::from(usage.count) / 10.0).min(1.0);
                (confidence >= self.config.min_confidence).then_some((key, usage, confidence))
            })
            .collect();

        // descending frequency; the canonical key makes equal-frequency
        // output deterministic
        scored.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));

        let patterns: Vec<Pattern> = scored
            .into_iter()
            .map(|(_, usage, confidence)| {
                let mut examples = usage.examples;
                examples.truncate(self.config.max_examples);
                Pattern {
                    name: self.pattern_name(&usage.chain, &usage.operations),
                    category: infer_category(&usage.chain),
                    template: usage.chain.join(" -> "),
                    examples,
                    frequency: usage.count,
                    confidence,
                }
            })
            .collect();

        debug!(patterns = patterns.len(), "extracted middleware patterns");
        patterns
    }

    fn pattern_name(&self, chain: &[String], operations: &[(String, u32)]) -> String {
        let mut parts: Vec<String> = chain
            .iter()
            .map(|entry| adjective_for(base_name(entry)).to_string())
            .collect();

        if self.config.verbose_names {
            for entry in chain {
                if let Some(params) = call_parameters(entry) {
                    parts.push(normalize_parameters(params));
                }
            }
            if let Some(operation) = dominant_operation(operations) {
                parts.push(operation.to_string());
            }
        }

        parts.push("handler".to_string());
        parts.join("_")
    }
}

/// Order-preserving string encoding of a middleware chain.
pub fn canonical_chain_key(chain: &[String]) -> String {
    chain.join(CHAIN_KEY_SEPARATOR)
}

/// Middleware name with any call parameters stripped.
fn base_name(entry: &str) -> &str {
    entry.split('(').next().unwrap_or(entry).trim()
}

/// The parenthesized parameter text of a middleware entry, if any.
fn call_parameters(entry: &str) -> Option<&str> {
    let start = entry.find('(')?;
    let inner = &entry[start + 1..];
    Some(inner.strip_suffix(')').unwrap_or(inner))
}

fn adjective_for(base: &str) -> &str {
    match base {
        "auth" => "authenticated",
        "cache" => "cached",
        "rate_limit" => "rate_limited",
        "cors" => "cors_enabled",
        "log" => "logged",
        other => other,
    }
}

/// Normalize parameter text into an identifier fragment: `/` reads as
/// "per", every other symbol run collapses to a single underscore.
fn normalize_parameters(params: &str) -> String {
    let mut out = String::new();
    for ch in params.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if ch == '/' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            out.push_str("per_");
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Most frequently used operation, first-seen order breaking ties.
fn dominant_operation(operations: &[(String, u32)]) -> Option<&str> {
    let mut best: Option<(&str, u32)> = None;
    for (operation, count) in operations {
        match best {
            Some((_, best_count)) if *count <= best_count => {}
            _ => best = Some((operation.as_str(), *count)),
        }
    }
    best.map(|(operation, _)| operation)
}

/// Priority-ordered category inference: the highest-priority middleware
/// family present anywhere in the chain wins.
fn infer_category(chain: &[String]) -> PatternCategory {
    let bases: Vec<&str> = chain.iter().map(|entry| base_name(entry)).collect();
    if bases.iter().any(|b| b.starts_with("auth")) {
        PatternCategory::Authentication
    } else if bases.iter().any(|b| b.starts_with("cache")) {
        PatternCategory::Caching
    } else if bases
        .iter()
        .any(|b| b.starts_with("rate_limit") || b.starts_with("throttle"))
    {
        PatternCategory::RateLimiting
    } else if bases.iter().any(|b| b.starts_with("cors")) {
        PatternCategory::Cors
    } else {
        PatternCategory::General
    }
}
