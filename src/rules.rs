// 🏷️ Ledger Tagging Rules - Rules as Data
// Ordered pattern rules that put each general-ledger account into an overhead bucket

use crate::entities::{LedgerBucket, MatchedBy};
use crate::error::{AnalysisError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggingRule {
    pub match_type: MatchType,

    /// Account-name pattern; all matching is case-insensitive
    pub pattern: String,

    pub bucket: LedgerBucket,
}

impl TaggingRule {
    pub fn contains(pattern: &str, bucket: LedgerBucket) -> Self {
        TaggingRule {
            match_type: MatchType::Contains,
            pattern: pattern.to_string(),
            bucket,
        }
    }

    pub fn exact(pattern: &str, bucket: LedgerBucket) -> Self {
        TaggingRule {
            match_type: MatchType::Exact,
            pattern: pattern.to_string(),
            bucket,
        }
    }

    pub fn regex(pattern: &str, bucket: LedgerBucket) -> Self {
        TaggingRule {
            match_type: MatchType::Regex,
            pattern: pattern.to_string(),
            bucket,
        }
    }
}

/// Default rule table shipped with the engine
pub fn default_tagging_rules() -> Vec<TaggingRule> {
    let mut rules = Vec::new();

    for pattern in [
        "Starset",
        "AWS",
        "Azure",
        "Cloud",
        "Data Center",
        "Software License",
        "Technology",
        "IT Infrastructure",
    ] {
        rules.push(TaggingRule::contains(pattern, LedgerBucket::Data));
    }

    for pattern in [
        "Well-being",
        "Wellbeing",
        "Wellness",
        "ICHRA",
        "Health Insurance",
        "Employee Benefits",
    ] {
        rules.push(TaggingRule::contains(pattern, LedgerBucket::Workplace));
    }

    for pattern in ["Depreciation", "Amortization", "Interest Expense", "Income Tax"] {
        rules.push(TaggingRule::contains(pattern, LedgerBucket::Nil));
    }

    rules
}

// ============================================================================
// TAG RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagResult {
    pub bucket: LedgerBucket,
    pub matched_by: MatchedBy,
}

impl Default for TagResult {
    fn default() -> Self {
        TagResult {
            bucket: LedgerBucket::Sga,
            matched_by: MatchedBy::Default,
        }
    }
}

// ============================================================================
// TAGGING ENGINE
// ============================================================================

enum CompiledMatcher {
    Exact(String),
    Contains(String),
    Regex(Regex),
}

impl CompiledMatcher {
    fn matches(&self, name_lower: &str, name: &str) -> bool {
        match self {
            CompiledMatcher::Exact(p) => name_lower == p,
            CompiledMatcher::Contains(p) => name_lower.contains(p.as_str()),
            CompiledMatcher::Regex(re) => re.is_match(name),
        }
    }

    fn matched_by(&self) -> MatchedBy {
        match self {
            CompiledMatcher::Exact(_) => MatchedBy::Exact,
            CompiledMatcher::Contains(_) => MatchedBy::Contains,
            CompiledMatcher::Regex(_) => MatchedBy::Regex,
        }
    }
}

pub struct TaggingEngine {
    rules: Vec<(CompiledMatcher, LedgerBucket)>,
}

impl TaggingEngine {
    /// Compile rules in order; an invalid regex is a configuration error
    pub fn from_rules(rules: &[TaggingRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let matcher = match rule.match_type {
                MatchType::Exact => CompiledMatcher::Exact(rule.pattern.trim().to_lowercase()),
                MatchType::Contains => CompiledMatcher::Contains(rule.pattern.to_lowercase()),
                MatchType::Regex => CompiledMatcher::Regex(
                    RegexBuilder::new(&rule.pattern)
                        .case_insensitive(true)
                        .build()?,
                ),
            };
            compiled.push((matcher, rule.bucket));
        }

        Ok(TaggingEngine { rules: compiled })
    }

    /// Load rules from a JSON array file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let rules: Vec<TaggingRule> = serde_json::from_str(&content).map_err(|e| {
            AnalysisError::Config(format!(
                "failed to parse tagging rules {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        TaggingEngine::from_rules(&rules)
    }

    /// First matching rule wins; no match means SGA
    pub fn tag(&self, account_name: &str) -> TagResult {
        let name = account_name.trim();
        let name_lower = name.to_lowercase();

        for (matcher, bucket) in &self.rules {
            if matcher.matches(&name_lower, name) {
                return TagResult {
                    bucket: *bucket,
                    matched_by: matcher.matched_by(),
                };
            }
        }

        TagResult::default()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for TaggingEngine {
    fn default() -> Self {
        TaggingEngine {
            rules: Vec::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
