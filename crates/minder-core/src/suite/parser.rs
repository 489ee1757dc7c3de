//! Suite parsing from YAML.
//!
//! Loading happens in three stages: the document is parsed into a JSON
//! value and checked against the embedded schema, deserialized into the
//! document form below, then converted into the validated [`Suite`] model
//! (rule constructors run here). Anything malformed surfaces as a
//! [`SuiteError`] before a single provider call is made.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::rules::{Rule, RuleError};

use super::schema::validate_suite_schema;

/// Errors that can occur when loading or constructing suites.
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("failed to read suite file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to deserialize suite: {0}")]
    Json(#[from] serde_json::Error),

    #[error("suite document does not match schema: {0}")]
    Schema(String),

    #[error("suite '{0}' defines no cases")]
    EmptySuite(String),

    #[error("case '{0}' defines no rules")]
    EmptyRuleSet(String),

    #[error("duplicate case id '{0}'")]
    DuplicateCaseId(String),

    #[error("case '{case_id}': {source}")]
    InvalidRule {
        case_id: String,
        #[source]
        source: RuleError,
    },
}

/// One prompt and the rules its response must satisfy.
#[derive(Debug, Clone)]
pub struct Case {
    /// Unique within the owning suite.
    pub id: String,

    pub prompt: String,

    /// Reporting category (e.g. "math", "reading", "safety").
    pub category: String,

    /// Optional skill tag carried through to reports.
    pub skill: Option<String>,

    /// Optional difficulty tag carried through to reports.
    pub difficulty: Option<String>,

    /// Ordered, non-empty rule set. Order is reporting order; the case
    /// verdict is the AND over all rules regardless of order.
    pub rules: Vec<Rule>,
}

impl Case {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        category: impl Into<String>,
        rules: Vec<Rule>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            category: category.into(),
            skill: None,
            difficulty: None,
            rules,
        }
    }
}

/// A named, ordered collection of cases sharing an age band.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub age_band: String,
    pub cases: Vec<Case>,
}

impl Suite {
    /// Construct a suite, enforcing the construction-time invariants:
    /// at least one case, at least one rule per case, unique case ids.
    pub fn new(
        name: impl Into<String>,
        age_band: impl Into<String>,
        cases: Vec<Case>,
    ) -> Result<Self, SuiteError> {
        let name = name.into();
        if cases.is_empty() {
            return Err(SuiteError::EmptySuite(name));
        }

        let mut seen = HashSet::new();
        for case in &cases {
            if case.rules.is_empty() {
                return Err(SuiteError::EmptyRuleSet(case.id.clone()));
            }
            if !seen.insert(case.id.as_str()) {
                return Err(SuiteError::DuplicateCaseId(case.id.clone()));
            }
        }

        Ok(Self {
            name,
            age_band: age_band.into(),
            cases,
        })
    }

    /// Parse a suite from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SuiteError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        validate_suite_schema(&value).map_err(|errors| SuiteError::Schema(errors.join("; ")))?;

        let doc: SuiteDoc = serde_json::from_value(value)?;
        let suite = doc.into_suite()?;
        tracing::debug!(
            suite = %suite.name,
            cases = suite.cases.len(),
            "suite validated"
        );
        Ok(suite)
    }

    /// Parse a suite from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

/// Document form, deserialized after schema validation.
#[derive(Debug, Deserialize)]
struct SuiteDoc {
    name: String,
    age_band: String,
    cases: Vec<CaseDoc>,
}

#[derive(Debug, Deserialize)]
struct CaseDoc {
    id: String,
    prompt: String,
    category: String,
    #[serde(default)]
    skill: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    rules: Vec<RuleDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RuleDoc {
    Contains {
        substring: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    NotContains {
        substring: String,
    },
    RegexMatch {
        pattern: String,
    },
    ExactNumeric {
        expected: f64,
        #[serde(default)]
        tolerance: f64,
    },
    LengthBounds {
        #[serde(default)]
        min_words: usize,
        max_words: usize,
    },
    ForbiddenTerms {
        terms: Vec<String>,
    },
    LlmJudge {
        rubric: String,
        #[serde(default = "default_passing_threshold")]
        passing_threshold: f64,
    },
}

fn default_passing_threshold() -> f64 {
    0.5
}

impl SuiteDoc {
    fn into_suite(self) -> Result<Suite, SuiteError> {
        let mut cases = Vec::with_capacity(self.cases.len());
        for case_doc in self.cases {
            let case_id = case_doc.id.clone();
            let mut rules = Vec::with_capacity(case_doc.rules.len());
            for rule_doc in case_doc.rules {
                let rule = rule_doc.into_rule().map_err(|source| SuiteError::InvalidRule {
                    case_id: case_id.clone(),
                    source,
                })?;
                rules.push(rule);
            }
            cases.push(Case {
                id: case_doc.id,
                prompt: case_doc.prompt,
                category: case_doc.category,
                skill: case_doc.skill,
                difficulty: case_doc.difficulty,
                rules,
            });
        }
        Suite::new(self.name, self.age_band, cases)
    }
}

impl RuleDoc {
    fn into_rule(self) -> Result<Rule, RuleError> {
        match self {
            RuleDoc::Contains {
                substring,
                case_sensitive,
            } => Rule::contains(substring, case_sensitive),
            RuleDoc::NotContains { substring } => Rule::not_contains(substring),
            RuleDoc::RegexMatch { pattern } => Rule::regex_match(&pattern),
            RuleDoc::ExactNumeric {
                expected,
                tolerance,
            } => Rule::exact_numeric(expected, tolerance),
            RuleDoc::LengthBounds {
                min_words,
                max_words,
            } => Rule::length_bounds(min_words, max_words),
            RuleDoc::ForbiddenTerms { terms } => Rule::forbidden_terms(terms),
            RuleDoc::LlmJudge {
                rubric,
                passing_threshold,
            } => Rule::llm_judge(rubric, passing_threshold),
        }
    }
}
