//! Declarative scoring rules.
//!
//! A rule is a pass/fail predicate over a single response text. Rule
//! parameters are validated by the constructors, so evaluation itself can
//! never fail on malformed configuration: an uncompilable regex or inverted
//! length bounds is rejected before any provider call is made.
//!
//! The one exception to pure offline evaluation is [`Rule::LlmJudge`], which
//! needs a judge provider. The deterministic engine conservatively fails it;
//! the runtime intercepts judge rules and delegates them to a provider.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    /// First number-like token: optional sign, maximal digit run, optional
    /// decimal part.
    static ref NUMERIC_TOKEN: Regex = Regex::new(r"[+-]?\d+(?:\.\d+)?").unwrap();
}

/// Detail text when an `exact_numeric` rule finds no number in the response.
pub const NO_NUMERIC_ANSWER: &str = "no numeric answer found";

/// Errors from rule construction.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("length bounds are inverted: min {min} > max {max}")]
    InvalidLengthBounds { min: usize, max: usize },

    #[error("numeric tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),

    #[error("expected numeric value must be finite, got {0}")]
    NonFiniteExpected(f64),

    #[error("substring to match must not be empty")]
    EmptyNeedle,

    #[error("forbidden term list must not be empty")]
    EmptyTermList,

    #[error("forbidden terms must not be empty strings")]
    EmptyTerm,

    #[error("judge rubric must not be empty")]
    EmptyRubric,

    #[error("judge passing threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),
}

/// A single declarative pass/fail predicate over response text.
///
/// Construct rules through the validating constructors ([`Rule::contains`],
/// [`Rule::regex_match`], ...); they are the only supported way to obtain a
/// well-formed rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Response must contain the substring. Case-insensitive unless
    /// `case_sensitive` is set.
    Contains { needle: String, case_sensitive: bool },

    /// Response must not contain the substring (case-insensitive).
    NotContains { needle: String },

    /// Response must match the pattern. The regex is compiled at
    /// construction, never at evaluation.
    RegexMatch { regex: Regex },

    /// The first number-like token in the response must be within
    /// `tolerance` of `expected`.
    ExactNumeric { expected: f64, tolerance: f64 },

    /// Whitespace-separated word count must be within `min_words..=max_words`.
    LengthBounds { min_words: usize, max_words: usize },

    /// Response must contain none of the terms (case-insensitive).
    ForbiddenTerms { terms: Vec<String> },

    /// Delegate to a judge provider with a free-form rubric. The threshold
    /// is carried in the suite format for forward compatibility; scoring is
    /// the binary parse of the judge's reply.
    LlmJudge {
        rubric: String,
        passing_threshold: f64,
    },
}

impl Rule {
    /// Substring presence check, case-insensitive by default.
    pub fn contains(needle: impl Into<String>, case_sensitive: bool) -> Result<Self, RuleError> {
        let needle = needle.into();
        if needle.is_empty() {
            return Err(RuleError::EmptyNeedle);
        }
        Ok(Rule::Contains {
            needle,
            case_sensitive,
        })
    }

    /// Substring absence check, always case-insensitive.
    pub fn not_contains(needle: impl Into<String>) -> Result<Self, RuleError> {
        let needle = needle.into();
        if needle.is_empty() {
            return Err(RuleError::EmptyNeedle);
        }
        Ok(Rule::NotContains { needle })
    }

    /// Regex match; the pattern must compile.
    pub fn regex_match(pattern: &str) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })?;
        Ok(Rule::RegexMatch { regex })
    }

    /// Numeric answer check against `expected` with an absolute `tolerance`.
    pub fn exact_numeric(expected: f64, tolerance: f64) -> Result<Self, RuleError> {
        if !expected.is_finite() {
            return Err(RuleError::NonFiniteExpected(expected));
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(RuleError::InvalidTolerance(tolerance));
        }
        Ok(Rule::ExactNumeric {
            expected,
            tolerance,
        })
    }

    /// Word-count bounds; `min_words` must not exceed `max_words`.
    pub fn length_bounds(min_words: usize, max_words: usize) -> Result<Self, RuleError> {
        if min_words > max_words {
            return Err(RuleError::InvalidLengthBounds {
                min: min_words,
                max: max_words,
            });
        }
        Ok(Rule::LengthBounds {
            min_words,
            max_words,
        })
    }

    /// Forbidden-term scan over a non-empty set of non-empty terms.
    pub fn forbidden_terms(terms: Vec<String>) -> Result<Self, RuleError> {
        if terms.is_empty() {
            return Err(RuleError::EmptyTermList);
        }
        if terms.iter().any(|t| t.trim().is_empty()) {
            return Err(RuleError::EmptyTerm);
        }
        Ok(Rule::ForbiddenTerms { terms })
    }

    /// Free-form judge rule with a rubric and a threshold in `0.0..=1.0`.
    pub fn llm_judge(
        rubric: impl Into<String>,
        passing_threshold: f64,
    ) -> Result<Self, RuleError> {
        let rubric = rubric.into();
        if rubric.trim().is_empty() {
            return Err(RuleError::EmptyRubric);
        }
        if !(0.0..=1.0).contains(&passing_threshold) || passing_threshold.is_nan() {
            return Err(RuleError::InvalidThreshold(passing_threshold));
        }
        Ok(Rule::LlmJudge {
            rubric,
            passing_threshold,
        })
    }

    /// Short human-readable description used in reports.
    pub fn description(&self) -> String {
        match self {
            Rule::Contains {
                needle,
                case_sensitive,
            } => {
                if *case_sensitive {
                    format!("contains \"{needle}\" (case-sensitive)")
                } else {
                    format!("contains \"{needle}\"")
                }
            }
            Rule::NotContains { needle } => format!("does not contain \"{needle}\""),
            Rule::RegexMatch { regex } => format!("matches /{}/", regex.as_str()),
            Rule::ExactNumeric {
                expected,
                tolerance,
            } => format!("numeric answer {expected} (tolerance {tolerance})"),
            Rule::LengthBounds {
                min_words,
                max_words,
            } => format!("length {min_words}..={max_words} words"),
            Rule::ForbiddenTerms { terms } => {
                format!("avoids forbidden terms [{}]", terms.join(", "))
            }
            Rule::LlmJudge { rubric, .. } => {
                let mut short: String = rubric.chars().take(60).collect();
                if short.len() < rubric.len() {
                    short.push('…');
                }
                format!("judge: {short}")
            }
        }
    }

    /// Whether scoring this rule needs a judge provider.
    pub fn requires_judge(&self) -> bool {
        matches!(self, Rule::LlmJudge { .. })
    }

    /// Score a response text against this rule.
    ///
    /// Deterministic kinds never fail or panic. [`Rule::LlmJudge`] cannot be
    /// scored offline and conservatively fails here; callers with a judge
    /// provider should dispatch it before reaching this method.
    pub fn evaluate(&self, response: &str) -> RuleOutcome {
        let rule = self.description();
        match self {
            Rule::Contains {
                needle,
                case_sensitive,
            } => {
                let found = if *case_sensitive {
                    response.contains(needle.as_str())
                } else {
                    response.to_lowercase().contains(&needle.to_lowercase())
                };
                if found {
                    RuleOutcome::pass(rule, format!("found \"{needle}\""))
                } else {
                    RuleOutcome::fail(rule, format!("\"{needle}\" not found in response"))
                }
            }
            Rule::NotContains { needle } => {
                if response.to_lowercase().contains(&needle.to_lowercase()) {
                    RuleOutcome::fail(rule, format!("response contains \"{needle}\""))
                } else {
                    RuleOutcome::pass(rule, format!("\"{needle}\" absent as required"))
                }
            }
            Rule::RegexMatch { regex } => {
                if regex.is_match(response) {
                    RuleOutcome::pass(rule, format!("matched /{}/", regex.as_str()))
                } else {
                    RuleOutcome::fail(rule, format!("no match for /{}/", regex.as_str()))
                }
            }
            Rule::ExactNumeric {
                expected,
                tolerance,
            } => match extract_numeric(response) {
                None => RuleOutcome::fail(rule, NO_NUMERIC_ANSWER.to_string()),
                Some(value) => {
                    if (value - expected).abs() <= *tolerance {
                        RuleOutcome::pass(
                            rule,
                            format!("extracted {value}, within tolerance {tolerance} of {expected}"),
                        )
                    } else {
                        RuleOutcome::fail(
                            rule,
                            format!(
                                "extracted {value}, outside tolerance {tolerance} of {expected}"
                            ),
                        )
                    }
                }
            },
            Rule::LengthBounds {
                min_words,
                max_words,
            } => {
                let words = response.split_whitespace().count();
                if (*min_words..=*max_words).contains(&words) {
                    RuleOutcome::pass(rule, format!("{words} words"))
                } else {
                    RuleOutcome::fail(
                        rule,
                        format!("{words} words, expected {min_words}..={max_words}"),
                    )
                }
            }
            Rule::ForbiddenTerms { terms } => {
                let lowered = response.to_lowercase();
                let found: Vec<&str> = terms
                    .iter()
                    .filter(|term| lowered.contains(&term.to_lowercase()))
                    .map(String::as_str)
                    .collect();
                if found.is_empty() {
                    RuleOutcome::pass(rule, "no forbidden terms present".to_string())
                } else {
                    RuleOutcome::fail(rule, format!("found forbidden terms: {}", found.join(", ")))
                }
            }
            Rule::LlmJudge { .. } => RuleOutcome::fail(
                rule,
                "llm judge rule requires a judge provider".to_string(),
            ),
        }
    }
}

/// Outcome of scoring one rule against one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Description of the rule that was applied.
    pub rule: String,

    /// Whether the response satisfied the rule.
    pub passed: bool,

    /// Explanation of the verdict.
    pub detail: String,
}

impl RuleOutcome {
    pub fn pass(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Extract the first number-like token from a response.
fn extract_numeric(response: &str) -> Option<f64> {
    NUMERIC_TOKEN
        .find(response)
        .and_then(|token| token.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn contains_is_case_insensitive_by_default() {
        let rule = Rule::contains("hello", false).unwrap();
        assert!(rule.evaluate("Hello there").passed);
        assert!(!rule.evaluate("goodbye").passed);
    }

    #[test]
    fn contains_case_sensitive_mode() {
        let rule = Rule::contains("Hello", true).unwrap();
        assert!(rule.evaluate("Hello there").passed);
        assert!(!rule.evaluate("hello there").passed);
    }

    #[test]
    fn not_contains_rejects_match() {
        let rule = Rule::not_contains("weapon").unwrap();
        assert!(rule.evaluate("a friendly story").passed);
        assert!(!rule.evaluate("The knight drew a WEAPON").passed);
    }

    #[test]
    fn exact_numeric_extracts_first_token() {
        let rule = Rule::exact_numeric(7.0, 0.0).unwrap();
        let outcome = rule.evaluate("The answer is 7 apples");
        assert!(outcome.passed);

        let rule = Rule::exact_numeric(3.0, 0.0).unwrap();
        assert!(rule.evaluate("I have 3 apples and 5 oranges").passed);
    }

    #[test]
    fn exact_numeric_no_token_fails_with_fixed_detail() {
        let rule = Rule::exact_numeric(7.0, 0.0).unwrap();
        let outcome = rule.evaluate("no numeric content");
        assert!(!outcome.passed);
        assert_eq!(outcome.detail, NO_NUMERIC_ANSWER);
    }

    #[test]
    fn exact_numeric_tolerance_and_signs() {
        let rule = Rule::exact_numeric(5.0, 0.5).unwrap();
        assert!(rule.evaluate("4.8").passed);
        assert!(rule.evaluate("5.2").passed);
        assert!(!rule.evaluate("3").passed);

        let rule = Rule::exact_numeric(-3.0, 1.0).unwrap();
        assert!(rule.evaluate("-2.5 degrees").passed);
    }

    #[test]
    fn length_bounds_counts_words() {
        let rule = Rule::length_bounds(2, 4).unwrap();
        assert!(rule.evaluate("three little words").passed);
        assert!(!rule.evaluate("one").passed);
        assert!(!rule.evaluate("far too many words in this one").passed);
    }

    #[test]
    fn forbidden_terms_lists_findings() {
        let rule =
            Rule::forbidden_terms(vec!["violence".to_string(), "weapon".to_string()]).unwrap();
        assert!(rule.evaluate("The cat sat on the mat").passed);

        let outcome = rule.evaluate("There was Violence in the story");
        assert!(!outcome.passed);
        assert!(outcome.detail.contains("violence"));
    }

    #[test]
    fn regex_must_compile_at_construction() {
        assert!(Rule::regex_match(r"\d+ stars").is_ok());
        assert!(matches!(
            Rule::regex_match("(unclosed"),
            Err(RuleError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn inverted_length_bounds_rejected() {
        assert!(matches!(
            Rule::length_bounds(10, 2),
            Err(RuleError::InvalidLengthBounds { min: 10, max: 2 })
        ));
    }

    #[test]
    fn negative_tolerance_rejected() {
        assert!(matches!(
            Rule::exact_numeric(5.0, -0.1),
            Err(RuleError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn judge_threshold_validated() {
        assert!(Rule::llm_judge("age-appropriate tone", 0.5).is_ok());
        assert!(matches!(
            Rule::llm_judge("age-appropriate tone", 1.5),
            Err(RuleError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Rule::llm_judge("   ", 0.5),
            Err(RuleError::EmptyRubric)
        ));
    }

    #[test]
    fn judge_rule_fails_offline() {
        let rule = Rule::llm_judge("kind and encouraging", 0.5).unwrap();
        let outcome = rule.evaluate("any response");
        assert!(!outcome.passed);
        assert!(outcome.detail.contains("judge provider"));
    }

    proptest! {
        #[test]
        fn evaluation_never_panics(response in ".*") {
            let rules = [
                Rule::contains("hello", false).unwrap(),
                Rule::not_contains("weapon").unwrap(),
                Rule::regex_match(r"\d+").unwrap(),
                Rule::exact_numeric(7.0, 0.5).unwrap(),
                Rule::length_bounds(0, 50).unwrap(),
                Rule::forbidden_terms(vec!["drugs".to_string()]).unwrap(),
            ];
            for rule in &rules {
                let _ = rule.evaluate(&response);
            }
        }

        #[test]
        fn numeric_extraction_round_trips(value in -1_000_000.0..1_000_000.0f64) {
            let rule = Rule::exact_numeric(value, 1e-6).unwrap();
            let outcome = rule.evaluate(&format!("the answer is {value} exactly"));
            prop_assert!(outcome.passed, "detail: {}", outcome.detail);
        }

        #[test]
        fn length_bounds_agrees_with_word_count(
            words in prop::collection::vec("[a-z]{1,8}", 0..20),
            min in 0usize..10,
            span in 0usize..10,
        ) {
            let rule = Rule::length_bounds(min, min + span).unwrap();
            let response = words.join(" ");
            let expected = (min..=min + span).contains(&words.len());
            prop_assert_eq!(rule.evaluate(&response).passed, expected);
        }
    }
}
