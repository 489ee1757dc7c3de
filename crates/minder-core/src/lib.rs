//! # minder-core
//!
//! Deterministic evaluation model for child-safe LLM response testing.
//!
//! This crate owns the data model (suites, cases, rules, results), the
//! rule-based scoring engine, and score aggregation. It makes no network
//! calls and holds no async state.
//!
//! ## Key Guarantees
//!
//! 1. **Validated at construction**: malformed rules, empty suites, and
//!    duplicate case ids are rejected when a suite is built, never at
//!    evaluation time.
//! 2. **Deterministic**: scoring a response against a rule is a pure
//!    function; the one rule kind needing a provider (`llm_judge`) is
//!    dispatched by the runtime crate.
//! 3. **Complete results**: result types are append-only during assembly
//!    and frozen afterwards; summaries are recomputed, never cached.
//!
//! ## Example
//!
//! ```rust
//! use minder_core::Rule;
//!
//! let rule = Rule::exact_numeric(7.0, 0.0).unwrap();
//! let outcome = rule.evaluate("The answer is 7 apples");
//! assert!(outcome.passed);
//! ```

pub mod aggregate;
pub mod result;
pub mod rules;
pub mod suite;

// Re-export main types at crate root
pub use aggregate::{summarize, ScoreSummary, VerdictBand};
pub use result::{CaseResult, ProviderFailure, ProviderFailureKind, SuiteResult};
pub use rules::{Rule, RuleError, RuleOutcome, NO_NUMERIC_ANSWER};
pub use suite::{Case, Suite, SuiteError};
