//! Suite definitions: loading, schema validation, and construction-time
//! invariants.

mod parser;
mod schema;

pub use parser::{Case, Suite, SuiteError};
pub use schema::validate_suite_schema;
