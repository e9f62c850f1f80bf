/// Database access layer
///
/// Repository structs over the shared Postgres pool. Enum-bearing issue rows
/// are decoded by hand; plain suggestion rows derive `FromRow`.
pub mod issue_repo;
pub mod suggestion_repo;

pub use issue_repo::{IssueRepository, NewIssue};
pub use suggestion_repo::SuggestionRepository;
