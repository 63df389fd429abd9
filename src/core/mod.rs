mod finding;
mod query_name;
mod report;
mod result_set;
mod status;

pub use finding::Finding;
pub use query_name::QueryName;
pub use report::{CategoryRollup, FindingsReport, FindingsSummary};
pub use result_set::{ResultSet, ResultSetCollection, Row};
pub use status::CheckStatus;
