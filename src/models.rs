mod attribute;
mod credential;
mod entry;
mod ids;
mod query;
mod result;

pub use attribute::LinkAttribute;
pub use credential::Credential;
pub use entry::Entry;
pub use ids::EntryId;
pub use query::StructuredQuery;
pub use result::{FieldValue, ResultRow, ResultSet};
