mod accounts;
mod content;
mod messages;
mod profiles;
mod reports;
mod settings;
mod verifications;

pub use accounts::{NewAccount, NewProfile};
pub use messages::MessageFlag;
pub use profiles::ProfilePatch;
pub use reports::NewReport;

use anyhow::Result;

/// Outcome of a guarded status change on a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<T, S> {
    /// The row was changed. Carries the before and after images.
    Applied { old: T, new: T },
    /// The row exists but its current status does not allow the change.
    Rejected(S),
    NotFound,
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Case-insensitive substring match used by the admin search boxes.
pub(crate) fn matches_search(needle: &str, haystacks: &[Option<&str>]) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks
        .iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
}
