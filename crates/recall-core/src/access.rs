//! Ownership checks shared by every user-owned resource.

use crate::{Error, Flashcard, Note};

/// A record that belongs to exactly one user.
pub trait Owned {
    /// Name used in error messages, e.g. "note".
    const KIND: &'static str;

    fn owner(&self) -> &str;
}

impl Owned for Note {
    const KIND: &'static str = "note";

    fn owner(&self) -> &str {
        &self.user_id
    }
}

impl Owned for Flashcard {
    const KIND: &'static str = "flashcard";

    fn owner(&self) -> &str {
        &self.user_id
    }
}

/// Hand back a fetched record only if `caller` owns it.
///
/// `resource` is the result of a lookup by `id`: a missing record is
/// `NotFound`, somebody else's record is `Forbidden`.
pub fn authorize<R: Owned>(resource: Option<R>, caller: &str, id: i64) -> Result<R, Error> {
    match resource {
        None => Err(Error::NotFound(format!("{} {}", R::KIND, id))),
        Some(r) if r.owner() != caller => Err(Error::Forbidden(format!(
            "{} {} belongs to another user",
            R::KIND,
            id
        ))),
        Some(r) => Ok(r),
    }
}
