//! User repository finders.

use super::error::RepoResult;
use super::filter::Filter;
use super::repository::Repository;
use crate::model::{User, UserColumn};
use rusqlite::types::Value;

pub type UserRepository<'c> = Repository<'c, User>;

impl Repository<'_, User> {
    /// Finds the in-scope user with `email`, honoring configured preloads.
    ///
    /// A configured cursor or limit does not apply.
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_first_where(Filter::Eq(
            UserColumn::Email,
            Value::Text(email.trim().to_string()),
        ))
    }
}
