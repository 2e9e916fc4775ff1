//! Contact-specific lookups on top of the generic entity collection.

use crate::model::contact::Contact;
use crate::model::entity::Entity;
use crate::repo::entity_set::EntitySet;
use crate::repo::RepoResult;

impl EntitySet<'_, Contact> {
    /// Finds the contact owning `email`, compared case-insensitively.
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Contact>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE email = ?1 COLLATE NOCASE;",
            Contact::COLUMNS.join(", "),
            Contact::TABLE
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let mut rows = stmt.query([email.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Contact::from_row(row)?));
        }

        Ok(None)
    }
}
