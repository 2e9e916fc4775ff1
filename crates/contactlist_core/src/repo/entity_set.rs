//! Generic SQLite-backed collection for one entity type.

use crate::model::entity::{Entity, EntityId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::marker::PhantomData;

/// Queryable collection of `E` rows, borrowed from a store handle.
pub struct EntitySet<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> EntitySet<'conn, E> {
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    pub(crate) fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Gets one entity by id.
    pub fn find(&self, id: EntityId) -> RepoResult<Option<E>> {
        let sql = format!("{} WHERE id = ?1;", select_sql::<E>());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }

        Ok(None)
    }

    /// Lists every entity, ordered by id for stable output.
    pub fn all(&self) -> RepoResult<Vec<E>> {
        let sql = format!("{} ORDER BY id ASC;", select_sql::<E>());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }

        Ok(entities)
    }

    /// Returns the live row count.
    pub fn count(&self) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", E::TABLE),
            [],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|_| {
            RepoError::InvalidData(format!("negative row count {count} in {}", E::TABLE))
        })
    }

    /// Inserts a new entity and returns its id.
    pub fn add(&self, entity: &E) -> RepoResult<EntityId> {
        entity.validate()?;

        let placeholders = (1..=E::COLUMNS.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        );
        self.conn.execute(&sql, params_from_iter(entity.to_values()))?;

        Ok(entity.id())
    }

    /// Replaces every non-key column of an existing entity.
    pub fn update(&self, entity: &E) -> RepoResult<()> {
        entity.validate()?;

        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, column)| format!("{column} = ?{}", idx + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?1;",
            E::TABLE,
            E::COLUMNS[0]
        );
        let changed = self
            .conn
            .execute(&sql, params_from_iter(entity.to_values()))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: E::NAME,
                id: entity.id(),
            });
        }

        Ok(())
    }

    /// Deletes one entity by id.
    pub fn remove(&self, id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", E::TABLE),
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { entity: E::NAME, id });
        }

        Ok(())
    }

    /// Returns whether an entity with `id` exists.
    pub fn contains(&self, id: EntityId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1;", E::TABLE),
                [id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn select_sql<E: Entity>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

#[cfg(test)]
mod tests {
    use crate::db::open_db_in_memory;
    use crate::model::contact::Contact;
    use crate::repo::entity_set::EntitySet;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn add_find_update_remove() {
        let conn = open_db_in_memory().unwrap();
        let contacts = EntitySet::<Contact>::new(&conn);

        let mut contact = Contact::new("Abe", "abe@example.com", None);
        let id = contacts.add(&contact).unwrap();
        assert_eq!(contacts.find(id).unwrap(), Some(contact.clone()));
        assert!(contacts.contains(id).unwrap());

        contact.phone_number = Some("555-123-0003".to_string());
        contacts.update(&contact).unwrap();
        assert_eq!(
            contacts.find(id).unwrap().unwrap().phone_number.as_deref(),
            Some("555-123-0003")
        );

        contacts.remove(id).unwrap();
        assert_eq!(contacts.find(id).unwrap(), None);
        assert_eq!(contacts.count().unwrap(), 0);
    }

    #[test]
    fn update_and_remove_missing_return_not_found() {
        let conn = open_db_in_memory().unwrap();
        let contacts = EntitySet::<Contact>::new(&conn);
        let contact = Contact::new("Ghost", "ghost@example.com", None);

        let err = contacts.update(&contact).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { id, .. } if id == contact.id));

        let missing = Uuid::new_v4();
        let err = contacts.remove(missing).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { id, .. } if id == missing));
    }

    #[test]
    fn add_rejects_invalid_entity_before_sql() {
        let conn = open_db_in_memory().unwrap();
        let contacts = EntitySet::<Contact>::new(&conn);
        let err = contacts
            .add(&Contact::new("", "blank@example.com", None))
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(contacts.count().unwrap(), 0);
    }

    #[test]
    fn read_path_rejects_corrupt_ids() {
        let conn = open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO contacts (id, name, email) VALUES ('not-a-uuid', 'X', 'x@example.com');",
            [],
        )
        .unwrap();

        let err = EntitySet::<Contact>::new(&conn).all().unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
