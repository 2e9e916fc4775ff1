//! `ContactIndex` query: every contact as a view model, sorted by name.
//!
//! # Invariants
//! - One view model per stored contact; no filtering.
//! - Order is ascending by `name` (byte-wise string order), then by `id` so
//!   equal names come back in a stable order.

use super::ContactError;
use crate::db::Store;
use crate::model::contact::Contact;
use crate::model::entity::EntityId;
use crate::pipeline::dispatch::Handler;
use crate::pipeline::request::{HandlerError, Request, RequestAccess};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIndex;

impl Request for ContactIndex {
    const KIND: &'static str = "contact_index";
    const ACCESS: RequestAccess = RequestAccess::Query;
    type Response = Vec<ContactIndexViewModel>;
}

/// Read-only row of the contact index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIndexViewModel {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

impl From<Contact> for ContactIndexViewModel {
    fn from(value: Contact) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            phone_number: value.phone_number,
        }
    }
}

pub struct ContactIndexHandler;

impl Handler<ContactIndex> for ContactIndexHandler {
    fn handle(
        &mut self,
        _request: ContactIndex,
        store: &Store,
    ) -> Result<Vec<ContactIndexViewModel>, HandlerError> {
        let contacts = store
            .set::<Contact>()
            .all()
            .map_err(ContactError::from)?;
        Ok(project_index(contacts))
    }
}

/// Orders contacts for the index and converts them to view models.
pub fn project_index(mut contacts: Vec<Contact>) -> Vec<ContactIndexViewModel> {
    contacts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    contacts
        .into_iter()
        .map(ContactIndexViewModel::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::project_index;
    use crate::model::contact::Contact;

    #[test]
    fn sorts_by_name_then_id() {
        let ben = Contact::new("Ben", "ben@example.com", None);
        let abe = Contact::new("Abe", "abe@example.com", None);
        let mut twin_a = Contact::new("Ann", "ann.a@example.com", None);
        let mut twin_b = Contact::new("Ann", "ann.b@example.com", None);
        if twin_a.id > twin_b.id {
            std::mem::swap(&mut twin_a, &mut twin_b);
        }

        let projected = project_index(vec![ben, twin_b.clone(), abe, twin_a.clone()]);
        let names: Vec<&str> = projected.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["Abe", "Ann", "Ann", "Ben"]);
        assert_eq!(projected[1].id, twin_a.id);
        assert_eq!(projected[2].id, twin_b.id);
    }

    #[test]
    fn ordering_is_case_sensitive_byte_order() {
        let lower = Contact::new("abe", "lower@example.com", None);
        let upper = Contact::new("Zed", "upper@example.com", None);
        let projected = project_index(vec![lower, upper]);
        assert_eq!(projected[0].name, "Zed");
        assert_eq!(projected[1].name, "abe");
    }
}
