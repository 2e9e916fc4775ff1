//! `AddContact` command.

use super::rules::check_contact_fields;
use super::{normalize_phone, ContactError};
use crate::db::Store;
use crate::model::contact::Contact;
use crate::model::entity::EntityId;
use crate::pipeline::dispatch::Handler;
use crate::pipeline::request::{HandlerError, Request, RequestAccess};
use crate::pipeline::validation::{ValidationResult, Validator};
use serde::{Deserialize, Serialize};

/// Creates a contact and returns its generated id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddContact {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

impl Request for AddContact {
    const KIND: &'static str = "add_contact";
    const ACCESS: RequestAccess = RequestAccess::Command;
    type Response = AddContactResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddContactResponse {
    pub contact_id: EntityId,
}

pub struct AddContactValidator;

impl Validator<AddContact> for AddContactValidator {
    fn validate(&self, request: &AddContact) -> ValidationResult {
        let mut result = ValidationResult::valid();
        check_contact_fields(
            &mut result,
            &request.name,
            &request.email,
            request.phone_number.as_deref(),
        );
        result
    }
}

pub struct AddContactHandler;

impl Handler<AddContact> for AddContactHandler {
    fn handle(
        &mut self,
        request: AddContact,
        store: &Store,
    ) -> Result<AddContactResponse, HandlerError> {
        Ok(add_contact(request, store)?)
    }
}

fn add_contact(request: AddContact, store: &Store) -> Result<AddContactResponse, ContactError> {
    let contacts = store.set::<Contact>();
    let email = request.email.trim();
    if contacts.find_by_email(email)?.is_some() {
        return Err(ContactError::DuplicateEmail(email.to_string()));
    }

    let contact = Contact::new(
        request.name.trim(),
        email,
        normalize_phone(request.phone_number),
    );
    let contact_id = contacts.add(&contact)?;
    Ok(AddContactResponse { contact_id })
}
