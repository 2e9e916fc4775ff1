//! `EditContact` command.

use super::rules::check_contact_fields;
use super::{normalize_phone, ContactError};
use crate::db::Store;
use crate::model::contact::Contact;
use crate::model::entity::EntityId;
use crate::pipeline::dispatch::Handler;
use crate::pipeline::request::{HandlerError, Request, RequestAccess};
use crate::pipeline::validation::{ValidationResult, Validator};
use serde::{Deserialize, Serialize};

/// Replaces name, email and phone number of an existing contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditContact {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

impl Request for EditContact {
    const KIND: &'static str = "edit_contact";
    const ACCESS: RequestAccess = RequestAccess::Command;
    type Response = ();
}

pub struct EditContactValidator;

impl Validator<EditContact> for EditContactValidator {
    fn validate(&self, request: &EditContact) -> ValidationResult {
        let mut result = ValidationResult::valid();
        if request.id.is_nil() {
            result.add_failure("id", "must not be empty");
        }
        check_contact_fields(
            &mut result,
            &request.name,
            &request.email,
            request.phone_number.as_deref(),
        );
        result
    }
}

pub struct EditContactHandler;

impl Handler<EditContact> for EditContactHandler {
    fn handle(&mut self, request: EditContact, store: &Store) -> Result<(), HandlerError> {
        Ok(edit_contact(request, store)?)
    }
}

fn edit_contact(request: EditContact, store: &Store) -> Result<(), ContactError> {
    let contacts = store.set::<Contact>();
    let mut contact = contacts
        .find(request.id)?
        .ok_or(ContactError::NotFound(request.id))?;

    let email = request.email.trim();
    if let Some(owner) = contacts.find_by_email(email)? {
        if owner.id != contact.id {
            return Err(ContactError::DuplicateEmail(email.to_string()));
        }
    }

    contact.name = request.name.trim().to_string();
    contact.email = email.to_string();
    contact.phone_number = normalize_phone(request.phone_number);
    contacts.update(&contact)?;
    Ok(())
}
