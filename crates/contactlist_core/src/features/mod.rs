//! Request types, validators and handlers registered by `AppContext::bootstrap`.

pub mod contact;

use crate::pipeline::envelope::AppContextBuilder;
use crate::pipeline::RegistrationError;
use contact::{
    AddContact, AddContactHandler, AddContactValidator, ContactIndex, ContactIndexHandler,
    DeleteContact, DeleteContactHandler, EditContact, EditContactHandler, EditContactValidator,
};

/// Registers every contact command and query.
///
/// `DeleteContact` and `ContactIndex` have no validator and pass the gate
/// unchecked.
pub fn register_contact_features(
    builder: &mut AppContextBuilder,
) -> Result<(), RegistrationError> {
    builder
        .register_validator::<AddContact>(AddContactValidator)?
        .register_validator::<EditContact>(EditContactValidator)?
        .register_handler::<AddContact, _, _>(|| AddContactHandler)?
        .register_handler::<EditContact, _, _>(|| EditContactHandler)?
        .register_handler::<DeleteContact, _, _>(|| DeleteContactHandler)?
        .register_handler::<ContactIndex, _, _>(|| ContactIndexHandler)?;
    Ok(())
}
