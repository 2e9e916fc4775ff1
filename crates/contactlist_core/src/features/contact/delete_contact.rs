//! `DeleteContact` command. No validator: any id is accepted by the gate and
//! unknown ids fail in the handler.

use super::ContactError;
use crate::db::Store;
use crate::model::contact::Contact;
use crate::model::entity::EntityId;
use crate::pipeline::dispatch::Handler;
use crate::pipeline::request::{HandlerError, Request, RequestAccess};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteContact {
    pub id: EntityId,
}

impl Request for DeleteContact {
    const KIND: &'static str = "delete_contact";
    const ACCESS: RequestAccess = RequestAccess::Command;
    type Response = ();
}

pub struct DeleteContactHandler;

impl Handler<DeleteContact> for DeleteContactHandler {
    fn handle(&mut self, request: DeleteContact, store: &Store) -> Result<(), HandlerError> {
        store
            .set::<Contact>()
            .remove(request.id)
            .map_err(ContactError::from)?;
        Ok(())
    }
}
