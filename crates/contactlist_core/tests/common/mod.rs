#![allow(dead_code)]

use contactlist_core::{AddContact, AppConfig, AppContext, AppContextBuilder, EntityId};
use tempfile::TempDir;

/// Context backed by a database file in its own temp directory.
pub struct Fixture {
    pub context: AppContext,
    _dir: TempDir,
}

pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let context = AppContext::bootstrap(AppConfig::new(dir.path().join("contacts.db"))).unwrap();
    Fixture { context, _dir: dir }
}

/// Context with contact features plus whatever `extend` registers.
pub fn fixture_with(extend: impl FnOnce(&mut AppContextBuilder)) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = AppContext::builder(AppConfig::new(dir.path().join("contacts.db")));
    contactlist_core::register_contact_features(&mut builder).unwrap();
    extend(&mut builder);
    let context = builder.build().unwrap();
    Fixture { context, _dir: dir }
}

pub fn add_command(name: &str, email: &str, phone: &str) -> AddContact {
    AddContact {
        name: name.to_string(),
        email: email.to_string(),
        phone_number: Some(phone.to_string()),
    }
}

pub fn add(context: &AppContext, name: &str, email: &str, phone: &str) -> EntityId {
    context
        .execute(add_command(name, email, phone))
        .unwrap()
        .contact_id
}
