mod common;

use common::{add, add_command, fixture};
use contactlist_core::{Contact, ContactError, DeleteContact, EditContact, ExecuteError};
use uuid::Uuid;

#[test]
fn add_contact_assigns_a_fresh_id_and_trims_fields() {
    let fx = fixture();
    let ctx = &fx.context;

    let id = ctx
        .execute(add_command("  Abe  ", " abe@example.com ", "  "))
        .unwrap()
        .contact_id;
    assert!(!id.is_nil());

    let stored: Contact = ctx.find(id).unwrap().expect("stored contact");
    assert_eq!(stored.name, "Abe");
    assert_eq!(stored.email, "abe@example.com");
    assert_eq!(stored.phone_number, None);
}

#[test]
fn add_contact_rejects_duplicate_email_case_insensitively() {
    let fx = fixture();
    let ctx = &fx.context;
    add(ctx, "Abe", "abe@example.com", "555");

    let err = ctx
        .execute(add_command("Other Abe", "Abe@Example.com", "556"))
        .unwrap_err();
    assert!(matches!(
        err.handler_error::<ContactError>(),
        Some(ContactError::DuplicateEmail(_))
    ));
    assert_eq!(ctx.count::<Contact>().unwrap(), 1);
}

#[test]
fn edit_contact_replaces_fields() {
    let fx = fixture();
    let ctx = &fx.context;
    let id = add(ctx, "Abe", "abe@example.com", "555");

    ctx.execute(EditContact {
        id,
        name: "Abraham".to_string(),
        email: "ABE@example.com".to_string(),
        phone_number: Some("555-000-1111".to_string()),
    })
    .unwrap();

    let stored: Contact = ctx.find(id).unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.name, "Abraham");
    assert_eq!(stored.email, "ABE@example.com");
    assert_eq!(stored.phone_number.as_deref(), Some("555-000-1111"));
}

#[test]
fn edit_contact_rejects_email_owned_by_another_contact() {
    let fx = fixture();
    let ctx = &fx.context;
    let abe = add(ctx, "Abe", "abe@example.com", "555");
    add(ctx, "Ben", "ben@example.com", "556");

    let err = ctx
        .execute(EditContact {
            id: abe,
            name: "Abe".to_string(),
            email: "ben@example.com".to_string(),
            phone_number: None,
        })
        .unwrap_err();
    assert!(matches!(
        err.handler_error::<ContactError>(),
        Some(ContactError::DuplicateEmail(_))
    ));

    let stored: Contact = ctx.find(abe).unwrap().unwrap();
    assert_eq!(stored.email, "abe@example.com");
}

#[test]
fn edit_contact_validates_before_touching_the_store() {
    let fx = fixture();
    let ctx = &fx.context;
    let before = ctx.transaction_stats();

    let err = ctx
        .execute(EditContact {
            id: Uuid::nil(),
            name: String::new(),
            email: "abe@example.com".to_string(),
            phone_number: None,
        })
        .unwrap_err();

    let result = err.validation().expect("validation rejection");
    assert_eq!(result.messages_for("id"), vec!["must not be empty"]);
    assert_eq!(result.messages_for("name"), vec!["must not be blank"]);
    assert_eq!(ctx.transaction_stats(), before);
}

#[test]
fn edit_and_delete_unknown_contact_return_not_found() {
    let fx = fixture();
    let ctx = &fx.context;
    let missing = Uuid::new_v4();

    let err = ctx
        .execute(EditContact {
            id: missing,
            name: "Nobody".to_string(),
            email: "nobody@example.com".to_string(),
            phone_number: None,
        })
        .unwrap_err();
    assert!(matches!(
        err.handler_error::<ContactError>(),
        Some(ContactError::NotFound(id)) if *id == missing
    ));

    let err = ctx.execute(DeleteContact { id: missing }).unwrap_err();
    assert!(matches!(err, ExecuteError::Handler(_)));
    assert!(matches!(
        err.handler_error::<ContactError>(),
        Some(ContactError::NotFound(id)) if *id == missing
    ));
}

#[test]
fn delete_contact_removes_the_row() {
    let fx = fixture();
    let ctx = &fx.context;
    let id = add(ctx, "Abe", "abe@example.com", "555");
    add(ctx, "Ben", "ben@example.com", "556");

    ctx.execute(DeleteContact { id }).unwrap();

    assert!(ctx.find::<Contact>(id).unwrap().is_none());
    assert_eq!(ctx.count::<Contact>().unwrap(), 1);
}
