mod common;

use common::{add, add_command, fixture, fixture_with};
use contactlist_core::{
    handler_fn, AddContact, Contact, ContactIndex, ExecuteError, HandlerError, Request,
    RequestAccess, Store, TransactionState, ValidatorRegistryError,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Inserts a contact, then fails.
struct AddThenExplode {
    name: String,
    email: String,
}

impl Request for AddThenExplode {
    const KIND: &'static str = "add_then_explode";
    const ACCESS: RequestAccess = RequestAccess::Command;
    type Response = ();
}

#[derive(Debug, PartialEq, Eq)]
struct Exploded {
    code: u32,
}

impl Display for Exploded {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "exploded with code {}", self.code)
    }
}

impl Error for Exploded {}

struct Orphan;

impl Request for Orphan {
    const KIND: &'static str = "orphan";
    const ACCESS: RequestAccess = RequestAccess::Command;
    type Response = ();
}

/// Inserts a contact and leaves a deferred foreign key violation behind, so
/// the handler succeeds but `COMMIT` fails.
struct AddThenBreakCommit {
    name: String,
    email: String,
}

impl Request for AddThenBreakCommit {
    const KIND: &'static str = "add_then_break_commit";
    const ACCESS: RequestAccess = RequestAccess::Command;
    type Response = u32;
}

fn commit_breaking_fixture() -> common::Fixture {
    fixture_with(|builder| {
        builder
            .register_handler::<AddThenBreakCommit, _, _>(|| {
                handler_fn(
                    |request: AddThenBreakCommit, store: &Store| -> Result<u32, HandlerError> {
                        store
                            .set::<Contact>()
                            .add(&Contact::new(request.name, request.email, None))?;
                        store.connection().execute_batch(
                            "CREATE TEMP TABLE parent (id INTEGER PRIMARY KEY);
                             CREATE TEMP TABLE child (
                                 parent_id INTEGER REFERENCES parent (id)
                                     DEFERRABLE INITIALLY DEFERRED
                             );
                             INSERT INTO child (parent_id) VALUES (1);",
                        )?;
                        Ok(1)
                    },
                )
            })
            .unwrap();
    })
}

fn exploding_fixture() -> common::Fixture {
    fixture_with(|builder| {
        builder
            .register_handler::<AddThenExplode, _, _>(|| {
                handler_fn(
                    |request: AddThenExplode, store: &Store| -> Result<(), HandlerError> {
                        store
                            .set::<Contact>()
                            .add(&Contact::new(request.name, request.email, None))?;
                        Err(Box::new(Exploded { code: 7 }))
                    },
                )
            })
            .unwrap();
    })
}

#[test]
fn rejected_request_opens_no_transaction_and_writes_nothing() {
    let fx = fixture();
    let ctx = &fx.context;
    add(ctx, "Abe", "abe@example.com", "555");
    let count_before = ctx.count::<Contact>().unwrap();
    let stats_before = ctx.transaction_stats();

    let err = ctx
        .execute(AddContact {
            name: "   ".to_string(),
            email: "not-an-email".to_string(),
            phone_number: None,
        })
        .unwrap_err();

    assert_eq!(ctx.transaction_stats(), stats_before);
    let result = err.validation().expect("validation rejection");
    assert!(!result.is_valid());
    assert_eq!(result.messages_for("name"), vec!["must not be blank"]);
    assert_eq!(
        result.messages_for("email"),
        vec!["must be a valid email address"]
    );
    assert_eq!(ctx.count::<Contact>().unwrap(), count_before);
}

#[test]
fn successful_request_commits_exactly_once() {
    let fx = fixture();
    let ctx = &fx.context;

    for idx in 0..3 {
        let before = ctx.transaction_stats();
        ctx.execute(add_command(
            &format!("Person {idx}"),
            &format!("p{idx}@example.com"),
            "555",
        ))
        .unwrap();
        let after = ctx.transaction_stats();

        assert_eq!(after.begun, before.begun + 1);
        assert_eq!(after.committed, before.committed + 1);
        assert_eq!(after.rolled_back, before.rolled_back);
    }

    let before = ctx.transaction_stats();
    ctx.execute(ContactIndex).unwrap();
    assert_eq!(ctx.transaction_stats().committed, before.committed + 1);
}

#[test]
fn handler_failure_rolls_back_and_returns_the_same_error() {
    let fx = exploding_fixture();
    let ctx = &fx.context;
    add(ctx, "Abe", "abe@example.com", "555");
    let index_before = ctx.execute(ContactIndex).unwrap();
    let stats_before = ctx.transaction_stats();

    let err = ctx
        .execute(AddThenExplode {
            name: "Ghost".to_string(),
            email: "ghost@example.com".to_string(),
        })
        .unwrap_err();

    let stats_after = ctx.transaction_stats();
    assert_eq!(stats_after.begun, stats_before.begun + 1);
    assert_eq!(stats_after.committed, stats_before.committed);
    assert_eq!(stats_after.rolled_back, stats_before.rolled_back + 1);

    assert_eq!(err.handler_error::<Exploded>(), Some(&Exploded { code: 7 }));
    assert_eq!(err.to_string(), "exploded with code 7");
    let inner = err.into_handler_error().expect("handler error");
    assert!(inner.downcast::<Exploded>().is_ok());

    assert_eq!(ctx.execute(ContactIndex).unwrap(), index_before);
}

#[test]
fn contact_errors_are_downcastable_from_handler_failures() {
    let fx = fixture();
    let ctx = &fx.context;
    add(ctx, "Abe", "abe@example.com", "555");

    let err = ctx
        .execute(add_command("Abraham", "ABE@example.com", "556"))
        .unwrap_err();
    assert!(matches!(
        err.handler_error::<contactlist_core::ContactError>(),
        Some(contactlist_core::ContactError::DuplicateEmail(_))
    ));
    assert_eq!(ctx.count::<Contact>().unwrap(), 1);
}

#[test]
fn failed_commit_rolls_back_and_reports_a_store_error() {
    let fx = commit_breaking_fixture();
    let ctx = &fx.context;
    add(ctx, "Abe", "abe@example.com", "555");
    let count_before = ctx.count::<Contact>().unwrap();
    let stats_before = ctx.transaction_stats();

    let err = ctx
        .execute(AddThenBreakCommit {
            name: "Ghost".to_string(),
            email: "ghost@example.com".to_string(),
        })
        .unwrap_err();

    assert!(matches!(err, ExecuteError::Store(_)), "unexpected error: {err}");
    assert!(err.to_string().contains("FOREIGN KEY"));
    let stats_after = ctx.transaction_stats();
    assert_eq!(stats_after.begun, stats_before.begun + 1);
    assert_eq!(stats_after.committed, stats_before.committed);
    assert_eq!(stats_after.rolled_back, stats_before.rolled_back + 1);
    assert_eq!(ctx.count::<Contact>().unwrap(), count_before);
}

#[test]
fn bootstrap_registers_every_contact_feature() {
    let fx = fixture();
    let ctx = &fx.context;

    assert!(ctx.config().db_path.ends_with("contacts.db"));
    assert!(ctx.config().logging.is_none());
    assert_eq!(ctx.validators().kinds(), vec!["add_contact", "edit_contact"]);
    assert_eq!(
        ctx.dispatcher().kinds(),
        vec!["add_contact", "contact_index", "delete_contact", "edit_contact"]
    );
    assert!(ctx.dispatcher().handles::<ContactIndex>());

    let scope_validators = ctx
        .scoped(|scope| scope.validators().len())
        .unwrap();
    assert_eq!(scope_validators, 2);
}

#[test]
fn missing_handler_is_fatal_and_rolls_back() {
    let fx = fixture();
    let ctx = &fx.context;
    let before = ctx.transaction_stats();

    let err = ctx.execute(Orphan).unwrap_err();

    assert!(matches!(err, ExecuteError::NoHandlerRegistered { kind: "orphan" }));
    let after = ctx.transaction_stats();
    assert_eq!(after.committed, before.committed);
    assert_eq!(after.rolled_back, before.rolled_back + 1);
}

#[test]
fn ad_hoc_query_and_transaction_bracket_a_unit_of_work() {
    let fx = fixture();
    let ctx = &fx.context;
    let abe_id = add(ctx, "Abe", "abe@example.com", "555");

    let found: Option<Contact> = ctx.find(abe_id).unwrap();
    assert_eq!(found.map(|c| c.name), Some("Abe".to_string()));

    let inserted = ctx
        .transaction(|store| {
            let contact = Contact::new("Ben", "ben@example.com", None);
            Ok(store.set::<Contact>().add(&contact)?)
        })
        .unwrap();
    assert!(ctx.find::<Contact>(inserted).unwrap().is_some());

    let err = ctx
        .transaction(|store| -> Result<(), HandlerError> {
            store
                .set::<Contact>()
                .add(&Contact::new("Cathy", "cathy@example.com", None))?;
            Err("abort".into())
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "abort");
    assert_eq!(ctx.count::<Contact>().unwrap(), 2);

    let names = ctx
        .query(|store| {
            Ok(store
                .set::<Contact>()
                .all()?
                .into_iter()
                .map(|c| c.name)
                .collect::<Vec<_>>())
        })
        .unwrap();
    assert_eq!(names.len(), 2);
}

#[test]
fn strict_validation_probe_requires_a_validator() {
    let fx = fixture();
    let ctx = &fx.context;

    let result = ctx
        .validation(&add_command("Abe", "abe@example.com", "555"))
        .unwrap();
    assert!(result.is_valid());

    let result = ctx.validation(&add_command("", "", "555")).unwrap();
    assert_eq!(result.failures().len(), 2);

    let err = ctx.validation(&ContactIndex).unwrap_err();
    assert_eq!(
        err,
        ValidatorRegistryError::NoValidatorRegistered {
            kind: "contact_index"
        }
    );
}

#[test]
fn dropping_a_scope_rolls_back_its_open_transaction() {
    let fx = fixture();
    let ctx = &fx.context;
    let before = ctx.transaction_stats();

    {
        let mut scope = ctx.open_scope().unwrap();
        scope.store_mut().begin_transaction().unwrap();
        scope
            .store()
            .set::<Contact>()
            .add(&Contact::new("Temp", "temp@example.com", None))
            .unwrap();
    }

    assert_eq!(ctx.transaction_stats().rolled_back, before.rolled_back + 1);
    assert_eq!(ctx.count::<Contact>().unwrap(), 0);
}

#[test]
fn scope_store_cannot_begin_after_its_transaction_finished() {
    let fx = fixture();
    let outcome = fx
        .context
        .scoped(|scope| {
            let store = scope.store_mut();
            store.begin_transaction().unwrap();
            store
                .close_transaction(contactlist_core::TransactionOutcome::Success)
                .unwrap();
            assert_eq!(store.state(), TransactionState::Committed);
            store.begin_transaction().is_err()
        })
        .unwrap();
    assert!(outcome);
}

#[test]
fn scoped_dispatch_runs_without_the_envelope() {
    let fx = fixture();
    let ctx = &fx.context;
    add(ctx, "Abe", "abe@example.com", "555");
    let before = ctx.transaction_stats();

    let rows = ctx
        .scoped(|scope| scope.dispatch(ContactIndex).unwrap())
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(ctx.transaction_stats(), before);
}

#[test]
fn concurrent_requests_each_get_their_own_scope() {
    let fx = fixture();
    let ctx = &fx.context;

    std::thread::scope(|threads| {
        for worker in 0..4 {
            threads.spawn(move || {
                for idx in 0..5 {
                    add(
                        ctx,
                        &format!("Worker {worker} #{idx}"),
                        &format!("w{worker}.{idx}@example.com"),
                        "555",
                    );
                }
            });
        }
    });

    assert_eq!(ctx.count::<Contact>().unwrap(), 20);
    assert_eq!(ctx.execute(ContactIndex).unwrap().len(), 20);
    let stats = ctx.transaction_stats();
    assert_eq!(stats.rolled_back, 0);
    assert_eq!(stats.begun, stats.committed);
}
