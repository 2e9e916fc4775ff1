//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `contactlist_core` wiring end to end: bootstrap a context, run a
//!   few commands through the envelope, print the contact index.
//!
//! Usage: `contactlist_cli [DB_PATH] [LOG_DIR]`. Without a path, a throwaway
//! database in the system temp directory is used. `LOG_DIR` must be absolute.

use contactlist_core::{
    AddContact, AppConfig, AppContext, ContactIndex, ExecuteError, LoggingConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args_os().skip(1);
    let db_path = args.next().map(PathBuf::from).unwrap_or_else(|| {
        std::env::temp_dir().join(format!("contactlist-cli-{}.sqlite3", std::process::id()))
    });
    let mut config = AppConfig::new(&db_path);
    if let Some(log_dir) = args.next() {
        config = config.with_logging(LoggingConfig::with_default_level(PathBuf::from(log_dir)));
    }

    println!("contactlist_core version={}", contactlist_core::core_version());
    let context = match AppContext::bootstrap(config) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("bootstrap failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    for (name, email, phone) in [
        ("Ben", "ben@example.com", "555-123-0001"),
        ("Cathy", "cathy@example.com", "555-123-0002"),
        ("Abe", "abe@example.com", "555-123-0003"),
    ] {
        let command = AddContact {
            name: name.to_string(),
            email: email.to_string(),
            phone_number: Some(phone.to_string()),
        };
        match context.execute(command) {
            Ok(response) => println!("added {name} id={}", response.contact_id),
            // Re-running against the same file hits the unique email rule.
            Err(err @ ExecuteError::Handler(_)) => println!("skipped {name}: {err}"),
            Err(err) => {
                eprintln!("add {name} failed: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    let exit = match context.execute(ContactIndex) {
        Ok(rows) => {
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.id,
                    row.name,
                    row.email,
                    row.phone_number.as_deref().unwrap_or("-")
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("index failed: {err}");
            ExitCode::FAILURE
        }
    };

    let stats = context.transaction_stats();
    log::info!(
        "event=cli_done module=cli status=ok committed={} rolled_back={}",
        stats.committed,
        stats.rolled_back
    );
    context.dispose();
    exit
}
