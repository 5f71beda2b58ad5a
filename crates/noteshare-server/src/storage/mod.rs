//! SQLite storage for the `NoteShare` server.
//!
//! Provides persistence for users, notes, pending registrations, purchases
//! and follows.

mod models;
mod queries_notes;
mod queries_pending;
mod queries_users;
mod queries_wallet;


pub use models::*;
pub use noteshare_core::db::DatabaseError;
pub use queries_notes::NewNote;
pub use queries_pending::PendingParams;
pub use queries_users::NewUser;
pub use queries_wallet::{PurchaseOutcome, PurchaseParams};

noteshare_core::define_database!(NoteshareDatabase, "NoteShare database migrations complete");
