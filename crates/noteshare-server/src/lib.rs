//! `NoteShare` Server Library
//!
//! Backend for a notes marketplace:
//! - SQLite storage for users, notes, pending registrations and purchases
//! - OTP-gated registration with email and SMS delivery
//! - Free-upload admission, view/download counters and the catalogue
//! - JWT login, wallet purchases and follows
//! - axum HTTP routes over all of the above

pub mod auth;
pub mod blob;
pub mod delivery;
pub mod http;
pub mod presence;
pub mod service;
pub mod storage;
pub mod sweep;
