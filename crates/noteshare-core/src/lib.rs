//! `NoteShare` Core Library
//!
//! Shared functionality for the `NoteShare` server:
//! - Configuration resolution and hierarchy
//! - Free-upload admission policy and price rules
//! - One-time code generation and expiry rules
//! - SQLite pool helpers and common error types

pub mod admission;
pub mod config;
pub mod db;
pub mod error;
pub mod otp;
pub mod tracing_init;

pub use admission::{AdmissionDecision, UploaderTally};
pub use config::Config;
pub use error::{Error, Result};
pub use otp::{Channel, Contact};
