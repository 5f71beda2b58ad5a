//! Application services between the HTTP routes and storage.

pub mod error;
pub mod notes;
pub mod purchase;
pub mod registration;
pub mod session;
pub mod social;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod registration_tests;

pub use error::ServiceError;
pub use notes::{NoteService, UploadRequest, UploadedFile};
pub use purchase::PurchaseService;
pub use registration::RegistrationService;
pub use session::SessionService;
pub use social::SocialService;
