pub mod error;
pub use error::{ApiError, ApiErrorKind};

pub mod traits;
pub use traits::Validator;

pub mod disks;
pub mod files;
pub mod users;
pub mod requests;

#[cfg(feature = "client")]
pub mod client;
