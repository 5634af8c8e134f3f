//! Client side state for a personal cloud file explorer.
//!
//! [`FileStore`] caches disks and folder listings, applies every mutation
//! only after the backend confirmed it, and keeps per disk usage in bytes.
//! Uploads run through [`UploadQueue`], user preferences through
//! [`SettingsStore`] and quota requests through [`StorageRequests`].

pub mod error;
pub mod config;
pub mod remote;
pub mod debounce;
pub mod upload;
pub mod settings;
pub mod requests;
pub mod store;

mod path;

pub use error::{Error, ErrorKind};
pub use remote::Remote;
pub use upload::UploadQueue;
pub use settings::SettingsStore;
pub use requests::StorageRequests;
pub use store::{FileStore, StoreOptions};
