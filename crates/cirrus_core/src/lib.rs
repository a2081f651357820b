//! # Cirrus Core
//!
//! Client-side engine of the Cirrus SDK.
//!
//! This crate provides:
//! - Records with a status state machine and dirty-property tracking
//! - A data store for create/find/save/delete/batch-save on collections
//! - File attachments with upload, resized download and an in-memory cache
//! - Relations between records, optionally expanded into nested records
//! - Record-level permission changes
//! - Signup, login and session persistence
//!
//! ## Record lifecycle
//!
//! A record starts `New`. Saving moves it through `Saving` to `Saved`;
//! setting a property on a saved record makes it `Modified`, and the next
//! save sends only the modified properties. A failed save returns the
//! record to its pre-save status. Deleting a record is terminal.
//!
//! ## Example
//!
//! ```no_run
//! use cirrus_core::{Client, ClientConfig};
//!
//! # async fn run() -> cirrus_core::CoreResult<()> {
//! let client = Client::init(ClientConfig::new("my-app-key"))?;
//! let store = client.data();
//!
//! let mut note = store.create("notes", [("title", "groceries")])?;
//! store.save(&mut note).await?;
//!
//! note.set("content", "milk, eggs")?;
//! store.save(&mut note).await?;
//!
//! let red = store.find_where("notes", [("color", "red")]).await?;
//! # let _ = red;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
pub mod file;
pub mod permissions;
mod record;
pub mod relation;
pub mod secure_store;
mod store;
mod user;
mod value;

pub use client::Client;
pub use config::{ClientConfig, ENV_APP_KEY, ENV_BASE_URL, ENV_TIMEOUT_SECS};
pub use error::{CoreError, CoreResult};
pub use file::{FileManager, FileRef, FileStatus, ImageFormat, LocalData, ResizeSpec};
pub use permissions::{PermissionChanges, PermissionDelta, PermissionEntry, PermissionsService};
pub use record::{
    is_read_only, Record, RecordStatus, COLLECTION_PROPERTY, ID_PROPERTY, USERNAME_PROPERTY,
    USERS_COLLECTION,
};
pub use relation::{Related, Relation, RelationKind};
pub use secure_store::{FileSecureStore, MemorySecureStore, SecureStore};
pub use store::DataStore;
pub use user::{User, UserService};
pub use value::PropertyValue;

pub use cirrus_query::{Combinator, Operand, Operator, Query, QueryError};
pub use cirrus_transport::{TransportError, TransportResult};
