//! # freshdb
//!
//! An embedded document store that keeps one JSON object per store in a
//! single file and addresses values inside it with dot-delimited key paths.
//!
//! ## Core Concepts
//!
//! - **Document**: the JSON object persisted at `<folder>/<name>.fdb`
//! - **Key path**: `user.address.city`, `items[0].title`, `files["a.txt"]`
//! - **Load-mutate-save**: every call re-reads the file; writes replace it
//! - **Retry policy**: disk and parse failures are returned or retried
//!
//! ## Example
//!
//! ```no_run
//! use freshdb::{Store, StoreConfig};
//! use serde_json::json;
//!
//! let store = Store::open(StoreConfig::new("app").with_folder("./data"))?;
//!
//! store.set("user.name", "Ann")?;
//! store.set("user.age", 30)?;
//! assert_eq!(store.get("user.name")?, Some(json!("Ann")));
//!
//! // Missing values can be defaulted; the default is written back.
//! let _theme = store.get_or("settings.theme", "dark")?;
//!
//! store.push("user.tags", ["admin"])?;
//! store.add("visits", 1.0)?;
//! # Ok::<(), freshdb::StoreError>(())
//! ```

pub mod config;
pub mod delete;
pub mod error;
pub mod fs;
pub mod logging;
pub mod path;
pub mod persist;
pub mod retry;
pub mod store;

// Re-exports
pub use config::{StoreConfig, StoreFactory, StoreOptions};
pub use delete::{DeleteHandle, DeleteOutcome};
pub use error::{PathError, Result, StoreError};
pub use fs::{FileSystem, OsFileSystem};
pub use path::{Document, KeyPath};
pub use persist::DocumentFile;
pub use retry::RetryPolicy;
pub use store::Store;
