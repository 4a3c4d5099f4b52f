//! Store configuration.
//!
//! [`StoreConfig`] is the resolved configuration a [`Store`] runs with.
//! [`StoreOptions`] is the partial form (every field optional) that can be
//! read from JSON and merged over a set of defaults. [`StoreFactory`] holds
//! such defaults for every store it opens.

use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::retry::RetryPolicy;
use crate::store::Store;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Default store name.
pub const DEFAULT_NAME: &str = "db";

/// Default folder holding the document files.
pub const DEFAULT_FOLDER: &str = "./fresh.db";

/// Default indent width for pretty output.
pub const DEFAULT_PRETTY_INDENT: usize = 2;

/// Extension of document files.
pub const FILE_EXTENSION: &str = "fdb";

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store name; the file is `<folder_path>/<name>.fdb`.
    pub name: String,

    /// Folder holding the document file. Created on demand.
    pub folder_path: PathBuf,

    /// Whether to pretty-print the document on save.
    pub pretty_save: bool,

    /// Indent width used when `pretty_save` is set.
    pub pretty_save_indent: usize,

    /// What to do when a load or save fails.
    pub retry: RetryPolicy,

    /// Emit a debug event for every persistence step.
    pub debug_logging: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            folder_path: PathBuf::from(DEFAULT_FOLDER),
            pretty_save: false,
            pretty_save_indent: DEFAULT_PRETTY_INDENT,
            retry: RetryPolicy::Propagate,
            debug_logging: false,
        }
    }
}

impl StoreConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder_path = folder.into();
        self
    }

    /// Pretty-print saves with `indent` spaces.
    pub fn with_pretty_save(mut self, indent: usize) -> Self {
        self.pretty_save = true;
        self.pretty_save_indent = indent;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry failed loads and saves forever instead of returning them.
    pub fn suppress_errors(mut self, suppress: bool) -> Self {
        self.retry = RetryPolicy::from(suppress);
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Location of the document file, as configured (possibly relative).
    pub fn file_path(&self) -> PathBuf {
        self.folder_path
            .join(format!("{}.{}", self.name, FILE_EXTENSION))
    }

    /// Indent width for saves, or `None` for compact output.
    pub(crate) fn indent(&self) -> Option<usize> {
        self.pretty_save.then_some(self.pretty_save_indent)
    }
}

/// Partial store configuration.
///
/// Field names follow the JSON option names (`folderPath`, `prettySave`,
/// `prettySaveIndent`, `disableGetSetErrors`, `debugLogging`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty_save: Option<bool>,

    #[serde(alias = "prettySaveSS", skip_serializing_if = "Option::is_none")]
    pub pretty_save_indent: Option<usize>,

    /// Retry failed loads and saves forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_get_set_errors: Option<bool>,

    #[serde(alias = "DEBUG", skip_serializing_if = "Option::is_none")]
    pub debug_logging: Option<bool>,

    /// Explicit retry policy. Wins over `disable_get_set_errors`.
    #[serde(skip)]
    pub retry: Option<RetryPolicy>,
}

impl StoreOptions {
    /// Options with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Parse options from a JSON object.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Shallow merge: fields set here win, gaps are taken from `defaults`.
    pub fn merge(self, defaults: &StoreOptions) -> StoreOptions {
        StoreOptions {
            name: self.name.or_else(|| defaults.name.clone()),
            folder_path: self.folder_path.or_else(|| defaults.folder_path.clone()),
            pretty_save: self.pretty_save.or(defaults.pretty_save),
            pretty_save_indent: self.pretty_save_indent.or(defaults.pretty_save_indent),
            disable_get_set_errors: self
                .disable_get_set_errors
                .or(defaults.disable_get_set_errors),
            debug_logging: self.debug_logging.or(defaults.debug_logging),
            retry: self.retry.or(defaults.retry),
        }
    }

    /// Resolve into a full configuration, filling gaps with the built-in
    /// defaults.
    pub fn into_config(self) -> StoreConfig {
        let base = StoreConfig::default();
        let retry = match (self.retry, self.disable_get_set_errors) {
            (Some(retry), _) => retry,
            (None, Some(suppress)) => RetryPolicy::from(suppress),
            (None, None) => base.retry,
        };

        StoreConfig {
            name: self.name.unwrap_or(base.name),
            folder_path: self.folder_path.unwrap_or(base.folder_path),
            pretty_save: self.pretty_save.unwrap_or(base.pretty_save),
            pretty_save_indent: self.pretty_save_indent.unwrap_or(base.pretty_save_indent),
            retry,
            debug_logging: self.debug_logging.unwrap_or(base.debug_logging),
        }
    }
}

impl From<StoreOptions> for StoreConfig {
    fn from(options: StoreOptions) -> Self {
        options.into_config()
    }
}

/// Opens stores with a shared set of default options.
///
/// Defaults apply to stores opened after they are set; stores already open
/// keep their configuration.
pub struct StoreFactory {
    defaults: RwLock<StoreOptions>,
    fs: Arc<dyn FileSystem>,
}

impl Default for StoreFactory {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl StoreFactory {
    pub fn new(defaults: StoreOptions) -> Self {
        Self {
            defaults: RwLock::new(defaults),
            fs: Arc::new(OsFileSystem),
        }
    }

    /// Use `fs` for every store opened by this factory.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the defaults.
    pub fn set_defaults(&self, defaults: StoreOptions) {
        *self.defaults.write() = defaults;
    }

    pub fn reset_defaults(&self) {
        self.set_defaults(StoreOptions::default());
    }

    pub fn defaults(&self) -> StoreOptions {
        self.defaults.read().clone()
    }

    /// The configuration `options` resolves to under the current defaults.
    pub fn config_for(&self, options: StoreOptions) -> StoreConfig {
        options.merge(&self.defaults.read()).into_config()
    }

    /// Open a store with `options` merged over the defaults.
    pub fn open(&self, options: StoreOptions) -> Result<Store> {
        Store::open_with_filesystem(self.config_for(options), Arc::clone(&self.fs))
    }
}
