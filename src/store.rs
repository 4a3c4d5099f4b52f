//! The public store: path-addressed reads and writes over one document file.

use crate::config::StoreConfig;
use crate::delete::DeleteHandle;
use crate::error::{kind_name, Result, StoreError};
use crate::fs::{FileSystem, OsFileSystem};
use crate::path::{self as accessor, Document, KeyPath};
use crate::persist::DocumentFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// A handle to one document file.
///
/// Every call loads the document from disk, works on it, and (for writes)
/// saves it back. Nothing is cached between calls and nothing is locked:
/// two handles updating the same file concurrently can lose a write.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// The backing document.
    file: DocumentFile,
}

impl Store {
    /// Open a store on the real filesystem, creating its folder and an
    /// empty document if they are missing.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::open_with_filesystem(config, Arc::new(OsFileSystem))
    }

    /// Open a store on top of a custom filesystem.
    pub fn open_with_filesystem(config: StoreConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let configured = config.file_path();
        let path = std::path::absolute(&configured).map_err(|source| StoreError::Io {
            store: config.name.clone(),
            file: configured,
            source,
        })?;

        let file = DocumentFile::new(
            config.name.clone(),
            path,
            config.indent(),
            config.retry,
            config.debug_logging,
            fs,
        );
        file.ensure_exists()?;

        Ok(Self { config, file })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Absolute path of the document file.
    pub fn file_path(&self) -> &Path {
        self.file.path()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Reads ---

    /// Value at `path`, if any.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        let key = KeyPath::parse(path)?;
        let doc = self.file.load()?;
        Ok(accessor::get(&doc, &key).cloned())
    }

    /// Value at `path`, or `default` if there is none.
    ///
    /// A missing value is replaced by `default` on disk before returning.
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        let key = KeyPath::parse(path)?;
        let mut doc = self.file.load()?;
        if let Some(value) = accessor::get(&doc, &key) {
            return Ok(value.clone());
        }

        let default = default.into();
        accessor::set(&mut doc, &key, default.clone())?;
        self.file.save(&doc)?;
        Ok(default)
    }

    /// Value at `path` deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Deserialization {
                    key_path: path.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Whether `path` holds a value. An explicit `null` counts.
    pub fn has(&self, path: &str) -> Result<bool> {
        let key = KeyPath::parse(path)?;
        Ok(accessor::has(&self.file.load()?, &key))
    }

    /// The whole document.
    pub fn get_all(&self) -> Result<Document> {
        self.file.load()
    }

    // --- Writes ---

    /// Store `value` at `path`, creating intermediate objects. Returns the
    /// stored value.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<Value> {
        let key = KeyPath::parse(path)?;
        let value = value.into();
        let mut doc = self.file.load()?;
        accessor::set(&mut doc, &key, value.clone())?;
        self.file.save(&doc)?;
        Ok(value)
    }

    /// Store any serializable value at `path`.
    ///
    /// A value that has no JSON form (say, a map with non-string keys) is
    /// stored as `null` instead of failing.
    pub fn put<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!(
                target: "freshdb",
                store = %self.config.name,
                key_path = path,
                error = %e,
                "value has no JSON form, storing null"
            );
            Value::Null
        });
        self.set(path, value).map(|_| ())
    }

    /// Remove the value at `path`. Returns whether there was one.
    ///
    /// The document is saved either way.
    pub fn del(&self, path: &str) -> Result<bool> {
        let key = KeyPath::parse(path)?;
        let mut doc = self.file.load()?;
        let removed = accessor::unset(&mut doc, &key);
        self.file.save(&doc)?;
        Ok(removed)
    }

    /// Replace the whole document with `{}`.
    pub fn clear(&self) -> Result<Document> {
        let empty = Map::new();
        self.file.save(&empty)?;
        Ok(empty)
    }

    /// Replace the value at `path` with `updater(current)` and return what
    /// ended up on disk there.
    pub fn update<F>(&self, path: &str, updater: F) -> Result<Option<Value>>
    where
        F: FnOnce(Option<Value>) -> Value,
    {
        self.try_update(path, |current| Ok(updater(current)))
    }

    /// Fallible [`update`](Self::update). If `updater` fails nothing is
    /// saved and its error is returned as is.
    pub fn try_update<F>(&self, path: &str, updater: F) -> Result<Option<Value>>
    where
        F: FnOnce(Option<Value>) -> Result<Value>,
    {
        let key = KeyPath::parse(path)?;
        let mut doc = self.file.load()?;
        accessor::update(&mut doc, &key, updater)?;
        self.file.save(&doc)?;

        let stored = self.file.load()?;
        Ok(accessor::get(&stored, &key).cloned())
    }

    // --- Sequence helpers ---

    /// The current value as a sequence. Absent means empty; any other
    /// non-array value is a usage error.
    fn sequence(&self, path: &str, current: Option<Value>) -> Result<Vec<Value>> {
        match current {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(StoreError::InvalidContainer {
                store: self.config.name.clone(),
                key_path: path.to_string(),
                found: kind_name(&other),
            }),
        }
    }

    /// Run `op` on the sequence at `path` through [`try_update`](Self::try_update)
    /// and return its side result.
    fn with_sequence<F, T>(&self, path: &str, op: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Value>) -> T,
        T: Default,
    {
        let mut out = None;
        self.try_update(path, |current| {
            let mut items = self.sequence(path, current)?;
            out = Some(op(&mut items));
            Ok(Value::Array(items))
        })?;
        // try_update only succeeds after running the updater.
        Ok(out.unwrap_or_default())
    }

    /// Append `values`. Returns the new length.
    pub fn push<I>(&self, path: &str, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.with_sequence(path, |items| {
            items.extend(values.into_iter().map(Into::into));
            items.len()
        })
    }

    /// Prepend `values`, keeping their order. Returns the new length.
    pub fn unshift<I>(&self, path: &str, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.with_sequence(path, |items| {
            items.splice(0..0, values.into_iter().map(Into::into));
            items.len()
        })
    }

    /// Remove and return the first element.
    pub fn shift(&self, path: &str) -> Result<Option<Value>> {
        self.with_sequence(path, |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Remove and return the last element.
    pub fn pop(&self, path: &str) -> Result<Option<Value>> {
        self.with_sequence(path, |items| items.pop())
    }

    /// Remove `delete_count` elements starting at `start` and return them.
    ///
    /// A negative `start` counts from the end. `None` removes everything
    /// from `start` on.
    pub fn splice(
        &self,
        path: &str,
        start: isize,
        delete_count: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.with_sequence(path, |items| {
            let len = items.len();
            let start = if start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                start.unsigned_abs().min(len)
            };
            let end = match delete_count {
                Some(count) => start.saturating_add(count).min(len),
                None => len,
            };
            items.drain(start..end).collect()
        })
    }

    // --- Arithmetic helpers ---
    //
    // An absent value counts as 0. Other values are read as numbers without
    // a type check: null is 0, booleans are 0 or 1, numeric strings are
    // parsed (never concatenated), and anything else is NaN, which is stored
    // as null.

    fn arithmetic(&self, path: &str, operand: f64, op: fn(f64, f64) -> f64) -> Result<Option<Value>> {
        self.update(path, |current| {
            let base = current.as_ref().map_or(0.0, coerce_number);
            number_value(op(base, operand))
        })
    }

    pub fn add(&self, path: &str, value: f64) -> Result<Option<Value>> {
        self.arithmetic(path, value, |a, b| a + b)
    }

    pub fn subtract(&self, path: &str, value: f64) -> Result<Option<Value>> {
        self.arithmetic(path, value, |a, b| a - b)
    }

    pub fn multiply(&self, path: &str, value: f64) -> Result<Option<Value>> {
        self.arithmetic(path, value, |a, b| a * b)
    }

    pub fn divide(&self, path: &str, value: f64) -> Result<Option<Value>> {
        self.arithmetic(path, value, |a, b| a / b)
    }

    // --- Lifecycle ---

    /// Mark the store deleted and remove its file in the background.
    ///
    /// The handle reports how the delete went; failures are never raised.
    /// The store stays usable and recreates its file on the next access.
    pub fn delete_database(&self) -> DeleteHandle {
        self.file.remove_in_background()
    }

    pub fn is_deleted(&self) -> bool {
        self.file.is_deleted()
    }
}

/// Numeric reading of a JSON value. Strings are parsed as numbers, so
/// `"5"` plus 1 is 6 rather than `"51"`.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// JSON form of an arithmetic result. Whole numbers stay integers; NaN and
/// infinities become null.
fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        Value::Null
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
