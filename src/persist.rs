//! The single on-disk document behind a store.
//!
//! Every load reads and parses the whole file; every save replaces it. No
//! copy of the tree is kept between calls, so the file is the only source
//! of truth.

use crate::delete::{DeleteHandle, DeleteOutcome};
use crate::error::{kind_name, Result, StoreError};
use crate::fs::FileSystem;
use crate::logging::{Op, OpLog};
use crate::path::Document;
use crate::retry::RetryPolicy;
use crossbeam_channel::bounded;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Content of a freshly created document file.
pub const EMPTY_DOCUMENT: &[u8] = b"{}";

/// Widest indent used for pretty output.
pub const MAX_INDENT: usize = 10;

/// The document file of one store.
pub struct DocumentFile {
    /// Store name, used in error messages.
    store: String,
    folder: PathBuf,
    file: PathBuf,
    /// Indent width for pretty output; `None` or `0` writes compact JSON.
    indent: Option<usize>,
    retry: RetryPolicy,
    fs: Arc<dyn FileSystem>,
    log: OpLog,
    /// Set once the database was deleted. The file is recreated on the next
    /// load.
    deleted: AtomicBool,
}

impl DocumentFile {
    /// Describe the document at `file`. Nothing is touched on disk.
    pub fn new(
        store: impl Into<String>,
        file: impl AsRef<Path>,
        indent: Option<usize>,
        retry: RetryPolicy,
        debug_logging: bool,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let file = file.as_ref().to_path_buf();
        let folder = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            store: store.into(),
            log: OpLog::new(debug_logging, &file),
            folder,
            file,
            indent,
            retry,
            fs,
            deleted: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            store: self.store.clone(),
            file: self.file.clone(),
            source,
        }
    }

    /// Make sure the folder and the document file exist.
    ///
    /// Folders are created one level at a time; levels that already exist,
    /// or appear while we work, are fine. A missing file is written as `{}`.
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.fs.exists(&self.folder) {
            self.log.ok(Op::FixPath, "creating folder path");
            self.create_folder().map_err(|e| {
                let err = self.io_error(e);
                self.log.error(Op::FixPath, "folder creation failed", &err);
                err
            })?;
        }

        if !self.fs.exists(&self.file) {
            self.fs.write(&self.file, EMPTY_DOCUMENT).map_err(|e| {
                let err = self.io_error(e);
                self.log.error(Op::FixPath, "file creation failed", &err);
                err
            })?;
            self.log.ok(Op::FixPath, "created document file");
        }

        Ok(())
    }

    fn create_folder(&self) -> io::Result<()> {
        let mut levels: Vec<&Path> = self
            .folder
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        levels.reverse();

        for level in levels {
            if self.fs.exists(level) {
                continue;
            }
            match self.fs.create_dir(level) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read and parse the document, following the retry policy.
    pub fn load(&self) -> Result<Document> {
        self.retry.run(|_| self.load_once())
    }

    fn load_once(&self) -> Result<Document> {
        if self.is_deleted() {
            self.ensure_exists()?;
        }

        let raw = match self.fs.read(&self.file) {
            Ok(raw) => {
                self.log.ok(Op::Get, "READ: RAW");
                raw
            }
            Err(e) => {
                let err = self.io_error(e);
                self.log.error(Op::Get, "READ: RAW ERROR", &err);
                if let Err(fix) = self.ensure_exists() {
                    self.log.error(Op::FixPath, "could not restore document file", &fix);
                }
                return Err(err);
            }
        };

        self.parse(&raw)
    }

    fn parse(&self, raw: &[u8]) -> Result<Document> {
        let err = match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(doc)) => {
                self.log.ok(Op::Get, "READ: RAW PARSE");
                return Ok(doc);
            }
            Ok(other) => StoreError::InvalidDocument {
                store: self.store.clone(),
                file: self.file.clone(),
                found: kind_name(&other),
            },
            Err(source) => StoreError::Parse {
                store: self.store.clone(),
                file: self.file.clone(),
                line: source.line(),
                column: source.column(),
                source,
            },
        };

        self.log.error(Op::Get, "READ: PARSE ERROR", &err);
        Err(err)
    }

    /// Serialize the document in the configured format.
    pub fn encode(&self, doc: &Document) -> Result<Vec<u8>> {
        let encoded = match self.indent {
            Some(width) if width > 0 => {
                let indent = " ".repeat(width.min(MAX_INDENT));
                let mut out = Vec::new();
                let written = {
                    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
                    let mut serializer = Serializer::with_formatter(&mut out, formatter);
                    doc.serialize(&mut serializer)
                };
                written.map(|()| out)
            }
            _ => serde_json::to_vec(doc),
        };
        encoded.map_err(|e| self.io_error(e.into()))
    }

    /// Replace the file with `doc`, following the retry policy.
    pub fn save(&self, doc: &Document) -> Result<()> {
        let bytes = self.encode(doc)?;

        self.retry.run(|_| match self.fs.write(&self.file, &bytes) {
            Ok(()) => {
                self.log.ok(Op::Set, "WRITE: OK");
                Ok(())
            }
            Err(e) => {
                let err = self.io_error(e);
                self.log.error(Op::Set, "WRITE: ERROR", &err);
                Err(err)
            }
        })
    }

    /// Mark the document deleted and remove its file on a background
    /// thread.
    ///
    /// Failures end up in the returned handle and the debug log, never in a
    /// panic or an error return.
    pub fn remove_in_background(&self) -> DeleteHandle {
        self.deleted.store(true, Ordering::Release);
        let (tx, rx) = bounded(1);

        let worker = {
            let fs = Arc::clone(&self.fs);
            let file = self.file.clone();
            let log = self.log.clone();
            let tx = tx.clone();
            move || {
                let _ = tx.send(remove_now(fs.as_ref(), &file, &log));
            }
        };

        if let Err(e) = thread::Builder::new()
            .name("freshdb-delete".into())
            .spawn(worker)
        {
            self.log.error(Op::Delete, "no delete worker, removing inline", &e);
            let _ = tx.send(remove_now(self.fs.as_ref(), &self.file, &self.log));
        }

        DeleteHandle::new(rx)
    }
}

fn remove_now(fs: &dyn FileSystem, file: &Path, log: &OpLog) -> DeleteOutcome {
    let outcome = DeleteOutcome::from_io(fs.remove_file(file));
    match &outcome {
        DeleteOutcome::Failed(e) => log.error(Op::Delete, "UNLINK: ERROR", e),
        DeleteOutcome::Removed => log.ok(Op::Delete, "UNLINK: OK"),
        DeleteOutcome::AlreadyAbsent => log.ok(Op::Delete, "UNLINK: ALREADY ABSENT"),
    }
    outcome
}
