//! Asset Assembler - the immutable result of one request

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concatenation::Concatenation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    logical_path: String,
    pathname: PathBuf,
    content_type: String,
    source: Vec<u8>,
    length: usize,
    mtime: DateTime<Utc>,
    dependency_set: BTreeSet<PathBuf>,
}

impl Asset {
    /// Flatten the concatenation into final content.
    pub(crate) fn assemble(
        logical_path: String,
        pathname: PathBuf,
        content_type: String,
        concatenation: &Concatenation,
        dependency_set: BTreeSet<PathBuf>,
    ) -> Self {
        let source = concatenation.join();
        let mtime = latest_mtime(&dependency_set);
        Self {
            logical_path,
            pathname,
            content_type,
            length: source.len(),
            source,
            mtime,
            dependency_set,
        }
    }

    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    pub fn pathname(&self) -> &Path {
        &self.pathname
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Content as text. Borrowed for UTF-8 content; binary assets such as
    /// images come back with replacement characters, use [`Asset::source`].
    pub fn content(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.source)
    }

    /// Raw content bytes.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn is_text(&self) -> bool {
        std::str::from_utf8(&self.source).is_ok()
    }

    /// Byte length of the content.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Latest modification time across the dependency set.
    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    pub fn dependency_set(&self) -> &BTreeSet<PathBuf> {
        &self.dependency_set
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content())
    }
}

fn latest_mtime(paths: &BTreeSet<PathBuf>) -> DateTime<Utc> {
    paths
        .iter()
        .filter_map(|path| fs::metadata(path).and_then(|m| m.modified()).ok())
        .max()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}
