//! Dependency Graph - require ordering, dedup, and cycle detection
//!
//! One [`Concatenation`] and one [`RequireStack`] exist per top-level
//! request. The stack holds every in-progress file together with the
//! requires it has not visited yet; a file is appended to the concatenation
//! only when all of its requires have been appended, which gives depth-first
//! post-order output.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::error::{AssetError, Result};

/// Ordered, deduplicated bodies of the files compiled for one request.
#[derive(Debug, Default)]
pub struct Concatenation {
    included: HashSet<PathBuf>,
    parts: Vec<(PathBuf, Vec<u8>)>,
}

impl Concatenation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.included.contains(path)
    }

    /// Append `body` for `path`. Returns `false` and changes nothing if the
    /// path is already included.
    pub fn push(&mut self, path: PathBuf, body: Vec<u8>) -> bool {
        if !self.included.insert(path.clone()) {
            return false;
        }
        self.parts.push((path, body));
        true
    }

    /// Included paths in output order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().map(|(path, _)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Join non-empty bodies with a single newline.
    pub fn join(&self) -> Vec<u8> {
        self.parts
            .iter()
            .map(|(_, body)| body.as_slice())
            .filter(|body| !body.is_empty())
            .collect::<Vec<_>>()
            .join(&b'\n')
    }
}

#[derive(Debug)]
struct Frame<T> {
    path: PathBuf,
    pending: VecDeque<PathBuf>,
    payload: T,
}

/// Explicit visit stack for the require graph.
///
/// `T` is whatever the driver keeps per in-progress file (its compiled body).
#[derive(Debug)]
pub struct RequireStack<T> {
    frames: Vec<Frame<T>>,
    in_progress: HashSet<PathBuf>,
}

impl<T> RequireStack<T> {
    pub fn new() -> Self {
        Self {
            frames: vec![],
            in_progress: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_in_progress(&self, path: &Path) -> bool {
        self.in_progress.contains(path)
    }

    /// Fail if `path` is an in-progress ancestor.
    pub fn check_cycle(&self, path: &Path) -> Result<()> {
        if !self.is_in_progress(path) {
            return Ok(());
        }
        let mut chain: Vec<PathBuf> = self
            .frames
            .iter()
            .skip_while(|frame| frame.path != path)
            .map(|frame| frame.path.clone())
            .collect();
        chain.push(path.to_path_buf());
        Err(AssetError::CircularDependency { chain })
    }

    /// Push `path` as the new innermost in-progress file.
    pub fn enter(&mut self, path: PathBuf, requires: Vec<PathBuf>, payload: T) -> Result<()> {
        self.check_cycle(&path)?;
        self.in_progress.insert(path.clone());
        self.frames.push(Frame {
            path,
            pending: requires.into(),
            payload,
        });
        Ok(())
    }

    /// Next unvisited require of the innermost file.
    pub fn next_require(&mut self) -> Option<PathBuf> {
        self.frames.last_mut().and_then(|frame| frame.pending.pop_front())
    }

    /// Pop the innermost file once all of its requires are visited.
    pub fn leave(&mut self) -> Option<(PathBuf, T)> {
        let frame = self.frames.pop()?;
        self.in_progress.remove(&frame.path);
        Some((frame.path, frame.payload))
    }
}

impl<T> Default for RequireStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
