//! Context - per-file compile state and the directive API
//!
//! A `Context` is built for every file processed during a request: the
//! top-level file and each file it requires. All of them borrow the same
//! request-wide [`Concatenation`], so deduplication is global to the request.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::concatenation::Concatenation;
use crate::error::{AssetError, Result};
use crate::pipeline::Environment;

/// Read-only view of a context's positional metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub pathname: PathBuf,
    pub root_path: PathBuf,
    pub logical_path: String,
    pub content_type: String,
}

pub struct Context<'a> {
    environment: &'a Environment,
    concatenation: &'a Concatenation,
    pathname: PathBuf,
    root_path: PathBuf,
    logical_path: String,
    content_type: String,
    dependency_set: BTreeSet<PathBuf>,
    resolved: BTreeSet<PathBuf>,
    required: Vec<PathBuf>,
}

/// Directive side effects collected from a finished context.
#[derive(Debug, Default)]
pub(crate) struct Directives {
    pub dependency_set: BTreeSet<PathBuf>,
    pub resolved: BTreeSet<PathBuf>,
    pub required: Vec<PathBuf>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        environment: &'a Environment,
        concatenation: &'a Concatenation,
        snapshot: ContextSnapshot,
    ) -> Self {
        let mut dependency_set = BTreeSet::new();
        dependency_set.insert(snapshot.pathname.clone());
        Self {
            environment,
            concatenation,
            pathname: snapshot.pathname,
            root_path: snapshot.root_path,
            logical_path: snapshot.logical_path,
            content_type: snapshot.content_type,
            dependency_set,
            resolved: BTreeSet::new(),
            required: vec![],
        }
    }

    pub fn pathname(&self) -> &Path {
        &self.pathname
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn dependency_set(&self) -> &BTreeSet<PathBuf> {
        &self.dependency_set
    }

    /// Files already appended to this request's output.
    ///
    /// Read-only: processors add to the output through [`Context::require`],
    /// which schedules the file and lets the driver append it once its own
    /// requires are done.
    pub fn concatenation(&self) -> &Concatenation {
        self.concatenation
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            pathname: self.pathname.clone(),
            root_path: self.root_path.clone(),
            logical_path: self.logical_path.clone(),
            content_type: self.content_type.clone(),
        }
    }

    /// Resolve `reference` to an absolute path.
    ///
    /// `./` and `../` references are relative to this file. With a
    /// `content_type` constraint the result must have exactly that type.
    pub fn resolve(&mut self, reference: &str, content_type: Option<&str>) -> Result<PathBuf> {
        let environment = self.environment;
        let base = self.pathname.parent();

        let path = match content_type {
            None => environment.resolve_reference(reference, base, |_| true)?,
            Some(expected) => {
                if let Some(actual) = environment.declared_content_type(reference) {
                    if actual != expected {
                        return Err(AssetError::ContentTypeMismatch {
                            path: reference.to_string(),
                            expected: expected.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                }
                environment.resolve_with_content_type(reference, base, expected)?
            }
        };

        self.resolved.insert(path.clone());
        Ok(path)
    }

    /// Record that the output depends on `path` without embedding it.
    pub fn depend_on(&mut self, path: impl Into<PathBuf>) {
        self.dependency_set.insert(path.into());
    }

    /// Include the compiled body of `reference` ahead of this file's output.
    ///
    /// The target must have this file's content type. Requiring a file that
    /// is already part of the request output is a no-op. This is the only way
    /// a processor extends the request's concatenation.
    pub fn require(&mut self, reference: &str) -> Result<PathBuf> {
        let content_type = self.content_type.clone();
        let path = self.resolve(reference, Some(&content_type))?;
        self.dependency_set.insert(path.clone());

        if self.concatenation.contains(&path) || self.required.contains(&path) {
            debug!(path = %path.display(), "require already satisfied");
        } else {
            debug!(from = %self.pathname.display(), path = %path.display(), "require scheduled");
            self.required.push(path.clone());
        }
        Ok(path)
    }

    /// Call a helper from the environment's extension table.
    pub fn helper(&mut self, name: &str, argument: &str) -> Result<String> {
        let environment = self.environment;
        let helper = environment
            .helpers()
            .get(name)
            .ok_or_else(|| AssetError::UnknownHelper { name: name.to_string() })?;
        helper(self, argument)
    }

    pub(crate) fn into_directives(self) -> Directives {
        Directives {
            dependency_set: self.dependency_set,
            resolved: self.resolved,
            required: self.required,
        }
    }
}
