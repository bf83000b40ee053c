//! Path Resolver - ordered search roots, first match wins

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{AssetError, Result};

/// Locates source files for a reference.
pub trait PathResolver: Send + Sync {
    /// Every file `reference` could name, in precedence order.
    ///
    /// References starting with `./` or `../` are relative to `base`; all
    /// others are looked up in the search roots.
    fn candidates(&self, reference: &str, base: Option<&Path>) -> Result<Vec<PathBuf>>;

    /// The search root that contains `pathname`.
    fn root_of(&self, pathname: &Path) -> Option<PathBuf>;
}

/// Lexically normalize a path, folding `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn is_relative_reference(reference: &str) -> bool {
    reference.starts_with("./") || reference.starts_with("../")
}

#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    roots: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            roots: roots.into_iter().map(|r| normalize(r.as_ref())).collect(),
        }
    }

    pub fn push(&mut self, root: impl AsRef<Path>) {
        self.roots.push(normalize(root.as_ref()));
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn scan(target: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        if target.is_file() && !found.iter().any(|f| f == target) {
            found.push(target.to_path_buf());
        }

        let (Some(dir), Some(name)) = (target.parent(), target.file_name()) else {
            return Ok(());
        };
        if !dir.is_dir() {
            return Ok(());
        }

        let prefix = format!("{}.", name.to_string_lossy());
        let mut matches = vec![];
        for entry in fs::read_dir(dir).map_err(|e| AssetError::io(dir, e))? {
            let entry = entry.map_err(|e| AssetError::io(dir, e))?;
            let path = entry.path();
            let matches_prefix = entry
                .file_name()
                .to_str()
                .map_or(false, |n| n.starts_with(&prefix));
            if matches_prefix && path.is_file() {
                matches.push(path);
            }
        }
        matches.sort();

        for path in matches {
            if !found.contains(&path) {
                found.push(path);
            }
        }
        Ok(())
    }
}

impl PathResolver for SearchPaths {
    fn candidates(&self, reference: &str, base: Option<&Path>) -> Result<Vec<PathBuf>> {
        let reference_path = Path::new(reference);
        let targets: Vec<PathBuf> = if reference_path.is_absolute() {
            vec![normalize(reference_path)]
        } else if is_relative_reference(reference) {
            base.map(|b| normalize(&b.join(reference))).into_iter().collect()
        } else {
            self.roots.iter().map(|root| normalize(&root.join(reference))).collect()
        };

        let mut found = vec![];
        for target in &targets {
            Self::scan(target, &mut found)?;
        }
        Ok(found)
    }

    fn root_of(&self, pathname: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .find(|root| pathname.starts_with(root))
            .cloned()
    }
}
