//! Compilation Pipeline - Single Entry Point
//!
//! `Environment::find_asset` is the only way to produce an `Asset`. Each call
//! owns its concatenation and require stack; nothing leaks between requests.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info_span, trace, warn};
use uuid::Uuid;

use crate::asset::Asset;
use crate::cache::{CacheStore, MemoryCache};
use crate::concatenation::{Concatenation, RequireStack};
use crate::config::EnvironmentConfig;
use crate::content_types::ContentTypes;
use crate::context::{Context, ContextSnapshot, Directives};
use crate::engines::{EngineRegistry, ExtensionChain, Locals, Processor, ProcessorFactory};
use crate::error::{AssetError, Result};
use crate::hashing::cache_key;
use crate::helpers::Helpers;
use crate::resolver::{PathResolver, SearchPaths};

/// One file's pipeline output plus the directives its stages issued.
struct ProcessedFile {
    body: Vec<u8>,
    directives: Directives,
}

/// The compilation facade: registry, content types, helpers, resolver, cache.
pub struct Environment {
    resolver: Box<dyn PathResolver>,
    engines: EngineRegistry,
    content_types: ContentTypes,
    helpers: Helpers,
    locals: Locals,
    cache: Option<Arc<dyn CacheStore>>,
}

impl Environment {
    pub fn new(resolver: impl PathResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            engines: EngineRegistry::new(),
            content_types: ContentTypes::default(),
            helpers: Helpers::new(),
            locals: Locals::new(),
            cache: None,
        }
    }

    /// Environment over ordered search roots, without a cache.
    pub fn with_paths<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::new(SearchPaths::new(roots))
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        let mut environment = Self::with_paths(&config.paths);
        for (extension, mime_type) in &config.mime_types {
            environment.content_types.register(extension, mime_type.clone());
        }
        environment.locals = config.locals.clone();
        if config.cache {
            environment.cache = Some(Arc::new(MemoryCache::new()));
        }
        environment
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    pub fn register_engine(&mut self, extension: &str, factory: Arc<dyn ProcessorFactory>) {
        self.engines.register(extension, factory);
    }

    pub fn register_engine_type<P>(&mut self, extension: &str)
    where
        P: Processor + Default + 'static,
    {
        self.engines.register_type::<P>(extension);
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn register_mime_type(&mut self, extension: &str, mime_type: impl Into<String>) {
        self.content_types.register(extension, mime_type);
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    pub fn register_helper<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&mut Context<'_>, &str) -> Result<String> + Send + Sync + 'static,
    {
        self.helpers.register(name, helper);
    }

    pub fn set_locals(&mut self, locals: Locals) {
        self.locals = locals;
    }

    /// First candidate for `reference` accepted by `accept`.
    pub fn resolve_reference(
        &self,
        reference: &str,
        base: Option<&Path>,
        accept: impl Fn(&Path) -> bool,
    ) -> Result<PathBuf> {
        self.resolver
            .candidates(reference, base)?
            .into_iter()
            .find(|candidate| accept(candidate.as_path()))
            .ok_or_else(|| AssetError::NotFound {
                reference: reference.to_string(),
            })
    }

    /// First candidate for `reference` whose content type is `expected`.
    ///
    /// When nothing matches and some candidate has no content type at all,
    /// that lookup failure is reported instead of `NotFound`.
    pub(crate) fn resolve_with_content_type(
        &self,
        reference: &str,
        base: Option<&Path>,
        expected: &str,
    ) -> Result<PathBuf> {
        let mut unknown = None;
        for candidate in self.resolver.candidates(reference, base)? {
            match self.content_type_of(&candidate) {
                Ok(actual) if actual == expected => return Ok(candidate),
                Ok(_) => {}
                Err(err) => {
                    unknown.get_or_insert(err);
                }
            }
        }
        Err(unknown.unwrap_or_else(|| AssetError::NotFound {
            reference: reference.to_string(),
        }))
    }

    /// Content type of an existing source file, from its format extension.
    pub fn content_type_of(&self, pathname: &Path) -> Result<&str> {
        let filename = file_name(pathname);
        let chain = self.engines.resolve_chain(&filename);
        self.content_types
            .lookup(chain.format_extension.as_deref(), pathname)
    }

    /// Content type a reference names explicitly through its own extension.
    pub(crate) fn declared_content_type(&self, reference: &str) -> Option<&str> {
        let filename = file_name(Path::new(reference));
        let chain = self.engines.resolve_chain(&filename);
        chain
            .format_extension
            .as_deref()
            .and_then(|extension| self.content_types.get(extension))
    }

    /// Compile the asset requested as `path`.
    pub fn find_asset(&self, path: &str) -> Result<Asset> {
        let request_id = Uuid::new_v4();
        let span = info_span!("find_asset", %request_id, path);
        let _guard = span.enter();

        if let Some(asset) = self.cached(path) {
            debug!("cache hit");
            return Ok(asset);
        }

        let asset = self.build_asset(path).map_err(|err| {
            warn!(error = %err, "compile failed");
            err
        })?;

        if let Some(cache) = &self.cache {
            let key = cache_key(path, asset.dependency_set())?;
            cache.put(path, key, asset.clone());
        }
        debug!(length = asset.length(), dependencies = asset.dependency_set().len(), "compiled");
        Ok(asset)
    }

    fn cached(&self, path: &str) -> Option<Asset> {
        let cache = self.cache.as_ref()?;
        let dependencies = cache.dependencies(path)?;
        let key = cache_key(path, &dependencies).ok()?;
        let asset = cache.get(&key);
        if asset.is_none() {
            debug!("cache stale");
        }
        asset
    }

    fn build_asset(&self, path: &str) -> Result<Asset> {
        let pathname = self.resolve_reference(path, None, |_| true)?;
        let mut concatenation = Concatenation::new();
        let mut stack = RequireStack::new();
        let mut dependency_set = BTreeSet::new();

        let (snapshot, top) = self.process_file(&pathname, &concatenation)?;
        self.enter(&mut stack, &mut dependency_set, pathname, top)?;

        loop {
            match stack.next_require() {
                Some(required) => {
                    if concatenation.contains(&required) {
                        continue;
                    }
                    stack.check_cycle(&required)?;
                    let (_, processed) = self.process_file(&required, &concatenation)?;
                    self.enter(&mut stack, &mut dependency_set, required, processed)?;
                }
                None => match stack.leave() {
                    Some((finished, body)) => {
                        trace!(path = %finished.display(), "appended");
                        concatenation.push(finished, body);
                    }
                    None => break,
                },
            }
        }

        Ok(Asset::assemble(
            snapshot.logical_path,
            snapshot.pathname,
            snapshot.content_type,
            &concatenation,
            dependency_set,
        ))
    }

    fn enter(
        &self,
        stack: &mut RequireStack<Vec<u8>>,
        dependency_set: &mut BTreeSet<PathBuf>,
        pathname: PathBuf,
        processed: ProcessedFile,
    ) -> Result<()> {
        let Directives {
            dependency_set: depends,
            resolved,
            required,
        } = processed.directives;
        dependency_set.extend(depends);
        dependency_set.extend(resolved);
        stack.enter(pathname, required, processed.body)
    }

    /// Run one file through its extension chain.
    fn process_file(
        &self,
        pathname: &Path,
        concatenation: &Concatenation,
    ) -> Result<(ContextSnapshot, ProcessedFile)> {
        let chain = self.engines.resolve_chain(&file_name(pathname));
        let content_type = self
            .content_types
            .lookup(chain.format_extension.as_deref(), pathname)?
            .to_string();
        let root_path = self
            .resolver
            .root_of(pathname)
            .or_else(|| pathname.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        let snapshot = ContextSnapshot {
            pathname: pathname.to_path_buf(),
            logical_path: logical_path(pathname, &root_path, &chain),
            root_path,
            content_type,
        };

        let mut context = Context::new(self, concatenation, snapshot.clone());
        let body = if chain.engines.is_empty() {
            // Static files pass through untouched, binary ones included.
            fs::read(pathname).map_err(|e| AssetError::io(pathname, e))?
        } else {
            let data = fs::read_to_string(pathname).map_err(|e| AssetError::io(pathname, e))?;
            self.run_chain(&chain, data, &mut context)?.into_bytes()
        };

        Ok((
            snapshot,
            ProcessedFile {
                body,
                directives: context.into_directives(),
            },
        ))
    }

    /// Execute the chain innermost-first, threading one context through every stage.
    fn run_chain(&self, chain: &ExtensionChain, data: String, context: &mut Context<'_>) -> Result<String> {
        let mut data = data;
        for (extension, factory) in &chain.engines {
            trace!(extension = %extension, pathname = %context.pathname().display(), "stage");
            let mut processor = factory.create();
            processor
                .prepare(&data)
                .map_err(|err| err.at_stage(context.pathname(), extension))?;
            data = processor
                .evaluate(context, &self.locals)
                .map_err(|err| err.at_stage(context.pathname(), extension))?;
        }
        Ok(data)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("engines", &self.engines)
            .field("helpers", &self.helpers)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path relative to its root with every consumed extension stripped.
fn logical_path(pathname: &Path, root_path: &Path, chain: &ExtensionChain) -> String {
    let relative = pathname.strip_prefix(root_path).unwrap_or(pathname);
    let mut parts: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(|dir| dir.components())
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.push(chain.stem.clone());
    parts.join("/")
}
