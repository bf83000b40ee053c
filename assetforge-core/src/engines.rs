//! Engine Registry - extension to processor mapping

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::content_types::normalize_extension;
use crate::context::Context;
use crate::error::Result;

/// Template variables handed to every stage.
pub type Locals = BTreeMap<String, serde_json::Value>;

/// A single transformation stage.
///
/// `prepare` receives the raw input of the stage; `evaluate` produces the
/// stage output. Processors are created fresh for every invocation.
pub trait Processor {
    fn prepare(&mut self, data: &str) -> Result<()>;
    fn evaluate(&self, context: &mut Context<'_>, locals: &Locals) -> Result<String>;
}

pub trait ProcessorFactory: Send + Sync {
    fn create(&self) -> Box<dyn Processor>;
}

impl<F> ProcessorFactory for F
where
    F: Fn() -> Box<dyn Processor> + Send + Sync,
{
    fn create(&self) -> Box<dyn Processor> {
        self()
    }
}

/// Extensions peeled from a filename.
#[derive(Clone)]
pub struct ExtensionChain {
    /// Filename with every consumed extension removed.
    pub stem: String,
    /// First unregistered extension, if any. Determines the content type.
    pub format_extension: Option<String>,
    /// Registered stages, innermost (rightmost) first.
    pub engines: Vec<(String, Arc<dyn ProcessorFactory>)>,
}

impl ExtensionChain {
    pub fn engine_extensions(&self) -> Vec<&str> {
        self.engines.iter().map(|(ext, _)| ext.as_str()).collect()
    }
}

impl fmt::Debug for ExtensionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionChain")
            .field("stem", &self.stem)
            .field("format_extension", &self.format_extension)
            .field("engines", &self.engine_extensions())
            .finish()
    }
}

/// Engine registry - owned by an `Environment`, never global
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn ProcessorFactory>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `extension` with `factory`. Re-registration replaces the previous factory.
    pub fn register(&mut self, extension: &str, factory: Arc<dyn ProcessorFactory>) {
        self.engines.insert(normalize_extension(extension), factory);
    }

    pub fn register_type<P>(&mut self, extension: &str)
    where
        P: Processor + Default + 'static,
    {
        let factory = || Box::new(P::default()) as Box<dyn Processor>;
        self.register(extension, Arc::new(factory));
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn ProcessorFactory>> {
        self.engines.get(&normalize_extension(extension))
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<_> = self.engines.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Peel extensions right-to-left while each one is registered.
    pub fn resolve_chain(&self, filename: &str) -> ExtensionChain {
        let mut remaining = filename;
        let mut engines = vec![];
        let mut format_extension = None;

        while let Some(idx) = remaining.rfind('.').filter(|&idx| idx > 0) {
            let extension = &remaining[idx..];
            remaining = &remaining[..idx];
            match self.get(extension) {
                Some(factory) => engines.push((normalize_extension(extension), Arc::clone(factory))),
                None => {
                    format_extension = Some(normalize_extension(extension));
                    break;
                }
            }
        }

        ExtensionChain {
            stem: remaining.to_string(),
            format_extension,
            engines,
        }
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}
