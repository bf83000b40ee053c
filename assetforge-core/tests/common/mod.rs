//! Test processors shared by the integration suites.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use regex::{Captures, Regex};
use serde::Deserialize;

use assetforge_core::helpers::encode64;
use assetforge_core::{
    AssetError, Context, ContextSnapshot, Environment, Locals, Processor, ProcessorFactory, Result,
};

pub fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/context")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixture_root().join(name)
}

pub fn fixture_env() -> Environment {
    Environment::with_paths([fixture_root()])
}

fn replace_all(
    pattern: &Regex,
    data: &str,
    mut replacement: impl FnMut(&Captures<'_>) -> Result<String>,
) -> Result<String> {
    let mut out = String::with_capacity(data.len());
    let mut last = 0;
    for caps in pattern.captures_iter(data) {
        let whole = caps.get(0).expect("group 0 always matches");
        out.push_str(&data[last..whole.start()]);
        out.push_str(&replacement(&caps)?);
        last = whole.end();
    }
    out.push_str(&data[last..]);
    Ok(out)
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    require: Vec<String>,
}

/// `.yml`: a manifest listing logical paths to require.
#[derive(Default)]
pub struct YamlManifest {
    manifest: Manifest,
}

impl Processor for YamlManifest {
    fn prepare(&mut self, data: &str) -> Result<()> {
        self.manifest = serde_yaml_ng::from_str(data).map_err(AssetError::processor)?;
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        for logical_path in &self.manifest.require {
            let filename = context.resolve(logical_path, None)?;
            context.require(&filename.to_string_lossy())?;
        }
        Ok(String::new())
    }
}

/// `.req`: each non-empty line is passed straight to `Context::require`.
#[derive(Default)]
pub struct RequireLines {
    references: Vec<String>,
}

impl Processor for RequireLines {
    fn prepare(&mut self, data: &str) -> Result<()> {
        self.references = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        for reference in &self.references {
            context.require(reference)?;
        }
        Ok(String::new())
    }
}

/// `.embed`: inlines `url("...")` references as base64 data URIs.
#[derive(Default)]
pub struct DataUri {
    data: String,
}

impl Processor for DataUri {
    fn prepare(&mut self, data: &str) -> Result<()> {
        self.data = data.to_string();
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        let pattern = Regex::new(r#"url\("(.+?)"\)"#).expect("valid pattern");
        replace_all(&pattern, &self.data, |caps| {
            let path = context.resolve(&caps[1], None)?;
            context.depend_on(path.clone());
            let bytes = fs::read(&path).map_err(|e| AssetError::io(&path, e))?;
            Ok(format!("url(data:image/png;base64,{})", encode64(&bytes)))
        })
    }
}

/// `.tmpl`: expands `<%= helper("arg") %>` through the context helper table.
#[derive(Default)]
pub struct HelperTemplate {
    data: String,
}

impl Processor for HelperTemplate {
    fn prepare(&mut self, data: &str) -> Result<()> {
        self.data = data.to_string();
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        let pattern = Regex::new(r#"<%=\s*(\w+)\("([^"]*)"\)\s*%>"#).expect("valid pattern");
        replace_all(&pattern, &self.data, |caps| context.helper(&caps[1], &caps[2]))
    }
}

/// `.props`: dumps the context snapshot as JSON.
#[derive(Default)]
pub struct Properties;

impl Processor for Properties {
    fn prepare(&mut self, _data: &str) -> Result<()> {
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        serde_json::to_string_pretty(&context.snapshot()).map_err(AssetError::processor)
    }
}

/// `.lookup`: each line is `reference` or `reference|content-type`; prints
/// the resolved path or the error message.
#[derive(Default)]
pub struct ResolveLines {
    lines: Vec<String>,
}

impl Processor for ResolveLines {
    fn prepare(&mut self, data: &str) -> Result<()> {
        self.lines = data.lines().map(str::to_string).collect();
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        let results: Vec<String> = self
            .lines
            .iter()
            .map(|line| {
                let (reference, content_type) = match line.split_once('|') {
                    Some((reference, content_type)) => (reference, Some(content_type)),
                    None => (line.as_str(), None),
                };
                match context.resolve(reference, content_type) {
                    Ok(path) => path.display().to_string(),
                    Err(err) => err.to_string(),
                }
            })
            .collect();
        Ok(results.join(",\n"))
    }
}

/// `.fail`: always fails in `evaluate`.
#[derive(Default)]
pub struct Failing;

impl Processor for Failing {
    fn prepare(&mut self, _data: &str) -> Result<()> {
        Ok(())
    }

    fn evaluate(&self, _context: &mut Context<'_>, _locals: &Locals) -> Result<String> {
        Err(AssetError::processor("unterminated block"))
    }
}

/// Passes data through and records every evaluation.
#[derive(Clone, Default)]
pub struct Recorder {
    pub evaluations: Arc<AtomicUsize>,
    pub contexts: Arc<Mutex<Vec<ContextSnapshot>>>,
    pub locals: Arc<Mutex<Vec<Locals>>>,
    /// Paths already in the request output at each evaluation.
    pub included: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl Recorder {
    pub fn count(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn factory(&self) -> Arc<dyn ProcessorFactory> {
        Arc::new(self.clone())
    }
}

impl ProcessorFactory for Recorder {
    fn create(&self) -> Box<dyn Processor> {
        Box::new(Recording {
            recorder: self.clone(),
            data: String::new(),
        })
    }
}

struct Recording {
    recorder: Recorder,
    data: String,
}

impl Processor for Recording {
    fn prepare(&mut self, data: &str) -> Result<()> {
        self.data = data.to_string();
        Ok(())
    }

    fn evaluate(&self, context: &mut Context<'_>, locals: &Locals) -> Result<String> {
        self.recorder.evaluations.fetch_add(1, Ordering::SeqCst);
        self.recorder
            .contexts
            .lock()
            .expect("recorder lock")
            .push(context.snapshot());
        self.recorder
            .locals
            .lock()
            .expect("recorder lock")
            .push(locals.clone());
        self.recorder
            .included
            .lock()
            .expect("recorder lock")
            .push(context.concatenation().paths().map(PathBuf::from).collect());
        Ok(self.data.clone())
    }
}
