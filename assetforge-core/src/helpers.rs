//! Context helpers - named functions made available to every Context

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

use base64::Engine;

use crate::context::Context;
use crate::error::{AssetError, Result};

/// A named helper: receives the calling context and one argument.
pub type Helper = Arc<dyn Fn(&mut Context<'_>, &str) -> Result<String> + Send + Sync>;

const ENCODED_LINE_WIDTH: usize = 60;

#[derive(Clone, Default)]
pub struct Helpers {
    helpers: BTreeMap<String, Helper>,
}

impl Helpers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&mut Context<'_>, &str) -> Result<String> + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }
}

impl fmt::Debug for Helpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Base64 in 60-column lines, each terminated by a newline.
pub fn encode64(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / ENCODED_LINE_WIDTH + 1);
    for line in encoded.as_bytes().chunks(ENCODED_LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push('\n');
    }
    out
}

/// Inline the referenced file as base64 and depend on it.
pub fn datauri(context: &mut Context<'_>, reference: &str) -> Result<String> {
    let path = context.resolve(reference, None)?;
    context.depend_on(path.clone());
    let data = fs::read(&path).map_err(|e| AssetError::io(&path, e))?;
    Ok(encode64(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode64_wraps_at_sixty_columns() {
        let data = vec![0u8; 90];
        let encoded = encode64(&data);
        let lines: Vec<_> = encoded.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 60);
        assert_eq!(lines[1].len(), 60);
        assert!(encoded.ends_with('\n'));
    }

    #[test]
    fn encode64_of_nothing_is_empty() {
        assert_eq!(encode64(&[]), "");
        assert_eq!(encode64(b"hi"), "aGk=\n");
    }

    #[test]
    fn registered_helpers_are_listed() {
        let mut helpers = Helpers::new();
        helpers.register("datauri", datauri);
        helpers.register("shout", |_context: &mut Context<'_>, arg: &str| Ok(arg.to_uppercase()));
        assert_eq!(helpers.names().collect::<Vec<_>>(), vec!["datauri", "shout"]);
        assert!(helpers.get("missing").is_none());
    }
}
