//! AssetForge Core - Asset Compiler
//!
//! # Guarantees
//! 1. One Request, One Output: every request owns its concatenation and is dropped with it
//! 2. Each Required File Appears Once, in depth-first discovery order
//! 3. Cycles Fail Loudly, never truncate
//! 4. Content Types Are Checked, never guessed
//! 5. Every Touched File Is a Cache Dependency
//! 6. Same Tree, Same Bytes

pub mod error;
pub mod content_types;
pub mod engines;
pub mod resolver;
pub mod concatenation;
pub mod context;
pub mod helpers;
pub mod hashing;
pub mod asset;
pub mod cache;
pub mod config;
pub mod pipeline;

pub use error::{AssetError, Result};
pub use content_types::ContentTypes;
pub use engines::{EngineRegistry, ExtensionChain, Locals, Processor, ProcessorFactory};
pub use resolver::{PathResolver, SearchPaths};
pub use concatenation::Concatenation;
pub use context::{Context, ContextSnapshot};
pub use helpers::{Helper, Helpers};
pub use hashing::{cache_key, canonical_json, sha256_hex};
pub use asset::Asset;
pub use cache::{CacheStore, MemoryCache};
pub use config::EnvironmentConfig;
pub use pipeline::Environment;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
