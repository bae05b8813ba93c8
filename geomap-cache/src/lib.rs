//! Session resource cache for Geomap.
//!
//! The cache has two stores:
//!
//! - the **primary** store holds one parsed [`Resource`] per resolved source
//!   identifier (a path under the example directory, or a URL);
//! - the **object** store memoizes anything derived from those resources,
//!   under composite keys that can be invalidated by substring.
//!
//! Reads from the primary store always hand out a deep copy, so a handler
//! that edits its table never changes what the next handler sees.
//!
//! # Architecture
//!
//! `Rc<RefCell<..>>` shared state for a single-threaded session: clones of a
//! [`ResourceCache`] share the same stores, while separate sessions create
//! separate caches. Borrows are never held across an `.await`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use geomap_cache::{CacheConfig, LoadOptions, LoadOutcome, ResourceCache, SourceMode};
//! use geomap_cache::progress::NoProgress;
//!
//! # async fn demo() -> geomap_core::Result<()> {
//! let cache = ResourceCache::new(CacheConfig::default());
//! let outcome = cache
//!     .load(SourceMode::Example, &["example6.csv".to_string()], &LoadOptions::default(), &mut NoProgress)
//!     .await?;
//! if let LoadOutcome::Loaded(loaded) = outcome {
//!     println!("{} resources", loaded.resources.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod fetch;
pub mod handler;
pub mod objects;
pub mod progress;
pub mod resource;
pub mod spreadsheet;

pub use handler::{DataHandler, DefaultHandler, SpreadsheetReader};
pub use resource::Resource;
pub use spreadsheet::CalamineReader;

use geomap_core::{ErrorClass, Result};
use objects::{composite_key, ObjectStore};
use progress::Progress;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Rc;

/// Where example files come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Project name, used to build the remote example directory.
    pub project: String,
    /// Directory prefix for examples when running natively.
    pub local_base: String,
    /// Root URL for examples when sandboxed.
    pub remote_root: String,
    /// Sandboxed (browser) execution: examples are downloaded, and
    /// blacklisted extensions are refused.
    pub sandboxed: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            project: "geomap".to_string(),
            local_base: "../example_input/".to_string(),
            remote_root: "https://raw.githubusercontent.com/wishartlab/agmaps/main".to_string(),
            sandboxed: false,
        }
    }
}

impl CacheConfig {
    /// Default directory (or URL prefix) that example names are resolved against.
    pub fn source(&self) -> String {
        if self.sandboxed {
            format!("{}/{}/example_input/", self.remote_root, self.project)
        } else {
            self.local_base.clone()
        }
    }
}

/// How the user picked the file(s) being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Named example files, resolved against a base directory or URL.
    Example,
    /// Uploaded bytes; these go through [`ResourceCache::ingest`] instead.
    Upload,
    /// Anything an application handles by itself.
    Other(String),
}

/// Per-call load options.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Base directory or URL prefix; `None` uses [`CacheConfig::source`].
    pub source: Option<String>,
    /// Whether this load may run at all in a sandbox.
    pub sandbox_allowed: bool,
    /// Extensions that must not be fetched in a sandbox.
    pub sandbox_blacklist: Vec<String>,
    /// What is being loaded, for progress messages.
    pub label: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            source: None,
            sandbox_allowed: true,
            sandbox_blacklist: Vec::new(),
            label: "file".to_string(),
        }
    }
}

/// Resources produced by a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// Resolved identifier and a private copy of its resource, in request order.
    pub resources: Vec<(String, Resource)>,
    /// Files that could not be fetched; shown to the user, not fatal.
    pub failures: Vec<String>,
}

impl Loaded {
    pub fn get(&self, identifier: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, r)| r)
    }

    /// The first resource, for single-file selections.
    pub fn into_first(self) -> Option<(String, Resource)> {
        self.resources.into_iter().next()
    }
}

/// Result of [`ResourceCache::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Loaded),
    /// Example mode without a selection: use the caller's default value.
    NoSelection,
    /// Not a cacheable mode; nothing was loaded.
    NotCacheable,
    /// Refused by the sandbox.
    Forbidden,
    /// Every requested file failed to fetch.
    Unavailable(Vec<String>),
}

struct CacheInner {
    primary: HashMap<String, Resource>,
    objects: ObjectStore,
}

/// Per-session cache of parsed files and derived objects.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Rc<RefCell<CacheInner>>,
    handler: Rc<dyn DataHandler>,
    config: Rc<CacheConfig>,
}

impl ResourceCache {
    /// Create an empty cache using the [`DefaultHandler`].
    pub fn new(config: CacheConfig) -> Self {
        Self::with_handler(config, Rc::new(DefaultHandler::new()))
    }

    /// Create an empty cache with a custom handler.
    pub fn with_handler(config: CacheConfig, handler: Rc<dyn DataHandler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CacheInner {
                primary: HashMap::new(),
                objects: ObjectStore::default(),
            })),
            handler,
            config: Rc::new(config),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolve a user-facing file name to the identifier used as primary key.
    pub fn resolve(&self, name: &str, source: &str) -> String {
        if fetch::is_remote(name) {
            if self.config.sandboxed {
                name.to_string()
            } else {
                let file = name.rsplit('/').next().unwrap_or(name);
                format!("{}{}", source, file)
            }
        } else {
            format!("{}{}", source, name)
        }
    }

    /// Load one or more files.
    ///
    /// Only [`SourceMode::Example`] loads anything. Each file is resolved,
    /// fetched and parsed once per session; every call returns fresh copies.
    /// Fetch failures are collected and reported, parse failures propagate.
    pub async fn load(
        &self,
        mode: SourceMode,
        files: &[String],
        options: &LoadOptions,
        progress: &mut dyn Progress,
    ) -> Result<LoadOutcome> {
        if !options.sandbox_allowed && self.config.sandboxed {
            progress.close();
            return Ok(LoadOutcome::Forbidden);
        }
        if mode != SourceMode::Example {
            progress.close();
            return Ok(LoadOutcome::NotCacheable);
        }
        if files.is_empty() {
            progress.close();
            return Ok(LoadOutcome::NoSelection);
        }

        progress.inc(&format!("Fetching {}...", options.label));
        let source = options.source.clone().unwrap_or_else(|| self.config.source());

        let mut resolved = Vec::new();
        for name in files {
            if self.config.sandboxed
                && options
                    .sandbox_blacklist
                    .iter()
                    .any(|ext| name.ends_with(ext.as_str()))
            {
                log::warn!("[Geomap] cache: Skipping {} in sandbox", name);
                continue;
            }
            resolved.push(self.resolve(name, &source));
        }
        if resolved.is_empty() {
            progress.close();
            return Ok(LoadOutcome::Forbidden);
        }

        progress.inc(&format!("Handling {}", options.label));
        let mut loaded = Loaded {
            resources: Vec::new(),
            failures: Vec::new(),
        };
        for identifier in resolved {
            match self.fetch_resource(&identifier, progress).await {
                Ok(resource) => loaded.resources.push((identifier, resource)),
                Err(e) if e.class() == ErrorClass::Load => {
                    log::warn!("[Geomap] cache: {}", e);
                    loaded.failures.push(e.to_string());
                }
                Err(e) => {
                    progress.close();
                    return Err(e);
                }
            }
        }
        progress.close();

        if loaded.resources.is_empty() {
            return Ok(LoadOutcome::Unavailable(loaded.failures));
        }
        Ok(LoadOutcome::Loaded(loaded))
    }

    /// Fetch and cache an arbitrary identifier (path or URL), returning a copy.
    pub async fn download(&self, identifier: &str, progress: &mut dyn Progress) -> Result<Resource> {
        self.fetch_resource(identifier, progress).await
    }

    /// Parse uploaded bytes and store them under `identifier`, replacing any
    /// previous upload with the same identifier.
    pub fn ingest(&self, identifier: &str, bytes: &[u8], progress: &mut dyn Progress) -> Result<Resource> {
        let resource = self.handler.handle(identifier, bytes, progress)?;
        self.inner
            .borrow_mut()
            .primary
            .insert(identifier.to_string(), resource.clone());
        log::info!("[Geomap] cache: Stored upload {} as {}", identifier, resource.kind());
        Ok(resource)
    }

    /// A fresh copy of a cached resource.
    pub fn checkout(&self, identifier: &str) -> Option<Resource> {
        self.inner.borrow().primary.get(identifier).cloned()
    }

    pub fn is_cached(&self, identifier: &str) -> bool {
        self.inner.borrow().primary.contains_key(identifier)
    }

    /// Drop a primary entry so the next load parses the source again.
    pub fn evict(&self, identifier: &str) -> bool {
        self.inner.borrow_mut().primary.remove(identifier).is_some()
    }

    /// Store a derived object under the composite key of `inputs`.
    pub fn store<T: std::any::Any>(&self, value: T, inputs: &[&dyn Display]) {
        self.inner
            .borrow_mut()
            .objects
            .store(composite_key(inputs), value);
    }

    /// A copy of a derived object, if present.
    pub fn get<T: std::any::Any + Clone>(&self, inputs: &[&dyn Display]) -> Option<T> {
        self.inner.borrow().objects.get(&composite_key(inputs))
    }

    pub fn contains(&self, inputs: &[&dyn Display]) -> bool {
        self.inner.borrow().objects.contains(&composite_key(inputs))
    }

    /// Remove every derived object whose key contains `token`.
    pub fn invalidate(&self, token: &str) -> usize {
        let removed = self.inner.borrow_mut().objects.invalidate(token);
        if removed > 0 {
            log::debug!("[Geomap] cache: Invalidated {} objects for {}", removed, token);
        }
        removed
    }

    async fn fetch_resource(&self, identifier: &str, progress: &mut dyn Progress) -> Result<Resource> {
        if let Some(resource) = self.checkout(identifier) {
            return Ok(resource);
        }
        let bytes = fetch::fetch(identifier).await?;
        let resource = self.handler.handle(identifier, &bytes, progress)?;
        self.inner
            .borrow_mut()
            .primary
            .insert(identifier.to_string(), resource.clone());
        Ok(resource)
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
