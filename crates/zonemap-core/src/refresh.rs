//! Periodic registry refresh with stale-response protection.
//!
//! Every cycle takes a generation number when it starts. When its fetch completes, the new
//! registry is published only if no newer cycle has started in the meantime; otherwise it is
//! dropped. A failed cycle leaves the published registry untouched.

use crate::registry::Registry;
use crate::{Engine, Error, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Where feed text comes from. Implementations decide the transport; the returned future must
/// not borrow the source so a cycle can be started before it is awaited.
pub trait FeedSource: Send + Sync {
    fn describe(&self) -> String;

    fn fetch(&self) -> BoxFuture<'static, Result<String>>;
}

/// Reads the feed from a file on every fetch.
///
/// The read is a blocking `std::fs` call made when the future is polled. That is fine under
/// `futures::executor::block_on`; on a shared async runtime, wrap the source or move the fetch
/// onto a blocking thread.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> BoxFuture<'static, Result<String>> {
        let path = self.path.clone();
        async move { std::fs::read_to_string(path).map_err(Error::from) }.boxed()
    }
}

/// Serves whatever text was last stored; handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    text: Arc<RwLock<Option<String>>>,
}

impl MemorySource {
    pub fn new(text: impl Into<String>) -> Self {
        let source = Self::default();
        source.set(text);
        source
    }

    pub fn set(&self, text: impl Into<String>) {
        let mut slot = self.text.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(text.into());
    }

    pub fn clear(&self) {
        let mut slot = self.text.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl FeedSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn fetch(&self) -> BoxFuture<'static, Result<String>> {
        let text = self
            .text
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        async move {
            text.ok_or_else(|| Error::Source {
                message: "no feed text available".to_string(),
            })
        }
        .boxed()
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Published(Arc<Registry>),
    /// A newer cycle started (or was published) before this one finished.
    Superseded { generation: u64, newest: u64 },
    Failed { generation: u64, error: Error },
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

pub struct Refresher<S> {
    engine: Engine,
    source: S,
    started: AtomicU64,
    published: RwLock<Option<Arc<Registry>>>,
}

impl<S: FeedSource> Refresher<S> {
    pub fn new(engine: Engine, source: S) -> Self {
        Self {
            engine,
            source,
            started: AtomicU64::new(0),
            published: RwLock::new(None),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Generation of the most recently started cycle (0 before the first).
    pub fn started_generation(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// The registry renderers should use, if any cycle has succeeded yet.
    pub fn latest(&self) -> Option<Arc<Registry>> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Starts a cycle now and returns a future that completes it.
    ///
    /// The generation is taken and the fetch is issued before the future is first polled, so
    /// cycle order is call order regardless of when each future is awaited.
    pub fn refresh(&self) -> impl Future<Output = CycleOutcome> + '_ {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, source = %self.source.describe(), "starting refresh cycle");
        let fetch = self.source.fetch();
        async move {
            let text = match fetch.await {
                Ok(text) => text,
                Err(error) => return self.fail(generation, error),
            };
            match self.engine.build_registry_at(&text, generation) {
                Ok(registry) => self.publish(registry),
                Err(error) => self.fail(generation, error),
            }
        }
    }

    fn publish(&self, registry: Registry) -> CycleOutcome {
        let generation = registry.generation();
        let newest = self.started.load(Ordering::SeqCst);
        if generation != newest {
            tracing::warn!(generation, newest, "discarding response from superseded cycle");
            return CycleOutcome::Superseded { generation, newest };
        }

        let mut slot = self.published.write().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = slot.as_ref() {
            if current.generation() >= generation {
                let newest = current.generation();
                tracing::warn!(
                    generation,
                    newest,
                    "discarding response older than published registry"
                );
                return CycleOutcome::Superseded { generation, newest };
            }
        }
        let registry = Arc::new(registry);
        *slot = Some(Arc::clone(&registry));
        tracing::info!(
            generation,
            zones = registry.len(),
            rows_without_id = registry.report().rows_without_id,
            "published zone registry"
        );
        CycleOutcome::Published(registry)
    }

    fn fail(&self, generation: u64, error: Error) -> CycleOutcome {
        tracing::warn!(
            generation,
            source = %self.source.describe(),
            error = %error,
            "refresh cycle failed; keeping previous registry"
        );
        CycleOutcome::Failed { generation, error }
    }
}
