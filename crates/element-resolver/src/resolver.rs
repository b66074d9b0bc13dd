//! Single-slot page cache and locator resolution

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::ResolverError;
use crate::locator::{canonical_xpath, Locator};
use crate::page::RenderedPage;
use crate::renderer::PageRenderer;
use crate::sink::{ErrorSink, ResolveFailure};

/// Last page built by a resolver instance.
struct CachedPage {
    html: String,
    page: RenderedPage,
    /// canonical xpath -> bid, built lazily on the first `resolve` after a rebuild
    index: Option<HashMap<String, String>>,
}

/// Counters describing how a resolver instance has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub renders: u64,
    pub cache_hits: u64,
    pub resolved: u64,
    pub misses: u64,
}

/// Converts page snapshots into AX trees and resolves structural locators to bids.
///
/// The cache holds exactly one page (the most recently built one). Pages whose
/// tree was recorded alongside the HTML are only [staged](Self::stage) and built
/// the first time a locator has to be resolved against them. An instance
/// must not be shared between concurrently rendering episodes; give each worker
/// its own resolver and share only the [`ErrorSink`].
pub struct ElementResolver {
    renderer: Arc<dyn PageRenderer>,
    sink: Arc<ErrorSink>,
    slot: Option<CachedPage>,
    /// HTML of the latest page, when it differs from the one in `slot`.
    pending: Option<String>,
    stats: ResolverStats,
}

impl ElementResolver {
    pub fn new(renderer: Arc<dyn PageRenderer>, sink: Arc<ErrorSink>) -> Self {
        Self {
            renderer,
            sink,
            slot: None,
            pending: None,
            stats: ResolverStats::default(),
        }
    }

    /// Return the AX tree for `html`, invoking the renderer only when `html`
    /// differs from the last page built by this instance.
    ///
    /// A renderer failure empties the slot and is recorded in the error sink.
    pub fn build_tree(&mut self, episode_id: &str, html: &str) -> Result<String, ResolverError> {
        self.pending = None;
        if let Some(cached) = self.slot.as_ref() {
            if cached.html == html {
                self.stats.cache_hits += 1;
                debug!(episode = episode_id, "page tree cache hit");
                return Ok(cached.page.axtree.clone());
            }
        }

        self.stats.renders += 1;
        match self.renderer.render(html) {
            Ok(page) => {
                debug!(
                    episode = episode_id,
                    elements = page.elements.len(),
                    "page tree rebuilt"
                );
                let axtree = page.axtree.clone();
                self.slot = Some(CachedPage {
                    html: html.to_string(),
                    page,
                    index: None,
                });
                Ok(axtree)
            }
            Err(err) => {
                self.slot = None;
                info!(episode = episode_id, error = %err, "page tree build failed");
                self.sink.record(ResolveFailure::page_build(episode_id, &err));
                Err(err)
            }
        }
    }

    /// Mark `html` as the latest page without rendering it. The renderer runs
    /// on the next [`resolve`](Self::resolve), and not at all when no locator
    /// follows.
    pub fn stage(&mut self, html: &str) {
        let current = self.slot.as_ref().map_or(false, |cached| cached.html == html);
        self.pending = if current { None } else { Some(html.to_string()) };
    }

    /// Resolve `locator` against the latest page, building a staged page first.
    /// Misses are soft: they are recorded in the error sink and `None` is
    /// returned.
    pub fn resolve(&mut self, episode_id: &str, locator: &str) -> Option<String> {
        if let Some(html) = self.pending.take() {
            if self.build_tree(episode_id, &html).is_err() {
                debug!(episode = episode_id, locator, "staged page could not be built");
            }
        }
        match self.try_resolve(locator) {
            Ok(bid) => {
                self.stats.resolved += 1;
                debug!(episode = episode_id, locator, bid = %bid, "locator resolved");
                Some(bid)
            }
            Err(err) => {
                self.stats.misses += 1;
                info!(episode = episode_id, locator, error = %err, "locator unresolved");
                self.sink
                    .record(ResolveFailure::new(episode_id, locator, &err));
                None
            }
        }
    }

    fn try_resolve(&mut self, raw: &str) -> Result<String, ResolverError> {
        let cached = self.slot.as_mut().ok_or(ResolverError::NoTree)?;
        let locator = Locator::parse(raw)?;
        match &locator {
            Locator::Absolute(_) => {
                let index = cached
                    .index
                    .get_or_insert_with(|| index_elements(&cached.page));
                index
                    .get(&locator.canonical())
                    .cloned()
                    .ok_or_else(|| ResolverError::NotFound(raw.to_string()))
            }
            Locator::Attribute { .. } => cached
                .page
                .elements
                .iter()
                .find(|element| locator.matches(element))
                .map(|element| element.bid.clone())
                .ok_or_else(|| ResolverError::NotFound(raw.to_string())),
        }
    }

    /// Whether a staged page is waiting to be built.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Page currently held in the cache slot.
    pub fn current_page(&self) -> Option<&RenderedPage> {
        self.slot.as_ref().map(|cached| &cached.page)
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn sink(&self) -> &Arc<ErrorSink> {
        &self.sink
    }
}

fn index_elements(page: &RenderedPage) -> HashMap<String, String> {
    let mut index = HashMap::with_capacity(page.elements.len());
    for element in &page.elements {
        if let Some(key) = canonical_xpath(&element.xpath) {
            // first element in document order wins
            index.entry(key).or_insert_with(|| element.bid.clone());
        }
    }
    index
}
