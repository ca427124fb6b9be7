//! Attachment resolution with a cache scoped to one render pass.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::join_all;
use log::{debug, warn};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Payloads larger than this are served from the public attachment route
/// instead of being inlined, when the resolver knows that route.
pub const INLINE_LIMIT: usize = 2 * 1024 * 1024;

/// Raw bytes returned by the attachment source.
#[derive(Debug, Clone)]
pub struct AttachmentPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Anything that can turn an attachment id into its binary payload.
pub trait AttachmentFetcher {
    fn fetch_attachment(
        &self,
        id: &str,
    ) -> impl Future<Output = anyhow::Result<AttachmentPayload>>;
}

/// Outcome of resolving one attachment id.
///
/// `url` is the handle written into the document. `public_url` is a
/// shareable address for the same attachment and is only set when the
/// resolver was given a public base. `payload` carries the fetched bytes and
/// is empty on cache hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub url: Option<String>,
    pub public_url: Option<String>,
    pub payload: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl Attachment {
    fn cached(id: &str, url: String, public_url: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            url: Some(url),
            public_url,
            payload: None,
            error: None,
        }
    }

    fn failed(id: &str, error: String) -> Self {
        Self {
            id: id.to_string(),
            url: None,
            public_url: None,
            payload: None,
            error: Some(error),
        }
    }
}

/// Build the local resource handle for a payload.
pub fn data_url(payload: &AttachmentPayload) -> String {
    format!("data:{};base64,{}", payload.mime(), STANDARD.encode(&payload.bytes))
}

impl AttachmentPayload {
    /// Content type without parameters, or the octet-stream fallback.
    pub fn mime(&self) -> &str {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
            .filter(|ct| !ct.is_empty())
            .unwrap_or(FALLBACK_MIME)
    }
}

/// Memoizes attachment handles for the lifetime of one render pass.
///
/// Successful resolutions are cached by id; failures are not, so a later
/// pass retries them. Dropping the resolver releases every handle.
pub struct MediaResolver<'a, F> {
    fetcher: &'a F,
    handles: HashMap<String, String>,
    public_base: Option<String>,
    fetches: usize,
}

impl<'a, F: AttachmentFetcher> MediaResolver<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            handles: HashMap::new(),
            public_base: None,
            fetches: 0,
        }
    }

    /// Publish attachments under `base`, as `{base}/{id}`.
    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.public_base = Some(base.trim_end_matches('/').to_string());
        self
    }

    fn public_url(&self, id: &str) -> Option<String> {
        public_url(self.public_base.as_deref(), id)
    }

    pub async fn resolve(&mut self, id: &str) -> Attachment {
        if let Some(url) = self.handles.get(id) {
            return Attachment::cached(id, url.clone(), self.public_url(id));
        }

        self.fetches += 1;
        let attachment = fetch_one(self.fetcher, self.public_base.as_deref(), id).await;
        if let Some(url) = &attachment.url {
            self.handles.insert(id.to_string(), url.clone());
        }
        attachment
    }

    /// Resolve many ids at once. Duplicate ids share one fetch, cached ids
    /// are served without one, and every miss is fetched concurrently. The
    /// cache is only written after all fetches have completed.
    pub async fn resolve_all(&mut self, ids: &[String]) -> HashMap<String, Attachment> {
        let mut seen = HashSet::new();
        let mut results = HashMap::new();
        let mut misses = Vec::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match self.handles.get(id) {
                Some(url) => {
                    let cached = Attachment::cached(id, url.clone(), self.public_url(id));
                    results.insert(id.clone(), cached);
                }
                None => misses.push(id.as_str()),
            }
        }

        if misses.is_empty() {
            return results;
        }

        debug!("resolving {} attachment(s)", misses.len());
        self.fetches += misses.len();
        let fetcher = self.fetcher;
        let public_base = self.public_base.as_deref();
        let fetched = join_all(misses.iter().map(|id| fetch_one(fetcher, public_base, id))).await;

        for attachment in fetched {
            if let Some(url) = &attachment.url {
                self.handles.insert(attachment.id.clone(), url.clone());
            }
            results.insert(attachment.id.clone(), attachment);
        }

        results
    }

    /// Number of remote fetches issued so far in this pass.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    pub fn cached(&self) -> usize {
        self.handles.len()
    }

    /// Drop every handle created during the pass and return how many there
    /// were.
    pub fn release(&mut self) -> usize {
        let released = self.handles.len();
        self.handles.clear();
        if released > 0 {
            debug!("released {released} attachment handle(s)");
        }
        released
    }
}

impl<F> Drop for MediaResolver<'_, F> {
    fn drop(&mut self) {
        self.handles.clear();
    }
}

fn public_url(base: Option<&str>, id: &str) -> Option<String> {
    base.map(|base| format!("{base}/{id}"))
}

async fn fetch_one<F: AttachmentFetcher>(
    fetcher: &F,
    public_base: Option<&str>,
    id: &str,
) -> Attachment {
    match fetcher.fetch_attachment(id).await {
        Ok(payload) => {
            let public_url = public_url(public_base, id);
            let url = match &public_url {
                Some(public) if payload.bytes.len() > INLINE_LIMIT => {
                    debug!("attachment {id} is {} bytes, not inlined", payload.bytes.len());
                    public.clone()
                }
                _ => data_url(&payload),
            };
            Attachment {
                id: id.to_string(),
                url: Some(url),
                public_url,
                payload: Some(payload.bytes),
                error: None,
            }
        }
        Err(err) => {
            warn!("attachment {id} could not be resolved: {err:#}");
            Attachment::failed(id, format!("{err:#}"))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::bail;

    use super::{AttachmentFetcher, AttachmentPayload, INLINE_LIMIT};

    /// In-memory fetcher that serves `id` as its own payload and fails for
    /// the configured ids.
    #[derive(Default)]
    pub struct StubFetcher {
        pub calls: AtomicUsize,
        pub failing: HashSet<String>,
        pub oversized: HashSet<String>,
    }

    impl StubFetcher {
        pub fn failing(ids: &[&str]) -> Self {
            Self {
                failing: ids.iter().map(|id| id.to_string()).collect(),
                ..Self::default()
            }
        }

        /// Serves a payload just over the inline limit for `ids`.
        pub fn oversized(ids: &[&str]) -> Self {
            Self {
                oversized: ids.iter().map(|id| id.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AttachmentFetcher for StubFetcher {
        async fn fetch_attachment(&self, id: &str) -> anyhow::Result<AttachmentPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(id) {
                bail!("attachment {id} returned 500");
            }
            let bytes = if self.oversized.contains(id) {
                vec![0; INLINE_LIMIT + 1]
            } else {
                id.as_bytes().to_vec()
            };
            Ok(AttachmentPayload {
                bytes,
                content_type: Some("image/png".into()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubFetcher;
    use super::*;

    #[tokio::test]
    async fn second_resolution_is_served_from_cache() {
        let fetcher = StubFetcher::default();
        let mut resolver = MediaResolver::new(&fetcher);

        let first = resolver.resolve("abc").await;
        let second = resolver.resolve("abc").await;

        assert_eq!(first.url, second.url);
        assert_eq!(first.url.as_deref(), Some("data:image/png;base64,YWJj"));
        assert_eq!(first.payload.as_deref(), Some(b"abc".as_slice()));
        assert_eq!(second.payload, None);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(resolver.fetch_count(), 1);
    }

    #[tokio::test]
    async fn failures_are_reported_and_not_cached() {
        let fetcher = StubFetcher::failing(&["bad"]);
        let mut resolver = MediaResolver::new(&fetcher);

        let attachment = resolver.resolve("bad").await;
        assert!(attachment.url.is_none());
        assert!(attachment.error.is_some());
        assert_eq!(resolver.cached(), 0);

        resolver.resolve("bad").await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn resolve_all_deduplicates_and_reuses_cache() {
        let fetcher = StubFetcher::failing(&["broken"]);
        let mut resolver = MediaResolver::new(&fetcher);
        resolver.resolve("a").await;

        let ids: Vec<String> = ["a", "b", "b", "broken"].iter().map(|s| s.to_string()).collect();
        let results = resolver.resolve_all(&ids).await;

        assert_eq!(results.len(), 3);
        assert!(results["a"].url.is_some());
        assert!(results["b"].url.is_some());
        assert!(results["broken"].url.is_none());
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(resolver.release(), 2);
        assert_eq!(resolver.cached(), 0);
    }

    #[tokio::test]
    async fn public_base_gives_shareable_urls() {
        let fetcher = StubFetcher::default();
        let mut resolver =
            MediaResolver::new(&fetcher).with_public_base("https://site.test/api/attachments/");

        let fresh = resolver.resolve("abc").await;
        let cached = resolver.resolve("abc").await;

        let public = Some("https://site.test/api/attachments/abc".to_string());
        assert_eq!(fresh.public_url, public);
        assert_eq!(cached.public_url, public);
        assert_eq!(fresh.url.as_deref(), Some("data:image/png;base64,YWJj"));

        let unpublished = MediaResolver::new(&fetcher).resolve("abc").await;
        assert_eq!(unpublished.public_url, None);
    }

    #[tokio::test]
    async fn oversized_payloads_are_linked_instead_of_inlined() {
        let fetcher = StubFetcher::oversized(&["clip"]);

        let mut published =
            MediaResolver::new(&fetcher).with_public_base("https://site.test/api/attachments");
        let linked = published.resolve("clip").await;
        assert_eq!(linked.url.as_deref(), Some("https://site.test/api/attachments/clip"));

        let small = published.resolve("still").await;
        assert!(small.url.unwrap().starts_with("data:image/png;base64,"));

        let mut local = MediaResolver::new(&fetcher);
        let inlined = local.resolve("clip").await;
        assert!(inlined.url.unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn data_url_drops_content_type_parameters() {
        let payload = AttachmentPayload {
            bytes: b"hi".to_vec(),
            content_type: Some("video/mp4; charset=binary".into()),
        };
        assert_eq!(data_url(&payload), "data:video/mp4;base64,aGk=");

        let untyped = AttachmentPayload {
            bytes: Vec::new(),
            content_type: None,
        };
        assert_eq!(data_url(&untyped), "data:application/octet-stream;base64,");
    }
}
