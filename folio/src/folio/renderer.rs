use anyhow::Result;
use log::debug;

use crate::folio::config::SiteConfig;
use crate::folio::media::{AttachmentFetcher, MediaResolver};
use crate::folio::plugins::summary::word_count;
use crate::folio::plugins::{MarkdownConverter, PluginRegistry};
use crate::folio::types::RenderedArticle;

const WORDS_PER_MINUTE: usize = 200;

/// Where the HTTP layer serves attachments, relative to the site base URL.
pub const ATTACHMENT_ROUTE: &str = "/api/attachments";

/// Markdown article to styled HTML plus derived metadata.
pub struct ArticleRenderer {
    converter: MarkdownConverter,
    registry: PluginRegistry,
    public_base: Option<String>,
}

impl ArticleRenderer {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let base_url = config.site.base_url.trim_end_matches('/');
        Ok(Self::with_registry(PluginRegistry::article_pipeline(config)?)
            .with_public_base(format!("{base_url}{ATTACHMENT_ROUTE}")))
    }

    pub fn with_registry(registry: PluginRegistry) -> Self {
        Self {
            converter: MarkdownConverter,
            registry,
            public_base: None,
        }
    }

    /// Publish resolved attachments under `base`.
    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = Some(base.into());
        self
    }

    /// One render pass. Attachments are resolved through `fetcher` with a
    /// cache that lives exactly as long as the pass.
    pub async fn render<F: AttachmentFetcher>(
        &self,
        markdown: &str,
        fetcher: &F,
    ) -> RenderedArticle {
        let doc = self.converter.convert(markdown);
        let mut resolver = MediaResolver::new(fetcher);
        if let Some(base) = &self.public_base {
            resolver = resolver.with_public_base(base.as_str());
        }

        let output = self.registry.run(&doc, &mut resolver).await;
        let released = resolver.release();
        debug!(
            "render pass done: {} fetch(es), {released} handle(s) released",
            resolver.fetch_count()
        );

        RenderedArticle {
            html: doc.to_html(),
            description: output.description,
            image_links: output.image_links,
            share_links: output.share_links,
            reading_time_minutes: reading_time(word_count(&doc)),
        }
    }
}

/// Minutes at 200 words per minute, rounded up, never below one.
pub fn reading_time(words: usize) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}
