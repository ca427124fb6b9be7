pub mod classes;
pub mod cleanup;
pub mod divider;
pub mod embeds;
pub mod headings;
pub mod highlight;
pub mod inline_media;
pub mod links;
pub mod markdown;
pub mod notices;
pub mod summary;
pub mod traits;

use anyhow::Result;
use log::{debug, warn};

use crate::folio::config::SiteConfig;
use crate::folio::dom::Document;
use crate::folio::media::{AttachmentFetcher, MediaResolver};

use self::classes::ClassInjection;
use self::cleanup::{LiteralLineBreaks, StrayBackslashes};
use self::divider::LogoDivider;
use self::embeds::CodePenEmbeds;
use self::headings::HeadingAnchors;
use self::highlight::CodeHighlighting;
use self::inline_media::{ImageProcessor, VideoProcessor};
use self::links::{CrossReferences, ExternalLinks};
use self::notices::Notices;
use self::traits::{MediaProcessor, Transformer};

pub use self::markdown::MarkdownConverter;

pub enum Stage {
    Dom(Box<dyn Transformer>),
    Videos(VideoProcessor),
    Images(ImageProcessor),
    Describe,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Dom(transformer) => transformer.name(),
            Stage::Videos(_) => "videos",
            Stage::Images(_) => "images",
            Stage::Describe => "describe",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub description: String,
    pub image_links: Vec<String>,
    pub share_links: Vec<String>,
}

pub struct PluginRegistry {
    stages: Vec<Stage>,
}

impl PluginRegistry {
    pub fn article_pipeline(config: &SiteConfig) -> Result<Self> {
        let site = &config.site;
        Ok(Self::with_stages(vec![
            // Order matters: videos are inlined before class injection so the
            // players get styled, and the description reads the rewritten tree.
            Stage::Dom(Box::new(StrayBackslashes)),
            Stage::Dom(Box::new(ExternalLinks)),
            Stage::Dom(Box::new(CrossReferences::new(&config.docs.host)?)),
            Stage::Dom(Box::new(HeadingAnchors)),
            Stage::Dom(Box::new(Notices)),
            Stage::Dom(Box::new(CodeHighlighting)),
            Stage::Videos(VideoProcessor),
            Stage::Dom(Box::new(CodePenEmbeds)),
            Stage::Dom(Box::new(ClassInjection::default())),
            Stage::Dom(Box::new(LogoDivider::new(&site.logo_src, &site.logo_alt))),
            Stage::Images(ImageProcessor),
            Stage::Describe,
            Stage::Dom(Box::new(StrayBackslashes)),
            Stage::Dom(Box::new(LiteralLineBreaks)),
        ]))
    }

    pub fn with_stages(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Run every stage in order over `doc`.
    ///
    /// A failing stage is logged and skipped; whatever it already changed
    /// stays in the tree.
    pub async fn run<F: AttachmentFetcher>(
        &self,
        doc: &Document,
        resolver: &mut MediaResolver<'_, F>,
    ) -> PipelineOutput {
        let mut output = PipelineOutput::default();

        for stage in &self.stages {
            debug!("running stage {}", stage.name());
            match stage {
                Stage::Dom(transformer) => {
                    if let Err(err) = transformer.transform(doc) {
                        warn!("stage {} failed: {err:#}", transformer.name());
                    }
                }
                Stage::Videos(videos) => {
                    videos.process(doc, resolver).await;
                }
                Stage::Images(images) => {
                    for attachment in images.process(doc, resolver).await {
                        output.image_links.extend(attachment.url);
                        output.share_links.extend(attachment.public_url);
                    }
                }
                Stage::Describe => {
                    output.description = summary::describe(doc);
                }
            }
        }

        output
    }
}
