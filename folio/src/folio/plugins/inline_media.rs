use kuchikiki::NodeRef;
use log::debug;
use reqwest::Url;

use crate::folio::dom::{self, Document};
use crate::folio::media::{Attachment, AttachmentFetcher, MediaResolver};
use crate::folio::plugins::traits::MediaProcessor;

const IMAGE_SELECTOR: &str = "img[src^='/api/attachments']";
const VIDEO_SELECTOR: &str = "a[href^='/api/attachments.redirect']";
const LIGHTBOXED: &str = "--lightboxed";
const VIDEO_FALLBACK: &str = "Your browser does not support the video tag.";

/// Attachment id carried in the `id` query parameter of a relative link.
pub fn attachment_id(link: &str) -> Option<String> {
    let base = Url::parse("http://localhost/").ok()?;
    let url = base.join(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// Inline attachment images, wrapped in a lightbox.
pub struct ImageProcessor;

impl MediaProcessor for ImageProcessor {
    async fn process<F: AttachmentFetcher>(
        &self,
        doc: &Document,
        resolver: &mut MediaResolver<'_, F>,
    ) -> Vec<Attachment> {
        let targets: Vec<(NodeRef, String)> = doc
            .select(IMAGE_SELECTOR)
            .into_iter()
            .filter(|img| !dom::has_class(img, LIGHTBOXED))
            .filter_map(|img| {
                let id = dom::attr(&img, "src").and_then(|src| attachment_id(&src))?;
                Some((img, id))
            })
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = targets.iter().map(|(_, id)| id.clone()).collect();
        let resolved = resolver.resolve_all(&ids).await;

        let mut applied = Vec::new();
        for (img, id) in targets {
            let Some(attachment) = resolved.get(&id) else {
                continue;
            };
            let Some(url) = attachment.url.as_deref() else {
                continue;
            };
            dom::set_attr(&img, "src", url);
            dom::add_classes(&img, &[LIGHTBOXED]);

            let lightbox = dom::new_element("div", &[("uk-lightbox", "true")]);
            let anchor = dom::new_element("a", &[("href", url)]);
            img.insert_before(lightbox.clone());
            img.detach();
            anchor.append(img);
            lightbox.append(anchor);
            applied.push(attachment.clone());
        }
        debug!("inlined {} image(s)", applied.len());
        applied
    }
}

/// Turns links to `.mp4` attachments into inline video players.
pub struct VideoProcessor;

impl MediaProcessor for VideoProcessor {
    async fn process<F: AttachmentFetcher>(
        &self,
        doc: &Document,
        resolver: &mut MediaResolver<'_, F>,
    ) -> Vec<Attachment> {
        let targets: Vec<(NodeRef, String)> = doc
            .select(VIDEO_SELECTOR)
            .into_iter()
            .filter(|link| {
                link.text_contents()
                    .trim()
                    .to_ascii_lowercase()
                    .ends_with(".mp4")
            })
            .filter_map(|link| {
                let id = dom::attr(&link, "href").and_then(|href| attachment_id(&href))?;
                Some((link, id))
            })
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = targets.iter().map(|(_, id)| id.clone()).collect();
        let resolved = resolver.resolve_all(&ids).await;

        let mut applied = Vec::new();
        for (link, id) in targets {
            let Some(attachment) = resolved.get(&id) else {
                continue;
            };
            let Some(url) = attachment.url.as_deref() else {
                continue;
            };
            dom::replace_with(&link, video_player(url));
            applied.push(attachment.clone());
        }
        debug!("inlined {} video(s)", applied.len());
        applied
    }
}

fn video_player(src: &str) -> NodeRef {
    let container = dom::new_element("div", &[("class", "video-container")]);
    let video = dom::new_element("video", &[("controls", "")]);
    video.append(dom::new_element("source", &[("src", src), ("type", "video/mp4")]));
    video.append(NodeRef::new_text(VIDEO_FALLBACK));
    container.append(video);
    container
}
