//! Open Graph and Twitter metadata for the public pages.

use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use serde::Serialize;

use crate::folio::config::SiteSettings;
use crate::folio::types::{Article, RenderedArticle};

const IMAGE_WIDTH: &str = "1200";
const IMAGE_HEIGHT: &str = "627";
const FAVICON: &str = "/favicon.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    Blog,
    Article,
}

impl FromStr for PageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "home" => Ok(PageKind::Home),
            "blog" => Ok(PageKind::Blog),
            "article" => Ok(PageKind::Article),
            other => Err(anyhow!("invalid page type {other:?}")),
        }
    }
}

/// What an article page head needs to know about the article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMeta {
    pub title: String,
    pub description: String,
    pub image: String,
    pub publish_date: String,
    pub author: String,
    pub slug: String,
}

impl ArticleMeta {
    /// The preview image is the first shareable image of the article, else
    /// the site default.
    pub fn from_article(
        article: &Article,
        rendered: &RenderedArticle,
        site: &SiteSettings,
    ) -> Self {
        let image = rendered
            .share_links
            .iter()
            .chain(&rendered.image_links)
            .find(|link| !link.starts_with("data:"))
            .cloned()
            .unwrap_or_else(|| site.default_image.clone());
        let published = article.published_at.unwrap_or(article.created_at);

        Self {
            title: article.title.clone(),
            description: rendered.description.clone(),
            image,
            publish_date: published.to_rfc3339(),
            author: article
                .created_by
                .as_ref()
                .map(|user| user.name.clone())
                .unwrap_or_else(|| site.author.clone()),
            slug: article.url_id.clone().unwrap_or_else(|| article.id.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetaTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub content: String,
}

impl MetaTag {
    fn name(name: &str, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.to_string()),
            property: None,
            content: content.into(),
        }
    }

    fn property(property: &str, content: impl Into<String>) -> Self {
        Self {
            name: None,
            property: Some(property.to_string()),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageHead {
    pub title: String,
    pub meta: Vec<MetaTag>,
    pub link: Vec<LinkTag>,
}

impl PageHead {
    /// Content of the first meta tag with the given name or property.
    pub fn meta_content(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|tag| tag.name.as_deref() == Some(key) || tag.property.as_deref() == Some(key))
            .map(|tag| tag.content.as_str())
    }
}

struct PageFacts {
    title: String,
    description: String,
    url: String,
    image: String,
    og_type: &'static str,
}

/// Build the head for a page. Article pages require `article`.
pub fn page_head(
    kind: PageKind,
    article: Option<&ArticleMeta>,
    site: &SiteSettings,
) -> Result<PageHead> {
    let base_url = site.base_url.trim_end_matches('/');

    let facts = match kind {
        PageKind::Home => PageFacts {
            title: site.site_name.clone(),
            description: site.tagline.clone(),
            url: base_url.to_string(),
            image: site.default_image.clone(),
            og_type: "website",
        },
        PageKind::Blog => PageFacts {
            title: format!("Blog - {}", site.author),
            description: site.blog_description.clone(),
            url: format!("{base_url}/blog"),
            image: site.default_image.clone(),
            og_type: "website",
        },
        PageKind::Article => {
            let Some(article) = article else {
                bail!("article metadata is required for article pages");
            };
            PageFacts {
                title: format!("{} - {} Blog", article.title, site.author),
                description: article.description.clone(),
                url: format!("{base_url}/blog/{}", article.slug),
                image: article.image.clone(),
                og_type: "article",
            }
        }
    };

    let mut meta = vec![
        MetaTag::name("description", &facts.description),
        MetaTag::name("robots", "index, follow"),
        MetaTag::property("og:locale", &site.locale),
        MetaTag::property("og:type", facts.og_type),
        MetaTag::property("og:title", &facts.title),
        MetaTag::property("og:description", &facts.description),
        MetaTag::property("og:url", &facts.url),
        MetaTag::property("og:site_name", &site.site_name),
        MetaTag::property("og:image:secure_url", &facts.image),
        MetaTag::property("og:image", &facts.image),
        MetaTag::property("og:image:width", IMAGE_WIDTH),
        MetaTag::property("og:image:height", IMAGE_HEIGHT),
        MetaTag::name("twitter:card", "summary_large_image"),
        MetaTag::name("twitter:site", base_url),
        MetaTag::name("twitter:title", &facts.title),
        MetaTag::name("twitter:description", &facts.description),
        MetaTag::name("twitter:image", &facts.image),
    ];
    if let (PageKind::Article, Some(article)) = (kind, article) {
        meta.push(MetaTag::property("article:published_time", &article.publish_date));
        meta.push(MetaTag::property("article:author", &article.author));
    }

    Ok(PageHead {
        title: facts.title,
        meta,
        link: vec![
            LinkTag {
                rel: "icon".into(),
                href: FAVICON.into(),
                kind: Some("image/jpeg".into()),
            },
            LinkTag {
                rel: "canonical".into(),
                href: facts.url,
                kind: None,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folio::config::SiteConfig;

    fn site() -> SiteSettings {
        let mut site = SiteConfig::default().site;
        site.base_url = "https://example.dev/".into();
        site.author = "Max".into();
        site
    }

    fn article() -> ArticleMeta {
        ArticleMeta {
            title: "Borrowing".into(),
            description: "On references".into(),
            image: "https://cdn.example.dev/cover.png".into(),
            publish_date: "2024-03-01T10:00:00+00:00".into(),
            author: "Max".into(),
            slug: "borrowing-x1".into(),
        }
    }

    #[test]
    fn article_page_without_metadata_fails() {
        let err = page_head(PageKind::Article, None, &site()).unwrap_err();
        assert!(err.to_string().contains("article metadata"));
    }

    #[test]
    fn article_head_carries_article_tags() {
        let head = page_head(PageKind::Article, Some(&article()), &site()).unwrap();
        assert_eq!(head.title, "Borrowing - Max Blog");
        assert_eq!(head.meta_content("og:type"), Some("article"));
        assert_eq!(head.meta_content("og:url"), Some("https://example.dev/blog/borrowing-x1"));
        assert_eq!(head.meta_content("article:author"), Some("Max"));
        assert_eq!(head.link[1].href, "https://example.dev/blog/borrowing-x1");
    }

    #[test]
    fn blog_head_has_no_article_tags() {
        let head = page_head(PageKind::Blog, Some(&article()), &site()).unwrap();
        assert_eq!(head.title, "Blog - Max");
        assert_eq!(head.meta_content("og:type"), Some("website"));
        assert_eq!(head.meta_content("article:published_time"), None);
    }

    fn rendered(image_links: &[&str], share_links: &[&str]) -> RenderedArticle {
        RenderedArticle {
            html: String::new(),
            description: "Intro".into(),
            image_links: image_links.iter().map(|l| l.to_string()).collect(),
            share_links: share_links.iter().map(|l| l.to_string()).collect(),
            reading_time_minutes: 1,
        }
    }

    fn source_article() -> Article {
        serde_json::from_value(serde_json::json!({
            "id": "doc-1",
            "title": "Borrowing",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T10:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn article_image_prefers_shareable_links() {
        let site = site();
        let shared = rendered(
            &["data:image/png;base64,AQID"],
            &["https://example.dev/api/attachments/c"],
        );
        let meta = ArticleMeta::from_article(&source_article(), &shared, &site);
        assert_eq!(meta.image, "https://example.dev/api/attachments/c");

        let inline_only = rendered(&["data:image/png;base64,AQID"], &[]);
        let meta = ArticleMeta::from_article(&source_article(), &inline_only, &site);
        assert_eq!(meta.image, site.default_image);
    }

    #[test]
    fn page_kinds_parse_from_route_names() {
        assert_eq!("home".parse::<PageKind>().unwrap(), PageKind::Home);
        assert!("admin".parse::<PageKind>().is_err());
    }
}
