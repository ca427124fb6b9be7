pub mod activity;
pub mod cache;
pub mod config;
pub mod docs;
pub mod dom;
pub mod github;
pub mod head;
pub mod media;
pub mod plugins;
pub mod renderer;
pub mod types;

pub use config::SiteConfig;
pub use renderer::ArticleRenderer;
pub use types::{ActivityRecord, Article, IntensityRecord, RenderedArticle};
