use actix_web::{HttpResponse, Responder, get, web};
use anyhow::Result;
use chrono::Utc;
use log::{error, warn};
use serde::Deserialize;
use serde_json::json;

use crate::folio::activity::{ActivityService, Aggregator};
use crate::folio::cache::SnapshotStore;
use crate::folio::docs::DocsClient;
use crate::folio::github::GithubClient;
use crate::folio::head::{ArticleMeta, PageKind, page_head};
use crate::folio::media::AttachmentFetcher;
use crate::folio::{ArticleRenderer, SiteConfig};

/// Shared by every worker.
pub struct AppState {
    pub config: SiteConfig,
    pub docs: DocsClient,
    pub renderer: ArticleRenderer,
    pub activity: ActivityService<GithubClient>,
}

impl AppState {
    pub fn new(config: SiteConfig) -> Result<Self> {
        let renderer = ArticleRenderer::new(&config)?;
        let docs = DocsClient::new(&config.docs);
        let activity = ActivityService::new(
            GithubClient::new(&config.github),
            SnapshotStore::new(config.activity.snapshot_path()),
            Aggregator::new(config.activity.year_range()),
        );
        Ok(Self {
            config,
            docs,
            renderer,
            activity,
        })
    }
}

pub fn config(conf: &mut web::ServiceConfig) {
    let api_scope = web::scope("/api")
        .service(healthcheck_handler)
        .service(articles_handler)
        .service(article_handler)
        .service(attachment_handler)
        .service(head_handler)
        .service(activity_handler);

    conf.service(api_scope);
}

#[get("/health")]
pub async fn healthcheck_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "pong" }))
}

#[get("/articles")]
pub async fn articles_handler(state: web::Data<AppState>) -> impl Responder {
    let articles = match state.docs.list_articles().await {
        Ok(articles) => articles,
        Err(err) => {
            warn!("article list unavailable: {err:#}");
            Vec::new()
        }
    };
    HttpResponse::Ok().json(articles)
}

#[get("/articles/{id}")]
pub async fn article_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    let article = match state.docs.article_info(&id).await {
        Ok(article) => article,
        Err(err) => {
            error!("failed to fetch article {id}: {err:#}");
            return HttpResponse::NotFound().json(json!({ "message": "article not found" }));
        }
    };

    let rendered = state.renderer.render(&article.text, &state.docs).await;

    if let Err(err) = state.docs.create_view(&article.id).await {
        warn!("view not recorded for {}: {err:#}", article.id);
    }
    let views = match state.docs.view_count(&article.id).await {
        Ok(count) => count,
        Err(err) => {
            warn!("view count unavailable for {}: {err:#}", article.id);
            0
        }
    };

    let meta = ArticleMeta::from_article(&article, &rendered, &state.config.site);
    let head = match page_head(PageKind::Article, Some(&meta), &state.config.site) {
        Ok(head) => head,
        Err(err) => {
            error!("failed to build head for {}: {err:#}", article.id);
            return HttpResponse::InternalServerError().json(json!({ "message": err.to_string() }));
        }
    };

    HttpResponse::Ok().json(json!({
        "article": article,
        "rendered": rendered,
        "views": views,
        "head": head,
    }))
}

/// Public address of an article attachment, used for previews and for media
/// too large to inline.
#[get("/attachments/{id}")]
pub async fn attachment_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    match state.docs.fetch_attachment(&id).await {
        Ok(payload) => HttpResponse::Ok()
            .content_type(payload.mime().to_string())
            .body(payload.bytes),
        Err(err) => {
            warn!("attachment {id} unavailable: {err:#}");
            HttpResponse::NotFound().json(json!({ "message": "attachment not found" }))
        }
    }
}

#[get("/head/{page}")]
pub async fn head_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let built = path
        .into_inner()
        .parse::<PageKind>()
        .and_then(|kind| page_head(kind, None, &state.config.site));

    match built {
        Ok(head) => HttpResponse::Ok().json(head),
        Err(err) => {
            error!("failed to build page head: {err:#}");
            HttpResponse::BadRequest().json(json!({ "message": err.to_string() }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub force: bool,
}

#[get("/activity")]
pub async fn activity_handler(
    state: web::Data<AppState>,
    query: web::Query<ActivityQuery>,
) -> impl Responder {
    let records = state.activity.intensities(query.force, Utc::now()).await;
    HttpResponse::Ok().json(records)
}
