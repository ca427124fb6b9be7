//! Client for the documentation service that hosts the blog articles.

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::folio::config::DocsConfig;
use crate::folio::media::{AttachmentFetcher, AttachmentPayload};
use crate::folio::types::{Article, ArticleView};

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct DocsClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    collection_id: String,
}

impl DocsClient {
    pub fn new(config: &DocsConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &DocsConfig) -> Self {
        Self {
            client,
            base_url: config.base_api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            collection_id: config.collection_id.clone(),
        }
    }

    /// Articles of the blog collection, without templates and section
    /// indexes.
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let articles: Vec<Article> = self
            .call("documents.list", json!({ "collectionId": self.collection_id }))
            .await?;
        let total = articles.len();
        let posts: Vec<Article> = articles.into_iter().filter(Article::is_post).collect();
        debug!("documents.list returned {total} document(s), {} post(s)", posts.len());
        Ok(posts)
    }

    pub async fn article_info(&self, id: &str) -> Result<Article> {
        self.call("documents.info", json!({ "id": id })).await
    }

    /// Total views of a document across all viewers.
    pub async fn view_count(&self, document_id: &str) -> Result<u64> {
        let views: Vec<ArticleView> = self
            .call("views.list", json!({ "documentId": document_id }))
            .await?;
        Ok(views.iter().map(|view| view.count).sum())
    }

    pub async fn create_view(&self, document_id: &str) -> Result<()> {
        let _: Value = self
            .call("views.create", json!({ "documentId": document_id }))
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T> {
        let response = self.send(endpoint, body).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("decoding {endpoint} response"))?;
        Ok(envelope.data)
    }

    async fn send(&self, endpoint: &str, body: Value) -> Result<reqwest::Response> {
        let url = format!("{}/{endpoint}", self.base_url);
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(error) => bail!("{endpoint} failed with {status}: {}", error.message),
            Err(_) => bail!("{endpoint} failed with {status}"),
        }
    }
}

impl AttachmentFetcher for DocsClient {
    async fn fetch_attachment(&self, id: &str) -> Result<AttachmentPayload> {
        let response = self.send("attachments.redirect", json!({ "id": id })).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading attachment {id}"))?;
        Ok(AttachmentPayload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
