//! Paginated GitHub REST client feeding the activity heatmap.

use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, RETRY_AFTER, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::folio::activity::{ActivitySource, Throttled};
use crate::folio::config::GithubConfig;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// GitHub refuses to page the events feed past 300 entries.
const MAX_EVENT_ENTRIES: u32 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Signature {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub committer: Option<Signature>,
    pub author: Option<Signature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub commit: CommitDetail,
}

impl Commit {
    /// Committer date, or the author date when the committer is missing.
    pub fn date(&self) -> Option<&str> {
        let detail = &self.commit;
        detail
            .committer
            .as_ref()
            .and_then(|sig| sig.date.as_deref())
            .or_else(|| detail.author.as_ref().and_then(|sig| sig.date.as_deref()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub created_at: String,
}

#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    owner: String,
    since: Option<String>,
    per_page: u32,
    user_agent: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &GithubConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            owner: config.owner.clone(),
            since: config.since.clone(),
            per_page: config.per_page.clamp(1, 100),
            user_agent: config.user_agent.clone(),
        }
    }

    pub async fn user_repositories(&self) -> Result<Vec<Repository>> {
        self.get_all("/user/repos", &[], None).await
    }

    pub async fn organizations(&self) -> Result<Vec<Organization>> {
        self.get_all("/user/orgs", &[], None).await
    }

    pub async fn organization_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        self.get_all(&format!("/orgs/{org}/repos"), &[], None).await
    }

    pub async fn commits(&self, full_name: &str) -> Result<Vec<Commit>> {
        let mut query = Vec::new();
        if let Some(since) = &self.since {
            query.push(("since", since.clone()));
        }
        self.get_all(&format!("/repos/{full_name}/commits"), &query, None)
            .await
    }

    pub async fn events(&self) -> Result<Vec<Event>> {
        let pages = MAX_EVENT_ENTRIES.div_ceil(self.per_page);
        self.get_all(&format!("/users/{}/events", self.owner), &[], Some(pages))
            .await
    }

    /// Follow `page=N` until a page comes back shorter than `per_page`, or
    /// until `max_pages` when the endpoint has a hard paging limit.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        max_pages: Option<u32>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch: Vec<T> = self.get_page(path, query, page).await?;
            let short = batch.len() < self.per_page as usize;
            items.extend(batch);
            if short || max_pages.is_some_and(|max| page >= max) {
                break;
            }
            page += 1;
        }
        debug!("GET {path}: {} item(s)", items.len());
        Ok(items)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        page: u32,
    ) -> Result<Vec<T>> {
        let url = format!("{}{path}", self.api_url);
        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, &self.user_agent)
            .query(query)
            .query(&[("per_page", self.per_page), ("page", page)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers();
            let limited = status == StatusCode::TOO_MANY_REQUESTS
                || headers.contains_key(RETRY_AFTER)
                || headers
                    .get(RATE_LIMIT_REMAINING)
                    .is_some_and(|remaining| remaining == "0");
            let body = response.text().await.unwrap_or_default();
            let message = format!("GET {path} page {page} returned {status}: {}", body.trim());
            if limited
                || (status == StatusCode::FORBIDDEN
                    && body.to_ascii_lowercase().contains("rate limit"))
            {
                return Err(Throttled(message).into());
            }
            bail!(message);
        }
        response
            .json()
            .await
            .with_context(|| format!("decoding {path} page {page}"))
    }
}

impl ActivitySource for GithubClient {
    /// Personal repositories plus the repositories of every organization
    /// the user belongs to, deduplicated by full name.
    async fn list_repositories(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self
            .user_repositories()
            .await?
            .into_iter()
            .map(|repo| repo.full_name)
            .collect();

        let orgs = match self.organizations().await {
            Ok(orgs) => orgs,
            Err(err) => {
                warn!("organizations unavailable: {err:#}");
                Vec::new()
            }
        };
        for org in orgs {
            match self.organization_repositories(&org.login).await {
                Ok(repos) => names.extend(repos.into_iter().map(|repo| repo.full_name)),
                Err(err) => warn!("repositories of {} unavailable: {err:#}", org.login),
            }
        }

        Ok(names.into_iter().collect())
    }

    async fn list_commit_dates(&self, repo: &str) -> Result<Vec<String>> {
        let commits = self.commits(repo).await?;
        Ok(commits
            .iter()
            .filter_map(|commit| commit.date().map(str::to_string))
            .collect())
    }

    async fn list_event_dates(&self) -> Result<Vec<String>> {
        if self.owner.is_empty() {
            return Ok(Vec::new());
        }
        let events = self.events().await?;
        Ok(events.into_iter().map(|event| event.created_at).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_date_prefers_committer() {
        let commit: Commit = serde_json::from_value(serde_json::json!({
            "sha": "abc",
            "commit": {
                "author": { "date": "2024-01-01T00:00:00Z" },
                "committer": { "date": "2024-01-02T00:00:00Z" }
            }
        }))
        .unwrap();
        assert_eq!(commit.date(), Some("2024-01-02T00:00:00Z"));

        let authored_only: Commit = serde_json::from_value(serde_json::json!({
            "commit": { "author": { "date": "2024-01-01T00:00:00Z" }, "committer": null }
        }))
        .unwrap();
        assert_eq!(authored_only.date(), Some("2024-01-01T00:00:00Z"));
    }
}
