use std::fmt;
use std::future::Future;

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use log::{info, warn};

use crate::folio::types::ActivityRecord;

/// Commit listings in flight at once.
pub const MAX_IN_FLIGHT: usize = 4;

/// The upstream asked us to slow down. Repositories failing this way are
/// retried on the next refresh rather than skipped.
#[derive(Debug)]
pub struct Throttled(pub String);

impl fmt::Display for Throttled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limited: {}", self.0)
    }
}

impl std::error::Error for Throttled {}

/// Where raw activity timestamps come from.
pub trait ActivitySource {
    /// Full names (`owner/name`) of every repository to scan.
    fn list_repositories(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// RFC 3339 timestamps of the commits in one repository.
    fn list_commit_dates(&self, repo: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// RFC 3339 timestamps of the user's public events.
    fn list_event_dates(&self) -> impl Future<Output = Result<Vec<String>>>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collection {
    pub dates: Vec<ActivityRecord>,
    /// Repositories to skip next time, including the ones passed in.
    pub bad_repos: Vec<String>,
}

/// Gather activity from every repository not in `skip`, plus user events.
///
/// At most [`MAX_IN_FLIGHT`] repositories are listed concurrently. A
/// repository whose commits cannot be listed is added to the skip list and
/// the rest are still collected, unless it was only [`Throttled`]. Failing to
/// list repositories at all is an error.
pub async fn collect<S: ActivitySource>(source: &S, skip: &[String]) -> Result<Collection> {
    let repos = source
        .list_repositories()
        .await
        .context("listing repositories")?;

    let pending: Vec<&String> = repos.iter().filter(|repo| !skip.contains(*repo)).collect();
    info!(
        "collecting activity from {} repositories ({} skipped)",
        pending.len(),
        repos.len() - pending.len()
    );

    let listings: Vec<Result<Vec<String>>> = stream::iter(&pending)
        .map(|repo| source.list_commit_dates(repo))
        .buffered(MAX_IN_FLIGHT)
        .collect()
        .await;

    let mut collection = Collection {
        dates: Vec::new(),
        bad_repos: skip.to_vec(),
    };

    for (repo, listing) in pending.into_iter().zip(listings) {
        match listing {
            Ok(timestamps) => collection.dates.extend(normalize(&timestamps)),
            Err(err) if err.downcast_ref::<Throttled>().is_some() => {
                warn!("repository {repo} will be retried: {err:#}");
            }
            Err(err) => {
                warn!("skipping repository {repo} from now on: {err:#}");
                collection.bad_repos.push(repo.clone());
            }
        }
    }

    match source.list_event_dates().await {
        Ok(timestamps) => collection.dates.extend(normalize(&timestamps)),
        Err(err) => warn!("user events unavailable: {err:#}"),
    }

    Ok(collection)
}

fn normalize(timestamps: &[String]) -> Vec<ActivityRecord> {
    timestamps
        .iter()
        .filter_map(|ts| match ActivityRecord::parse(ts) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("{err:#}");
                None
            }
        })
        .collect()
}
