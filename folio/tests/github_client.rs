use folio::folio::activity::{ActivitySource, collect};
use folio::folio::config::{GithubConfig, SiteConfig};
use folio::folio::github::GithubClient;
use folio::folio::types::ActivityRecord;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn github_config(server: &MockServer) -> GithubConfig {
    let mut github = SiteConfig::default().github;
    github.api_url = server.uri();
    github.token = Some("gh-token".into());
    github.owner = "me".into();
    github.per_page = 2;
    github
}

fn commit(date: &str) -> serde_json::Value {
    json!({ "sha": date, "commit": { "committer": { "date": date }, "author": { "date": date } } })
}

async fn mount_page(server: &MockServer, route: &str, page: u32, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn listings_follow_pages_until_a_short_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/me/app/commits"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("authorization", "Bearer gh-token"))
        .and(query_param("per_page", "2"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            commit("2024-01-01T10:00:00Z"),
            commit("2024-01-02T10:00:00Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/repos/me/app/commits", 2, json!([commit("2024-01-03T10:00:00Z")])).await;

    let client = GithubClient::new(&github_config(&server));
    let dates = client.list_commit_dates("me/app").await.unwrap();

    assert_eq!(
        dates,
        vec![
            "2024-01-01T10:00:00Z".to_string(),
            "2024-01-02T10:00:00Z".to_string(),
            "2024-01-03T10:00:00Z".to_string(),
        ]
    );
}

fn requested_page(request: &Request) -> u32 {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

#[tokio::test]
async fn long_histories_are_read_to_the_last_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/me/monorepo/commits"))
        .respond_with(|request: &Request| {
            let page = requested_page(request);
            let body = if page <= 120 {
                json!([commit("2024-04-01T10:00:00Z")])
            } else {
                json!([])
            };
            ResponseTemplate::new(200).set_body_json(body)
        })
        .expect(121)
        .mount(&server)
        .await;

    let mut config = github_config(&server);
    config.per_page = 1;
    let client = GithubClient::new(&config);

    let dates = client.list_commit_dates("me/monorepo").await.unwrap();
    assert_eq!(dates.len(), 120);
}

#[tokio::test]
async fn events_stop_at_the_feed_limit() {
    let server = MockServer::start().await;
    let events: Vec<_> = (0..100)
        .map(|n| json!({ "id": n.to_string(), "created_at": "2024-04-02T08:00:00Z" }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/users/me/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(events)))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = github_config(&server);
    config.per_page = 100;
    let client = GithubClient::new(&config);

    let dates = client.list_event_dates().await.unwrap();
    assert_eq!(dates.len(), 300);
}

#[tokio::test]
async fn repositories_include_organizations_without_duplicates() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/user/repos",
        1,
        json!([{ "full_name": "me/app" }, { "full_name": "acme/site" }]),
    )
    .await;
    mount_page(&server, "/user/repos", 2, json!([])).await;
    mount_page(&server, "/user/orgs", 1, json!([{ "login": "acme" }])).await;
    mount_page(
        &server,
        "/orgs/acme/repos",
        1,
        json!([{ "full_name": "acme/site" }]),
    )
    .await;

    let client = GithubClient::new(&github_config(&server));
    let repos = client.list_repositories().await.unwrap();

    assert_eq!(repos, vec!["acme/site".to_string(), "me/app".to_string()]);
}

#[tokio::test]
async fn failing_repository_is_skipped_and_the_rest_collected() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/user/repos",
        1,
        json!([{ "full_name": "me/app" }, { "full_name": "me/empty" }]),
    )
    .await;
    mount_page(&server, "/user/repos", 2, json!([])).await;
    mount_page(&server, "/user/orgs", 1, json!([])).await;
    mount_page(&server, "/repos/me/app/commits", 1, json!([commit("2024-02-29T23:00:00Z")])).await;
    Mock::given(method("GET"))
        .and(path("/repos/me/empty/commits"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "Git Repository is empty." })),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/users/me/events",
        1,
        json!([{ "id": "1", "created_at": "2024-03-01T08:00:00Z" }]),
    )
    .await;

    let client = GithubClient::new(&github_config(&server));
    let collection = collect(&client, &[]).await.unwrap();

    assert_eq!(
        collection.dates,
        vec![ActivityRecord::new(2024, 2, 29), ActivityRecord::new(2024, 3, 1)]
    );
    assert_eq!(collection.bad_repos, vec!["me/empty".to_string()]);
}

#[tokio::test]
async fn rate_limited_repository_is_retried_later() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/user/repos",
        1,
        json!([{ "full_name": "me/app" }, { "full_name": "me/busy" }]),
    )
    .await;
    mount_page(&server, "/user/repos", 2, json!([])).await;
    mount_page(&server, "/user/orgs", 1, json!([])).await;
    mount_page(&server, "/repos/me/app/commits", 1, json!([commit("2024-02-01T09:00:00Z")])).await;
    Mock::given(method("GET"))
        .and(path("/repos/me/busy/commits"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/users/me/events", 1, json!([])).await;

    let client = GithubClient::new(&github_config(&server));
    let collection = collect(&client, &[]).await.unwrap();

    assert_eq!(collection.dates, vec![ActivityRecord::new(2024, 2, 1)]);
    assert!(collection.bad_repos.is_empty());
}
