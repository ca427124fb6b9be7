use std::env;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use confik::{Configuration, EnvSource};
use serde::{Deserialize, Serialize};

use self::yaml::YamlFileSource;

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Public facts about the site used in page heads and article markup.
#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct SiteSettings {
    pub base_url: String,
    pub site_name: String,
    pub author: String,
    pub tagline: String,
    pub blog_description: String,
    pub locale: String,
    pub default_image: String,
    pub logo_src: String,
    pub logo_alt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct DocsConfig {
    pub base_api_url: String,
    pub token: Option<String>,
    pub collection_id: String,
    /// Host of the public documentation site; links into it are rewritten
    /// to local anchors.
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct GithubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub owner: String,
    /// Only commits after this RFC 3339 timestamp are collected.
    pub since: Option<String>,
    pub per_page: u32,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct ActivityConfig {
    pub snapshot_path: String,
    /// Gap filling is limited to these years. Empty means every observed year.
    pub years: Vec<i32>,
}

impl ActivityConfig {
    pub fn year_range(&self) -> Option<RangeInclusive<i32>> {
        let first = self.years.iter().min()?;
        let last = self.years.iter().max()?;
        Some(*first..=*last)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.snapshot_path);
        if path.is_absolute() {
            path
        } else {
            Path::new(env!("CARGO_MANIFEST_DIR")).join(path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Configuration)]
pub struct SiteConfig {
    pub server: ServerConfig,
    pub site: SiteSettings,
    pub docs: DocsConfig,
    pub github: GithubConfig,
    pub activity: ActivityConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
                cors_origins: vec!["http://localhost:5173".into()],
            },
            site: SiteSettings {
                base_url: "http://localhost:8080".into(),
                site_name: "Folio".into(),
                author: "Folio".into(),
                tagline: "FullStack Developer".into(),
                blog_description: "Notes on building things for the web.".into(),
                locale: "en_US".into(),
                default_image: "/og-image.png".into(),
                logo_src: "/logo.png".into(),
                logo_alt: "Site logo".into(),
            },
            docs: DocsConfig {
                base_api_url: "https://docs.example.com/api".into(),
                token: None,
                collection_id: String::new(),
                host: "docs.example.com".into(),
            },
            github: GithubConfig {
                api_url: "https://api.github.com".into(),
                token: None,
                owner: String::new(),
                since: None,
                per_page: 100,
                user_agent: "folio".into(),
            },
            activity: ActivityConfig {
                snapshot_path: "var/activity.json".into(),
                years: Vec::new(),
            },
        }
    }
}

impl SiteConfig {
    /// Load configuration from `config.yml` (if present) and environment variables.
    /// Falls back to the compiled-in defaults when parsing fails.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        let config_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.yml");
        let mut builder = SiteConfig::builder();

        if config_path.exists() {
            builder.override_with(YamlFileSource::new(config_path));
        }

        builder.override_with(EnvSource::new());

        let config = match builder.try_build() {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Failed to load config.yml or env overrides: {err}. Using defaults.");
                SiteConfig::default()
            }
        };
        config.with_env_tokens(|key| env::var(key).ok())
    }

    /// Fill missing API tokens from `DOCS_TOKEN` and `GITHUB_TOKEN`.
    pub fn with_env_tokens(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.docs.token.as_deref().is_none_or(str::is_empty) {
            self.docs.token = lookup("DOCS_TOKEN").filter(|t| !t.is_empty());
        }
        if self.github.token.as_deref().is_none_or(str::is_empty) {
            self.github.token = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty());
        }
        self
    }
}

mod yaml {
    use std::error::Error;
    use std::path::PathBuf;

    use confik::Source;
    use serde::de::DeserializeOwned;

    #[derive(Debug)]
    pub struct YamlFileSource {
        path: PathBuf,
    }

    impl YamlFileSource {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl<T> Source<T> for YamlFileSource
    where
        T: DeserializeOwned + confik::ConfigurationBuilder,
    {
        fn allows_secrets(&self) -> bool {
            false
        }

        fn provide(&self) -> Result<T, Box<dyn Error + Sync + Send>> {
            let contents = std::fs::read_to_string(&self.path)?;
            let parsed = serde_yaml::from_str(&contents)?;
            Ok(parsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_spans_configured_years() {
        let mut activity = SiteConfig::default().activity;
        assert_eq!(activity.year_range(), None);

        activity.years = vec![2024, 2022, 2023];
        assert_eq!(activity.year_range(), Some(2022..=2024));
    }

    #[test]
    fn tokens_fall_back_to_environment() {
        let config = SiteConfig::default().with_env_tokens(|key| match key {
            "DOCS_TOKEN" => Some("docs-secret".into()),
            "GITHUB_TOKEN" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.docs.token.as_deref(), Some("docs-secret"));
        assert_eq!(config.github.token, None);
    }

    #[test]
    fn configured_tokens_win_over_environment() {
        let mut config = SiteConfig::default();
        config.github.token = Some("from-file".into());
        let config = config.with_env_tokens(|_| Some("from-env".into()));
        assert_eq!(config.github.token.as_deref(), Some("from-file"));
    }

    #[test]
    fn shipped_config_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.yml");
        let contents = std::fs::read_to_string(path).unwrap();
        let parsed: SiteConfig = serde_yaml::from_str(&contents).unwrap();
        assert_eq!(parsed.github.per_page, 100);
        assert!(!parsed.site.logo_src.is_empty());
    }
}
