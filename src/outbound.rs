use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tokio::time;
use tracing::warn;

use crate::settings::Jira as JiraSettings;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const SEARCH_PATH: &str = "/rest/api/3/search";
const PROJECT_PATH: &str = "/rest/api/3/project";
const FIELD_PATH: &str = "/rest/api/3/field";
const RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub(crate) enum JiraError {
    #[error("Jira request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Jira returned status {0}")]
    Status(StatusCode),
}

impl JiraError {
    /// Search calls are read-only, so these failures are safe to retry.
    fn is_transient(&self) -> bool {
        match self {
            JiraError::Http(error) => error.is_connect() || error.is_timeout(),
            JiraError::Status(status) => status.is_server_error(),
        }
    }
}

/// A `{label, value}` choice used to populate the configuration UI's
/// project and field selectors.
#[derive(Debug, Clone)]
pub(crate) struct CatalogEntry {
    pub(crate) label: String,
    pub(crate) value: String,
}

/// The Jira REST surface the matrix engine and the catalog queries
/// depend on.
#[async_trait]
pub(crate) trait JiraApi: Send + Sync {
    /// Number of issues matching `jql`.
    async fn search_count(&self, jql: &str) -> Result<u64, JiraError>;

    async fn projects(&self) -> Result<Vec<CatalogEntry>, JiraError>;

    async fn fields(&self) -> Result<Vec<CatalogEntry>, JiraError>;
}

pub(crate) struct JiraClient {
    client: Client,
    base_url: Url,
    user: String,
    token: String,
    max_results: u32,
    search_retries: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

impl JiraClient {
    pub(crate) fn new(
        settings: &JiraSettings,
        max_results: u32,
        search_retries: u32,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;
        let base_url = Url::parse(&settings.base_url)?;
        Ok(JiraClient {
            client,
            base_url,
            user: settings.user.clone(),
            token: settings.token.clone(),
            max_results,
            search_retries,
        })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    async fn search_once(&self, jql: &str) -> Result<u64, JiraError> {
        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(self.endpoint(SEARCH_PATH))
            .query(&[("jql", jql), ("maxResults", max_results.as_str())])
            .basic_auth(&self.user, Some(&self.token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(JiraError::Status(response.status()));
        }
        let body: SearchResponse = response.json().await?;
        Ok(body.total)
    }

    async fn fetch_catalog(&self, path: &str) -> Result<Vec<CatalogEntry>, JiraError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .basic_auth(&self.user, Some(&self.token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(JiraError::Status(response.status()));
        }
        let entries: Vec<NamedEntity> = response.json().await?;
        Ok(entries
            .into_iter()
            .map(|entity| CatalogEntry {
                label: entity.name.clone(),
                value: entity.name,
            })
            .collect())
    }
}

#[async_trait]
impl JiraApi for JiraClient {
    async fn search_count(&self, jql: &str) -> Result<u64, JiraError> {
        let mut attempts = 0;
        loop {
            match self.search_once(jql).await {
                Ok(total) => return Ok(total),
                Err(error) if attempts < self.search_retries && error.is_transient() => {
                    attempts += 1;
                    warn!(
                        "Problem while searching Jira. Retrying in {}s ({attempts}/{}). {error}",
                        RETRY_DELAY.as_secs(),
                        self.search_retries
                    );
                    time::sleep(RETRY_DELAY).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn projects(&self) -> Result<Vec<CatalogEntry>, JiraError> {
        self.fetch_catalog(PROJECT_PATH).await
    }

    async fn fields(&self) -> Result<Vec<CatalogEntry>, JiraError> {
        self.fetch_catalog(FIELD_PATH).await
    }
}

/// In-memory stand-in for the Jira collaborator, keyed by literal JQL.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FakeJira {
    counts: std::collections::HashMap<String, u64>,
    default_count: u64,
    fail_matching: Option<String>,
    projects: Vec<CatalogEntry>,
    fields: Vec<CatalogEntry>,
}

#[cfg(test)]
impl FakeJira {
    pub(crate) fn new() -> Self {
        FakeJira::default()
    }

    pub(crate) fn count(mut self, jql: &str, total: u64) -> Self {
        self.counts.insert(jql.to_string(), total);
        self
    }

    pub(crate) fn default_count(mut self, total: u64) -> Self {
        self.default_count = total;
        self
    }

    /// Any search whose JQL contains `fragment` fails with a 500.
    pub(crate) fn fail_matching(mut self, fragment: &str) -> Self {
        self.fail_matching = Some(fragment.to_string());
        self
    }

    pub(crate) fn projects_named(mut self, names: &[&str]) -> Self {
        self.projects = names
            .iter()
            .map(|name| CatalogEntry {
                label: (*name).to_string(),
                value: (*name).to_string(),
            })
            .collect();
        self
    }

    pub(crate) fn fields_named(mut self, names: &[&str]) -> Self {
        self.fields = names
            .iter()
            .map(|name| CatalogEntry {
                label: (*name).to_string(),
                value: (*name).to_string(),
            })
            .collect();
        self
    }
}

#[cfg(test)]
#[async_trait]
impl JiraApi for FakeJira {
    async fn search_count(&self, jql: &str) -> Result<u64, JiraError> {
        if let Some(fragment) = &self.fail_matching {
            if jql.contains(fragment.as_str()) {
                return Err(JiraError::Status(StatusCode::INTERNAL_SERVER_ERROR));
            }
        }
        Ok(self.counts.get(jql).copied().unwrap_or(self.default_count))
    }

    async fn projects(&self) -> Result<Vec<CatalogEntry>, JiraError> {
        Ok(self.projects.clone())
    }

    async fn fields(&self) -> Result<Vec<CatalogEntry>, JiraError> {
        Ok(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{NamedEntity, SearchResponse};

    #[test]
    fn search_response_only_needs_the_total() {
        let body = r#"{"startAt":0,"maxResults":5000,"total":42,"issues":[]}"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.total, 42);
    }

    #[test]
    fn catalog_entities_parse_from_their_name() {
        let body = r#"[{"id":"10000","key":"TEST","name":"Test Project"},{"id":"3","name":"Status"}]"#;
        let entities: Vec<NamedEntity> = serde_json::from_str(body).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "Test Project");
        assert_eq!(entities[1].name, "Status");
    }
}
