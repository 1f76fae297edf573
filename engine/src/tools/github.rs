//! GitHub repository search
//!
//! Wraps `GET /search/repositories` and reduces each hit to the handful of
//! fields the verifier renders.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolArgs, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{request_error, status_error};
use crate::config::GithubConfig;
use crate::secrets::SecretString;

pub const TOOL_NAME: &str = "github_search";

const USER_AGENT: &str = concat!("opsagent/", env!("CARGO_PKG_VERSION"));
const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 10;
const SORT_KEYS: &[&str] = &["stars", "forks", "updated"];
const ORDERS: &[&str] = &["asc", "desc"];

pub struct GithubTool {
    base_url: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

/// One repository in the tool output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    #[serde(default)]
    html_url: String,
}

impl From<SearchItem> for Repository {
    fn from(item: SearchItem) -> Self {
        Self {
            name: item.name,
            full_name: item.full_name,
            description: item.description,
            stars: item.stargazers_count,
            forks: item.forks_count,
            language: item.language,
            url: item.html_url,
        }
    }
}

impl GithubTool {
    /// `token` is optional; unauthenticated search works with lower rate limits.
    pub fn new(config: &GithubConfig, token: Option<SecretString>) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn choice<'a>(
        args: &'a ToolArgs,
        key: &str,
        allowed: &[&str],
        default: &'a str,
    ) -> Result<&'a str, ToolError> {
        match args.param_str_opt(key) {
            None => Ok(default),
            Some(v) if allowed.contains(&v) => Ok(v),
            Some(v) => Err(ToolError::invalid_input(format!(
                "Invalid {} '{}'. Expected one of: {}",
                key,
                v,
                allowed.join(", ")
            ))),
        }
    }
}

#[async_trait]
impl Tool for GithubTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search public GitHub repositories by keyword and return the top matches with stars, forks and language"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::required("query", ParamType::String, "Search keywords"),
            ParameterSpec::optional(
                "sort",
                ParamType::String,
                "Sort key: stars, forks or updated (default stars)",
            ),
            ParameterSpec::optional("order", ParamType::String, "asc or desc (default desc)"),
            ParameterSpec::optional(
                "limit",
                ParamType::Integer,
                "Number of repositories to return, 1-10 (default 5)",
            ),
        ])
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let query = args.param_str("query")?.trim();
        if query.is_empty() {
            return Err(ToolError::invalid_input("Search query must not be empty"));
        }
        let sort = Self::choice(args, "sort", SORT_KEYS, "stars")?;
        let order = Self::choice(args, "order", ORDERS, "desc")?;
        let limit = args
            .param_i64_opt("limit")
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        tracing::info!("Searching GitHub for: {}", query);

        let mut request = self
            .client
            .get(format!("{}/search/repositories", self.base_url))
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query.to_string()),
                ("sort", sort.to_string()),
                ("order", order.to_string()),
                ("per_page", limit.to_string()),
            ]);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error(e, "GitHub"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, "GitHub"));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| request_error(e, "GitHub"))?;

        let repositories: Vec<Repository> = data
            .items
            .into_iter()
            .take(limit as usize)
            .map(Repository::from)
            .collect();

        tracing::debug!(
            "GitHub search returned {} of {} repositories",
            repositories.len(),
            data.total_count
        );

        Ok(serde_json::json!({
            "total_count": data.total_count,
            "repositories": repositories,
        }))
    }
}
