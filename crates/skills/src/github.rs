//! GitHub access: repository info, branch zip snapshots, repository search.

use {
    async_trait::async_trait,
    reqwest::{RequestBuilder, Response, StatusCode, header},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use {
    crate::error::{Error, Result},
    skillman_config::GithubConfig,
};

const API_ACCEPT: &str = "application/vnd.github.v3+json";

/// Repository metadata needed to fetch a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// One repository returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSearchHit {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepoSearchHit>,
}

/// Where remote bundles come from.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// `Ok(None)` when the repository does not exist.
    async fn repo_info(&self, owner: &str, repo: &str) -> Result<Option<RepoInfo>>;

    /// Zip snapshot of `branch`.
    async fn download_zip(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<u8>>;
}

/// [`RepoHost`] backed by the GitHub REST API and archive downloads.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    archive_url: String,
    token: Option<Secret<String>>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            archive_url: config.archive_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Repositories matching `query` that contain a `SKILL.md`, most starred first.
    pub async fn search_repositories(&self, query: &str, limit: u32) -> Result<Vec<RepoSearchHit>> {
        let url = format!("{}/search/repositories", self.api_url);
        let q = format!("{query} SKILL.md in:path");
        let per_page = limit.to_string();
        let resp = self
            .api_get(&url)
            .query(&[("q", q.as_str()), ("per_page", per_page.as_str()), ("sort", "stars")])
            .send()
            .await?;
        let resp = check_api_status(resp, &url)?;
        let body: SearchResponse = resp.json().await?;
        debug!(%query, hits = body.items.len(), "repository search");
        Ok(body.items)
    }

    fn api_get(&self, url: &str) -> RequestBuilder {
        let req = self.http.get(url).header(header::ACCEPT, API_ACCEPT);
        match &self.token {
            Some(token) => req.header(
                header::AUTHORIZATION,
                format!("token {}", token.expose_secret()),
            ),
            None => req,
        }
    }
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn repo_info(&self, owner: &str, repo: &str) -> Result<Option<RepoInfo>> {
        let url = format!("{}/repos/{owner}/{repo}", self.api_url);
        let resp = self.api_get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(%owner, %repo, "repository not found");
            return Ok(None);
        }
        let resp = check_api_status(resp, &url)?;
        Ok(Some(resp.json().await?))
    }

    async fn download_zip(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/{owner}/{repo}/archive/refs/heads/{branch}.zip",
            self.archive_url
        );
        debug!(%url, "downloading snapshot");
        let resp = check_api_status(self.http.get(&url).send().await?, &url)?;
        Ok(resp.bytes().await?.to_vec())
    }
}

fn check_api_status(resp: Response, url: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            status: status.as_u16(),
        });
    }
    Err(Error::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}
