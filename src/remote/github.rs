use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Request, Response, StatusCode, Url};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::remote::backend::{RemoteEntry, RemoteFile, RemoteRepository, RemoteSet};
use crate::remote::types::{
    ApiErrorBody, BlobResponse, Branch, ContentResponse, DeleteContentRequest,
    PutContentRequest, PutContentResponse, Repository, TreeResponse, User,
};
use crate::sync::codec;
use crate::sync::throttle::RequestThrottle;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const PAGE_SIZE: usize = 100;

/// GitHub repository backend over the REST API.
#[derive(Debug, Clone)]
pub struct GitHubRemote {
    client: Client,
    api_base: Url,
    owner: String,
    repo: String,
    branch: String,
    throttle: RequestThrottle,
}

impl GitHubRemote {
    /// Create a client for `owner/repo` on `branch` against api.github.com.
    pub fn new(token: &str, repository: &str, branch: &str) -> Result<Self> {
        Self::with_api_base(DEFAULT_API_BASE, token, repository, branch)
    }

    /// Create a client against a custom API root (GitHub Enterprise).
    pub fn with_api_base(api_base: &str, token: &str, repository: &str, branch: &str) -> Result<Self> {
        let (owner, repo) = split_repository(repository)?;
        if token.trim().is_empty() {
            return Err(SyncError::missing("token"));
        }
        if branch.trim().is_empty() {
            return Err(SyncError::missing("branch"));
        }

        let api_base = Url::parse(api_base).map_err(|e| SyncError::InvalidUrl {
            url: api_base.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client: build_client(token)?,
            api_base,
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            throttle: RequestThrottle::default(),
        })
    }

    /// Replace the request throttle.
    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Validate the token by looking up the user it belongs to.
    pub async fn current_user(&self) -> Result<User> {
        let url = self.url(&["user"])?;
        let response = self.send(self.client.get(url).build()?, "user").await?;
        Ok(response.json().await?)
    }

    /// Repositories visible to the token, across all pages.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let mut repos = Vec::new();
        let mut page = 1usize;
        loop {
            let url = self.url(&["user", "repos"])?;
            let request = self
                .client
                .get(url)
                .query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                    ("sort", "full_name".to_string()),
                ])
                .build()?;
            let batch: Vec<Repository> = self.send(request, "user/repos").await?.json().await?;
            let done = batch.len() < PAGE_SIZE;
            repos.extend(batch);
            if done {
                return Ok(repos);
            }
            page += 1;
        }
    }

    /// Branches of the configured repository, across all pages.
    pub async fn list_branches(&self) -> Result<Vec<Branch>> {
        let mut branches = Vec::new();
        let mut page = 1usize;
        loop {
            let url = self.url(&["repos", self.owner.as_str(), self.repo.as_str(), "branches"])?;
            let request = self
                .client
                .get(url)
                .query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ])
                .build()?;
            let batch: Vec<Branch> = self.send(request, "branches").await?.json().await?;
            let done = batch.len() < PAGE_SIZE;
            branches.extend(batch);
            if done {
                return Ok(branches);
            }
            page += 1;
        }
    }

    // ========== Request Building ==========

    /// Recursive tree listing; `nonce` keeps intermediaries from serving a stale tree.
    fn tree_request(&self, nonce: &str) -> Result<Request> {
        let url = self.tree_url()?;
        Ok(self
            .client
            .get(url)
            .query(&[("recursive", "1"), ("t", nonce)])
            .build()?)
    }

    fn get_request(&self, path: &str) -> Result<Request> {
        let url = self.contents_url(path)?;
        Ok(self
            .client
            .get(url)
            .query(&[("ref", self.branch.as_str())])
            .build()?)
    }

    /// Raw blob by sha; used when the contents endpoint omits large files.
    fn blob_request(&self, sha: &str) -> Result<Request> {
        let url = self.url(&["repos", self.owner.as_str(), self.repo.as_str(), "git", "blobs", sha])?;
        Ok(self.client.get(url).build()?)
    }

    fn put_request(
        &self,
        path: &str,
        content: &[u8],
        token: Option<&str>,
        message: &str,
    ) -> Result<Request> {
        let url = self.contents_url(path)?;
        let body = PutContentRequest {
            message,
            content: codec::encode(content),
            branch: &self.branch,
            sha: token,
        };
        Ok(self.client.put(url).json(&body).build()?)
    }

    fn delete_request(&self, path: &str, token: &str, message: &str) -> Result<Request> {
        let url = self.contents_url(path)?;
        let body = DeleteContentRequest {
            message,
            sha: token,
            branch: &self.branch,
        };
        Ok(self.client.delete(url).json(&body).build()?)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl {
                url: self.api_base.to_string(),
                message: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `.../repos/{owner}/{repo}/contents/{path}` with each path segment encoded.
    fn contents_url(&self, path: &str) -> Result<Url> {
        let mut segments = vec!["repos", self.owner.as_str(), self.repo.as_str(), "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.url(&segments)
    }

    fn tree_url(&self) -> Result<Url> {
        let mut segments = vec!["repos", self.owner.as_str(), self.repo.as_str(), "git", "trees"];
        segments.extend(self.branch.split('/'));
        self.url(&segments)
    }

    /// Send a paced request and turn error statuses into typed errors.
    async fn send(&self, request: Request, path: &str) -> Result<Response> {
        self.throttle.acquire().await;
        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        Err(classify_status(status, rate_limited, path, message))
    }
}

/// Map an error status to the matching `SyncError`.
pub fn classify_status(status: StatusCode, rate_limited: bool, path: &str, message: String) -> SyncError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if rate_limited => {
            SyncError::RateLimited { message }
        }
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited { message },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized { message },
        StatusCode::NOT_FOUND => SyncError::NotFound {
            path: path.to_string(),
        },
        // 409: sha does not match; 422: sha missing for an existing file
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => SyncError::Conflict {
            path: path.to_string(),
            message,
        },
        _ => SyncError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Split `owner/name` into its parts.
pub fn split_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(SyncError::MissingConfig {
            field: format!("repository (expected owner/name, got '{}')", repository),
        }),
    }
}

fn build_client(token: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
        .map_err(|_| SyncError::missing("token (contains invalid characters)"))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(concat!("gitsync/", env!("CARGO_PKG_VERSION"))));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

    Ok(Client::builder().default_headers(headers).build()?)
}

/// Keep the blobs of a tree listing; trees and submodules are dropped.
pub fn remote_set_from_tree(tree: TreeResponse) -> RemoteSet {
    tree.tree
        .into_iter()
        .filter(|item| item.is_blob())
        .map(|item| RemoteEntry::new(item.path, item.sha))
        .collect()
}

/// Decode a contents or blob payload.
///
/// `Ok(None)` means the API left the content out, which the contents
/// endpoint does for files over 1 MB.
pub fn decode_payload(path: &str, encoding: &str, content: &str) -> Result<Option<Vec<u8>>> {
    match encoding {
        "" | "base64" => Ok(Some(codec::decode(content)?)),
        "none" => Ok(None),
        other => Err(SyncError::Api {
            status: 200,
            message: format!("unsupported content encoding '{}' for {}", other, path),
        }),
    }
}

#[async_trait]
impl RemoteRepository for GitHubRemote {
    async fn list_tree(&self) -> Result<RemoteSet> {
        let nonce = chrono::Utc::now().timestamp_millis().to_string();
        let request = self.tree_request(&nonce)?;
        let tree: TreeResponse = self.send(request, &self.branch).await?.json().await?;

        if tree.truncated {
            warn!(repo = %self.describe(), "remote tree listing was truncated; some files will be ignored");
        }

        let set = remote_set_from_tree(tree);
        debug!(repo = %self.describe(), blobs = set.len(), "fetched remote tree");
        Ok(set)
    }

    async fn get_file(&self, path: &str) -> Result<RemoteFile> {
        let body: ContentResponse = self.send(self.get_request(path)?, path).await?.json().await?;

        let content = match decode_payload(path, &body.encoding, &body.content)? {
            Some(content) => content,
            None => {
                debug!(path, sha = %body.sha, "content omitted by contents endpoint, fetching blob");
                let blob: BlobResponse = self
                    .send(self.blob_request(&body.sha)?, path)
                    .await?
                    .json()
                    .await?;
                decode_payload(path, &blob.encoding, &blob.content)?.ok_or_else(|| SyncError::Api {
                    status: 200,
                    message: format!("blob {} for {} came back without content", body.sha, path),
                })?
            }
        };

        Ok(RemoteFile {
            content,
            token: body.sha,
        })
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        token: Option<&str>,
        message: &str,
    ) -> Result<String> {
        let request = self.put_request(path, content, token, message)?;
        let response: PutContentResponse = self.send(request, path).await?.json().await?;
        Ok(response.content.sha)
    }

    async fn delete_file(&self, path: &str, token: &str, message: &str) -> Result<()> {
        self.send(self.delete_request(path, token, message)?, path).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.branch)
    }
}
