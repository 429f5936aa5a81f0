//! Podcast episode list for the home page.
//!
//! The endpoint follows the Spotify show-episodes response shape. The fetch
//! is best effort: any failure leaves the home page without episodes.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EpisodesConfig;

/// A podcast episode as shown on the home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub date: String,
    pub image: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpisodePage {
    #[serde(default)]
    items: Option<Vec<RawEpisode>>,
}

#[derive(Debug, Deserialize)]
struct RawEpisode {
    id: String,
    name: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    images: Vec<RawImage>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<RawEpisode> for Episode {
    fn from(raw: RawEpisode) -> Self {
        Self {
            id: raw.id,
            title: raw.name,
            date: raw.release_date,
            image: raw.images.into_iter().next().map(|img| img.url),
            url: raw.external_urls.spotify,
        }
    }
}

/// Client for the episode endpoint.
pub struct EpisodeClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    limit: usize,
}

impl EpisodeClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, limit: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token,
            limit,
        }
    }

    /// Build a client, reading the bearer token from the configured variable.
    pub fn from_config(config: &EpisodesConfig) -> Self {
        let token = config
            .token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|token| !token.is_empty());
        Self::new(config.endpoint.clone(), token, config.limit)
    }

    /// Fetch the latest episodes. Never fails: errors yield an empty list.
    pub async fn fetch(&self) -> Vec<Episode> {
        let mut request = self.http.get(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(endpoint = %self.endpoint, %error, "episode fetch failed");
                return Vec::new();
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!(endpoint = %self.endpoint, "episode endpoint returned no content");
            return Vec::new();
        }
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "episode endpoint returned an error");
            return Vec::new();
        }

        let page: EpisodePage = match response.json().await {
            Ok(page) => page,
            Err(error) => {
                warn!(endpoint = %self.endpoint, %error, "episode response could not be decoded");
                return Vec::new();
            }
        };

        let episodes: Vec<Episode> = page
            .items
            .unwrap_or_default()
            .into_iter()
            .take(self.limit)
            .map(Episode::from)
            .collect();
        debug!(count = episodes.len(), "fetched episodes");
        episodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::get};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn sample() -> serde_json::Value {
        json!({
            "items": [
                {
                    "id": "ep1",
                    "name": "First Episode",
                    "release_date": "2023-03-01",
                    "images": [{ "url": "https://img.example.com/1.png" }, { "url": "https://img.example.com/1-small.png" }],
                    "external_urls": { "spotify": "https://open.spotify.com/episode/ep1" }
                },
                {
                    "id": "ep2",
                    "name": "Second Episode",
                    "release_date": "2023-02-01",
                    "images": []
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_no_content_yields_empty_list() {
        let app = Router::new().route("/episodes", get(|| async { StatusCode::NO_CONTENT }));
        let base = serve(app).await;

        let client = EpisodeClient::new(format!("{base}/episodes"), None, 6);
        assert!(client.fetch().await.is_empty());
    }

    #[tokio::test]
    async fn test_maps_items() {
        let app = Router::new().route("/episodes", get(|| async { Json(sample()) }));
        let base = serve(app).await;

        let episodes = EpisodeClient::new(format!("{base}/episodes"), None, 6)
            .fetch()
            .await;
        assert_eq!(episodes.len(), 2);
        assert_eq!(
            episodes[0],
            Episode {
                id: "ep1".to_string(),
                title: "First Episode".to_string(),
                date: "2023-03-01".to_string(),
                image: Some("https://img.example.com/1.png".to_string()),
                url: Some("https://open.spotify.com/episode/ep1".to_string()),
            }
        );
        assert_eq!(episodes[1].image, None);
        assert_eq!(episodes[1].url, None);
    }

    #[tokio::test]
    async fn test_limit_and_bearer_token() {
        let app = Router::new().route(
            "/episodes",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("Bearer secret") => (StatusCode::OK, Json(sample())),
                    _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
                }
            }),
        );
        let base = serve(app).await;

        let anonymous = EpisodeClient::new(format!("{base}/episodes"), None, 1);
        assert!(anonymous.fetch().await.is_empty());

        let authorized =
            EpisodeClient::new(format!("{base}/episodes"), Some("secret".to_string()), 1);
        let episodes = authorized.fetch().await;
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].id, "ep1");
    }

    #[tokio::test]
    async fn test_error_status_and_missing_items() {
        let app = Router::new()
            .route(
                "/broken",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/empty", get(|| async { Json(json!({ "total": 0 })) }))
            .route("/garbage", get(|| async { "not json" }));
        let base = serve(app).await;

        for path in ["broken", "empty", "garbage"] {
            let client = EpisodeClient::new(format!("{base}/{path}"), None, 6);
            assert!(client.fetch().await.is_empty(), "{path} should yield no episodes");
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = EpisodeClient::new(format!("http://{addr}/episodes"), None, 6);
        assert!(client.fetch().await.is_empty());
    }
}
