// Favorites backend HTTP client
//
// Wraps `reqwest::Client` with bearer-token attachment, URL construction,
// and `{ success, items }` envelope unwrapping. A 401 is reported as
// `Error::Authentication` so the caller can hand it to the session layer.
// List and batch requests that fail transiently are retried once after a
// short pause.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace, warn};
use url::Url;

use super::models::{BatchRequest, FavoriteItem, FavoritesEnvelope};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the favorites backend.
///
/// All methods return the unwrapped `items` payload; the envelope is
/// stripped before the caller sees it.
#[derive(Debug, Clone)]
pub struct FavoritesClient {
    http: reqwest::Client,
    base_url: Url,
    retry_delay: Duration,
}

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);

impl FavoritesClient {
    /// Create a client that attaches `token` as a bearer credential.
    pub fn new(
        base_url: Url,
        token: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_bearer_client(token)?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for any auth headers on `http`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the pause before the single retry (default 800 ms).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /favorites` -- the authoritative favorite list.
    pub async fn list_favorites(&self) -> Result<Vec<FavoriteItem>, Error> {
        let url = self.api_url("favorites")?;
        debug!("GET {}", url);

        let url = &url;
        self.retrying(move || async move {
            let resp = self.http.get(url.clone()).send().await?;
            self.parse_envelope(resp).await
        })
        .await
    }

    /// `POST /favorites/batch` -- apply adds and removes, returning the
    /// resulting authoritative favorite list.
    pub async fn batch(&self, request: &BatchRequest) -> Result<Vec<FavoriteItem>, Error> {
        let url = self.api_url("favorites/batch")?;
        debug!(
            adds = request.adds.len(),
            removes = request.removes.len(),
            "POST {}",
            url
        );

        self.retrying(move || self.post(url.clone(), request)).await
    }

    /// Cheap reachability check against the backend root.
    ///
    /// Any HTTP response (even an error status) means the network path is
    /// up. Only transport failures count as unreachable.
    pub async fn ping(&self) -> Result<(), Error> {
        trace!("HEAD {}", self.base_url);
        self.http.head(self.base_url.clone()).send().await?;
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Run `call`, and once more after `retry_delay` if the first attempt
    /// failed transiently.
    async fn retrying<F, Fut>(&self, mut call: F) -> Result<Vec<FavoriteItem>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<FavoriteItem>, Error>>,
    {
        match call().await {
            Err(e) if e.is_transient() => {
                warn!(
                    error = %e,
                    delay_ms = self.retry_delay.as_millis(),
                    "transient failure, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
                call().await
            }
            result => result,
        }
    }

    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    async fn post(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<Vec<FavoriteItem>, Error> {
        let resp = self.http.post(url).json(body).send().await?;
        self.parse_envelope(resp).await
    }

    /// Parse the `{ success, items }` envelope, returning `items` on
    /// success or an `Error::Api` if `success` is false.
    async fn parse_envelope(&self, resp: reqwest::Response) -> Result<Vec<FavoriteItem>, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "bearer token expired or invalid".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let body = resp.text().await?;

        let envelope: FavoritesEnvelope = serde_json::from_str(&body).map_err(|e| {
            Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body: body.clone(),
            }
        })?;

        if !envelope.success {
            return Err(Error::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "backend reported success=false".into()),
            });
        }

        trace!(items = envelope.items.len(), "favorites envelope ok");
        Ok(envelope.items)
    }
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
