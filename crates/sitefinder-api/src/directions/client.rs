// Walking-directions HTTP client
//
// One GET per request, origin and destination encoded in the path as
// `lng,lat;lng,lat`. The access token rides in the query string, so URLs
// are never logged in full.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::models::{DirectionsResponse, DirectionsRoute, Waypoint};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Codes the provider uses to say "there is no path", as opposed to "the
/// request was bad".
const NO_ROUTE_CODES: &[&str] = &["NoRoute", "NoSegment"];

/// Raw HTTP client for the walking-directions service.
#[derive(Debug, Clone)]
pub struct DirectionsClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: SecretString,
    profile: String,
}

impl DirectionsClient {
    pub fn new(
        base_url: Url,
        access_token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, access_token))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url, access_token: SecretString) -> Self {
        Self {
            http,
            base_url,
            access_token,
            profile: "mapbox/walking".into(),
        }
    }

    /// Override the routing profile (default `mapbox/walking`).
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Fetch the first walking route between two points.
    ///
    /// Returns `Ok(None)` when the provider reports zero routes. Transport
    /// failures and non-2xx responses are errors.
    pub async fn route(
        &self,
        origin: Waypoint,
        destination: Waypoint,
    ) -> Result<Option<DirectionsRoute>, Error> {
        let url = self.route_url(origin, destination)?;
        debug!(path = url.path(), "GET directions");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        // A rejected access token is a plain `Api` failure; `Authentication`
        // is reserved for the favorites session.
        let body = resp.text().await?;

        let parsed: Result<DirectionsResponse, _> = serde_json::from_str(&body);

        if !status.is_success() {
            // A 4xx carrying a no-route code is an answer, not a failure.
            if let Ok(ref r) = parsed {
                if r.code.as_deref().is_some_and(|c| NO_ROUTE_CODES.contains(&c)) {
                    debug!(code = ?r.code, "provider reported no route");
                    return Ok(None);
                }
            }
            let message = parsed
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })?;

        let route = parsed.routes.into_iter().next();
        if route.is_none() {
            debug!(code = ?parsed.code, "provider returned zero routes");
        }
        Ok(route)
    }

    fn route_url(&self, origin: Waypoint, destination: Waypoint) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{base}/directions/v5/{}/{},{};{},{}",
            self.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
        ))?;
        url.query_pairs_mut()
            .append_pair("geometries", "geojson")
            .append_pair("access_token", self.access_token.expose_secret());
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn route_url_orders_longitude_first() {
        let client = DirectionsClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://api.example.com/").unwrap(),
            SecretString::from("tok".to_string()),
        );
        let url = client
            .route_url(
                Waypoint {
                    latitude: 37.5,
                    longitude: 127.0,
                },
                Waypoint {
                    latitude: 37.6,
                    longitude: 127.1,
                },
            )
            .unwrap();
        assert_eq!(
            url.path(),
            "/directions/v5/mapbox/walking/127,37.5;127.1,37.6"
        );
        assert_eq!(url.query(), Some("geometries=geojson&access_token=tok"));
    }
}
