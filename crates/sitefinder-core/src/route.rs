// ── Route provider seam ──
//
// The engine asks for a walking route through `RouteProvider`; the
// production implementation wraps `sitefinder_api::DirectionsClient`.
// Tests substitute their own provider.

use std::future::Future;

use sitefinder_api::{DirectionsClient, TransportConfig};
use tracing::debug;

use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{Coordinate, RouteResult};

/// Source of walking routes.
///
/// `Ok(None)` means the provider answered and there is no path. Errors
/// mean it could not be asked.
pub trait RouteProvider: Send + Sync + 'static {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<Option<RouteResult>, CoreError>> + Send;
}

/// [`RouteProvider`] backed by the walking-directions HTTP service.
#[derive(Debug, Clone)]
pub struct DirectionsRouteProvider {
    client: DirectionsClient,
}

impl DirectionsRouteProvider {
    pub fn new(client: DirectionsClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: config.tls.clone(),
            timeout: config.timeout,
        };
        let client = DirectionsClient::new(
            config.directions_url.clone(),
            config.directions_token.clone(),
            &transport,
        )?;
        Ok(Self::new(client))
    }
}

impl RouteProvider for DirectionsRouteProvider {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<RouteResult>, CoreError> {
        let route = self.client.route(origin.into(), destination.into()).await?;
        let result = route.map(RouteResult::from);
        debug!(
            %origin,
            %destination,
            found = result.is_some(),
            "route lookup finished"
        );
        Ok(result)
    }
}
