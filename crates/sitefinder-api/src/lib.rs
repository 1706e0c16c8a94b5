//! Async HTTP clients for the services sitefinder talks to.
//!
//! - **[`FavoritesClient`]** -- bearer-authenticated client for the favorites
//!   backend (`GET /favorites`, `POST /favorites/batch`). Unwraps the
//!   `{ success, items }` envelope before the caller sees it.
//!
//! - **[`DirectionsClient`]** -- walking-directions client. Returns the first
//!   route the provider reports, or `None` when it reports zero routes.
//!
//! - **[`TransportConfig`]** -- shared timeout / TLS / header settings used to
//!   build the underlying `reqwest::Client` for both.
//!
//! Nothing in this crate knows about the domain model. `sitefinder-core`
//! converts the wire types here into its canonical types.

pub mod directions;
pub mod error;
pub mod favorites;
pub mod transport;

pub use directions::{DirectionsClient, DirectionsRoute, Waypoint};
pub use error::Error;
pub use favorites::{BatchRequest, FavoriteItem, FavoritesClient, WireSite};
pub use transport::{TlsMode, TransportConfig};
