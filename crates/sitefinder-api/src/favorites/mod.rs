mod client;
mod models;

pub use client::FavoritesClient;
pub use models::{BatchRequest, FavoriteItem, WireSite};
