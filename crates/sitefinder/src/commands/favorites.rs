//! Favorites command handlers.
//!
//! One-shot commands use the immediate toggle path: the process exits right
//! after the change, so nothing is left for a debounce timer to flush.

use serde::Serialize;
use tabled::Tabled;

use sitefinder_core::{Controller, Site, SiteCatalog};

use crate::cli::{FavoritesArgs, FavoritesCommand, GlobalOpts};
use crate::config::{self, Config, TokenKind};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct FavoriteView {
    key: String,
    site: Site,
}

#[derive(Tabled)]
struct FavoriteRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Key")]
    key: String,
}

fn connect(global: &GlobalOpts, cfg: &Config, catalog: SiteCatalog) -> Result<Controller, CliError> {
    let controller_config = config::controller_config(global, cfg, true)?;
    config::require_token(&controller_config.api_token, TokenKind::Api, global, cfg)?;
    Ok(Controller::from_config(&controller_config, catalog)?)
}

pub async fn handle(
    args: FavoritesArgs,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    match args.command {
        FavoritesCommand::List => {
            let controller = connect(global, cfg, SiteCatalog::default())?;
            let count = controller.refresh_favorites().await?;
            tracing::debug!(count, "favorites fetched");

            let mut favorites: Vec<FavoriteView> = controller
                .favorites_snapshot()
                .iter()
                .map(|(key, site)| FavoriteView {
                    key: key.to_string(),
                    site: site.clone(),
                })
                .collect();
            favorites.sort_by(|a, b| a.key.cmp(&b.key));
            controller.dispose().await;

            let rendered = output::render_list(
                &global.output,
                &favorites,
                |f| FavoriteRow {
                    marker: output::favorite_marker(true, color),
                    name: f.site.name.clone(),
                    address: f.site.address.clone().unwrap_or_default(),
                    key: f.key.clone(),
                },
                |f| f.key.clone(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        FavoritesCommand::Add { site } => set_favorite(global, cfg, &site, Some(true)).await,
        FavoritesCommand::Remove { site } => set_favorite(global, cfg, &site, Some(false)).await,
        FavoritesCommand::Toggle { site } => set_favorite(global, cfg, &site, None).await,
    }
}

/// Bring `identifier` to the `wanted` state, or flip it when `None`.
async fn set_favorite(
    global: &GlobalOpts,
    cfg: &Config,
    identifier: &str,
    wanted: Option<bool>,
) -> Result<(), CliError> {
    let catalog = config::load_catalog(global, cfg)?;
    let site = util::resolve_site(&catalog, identifier)?;
    let controller = connect(global, cfg, catalog)?;
    controller.refresh_favorites().await?;

    let current = controller.is_favorite(&site);
    let is_fav = if wanted == Some(current) {
        current
    } else {
        controller.toggle_favorite_now(site.clone()).await?
    };
    controller.dispose().await;

    if !global.quiet {
        let verb = match (wanted == Some(current), is_fav) {
            (true, true) => "already a favorite",
            (true, false) => "not a favorite",
            (false, true) => "added to favorites",
            (false, false) => "removed from favorites",
        };
        eprintln!(
            "{} {} {verb}",
            output::favorite_marker(is_fav, output::should_color(&global.color)),
            site.name
        );
    }
    Ok(())
}
