//! Walking route to a catalog site.

use serde::Serialize;

use sitefinder_core::{Coordinate, DirectionsRouteProvider, RouteProvider, RouteResult};

use crate::cli::{GlobalOpts, RouteArgs};
use crate::config::{self, Config, TokenKind};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteView {
    site: String,
    key: String,
    distance: String,
    duration: String,
    #[serde(flatten)]
    route: RouteResult,
}

fn detail(view: &RouteView) -> String {
    [
        format!("Destination  {}", view.site),
        format!("Distance     {}", view.distance),
        format!("Walking time {}", view.duration),
        format!("Waypoints    {}", view.route.path.len()),
    ]
    .join("\n")
}

pub async fn handle(args: RouteArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let controller_config = config::controller_config(global, cfg, false)?;
    config::require_token(
        &controller_config.directions_token,
        TokenKind::Directions,
        global,
        cfg,
    )?;
    let catalog = config::load_catalog(global, cfg)?;
    let site = util::resolve_site(&catalog, &args.site)?;

    let provider = DirectionsRouteProvider::from_config(&controller_config)?;
    let origin = Coordinate::new(args.from.lat, args.from.lng);
    let Some(route) = provider.route(origin, site.coordinate()).await? else {
        return Err(CliError::NoRoute { site: site.name });
    };

    let summary = route.summary();
    let view = RouteView {
        key: site.key().into_inner(),
        site: site.name,
        distance: summary.distance,
        duration: summary.duration,
        route,
    };
    let rendered = output::render_single(&global.output, &view, detail, |v| {
        format!("{}\t{}", v.distance, v.duration)
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
