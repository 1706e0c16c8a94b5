//! Nearby search and radius listing.

use serde::Serialize;
use tabled::Tabled;

use sitefinder_core::{Coordinate, Site, radius_label};

use crate::cli::{GlobalOpts, NearbyArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

/// One search hit, with its distance from the query position.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbySite {
    #[serde(flatten)]
    site: Site,
    key: String,
    distance_km: f64,
}

#[derive(Tabled)]
struct NearbyRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Hours")]
    hours: String,
}

impl From<&NearbySite> for NearbyRow {
    fn from(hit: &NearbySite) -> Self {
        Self {
            name: hit.site.name.clone(),
            distance: format_distance(hit.distance_km),
            address: hit.site.address.clone().unwrap_or_default(),
            hours: hit.site.opening_hours.clone().unwrap_or_default(),
        }
    }
}

fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.2} km")
    }
}

pub fn handle(args: NearbyArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let controller_config = config::controller_config(global, cfg, false)?;
    let radius = util::radius_setting(&controller_config, args.radius_index)?;
    let catalog = config::load_catalog(global, cfg)?;

    let position = Coordinate::new(args.position.lat, args.position.lng);
    let hits: Vec<NearbySite> = catalog
        .nearby(position, radius.km())
        .into_iter()
        .map(|site| NearbySite {
            key: site.key().into_inner(),
            distance_km: position.distance_km(site.coordinate()),
            site,
        })
        .collect();

    tracing::debug!(%position, radius = %radius.label(), hits = hits.len(), "nearby search");
    if !global.quiet && matches!(global.output, crate::cli::OutputFormat::Table) {
        eprintln!(
            "{} within {} of {position}",
            hits.len(),
            output::highlight(&radius.label(), output::should_color(&global.color)),
        );
    }

    let rendered = output::render_list(&global.output, &hits, |h| NearbyRow::from(h), |h| h.key.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}

#[derive(Debug, Serialize)]
struct RadiusOption {
    index: usize,
    km: f64,
    label: String,
    default: bool,
}

#[derive(Tabled)]
struct RadiusRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Radius")]
    label: String,
    #[tabled(rename = "Default")]
    default: String,
}

pub fn radius(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let controller_config = config::controller_config(global, cfg, false)?;
    let setting = util::radius_setting(&controller_config, None)?;
    let options: Vec<RadiusOption> = setting
        .options()
        .iter()
        .enumerate()
        .map(|(index, &km)| RadiusOption {
            index,
            km,
            label: radius_label(km),
            default: index == setting.index(),
        })
        .collect();

    let rendered = output::render_list(
        &global.output,
        &options,
        |o| RadiusRow {
            index: o.index,
            label: o.label.clone(),
            default: if o.default { "*".into() } else { String::new() },
        },
        |o| o.label.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_switch_units_at_one_km() {
        assert_eq!(format_distance(0.3004), "300 m");
        assert_eq!(format_distance(1.2345), "1.23 km");
    }
}
