//! Shared helpers for command handlers.

use sitefinder_core::{ControllerConfig, RadiusSetting, Site, SiteCatalog};

use crate::error::CliError;

/// Resolve a site by identity key, then by exact name.
///
/// A name shared by several catalog entries is rejected; pass the key
/// instead.
pub fn resolve_site(catalog: &SiteCatalog, identifier: &str) -> Result<Site, CliError> {
    if let Some(site) = catalog
        .sites()
        .iter()
        .find(|s| s.key().as_str() == identifier)
    {
        return Ok(site.clone());
    }

    let mut by_name = catalog.sites().iter().filter(|s| s.name == identifier);
    match (by_name.next(), by_name.next()) {
        (Some(site), None) => Ok(site.clone()),
        (Some(_), Some(_)) => Err(CliError::Validation {
            field: "site".into(),
            reason: format!("'{identifier}' names several sites; use its key instead"),
        }),
        (None, _) => Err(CliError::NotFound {
            resource_type: "site".into(),
            identifier: identifier.into(),
            list_command: "nearby".into(),
        }),
    }
}

/// Radius options from config, starting at `index` when given.
pub fn radius_setting(
    config: &ControllerConfig,
    index: Option<usize>,
) -> Result<RadiusSetting, CliError> {
    let index = index.unwrap_or(config.initial_radius_index);
    Ok(RadiusSetting::new(config.radius_options_km.clone(), index)?)
}
