//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, TokenKindArg};
use crate::config::{self, Config, Profile, TokenKind};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn invalid(field: &str, reason: &str) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

impl From<TokenKindArg> for TokenKind {
    fn from(kind: TokenKindArg) -> Self {
        match kind {
            TokenKindArg::Api => Self::Api,
            TokenKindArg::Directions => Self::Directions,
        }
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            for profile in cfg.profiles.values_mut() {
                for token in [&mut profile.api_token, &mut profile.directions_token] {
                    if token.is_some() {
                        *token = Some(REDACTED.into());
                    }
                }
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile_name().to_owned(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile_name();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: sitefinder config init");
            } else {
                let mut names: Vec<&String> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetToken { kind, token } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let kind = TokenKind::from(kind);
            let secret = match token {
                Some(token) => token,
                None => rpassword::prompt_password(format!("{}: ", kind.account()))
                    .map_err(prompt_err)?,
            };
            if secret.is_empty() {
                return Err(invalid("token", "value cannot be empty"));
            }
            config::store_token(&profile_name, kind, &secret)?;
            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("sitefinder configuration");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let api_url: String = Input::new()
        .with_prompt("Favorites API URL")
        .default("http://localhost:4000".into())
        .interact_text()
        .map_err(prompt_err)?;
    if api_url.parse::<url::Url>().is_err() {
        return Err(invalid("api_url", "not a valid URL"));
    }

    let catalog: String = Input::new()
        .with_prompt("Site catalog JSON file")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store tokens?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let use_keyring = store_selection == 0;

    let mut tokens = [None, None];
    for (slot, kind) in tokens.iter_mut().zip([TokenKind::Api, TokenKind::Directions]) {
        let secret = rpassword::prompt_password(format!("{} (empty to skip): ", kind.account()))
            .map_err(prompt_err)?;
        if secret.is_empty() {
            continue;
        }
        if use_keyring {
            config::store_token(&profile_name, kind, &secret)?;
            eprintln!("   ✓ {} stored in system keyring", kind.account());
        } else {
            *slot = Some(secret);
        }
    }
    let [api_token, directions_token] = tokens;

    let profile = Profile {
        api_url,
        api_token,
        directions_token,
        catalog: (!catalog.is_empty()).then(|| catalog.into()),
        ..Profile::default()
    };

    let mut profiles = HashMap::new();
    profiles.insert(profile_name.clone(), profile);
    let cfg = Config {
        default_profile: Some(profile_name.clone()),
        defaults: sitefinder_config::Defaults::default(),
        profiles,
    };
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: sitefinder favorites list");
    Ok(())
}

fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    fn number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
        value.parse().map_err(|_| invalid(field, "must be a number"))
    }

    match key {
        "api_url" | "api-url" => profile.api_url = value,
        "api_token_env" | "api-token-env" => profile.api_token_env = Some(value),
        "directions_url" | "directions-url" => profile.directions_url = Some(value),
        "directions_token_env" | "directions-token-env" => {
            profile.directions_token_env = Some(value);
        }
        "catalog" => profile.catalog = Some(value.into()),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "timeout" => profile.timeout = Some(number(key, &value)?),
        "radius_index" | "radius-index" => profile.radius_index = Some(number(key, &value)?),
        "radius_options" | "radius-options" => {
            let options = value
                .split(',')
                .map(|v| number::<f64>(key, v.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            profile.radius_options = Some(options);
        }
        "favorite_debounce_ms" | "favorite-debounce-ms" => {
            profile.favorite_debounce_ms = Some(number(key, &value)?);
        }
        "reroute_threshold_m" | "reroute-threshold-m" => {
            profile.reroute_threshold_m = Some(number(key, &value)?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: api_url, api_token_env, \
                     directions_url, directions_token_env, catalog, ca_cert, timeout, \
                     radius_index, radius_options, favorite_debounce_ms, reroute_threshold_m"
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sets_known_profile_keys() {
        let mut profile = Profile::default();
        set_profile_value(&mut profile, "api-url", "https://fav.example.com".into()).unwrap();
        set_profile_value(&mut profile, "radius_options", "0.5, 1, 2".into()).unwrap();
        set_profile_value(&mut profile, "timeout", "7".into()).unwrap();

        assert_eq!(profile.api_url, "https://fav.example.com");
        assert_eq!(profile.radius_options, Some(vec![0.5, 1.0, 2.0]));
        assert_eq!(profile.timeout, Some(7));
    }

    #[test]
    fn rejects_unknown_and_malformed_values() {
        let mut profile = Profile::default();
        assert!(set_profile_value(&mut profile, "colour", "red".into()).is_err());
        assert!(set_profile_value(&mut profile, "timeout", "soon".into()).is_err());
    }
}
