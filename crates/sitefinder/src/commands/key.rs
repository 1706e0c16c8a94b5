//! Identity key derivation.

use sitefinder_core::Site;

use crate::cli::{GlobalOpts, KeyArgs};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &KeyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let site = Site::new(args.name.clone(), args.position.lat, args.position.lng);
    if !site.lat.is_finite() || !site.lng.is_finite() {
        return Err(CliError::Validation {
            field: "position".into(),
            reason: "latitude and longitude must be finite".into(),
        });
    }
    let key = site.key();
    let rendered = output::render_single(
        &global.output,
        &key,
        ToString::to_string,
        ToString::to_string,
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
