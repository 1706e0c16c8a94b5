//! Headless map session.
//!
//! Reads one input per line on stdin: a position (`lat,lng` or
//! `{"latitude":..,"longitude":..}`), `denied`, or a panel action. Every
//! message the engine sends to the renderer is written to stdout as one
//! JSON line. Renderer messages (e.g. `marker_click`) are read from the
//! `--inbound` file or FIFO. With `--print-state`, the outbound stream is
//! also replayed into a [`RendererModel`] whose final state is the last
//! stdout line.

use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sitefinder_core::{
    Controller, Coordinate, CoreError, PanelState, RendererModel, RouteOutcome,
};

use crate::cli::{GlobalOpts, TrackArgs};
use crate::config::{self, Config};
use crate::error::CliError;

/// One stdin line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackInput {
    Fix(Coordinate),
    PermissionDenied,
    StartRoute,
    CancelRoute,
    ClosePanel,
    Center,
    ToggleFavorite,
    RadiusUp,
    RadiusDown,
    Radius(usize),
}

impl FromStr for TrackInput {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.starts_with('{') {
            let position: Coordinate = serde_json::from_str(line)?;
            return Ok(Self::Fix(position));
        }
        match line {
            "denied" => return Ok(Self::PermissionDenied),
            "route" => return Ok(Self::StartRoute),
            "cancel" => return Ok(Self::CancelRoute),
            "close" => return Ok(Self::ClosePanel),
            "center" => return Ok(Self::Center),
            "favorite" | "fav" => return Ok(Self::ToggleFavorite),
            "radius+" => return Ok(Self::RadiusUp),
            "radius-" => return Ok(Self::RadiusDown),
            _ => {}
        }
        if let Some(index) = line.strip_prefix("radius ") {
            return index
                .trim()
                .parse()
                .map(Self::Radius)
                .map_err(|_| invalid_line(line));
        }

        let (lat, lng) = line.split_once(',').ok_or_else(|| invalid_line(line))?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid_line(line))?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid_line(line))?;
        if !lat.is_finite() || !lng.is_finite() {
            return Err(invalid_line(line));
        }
        Ok(Self::Fix(Coordinate::new(lat, lng)))
    }
}

fn invalid_line(line: &str) -> CliError {
    CliError::Validation {
        field: "input".into(),
        reason: format!("expected `lat,lng`, a JSON position, or an action, got '{line}'"),
    }
}

pub async fn handle(args: TrackArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let controller_config = config::controller_config(global, cfg, false)?;
    let catalog = config::load_catalog(global, cfg)?;
    let controller = Controller::from_config(&controller_config, catalog)?;

    let mut outbound = controller
        .take_renderer_outbound()
        .ok_or_else(|| std::io::Error::other("renderer channel already taken"))?;
    let mut events = controller.events();
    let mut state = args.print_state.then(RendererModel::new);

    if args.sync {
        match controller.refresh_favorites().await {
            Ok(count) => info!(favorites = count, "favorites synced"),
            Err(e) => warn!(error = %e, "favorites sync failed"),
        }
    }
    if let Some(path) = args.inbound {
        let inbound = spawn_inbound_reader(path).await?;
        controller.listen_renderer(inbound).await;
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() || line.trim_start().starts_with('#') {
                    continue;
                }
                match line.parse::<TrackInput>() {
                    Ok(input) => {
                        if let Err(e) = apply(&controller, input).await {
                            warn!(?input, error = %e, "input rejected");
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping line"),
                }
            }
            Some(raw) = outbound.recv() => emit(&mut stdout, state.as_mut(), &raw).await?,
            event = events.recv() => {
                if let Ok(event) = event {
                    info!(?event, "ui event");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    match controller.flush_favorites().await {
        Ok(outcome) => debug!(?outcome, "favorites flushed"),
        Err(e) => warn!(error = %e, "favorites left unsynced"),
    }
    controller.dispose().await;

    while let Ok(raw) = outbound.try_recv() {
        emit(&mut stdout, state.as_mut(), &raw).await?;
    }
    if let Some(state) = state {
        write_line(&mut stdout, &serde_json::to_string(&state)?).await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn apply(controller: &Controller, input: TrackInput) -> Result<(), CoreError> {
    match input {
        TrackInput::Fix(position) => controller.handle_position(position).await,
        TrackInput::PermissionDenied => {
            controller.handle_permission_denied();
            Ok(())
        }
        TrackInput::StartRoute => {
            match controller.start_route().await? {
                RouteOutcome::Routed(route) => {
                    let summary = route.summary();
                    info!(distance = %summary.distance, duration = %summary.duration, "routing");
                }
                outcome => info!(?outcome, "no route drawn"),
            }
            Ok(())
        }
        TrackInput::CancelRoute => controller.cancel_route(),
        TrackInput::ClosePanel => controller.close_panel(),
        TrackInput::Center => {
            if !controller.center_on_user()? {
                info!("no position yet, nothing to center on");
            }
            Ok(())
        }
        TrackInput::ToggleFavorite => {
            let (PanelState::Selected(site) | PanelState::RoutingActive { site, .. }) =
                controller.panel_state()
            else {
                return Err(CoreError::InvalidTransition {
                    action: "toggle a favorite",
                    state: "closed",
                });
            };
            let is_fav = controller.toggle_favorite(site)?;
            debug!(is_fav, "favorite toggled");
            Ok(())
        }
        TrackInput::RadiusUp => controller.increase_radius().map(drop),
        TrackInput::RadiusDown => controller.decrease_radius().map(drop),
        TrackInput::Radius(index) => controller.set_radius_index(index),
    }
}

/// Forward lines from `path` into a channel until EOF.
async fn spawn_inbound_reader(path: PathBuf) -> Result<mpsc::UnboundedReceiver<String>, CliError> {
    let file = tokio::fs::File::open(&path).await?;
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(file).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "inbound read failed");
                    break;
                }
            }
        }
        debug!("inbound reader finished");
    });
    Ok(rx)
}

/// Write one outbound message and fold it into `state` when tracking one.
async fn emit(
    stdout: &mut tokio::io::Stdout,
    state: Option<&mut RendererModel>,
    raw: &str,
) -> Result<(), CliError> {
    write_line(stdout, raw).await?;
    if let Some(state) = state {
        if let Err(e) = state.apply_raw(raw) {
            warn!(error = %e, "renderer state not updated");
        }
    }
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, raw: &str) -> Result<(), CliError> {
    stdout.write_all(raw.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
