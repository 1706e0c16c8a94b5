// ── Detail panel state machine ──
//
// Closed → Selected(site) → RoutingActive(site, route) → Closed.
// Transitions return the effects the controller must carry out; the
// machine itself never talks to the renderer. Every transition bumps the
// generation, so a route response dispatched before it can be recognized
// as stale.

use crate::bridge::OutboundMessage;
use crate::error::CoreError;
use crate::model::{RouteNotice, RouteResult, Site};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PanelState {
    #[default]
    Closed,
    Selected(Site),
    RoutingActive { site: Site, route: RouteResult },
}

impl PanelState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Selected(_) => "selected",
            Self::RoutingActive { .. } => "routing",
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEffect {
    /// Show the detail panel for a site.
    Open(Site),
    /// Hide the detail panel.
    Close,
    Render(OutboundMessage),
    Notice(RouteNotice),
}

#[derive(Debug, Default)]
pub struct PanelStateMachine {
    state: PanelState,
    generation: u64,
}

impl PanelStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_routing(&self) -> bool {
        matches!(self.state, PanelState::RoutingActive { .. })
    }

    /// Site currently shown or routed to.
    pub fn site(&self) -> Option<&Site> {
        match &self.state {
            PanelState::Closed => None,
            PanelState::Selected(site) | PanelState::RoutingActive { site, .. } => Some(site),
        }
    }

    pub fn route(&self) -> Option<&RouteResult> {
        match &self.state {
            PanelState::RoutingActive { route, .. } => Some(route),
            _ => None,
        }
    }

    /// Valid from any state. Leaving an active route clears its polyline.
    pub fn marker_click(&mut self, site: Site) -> Vec<PanelEffect> {
        let mut effects = Vec::with_capacity(2);
        if self.is_routing() {
            effects.push(PanelEffect::Render(OutboundMessage::ClearRoute));
        }
        effects.push(PanelEffect::Open(site.clone()));
        self.enter(PanelState::Selected(site));
        effects
    }

    /// `Selected` → `RoutingActive`.
    pub fn route_found(&mut self, route: RouteResult) -> Result<Vec<PanelEffect>, CoreError> {
        let PanelState::Selected(site) = &self.state else {
            return Err(self.invalid("start a route"));
        };
        let site = site.clone();
        let effects = vec![
            PanelEffect::Render(OutboundMessage::DrawRoute {
                path: route.path.clone(),
            }),
            PanelEffect::Close,
        ];
        self.enter(PanelState::RoutingActive { site, route });
        Ok(effects)
    }

    /// `Selected` stays `Selected` with a user notice.
    pub fn route_unavailable(&mut self, notice: RouteNotice) -> Result<Vec<PanelEffect>, CoreError> {
        if !matches!(self.state, PanelState::Selected(_)) {
            return Err(self.invalid("start a route"));
        }
        self.generation += 1;
        Ok(vec![PanelEffect::Notice(notice)])
    }

    /// Swap in a recomputed route while `RoutingActive`.
    pub fn reroute(&mut self, new_route: RouteResult) -> Result<Vec<PanelEffect>, CoreError> {
        if !self.is_routing() {
            return Err(self.invalid("reroute"));
        }
        let effects = vec![PanelEffect::Render(OutboundMessage::DrawRoute {
            path: new_route.path.clone(),
        })];
        if let PanelState::RoutingActive { route, .. } = &mut self.state {
            *route = new_route;
        }
        self.generation += 1;
        Ok(effects)
    }

    /// `Selected` → `Closed`.
    pub fn close(&mut self) -> Result<Vec<PanelEffect>, CoreError> {
        if !matches!(self.state, PanelState::Selected(_)) {
            return Err(self.invalid("close the panel"));
        }
        self.enter(PanelState::Closed);
        Ok(vec![PanelEffect::Close])
    }

    /// `RoutingActive` → `Closed`.
    pub fn cancel(&mut self) -> Result<Vec<PanelEffect>, CoreError> {
        if !self.is_routing() {
            return Err(self.invalid("cancel routing"));
        }
        self.enter(PanelState::Closed);
        Ok(vec![PanelEffect::Render(OutboundMessage::ClearRoute)])
    }

    fn enter(&mut self, next: PanelState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "panel transition");
        self.state = next;
        self.generation += 1;
    }

    fn invalid(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}
