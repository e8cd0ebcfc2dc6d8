//! Hover state machine driving the info panel and region emphasis.
//!
//! A pointer may hover at most one region. Entering a region while another is
//! hovered, or leaving a region that is not hovered, is rejected and leaves
//! the state untouched.

use crate::aggregate::CountryCountTable;
use crate::style::{base_style, highlight_style, RegionStyle};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PROMPT: &str = "Hover over a country for more information";

/// The single text box describing what is under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoPanel {
    text: String,
}

impl Default for InfoPanel {
    fn default() -> Self {
        Self {
            text: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl InfoPanel {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn show_region(&mut self, name: &str, count: Option<u32>) {
        self.text = format!("{}: {} airports", name, count.unwrap_or(0));
    }

    pub fn reset(&mut self) {
        self.text = DEFAULT_PROMPT.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "region", rename_all = "snake_case")]
pub enum HoverState {
    Idle,
    Hovering(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    UnknownRegion(String),
    AlreadyHovering { current: String, requested: String },
    NotHovering(String),
}

impl fmt::Display for InteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRegion(name) => write!(f, "no region named {name:?}"),
            Self::AlreadyHovering { current, requested } => write!(
                f,
                "cannot enter {requested:?} while {current:?} is still hovered"
            ),
            Self::NotHovering(name) => write!(f, "{name:?} is not the hovered region"),
        }
    }
}

impl std::error::Error for InteractionError {}

/// Restyle instruction produced by a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleUpdate {
    pub region: String,
    pub style: RegionStyle,
    pub bring_to_front: bool,
    pub info: String,
}

/// Owns the hover state and info panel for one map.
///
/// Regions are registered once with their name; each event carries the
/// region identity and looks the count up in the shared table.
#[derive(Debug)]
pub struct InteractionLayer {
    table: Arc<CountryCountTable>,
    regions: HashSet<String>,
    state: HoverState,
    panel: InfoPanel,
}

impl InteractionLayer {
    pub fn new(table: Arc<CountryCountTable>) -> Self {
        Self {
            table,
            regions: HashSet::new(),
            state: HoverState::Idle,
            panel: InfoPanel::default(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>) {
        self.regions.insert(name.into());
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.regions.contains(name)
    }

    pub fn state(&self) -> &HoverState {
        &self.state
    }

    pub fn panel(&self) -> &InfoPanel {
        &self.panel
    }

    /// `Idle -> Hovering(name)`.
    ///
    /// `bring_to_front_supported` is false for clients whose renderer cannot
    /// reorder paths.
    pub fn pointer_enter(
        &mut self,
        name: &str,
        bring_to_front_supported: bool,
    ) -> Result<StyleUpdate, InteractionError> {
        if !self.is_registered(name) {
            return Err(InteractionError::UnknownRegion(name.to_string()));
        }
        if let HoverState::Hovering(current) = &self.state {
            return Err(InteractionError::AlreadyHovering {
                current: current.clone(),
                requested: name.to_string(),
            });
        }

        self.panel.show_region(name, self.table.get(name));
        self.state = HoverState::Hovering(name.to_string());
        debug!("Hovering {}", name);

        Ok(StyleUpdate {
            region: name.to_string(),
            style: highlight_style(),
            bring_to_front: bring_to_front_supported,
            info: self.panel.text().to_string(),
        })
    }

    /// `Hovering(name) -> Idle`. The restored style is recomputed from the
    /// table rather than remembered from before the hover.
    pub fn pointer_leave(&mut self, name: &str) -> Result<StyleUpdate, InteractionError> {
        if !self.is_registered(name) {
            return Err(InteractionError::UnknownRegion(name.to_string()));
        }
        match &self.state {
            HoverState::Hovering(current) if current == name => {}
            _ => return Err(InteractionError::NotHovering(name.to_string())),
        }

        self.panel.reset();
        self.state = HoverState::Idle;
        debug!("Left {}", name);

        Ok(StyleUpdate {
            region: name.to_string(),
            style: base_style(&self.table, name),
            bring_to_front: false,
            info: self.panel.text().to_string(),
        })
    }
}
