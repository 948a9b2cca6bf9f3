//! Status lifecycle rules for project records.
//!
//! Transitions are permitted only along a static directed graph; terminal
//! states have no outgoing edges. Requesting the state the entity is already
//! in is always accepted as an explicit no-op, including in terminal states;
//! only a genuine change is evaluated against the graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Closed set of project states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Created, not yet started
    Pending,
    /// In progress
    Active,
    /// Finished; terminal
    Completed,
    /// Abandoned; terminal
    Cancelled,
}

impl ProjectStatus {
    /// States reachable from this one.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Active, Self::Cancelled],
            Self::Active => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether the state has no outgoing edges.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown project status: {other}")),
        }
    }
}

/// Result of evaluating a requested status against the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The requested state equals the current state; nothing to do
    Unchanged,
    /// A legal change to the contained state
    Apply(ProjectStatus),
}

/// Evaluate a requested status change against the transition graph.
///
/// The caller must not mutate any field when this rejects.
///
/// # Errors
///
/// [`GatewayError::InvalidTransition`] naming both states when the pair is
/// not an edge of the graph.
pub fn validate_transition(
    current: ProjectStatus,
    requested: ProjectStatus,
) -> Result<Transition, GatewayError> {
    if requested == current {
        return Ok(Transition::Unchanged);
    }
    if current.allowed_transitions().contains(&requested) {
        Ok(Transition::Apply(requested))
    } else {
        Err(GatewayError::InvalidTransition {
            from: current,
            to: requested,
        })
    }
}
