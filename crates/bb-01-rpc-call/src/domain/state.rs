//! Call lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one RPC call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Constructed but not handed to the transport.
    Created,
    /// Handed to the transport, waiting for a reply.
    Started,
    /// Terminal: the transport returned a result.
    Succeeded,
    /// Terminal: the transport reported a failure.
    Failed,
}

impl CallState {
    /// True once no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// True while a reply is outstanding.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        self == Self::Started
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
