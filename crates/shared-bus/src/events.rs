//! # Bug Events
//!
//! Everything a bug entity announces to the outside world.

use serde::{Deserialize, Serialize};
use shared_types::{BugId, FieldValue, RemoteError};

/// Events emitted by bug entities.
///
/// `bug_id` is `None` while the bug has not been created remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BugEvent {
    // =========================================================================
    // FIELD STATE
    // =========================================================================
    /// The effective value of a field changed through `set`/`add`/`remove`.
    Changed {
        bug_id: Option<BugId>,
        field: String,
        value: FieldValue,
    },

    /// A field's legal choices were recomputed after `source` changed.
    ChoicesUpdated {
        bug_id: Option<BugId>,
        source: String,
        field: String,
        choices: Vec<String>,
    },

    /// A field's visibility was recomputed after `source` changed.
    VisibilityUpdated {
        bug_id: Option<BugId>,
        source: String,
        field: String,
        visible: bool,
    },

    // =========================================================================
    // PERSISTENCE
    // =========================================================================
    /// A draft was created remotely and received its id.
    Created { bug_id: BugId },

    /// Pending edits were accepted by the service.
    Saved { bug_id: BugId },

    /// A save attempt failed; pending edits are kept.
    SaveFailed {
        bug_id: Option<BugId>,
        error: RemoteError,
    },

    /// Confirmed state was refreshed from the service.
    Fetched { bug_id: BugId },

    /// A refresh failed.
    FetchFailed { bug_id: BugId, error: RemoteError },
}

impl BugEvent {
    /// Topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Changed { .. } => EventTopic::FieldChanged,
            Self::ChoicesUpdated { .. } => EventTopic::ChoicesUpdated,
            Self::VisibilityUpdated { .. } => EventTopic::VisibilityUpdated,
            Self::Created { .. }
            | Self::Saved { .. }
            | Self::SaveFailed { .. }
            | Self::Fetched { .. }
            | Self::FetchFailed { .. } => EventTopic::Persistence,
        }
    }

    /// Bug the event is about, if it has an id yet.
    #[must_use]
    pub fn bug_id(&self) -> Option<BugId> {
        match self {
            Self::Changed { bug_id, .. }
            | Self::ChoicesUpdated { bug_id, .. }
            | Self::VisibilityUpdated { bug_id, .. }
            | Self::SaveFailed { bug_id, .. } => *bug_id,
            Self::Created { bug_id }
            | Self::Saved { bug_id }
            | Self::Fetched { bug_id }
            | Self::FetchFailed { bug_id, .. } => Some(*bug_id),
        }
    }

    /// Field the event is about, for field-state events.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Changed { field, .. }
            | Self::ChoicesUpdated { field, .. }
            | Self::VisibilityUpdated { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    FieldChanged,
    ChoicesUpdated,
    VisibilityUpdated,
    Persistence,
    /// Subscribe to everything.
    All,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Bugs to include. Empty means all bugs, including drafts.
    pub bug_ids: Vec<BugId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            bug_ids: Vec::new(),
        }
    }

    /// Create a filter for events about specific bugs.
    #[must_use]
    pub fn for_bugs(bug_ids: Vec<BugId>) -> Self {
        Self {
            topics: Vec::new(),
            bug_ids,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BugEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let bug_match = self.bug_ids.is_empty()
            || event
                .bug_id()
                .is_some_and(|id| self.bug_ids.contains(&id));

        topic_match && bug_match
    }
}
