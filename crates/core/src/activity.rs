//! Activity log - the learner's timeline of starts and completions.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::id::{EventId, ProjectId};
use crate::Time;

/// Kind of transition recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Started,
    Completed,
}

impl ActivityKind {
    /// Get string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Started => "started",
            ActivityKind::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transition of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Unique identifier
    pub id: EventId,

    /// Project that changed
    pub project_id: ProjectId,

    /// What happened
    pub kind: ActivityKind,

    /// When it happened
    pub timestamp: Time,
}

impl ActivityEvent {
    /// Create a new event.
    pub fn new(project_id: ProjectId, kind: ActivityKind, timestamp: Time) -> Self {
        Self {
            id: EventId::new(),
            project_id,
            kind,
            timestamp,
        }
    }
}

/// Append-only log, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityLog {
    events: VecDeque<ActivityEvent>,
}

impl ActivityLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from events already ordered newest first.
    pub fn from_newest_first(events: impl IntoIterator<Item = ActivityEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Record a new event at the head.
    pub fn record(&mut self, event: ActivityEvent) {
        self.events.push_front(event);
    }

    /// Events newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.events.iter()
    }

    /// Most recent event, if any.
    pub fn latest(&self) -> Option<&ActivityEvent> {
        self.events.front()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Union with another log by event id, re-sorted newest first.
    pub fn merge(&mut self, other: &ActivityLog) {
        let known: HashSet<EventId> = self.events.iter().map(|e| e.id).collect();
        let mut all: Vec<ActivityEvent> = self.events.drain(..).collect();
        all.extend(other.iter().filter(|e| !known.contains(&e.id)).cloned());
        // stable: equal timestamps keep local-before-remote order
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.events = all.into();
    }
}

impl<'a> IntoIterator for &'a ActivityLog {
    type Item = &'a ActivityEvent;
    type IntoIter = std::collections::vec_deque::Iter<'a, ActivityEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_record_prepends() {
        let mut log = ActivityLog::new();
        let now = Utc::now();
        log.record(ActivityEvent::new("a".into(), ActivityKind::Started, now));
        log.record(ActivityEvent::new("a".into(), ActivityKind::Completed, now));

        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().kind, ActivityKind::Completed);
    }

    #[test]
    fn test_merge_dedups_and_orders() {
        let now = Utc::now();
        let older = ActivityEvent::new("a".into(), ActivityKind::Started, now - Duration::minutes(5));
        let newer = ActivityEvent::new("a".into(), ActivityKind::Completed, now);

        let mut local = ActivityLog::from_newest_first(vec![older.clone()]);
        let remote = ActivityLog::from_newest_first(vec![newer.clone(), older.clone()]);
        local.merge(&remote);

        let ids: Vec<EventId> = local.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }
}
