//! Recent-activity cache for dashboards and the header badge.

use activity_relay_core::{ActivityPayload, ActivityRecord, ActivityStats, EventKind};
use std::collections::VecDeque;

pub const DEFAULT_FEED_CAPACITY: usize = 50;

/// Most recent activities (newest first), latest stats, and the number of new
/// activities not yet marked seen.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    recent: VecDeque<ActivityRecord>,
    stats: Option<ActivityStats>,
    unseen: usize,
    capacity: usize,
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            stats: None,
            unseen: 0,
            capacity,
        }
    }

    /// Fold one event into the feed.
    pub fn apply(&mut self, payload: ActivityPayload, kind: EventKind) {
        match (kind, payload) {
            (EventKind::Initial, ActivityPayload::Activities(records)) => {
                self.recent = records.into_iter().take(self.capacity).collect();
            }
            (EventKind::New, ActivityPayload::Activity(record)) => {
                if self.capacity == 0 {
                    return;
                }
                self.recent.push_front(record);
                self.recent.truncate(self.capacity);
                self.unseen += 1;
            }
            (EventKind::Updated, ActivityPayload::Activity(record)) => {
                match self.recent.iter_mut().find(|r| r.id == record.id) {
                    Some(slot) => *slot = record,
                    None => tracing::debug!(id = %record.id, "Update for activity not in feed"),
                }
            }
            (EventKind::Stats, ActivityPayload::Stats(stats)) => {
                self.stats = Some(stats);
            }
            (kind, _) => tracing::warn!(kind = %kind, "Payload does not match event kind"),
        }
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn stats(&self) -> Option<&ActivityStats> {
        self.stats.as_ref()
    }

    pub fn unseen(&self) -> usize {
        self.unseen
    }

    pub fn mark_seen(&mut self) {
        self.unseen = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(feed: &ActivityFeed) -> Vec<&str> {
        feed.recent().map(|r| r.id.as_str()).collect()
    }

    fn new(feed: &mut ActivityFeed, id: &str) {
        feed.apply(ActivityPayload::Activity(ActivityRecord::new(id)), EventKind::New);
    }

    #[test]
    fn initial_replaces_and_truncates() {
        let mut feed = ActivityFeed::new(2);
        new(&mut feed, "old");
        feed.apply(
            ActivityPayload::Activities(vec![
                ActivityRecord::new("a"),
                ActivityRecord::new("b"),
                ActivityRecord::new("c"),
            ]),
            EventKind::Initial,
        );
        assert_eq!(ids(&feed), ["a", "b"]);
    }

    #[test]
    fn new_prepends_and_counts_unseen() {
        let mut feed = ActivityFeed::new(3);
        for id in ["1", "2", "3", "4"] {
            new(&mut feed, id);
        }
        assert_eq!(ids(&feed), ["4", "3", "2"]);
        assert_eq!(feed.unseen(), 4);

        feed.mark_seen();
        assert_eq!(feed.unseen(), 0);
    }

    #[test]
    fn updated_replaces_in_place() {
        let mut feed = ActivityFeed::default();
        new(&mut feed, "a");
        new(&mut feed, "b");

        let mut edited = ActivityRecord::new("a");
        edited.description = Some("renamed".into());
        feed.apply(ActivityPayload::Activity(edited), EventKind::Updated);
        feed.apply(
            ActivityPayload::Activity(ActivityRecord::new("missing")),
            EventKind::Updated,
        );

        assert_eq!(ids(&feed), ["b", "a"]);
        let a = feed.recent().find(|r| r.id == "a").unwrap();
        assert_eq!(a.description.as_deref(), Some("renamed"));
        assert_eq!(feed.unseen(), 2);
    }

    #[test]
    fn stats_are_replaced() {
        let mut feed = ActivityFeed::default();
        assert!(feed.stats().is_none());
        let stats = ActivityStats {
            total: 9,
            ..Default::default()
        };
        feed.apply(ActivityPayload::Stats(stats), EventKind::Stats);
        assert_eq!(feed.stats().unwrap().total, 9);
    }

    #[test]
    fn mismatched_payload_is_ignored() {
        let mut feed = ActivityFeed::default();
        feed.apply(ActivityPayload::Stats(ActivityStats::default()), EventKind::New);
        assert!(feed.is_empty());
        assert_eq!(feed.unseen(), 0);
    }
}
