//! Synthetic back-office activity.

use activity_relay_core::{ActivityAction, ActivityRecord, ActivityStats};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

const USERS: [&str; 4] = ["alice", "bob", "carmen", "deepak"];

const ENTITIES: [(&str, &str); 6] = [
    ("client", "Harper Logistics"),
    ("policy", "P-2024-118"),
    ("lead", "Northwind Bakery"),
    ("quotation", "Q-553"),
    ("invoice", "INV-9031"),
    ("agent", "Priya Natarajan"),
];

const ACTIONS: [ActivityAction; 4] = [
    ActivityAction::Create,
    ActivityAction::Update,
    ActivityAction::Read,
    ActivityAction::Delete,
];

const HISTORY: usize = 50;

/// Recent activity plus running counters.
pub struct ActivityLog {
    recent: VecDeque<ActivityRecord>,
    stats: ActivityStats,
    next_id: u64,
}

impl ActivityLog {
    /// A log seeded with a few activities.
    pub fn seeded(count: usize) -> Self {
        let mut log = Self {
            recent: VecDeque::new(),
            stats: ActivityStats::default(),
            next_id: 1,
        };
        for _ in 0..count {
            log.record_next();
        }
        log
    }

    /// Make up and record the next activity.
    pub fn record_next(&mut self) -> ActivityRecord {
        let n = self.next_id;
        self.next_id += 1;

        let n_usize = n as usize;
        let user = USERS[n_usize % USERS.len()];
        let (entity_type, entity_name) = ENTITIES[n_usize % ENTITIES.len()];
        let action = ACTIONS[n_usize % ACTIONS.len()];

        let mut record = ActivityRecord::new(format!("act-{n:05}"));
        record.action = Some(action);
        record.entity_type = Some(entity_type.to_string());
        record.entity_id = Some(format!("{entity_type}-{}", n % 97));
        record.entity_name = Some(entity_name.to_string());
        record.user_name = Some(user.to_string());
        record.timestamp = Some(now_secs().to_string());

        self.stats.total += 1;
        self.stats.today += 1;
        *self.stats.by_action.entry(action.to_string()).or_default() += 1;

        self.recent.push_front(record.clone());
        self.recent.truncate(HISTORY);
        record
    }

    /// Annotate the oldest activity still in the log, as if someone edited it.
    pub fn amend_oldest(&mut self) -> Option<ActivityRecord> {
        let record = self.recent.back_mut()?;
        if record.description.is_none() {
            record.description = Some(format!("{} (reviewed)", record.summary()));
        }
        Some(record.clone())
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<ActivityRecord> {
        self.recent.iter().cloned().collect()
    }

    pub fn stats(&self) -> ActivityStats {
        self.stats.clone()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
