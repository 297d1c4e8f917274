//! Dashboard counters derived from a fetched snapshot of students.
//!
//! `compute_stats` is a pure function of (records, now). The qualifying
//! predicates are exported so the quick filters in `filter` use exactly the
//! same conditions as the counters they are reached from.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{AppStatus, Student};

pub const ACTIVE_WINDOW_DAYS: i64 = 14;
pub const STALE_CONTACT_DAYS: i64 = 7;

/// Active iff `now - last_active <= 14 days`. A missing `last_active` never
/// qualifies.
pub fn is_active(student: &Student, now: DateTime<Utc>) -> bool {
    student
        .last_active
        .map(|ts| now - ts <= Duration::days(ACTIVE_WINDOW_DAYS))
        .unwrap_or(false)
}

/// Stale iff there was never any contact or the last one is more than
/// 7 days old. Exactly 7 days is not stale.
pub fn is_stale_contact(student: &Student, now: DateTime<Utc>) -> bool {
    match student.last_communication_at {
        None => true,
        Some(ts) => now - ts > Duration::days(STALE_CONTACT_DAYS),
    }
}

pub fn is_high_intent(student: &Student) -> bool {
    student.high_intent
}

pub fn needs_essay_help(student: &Student) -> bool {
    student.needs_essay_help
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    /// Always holds all four stages, zero when absent.
    pub by_status: BTreeMap<AppStatus, usize>,
    pub active: usize,
    pub essay: usize,
    pub not_contacted_7d: usize,
    pub high_intent: usize,
}

impl DashboardStats {
    pub fn status_count(&self, status: AppStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Reduce a snapshot into the dashboard counters in a single pass.
pub fn compute_stats(records: &[Student], now: DateTime<Utc>) -> DashboardStats {
    let mut by_status: BTreeMap<AppStatus, usize> =
        AppStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut active = 0;
    let mut essay = 0;
    let mut not_contacted_7d = 0;
    let mut high_intent = 0;

    for s in records {
        *by_status.entry(s.status).or_insert(0) += 1;
        if is_active(s, now) {
            active += 1;
        }
        if needs_essay_help(s) {
            essay += 1;
        }
        if is_stale_contact(s, now) {
            not_contacted_7d += 1;
        }
        if is_high_intent(s) {
            high_intent += 1;
        }
    }

    DashboardStats {
        total: records.len(),
        by_status,
        active,
        essay,
        not_contacted_7d,
        high_intent,
    }
}
