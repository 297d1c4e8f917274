// Dashboard service
// Fetches one snapshot of students and reduces it into the counter cards.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DeskError;
use crate::filter::QuickFilter;
use crate::metrics::{compute_stats, DashboardStats};
use crate::store::RecordStore;
use crate::types::{AppStatus, Config, Student};

/// Result type for dashboard data loading
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DashboardResult {
    Success { data: DashboardData },
    Empty { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCard {
    pub label: String,
    pub value: usize,
    /// Click-through target for cards backed by a quick filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_filter: Option<QuickFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl StatCard {
    fn plain(label: &str, value: usize) -> Self {
        StatCard {
            label: label.to_string(),
            value,
            quick_filter: None,
            href: None,
        }
    }

    fn linked(label: &str, value: usize, quick: QuickFilter) -> Self {
        StatCard {
            label: label.to_string(),
            value,
            quick_filter: Some(quick),
            href: Some(quick.href()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub cards: Vec<StatCard>,
    pub computed_at: DateTime<Utc>,
}

/// Cards in display order: totals, the four stages, then the click-through
/// counters.
pub fn stat_cards(stats: &DashboardStats) -> Vec<StatCard> {
    let mut cards = vec![
        StatCard::plain("Total Students", stats.total),
        StatCard::plain("Active (14d)", stats.active),
    ];
    cards.extend(
        AppStatus::ALL
            .iter()
            .map(|s| StatCard::plain(s.as_str(), stats.status_count(*s))),
    );
    cards.push(StatCard::linked(
        "Needs essay help",
        stats.essay,
        QuickFilter::NeedsEssayHelp,
    ));
    cards.push(StatCard::linked(
        "Not contacted in 7d",
        stats.not_contacted_7d,
        QuickFilter::NotContacted7d,
    ));
    cards.push(StatCard::linked(
        "High intent",
        stats.high_intent,
        QuickFilter::HighIntent,
    ));
    cards
}

pub fn build_dashboard(records: &[Student], now: DateTime<Utc>) -> DashboardData {
    let stats = compute_stats(records, now);
    DashboardData {
        cards: stat_cards(&stats),
        stats,
        computed_at: now,
    }
}

/// Fetch the dashboard snapshot: most recently active students first, capped
/// at `dashboard_fetch_limit`.
pub fn load_dashboard_records(
    store: &dyn RecordStore,
    config: &Config,
) -> Result<Vec<Student>, DeskError> {
    store
        .list_students(config.dashboard_fetch_limit)
        .map_err(|e| DeskError::load("students", e))
}

pub fn get_dashboard_data(
    store: &dyn RecordStore,
    config: &Config,
    now: DateTime<Utc>,
) -> DashboardResult {
    let records = match load_dashboard_records(store, config) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("Dashboard load failed: {}", e);
            return DashboardResult::Error {
                message: e.to_string(),
            };
        }
    };

    if records.is_empty() {
        return DashboardResult::Empty {
            message: "No students yet. Seed demo data with `studentdesk seed`.".to_string(),
        };
    }

    log::debug!("Dashboard computed over {} students", records.len());
    DashboardResult::Success {
        data: build_dashboard(&records, now),
    }
}
