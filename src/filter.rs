//! Student list filtering and display sorting.
//!
//! Filtering and sorting are separate: `StudentFilter::apply` keeps the
//! snapshot's relative order, and `SortState` only reorders the filtered
//! rows for display.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics;
use crate::types::{AppStatus, Student};

/// Path of the student list view.
pub const STUDENTS_PATH: &str = "/students";
/// Query parameter carrying the quick-filter token.
pub const QUICK_FILTER_PARAM: &str = "qf";
pub const ALL: &str = "All";

// =============================================================================
// Quick filters
// =============================================================================

/// Named predicate shortcut reached from a dashboard counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    #[serde(rename = "not_contacted_7d")]
    NotContacted7d,
    HighIntent,
    NeedsEssayHelp,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 3] = [
        QuickFilter::NotContacted7d,
        QuickFilter::HighIntent,
        QuickFilter::NeedsEssayHelp,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            QuickFilter::NotContacted7d => "not_contacted_7d",
            QuickFilter::HighIntent => "high_intent",
            QuickFilter::NeedsEssayHelp => "needs_essay_help",
        }
    }

    /// Unknown tokens yield `None`, which filters nothing.
    pub fn from_token(token: &str) -> Option<Self> {
        QuickFilter::ALL.iter().copied().find(|q| q.token() == token)
    }

    /// Same predicates as the dashboard counters.
    pub fn matches(&self, student: &Student, now: DateTime<Utc>) -> bool {
        match self {
            QuickFilter::NotContacted7d => metrics::is_stale_contact(student, now),
            QuickFilter::HighIntent => metrics::is_high_intent(student),
            QuickFilter::NeedsEssayHelp => metrics::needs_essay_help(student),
        }
    }

    /// Navigation target for the click-through: `/students?qf=<token>`.
    pub fn href(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(QUICK_FILTER_PARAM, self.token())
            .finish();
        format!("{}?{}", STUDENTS_PATH, query)
    }
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// =============================================================================
// Filter
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppStatus),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL) {
            Ok(StatusFilter::All)
        } else {
            s.parse::<AppStatus>().map(StatusFilter::Only)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CountryFilter {
    #[default]
    All,
    Only(String),
}

impl From<&str> for CountryFilter {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() || s.trim() == ALL {
            CountryFilter::All
        } else {
            CountryFilter::Only(s.to_string())
        }
    }
}

/// Conjunctive filter over the student list. Unset parts are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub query: String,
    pub status: StatusFilter,
    pub country: CountryFilter,
    pub quick: Option<QuickFilter>,
}

impl StudentFilter {
    /// Build a filter from navigation state. Only the quick-filter token is
    /// carried in the URL; unknown tokens are dropped.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let quick = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == QUICK_FILTER_PARAM)
            .and_then(|(_, value)| QuickFilter::from_token(&value));
        StudentFilter {
            quick,
            ..Default::default()
        }
    }

    pub fn clear_quick_filter(&mut self) {
        self.quick = None;
    }

    pub fn matches_text(&self, student: &Student) -> bool {
        let needle = self.query.trim().to_lowercase();
        needle.is_empty()
            || student.name.to_lowercase().contains(&needle)
            || student.email.to_lowercase().contains(&needle)
    }

    pub fn matches_status(&self, student: &Student) -> bool {
        match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => student.status == status,
        }
    }

    pub fn matches_country(&self, student: &Student) -> bool {
        match self.country {
            CountryFilter::All => true,
            CountryFilter::Only(ref country) => &student.country == country,
        }
    }

    pub fn matches_quick(&self, student: &Student, now: DateTime<Utc>) -> bool {
        self.quick.map(|q| q.matches(student, now)).unwrap_or(true)
    }

    pub fn matches(&self, student: &Student, now: DateTime<Utc>) -> bool {
        self.matches_text(student)
            && self.matches_status(student)
            && self.matches_country(student)
            && self.matches_quick(student, now)
    }

    /// Filter a snapshot, preserving relative order.
    pub fn apply<'a>(&self, records: &'a [Student], now: DateTime<Utc>) -> Vec<&'a Student> {
        records.iter().filter(|s| self.matches(s, now)).collect()
    }
}

/// Country dropdown options: `All` then the sorted distinct countries.
pub fn country_options(records: &[Student]) -> Vec<String> {
    let distinct: BTreeSet<&str> = records.iter().map(|s| s.country.as_str()).collect();
    std::iter::once(ALL.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Name,
    Email,
    Country,
    Status,
    LastActive,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "name" => Ok(SortColumn::Name),
            "email" => Ok(SortColumn::Email),
            "country" => Ok(SortColumn::Country),
            "status" => Ok(SortColumn::Status),
            "lastactive" => Ok(SortColumn::LastActive),
            _ => Err(format!("Unknown sort column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// Column sort state of the list view. Empty until data first loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    directive: Option<SortDirective>,
}

impl SortState {
    pub fn directive(&self) -> Option<SortDirective> {
        self.directive
    }

    pub fn set(&mut self, column: SortColumn, direction: SortDirection) {
        self.directive = Some(SortDirective { column, direction });
    }

    /// Once rows are loaded and nothing was chosen yet, sort by last active,
    /// newest first.
    pub fn ensure_default(&mut self, loaded_rows: usize) {
        if loaded_rows > 0 && self.directive.is_none() {
            self.set(SortColumn::LastActive, SortDirection::Desc);
        }
    }

    /// Header click: a new column starts ascending, the active column flips.
    pub fn toggle(&mut self, column: SortColumn) {
        let direction = match self.directive {
            Some(d) if d.column == column => match d.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            },
            _ => SortDirection::Asc,
        };
        self.set(column, direction);
    }

    /// Stable sort of display rows. Does not affect which rows are shown.
    pub fn sort_rows(&self, rows: &mut [&Student]) {
        let Some(directive) = self.directive else {
            return;
        };
        rows.sort_by(|a, b| {
            let ord = compare(a, b, directive.column);
            match directive.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}

fn compare(a: &Student, b: &Student, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortColumn::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        SortColumn::Country => a.country.cmp(&b.country),
        SortColumn::Status => a.status.cmp(&b.status),
        // Missing timestamps order before any real one.
        SortColumn::LastActive => a.last_active.cmp(&b.last_active),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::student;
    use chrono::Duration;
    use std::collections::HashSet;

    fn snapshot(now: DateTime<Utc>) -> Vec<Student> {
        let mut a = student("a", AppStatus::Applying, now);
        a.name = "Amara Okafor".into();
        a.email = "amara@school.ng".into();
        a.country = "Nigeria".into();
        a.high_intent = true;

        let mut b = student("b", AppStatus::Exploring, now);
        b.name = "Bruno Costa".into();
        b.email = "bcosta@mail.br".into();
        b.country = "Brazil".into();
        b.last_communication_at = None;
        b.needs_essay_help = true;

        let mut c = student("c", AppStatus::Applying, now);
        c.name = "Chloe Martin".into();
        c.email = "chloe.okay@mail.fr".into();
        c.country = "France".into();
        c.last_communication_at = Some(now - Duration::days(9));
        c.high_intent = true;
        c.last_active = Some(now - Duration::days(2));

        let mut d = student("d", AppStatus::Submitted, now);
        d.name = "Dev Patel".into();
        d.country = "Nigeria".into();
        d.last_active = None;

        vec![a, b, c, d]
    }

    fn ids(rows: &[&Student]) -> Vec<String> {
        rows.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_default_filter_is_noop_and_keeps_order() {
        let now = Utc::now();
        let records = snapshot(now);
        let rows = StudentFilter::default().apply(&records, now);
        assert_eq!(ids(&rows), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_text_query_matches_name_or_email_case_insensitive() {
        let now = Utc::now();
        let records = snapshot(now);
        let filter = StudentFilter {
            query: "OKA".into(),
            ..Default::default()
        };
        // "Okafor" by name, "chloe.okay" by email.
        assert_eq!(ids(&filter.apply(&records, now)), vec!["a", "c"]);
    }

    #[test]
    fn test_conjunction_equals_intersection() {
        let now = Utc::now();
        let records = snapshot(now);
        let queries = ["", "o"];
        let statuses = [StatusFilter::All, StatusFilter::Only(AppStatus::Applying)];
        let countries = [CountryFilter::All, CountryFilter::Only("Nigeria".into())];
        let quicks = [None, Some(QuickFilter::HighIntent), Some(QuickFilter::NotContacted7d)];

        for q in queries {
            for st in &statuses {
                for co in &countries {
                    for qf in quicks {
                        let combined = StudentFilter {
                            query: q.into(),
                            status: st.clone(),
                            country: co.clone(),
                            quick: qf,
                        };
                        let parts = [
                            StudentFilter { query: q.into(), ..Default::default() },
                            StudentFilter { status: st.clone(), ..Default::default() },
                            StudentFilter { country: co.clone(), ..Default::default() },
                            StudentFilter { quick: qf, ..Default::default() },
                        ];
                        let expected: HashSet<String> = records
                            .iter()
                            .filter(|s| {
                                parts
                                    .iter()
                                    .all(|p| p.apply(&records, now).iter().any(|r| r.id == s.id))
                            })
                            .map(|s| s.id.clone())
                            .collect();
                        let actual: HashSet<String> =
                            ids(&combined.apply(&records, now)).into_iter().collect();
                        assert_eq!(actual, expected, "filter {:?}", combined);
                    }
                }
            }
        }
    }

    #[test]
    fn test_quick_filters_mirror_dashboard_counters() {
        let now = Utc::now();
        let records = snapshot(now);
        let stats = metrics::compute_stats(&records, now);
        let count = |q: QuickFilter| {
            StudentFilter { quick: Some(q), ..Default::default() }
                .apply(&records, now)
                .len()
        };
        assert_eq!(count(QuickFilter::HighIntent), stats.high_intent);
        assert_eq!(count(QuickFilter::NotContacted7d), stats.not_contacted_7d);
        assert_eq!(count(QuickFilter::NeedsEssayHelp), stats.essay);
    }

    #[test]
    fn test_essay_subset_has_flag_or_tag() {
        let now = Utc::now();
        let records = snapshot(now);
        let filter = StudentFilter {
            quick: Some(QuickFilter::NeedsEssayHelp),
            ..Default::default()
        };
        for s in filter.apply(&records, now) {
            assert!(s.needs_essay_help || s.has_tag("Essay"));
        }
    }

    #[test]
    fn test_query_string_round_trip_and_unknown_token() {
        for q in QuickFilter::ALL {
            let href = q.href();
            let qs = href.split_once('?').map(|(_, qs)| qs).unwrap_or_default();
            assert_eq!(StudentFilter::from_query_string(qs).quick, Some(q));
        }
        assert_eq!(StudentFilter::from_query_string("?qf=vip_only").quick, None);
        assert_eq!(StudentFilter::from_query_string("").quick, None);
    }

    #[test]
    fn test_clear_quick_filter() {
        let mut filter = StudentFilter::from_query_string("qf=high_intent");
        assert!(filter.quick.is_some());
        filter.clear_quick_filter();
        assert_eq!(filter, StudentFilter::default());
    }

    #[test]
    fn test_country_options_sorted_distinct_with_all_first() {
        let now = Utc::now();
        let records = snapshot(now);
        assert_eq!(
            country_options(&records),
            vec!["All", "Brazil", "France", "Nigeria"]
        );
    }

    #[test]
    fn test_sort_toggle_and_default() {
        let mut sort = SortState::default();
        sort.ensure_default(0);
        assert_eq!(sort.directive(), None, "no default before data loads");
        sort.ensure_default(4);
        assert_eq!(
            sort.directive(),
            Some(SortDirective {
                column: SortColumn::LastActive,
                direction: SortDirection::Desc
            })
        );
        sort.toggle(SortColumn::Name);
        assert_eq!(sort.directive().map(|d| d.direction), Some(SortDirection::Asc));
        sort.toggle(SortColumn::Name);
        assert_eq!(sort.directive().map(|d| d.direction), Some(SortDirection::Desc));
    }

    #[test]
    fn test_sort_is_display_only() {
        let now = Utc::now();
        let records = snapshot(now);
        let filter = StudentFilter::default();
        let mut rows = filter.apply(&records, now);

        let mut sort = SortState::default();
        sort.set(SortColumn::Status, SortDirection::Desc);
        sort.sort_rows(&mut rows);
        // Submitted, then the two Applying rows in their original order, then Exploring.
        assert_eq!(ids(&rows), vec!["d", "a", "c", "b"]);

        sort.set(SortColumn::LastActive, SortDirection::Desc);
        sort.sort_rows(&mut rows);
        assert_eq!(rows.last().map(|s| s.id.as_str()), Some("d"));

        // Filtering the snapshot again is unaffected by the sort.
        assert_eq!(ids(&filter.apply(&records, now)), vec!["a", "b", "c", "d"]);
    }
}
