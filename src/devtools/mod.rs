//! Dev tools for populating a desk with demo data.
//!
//! Public entry points check `AppState::dev_tools_enabled()` first: they run
//! in debug builds, or in release builds whose config sets `developerMode`.
//! Each student is written in its own transaction.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{DbError, DeskDb};
use crate::error::DeskError;
use crate::state::AppState;
use crate::templates::{compose_outbound, OutreachInput, Picker};
use crate::types::{
    AppStatus, Channel, Direction, InteractionKind, NewCommunication, NewInteraction, NewNote,
    NewStudent, NewTask, StudentPatch,
};
use crate::util::email_local_part;

pub const DEFAULT_SEED_COUNT: usize = 50;
/// How many of the most recently active students get sub-records.
pub const INTERACTION_SEED_LIMIT: usize = 100;

pub const SEED_TAGS: [&str; 5] = ["SAT", "TOEFL", "Essay", "Scholarship", "STEM"];

const FIRST_NAMES: &[&str] = &[
    "Amara", "Bruno", "Chloe", "Dev", "Elena", "Farah", "Gabriel", "Hana", "Ibrahim", "Jia",
    "Kwame", "Lucia", "Mateo", "Nadia", "Omar", "Priya", "Quinn", "Rafael", "Sofia", "Tariq",
    "Uma", "Victor", "Wen", "Ximena", "Yusuf", "Zara",
];

const LAST_NAMES: &[&str] = &[
    "Okafor", "Costa", "Martin", "Patel", "Petrova", "Haddad", "Silva", "Tanaka", "Diallo",
    "Chen", "Mensah", "Fernandez", "Rossi", "Karimi", "Nguyen", "Kowalski", "Mwangi", "Ortiz",
    "Sato", "Ahmed",
];

const COUNTRIES: &[&str] = &[
    "Nigeria", "Brazil", "France", "India", "Ghana", "Kenya", "Vietnam", "Mexico", "Egypt",
    "Indonesia", "Pakistan", "Colombia", "Turkey", "Philippines", "Morocco",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

const DETAIL_SENTENCES: &[&str] = &[
    "Asked about application fee waivers.",
    "Compared two engineering programs side by side.",
    "Uploaded a transcript for review.",
    "Checked scholarship deadlines for the spring intake.",
    "Opened the essay planning worksheet.",
    "Reviewed English test score requirements.",
    "Saved three universities to the shortlist.",
    "Asked how early decision differs from regular decision.",
];

const TASK_TOPICS: &[&str] = &[
    "Essay outline",
    "Shortlist review",
    "Scholarship eligibility",
    "SAT prep plan",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub students: usize,
    pub writes: usize,
}

fn require_dev_tools(state: &AppState) -> Result<(), DeskError> {
    if state.dev_tools_enabled() {
        Ok(())
    } else {
        Err(DeskError::Validation(
            "Dev tools are only available in debug builds or with developerMode enabled"
                .to_string(),
        ))
    }
}

/// Seed `count` demo students.
pub fn seed_students(state: &AppState, count: usize) -> Result<SeedReport, DeskError> {
    require_dev_tools(state)?;
    let report = seed_students_into(&state.db, &mut Picker::from_entropy(), Utc::now(), count)
        .map_err(|e| DeskError::write("seed students", e))?;
    log::info!("Seeded {} students", report.students);
    Ok(report)
}

/// Enrich the most recently active students with interactions,
/// communications, notes and tasks.
pub fn seed_interactions(state: &AppState) -> Result<SeedReport, DeskError> {
    require_dev_tools(state)?;
    let report = seed_interactions_into(
        &state.db,
        &mut Picker::from_entropy(),
        Utc::now(),
        &state.config.author_id,
    )
    .map_err(|e| DeskError::write("seed interactions", e))?;
    log::info!(
        "Seeded interactions for {} students ({} writes)",
        report.students,
        report.writes
    );
    Ok(report)
}

/// A random instant within the last `days` days.
fn recent(picker: &mut Picker, now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let window = (days.max(0) * 86_400) as usize;
    now - Duration::seconds(picker.between(0, window) as i64)
}

fn pick_str(picker: &mut Picker, pool: &[&str]) -> String {
    picker.pick(pool).map(|s| s.to_string()).unwrap_or_default()
}

pub fn random_student(picker: &mut Picker, now: DateTime<Utc>) -> NewStudent {
    let first = pick_str(picker, FIRST_NAMES);
    let last = pick_str(picker, LAST_NAMES);
    let name = format!("{} {}", first, last);
    let email = format!(
        "{}{}@{}",
        email_local_part(&name),
        picker.between(1, 999),
        pick_str(picker, EMAIL_DOMAINS)
    );
    let tag_count = picker.between(0, 3);

    NewStudent {
        name,
        email,
        phone: Some(format!(
            "+1 555-{:03}-{:04}",
            picker.between(100, 999),
            picker.between(0, 9999)
        )),
        grade: Some(picker.between(9, 12).to_string()),
        country: pick_str(picker, COUNTRIES),
        status: picker.pick(&AppStatus::ALL).copied(),
        last_active: Some(recent(picker, now, 14)),
        last_communication_at: Some(recent(picker, now, 10)),
        high_intent: Some(picker.coin()),
        needs_essay_help: Some(picker.coin()),
        tags: Some(
            picker
                .pick_distinct(&SEED_TAGS, tag_count)
                .into_iter()
                .map(str::to_string)
                .collect(),
        ),
    }
}

pub fn seed_students_into(
    db: &DeskDb,
    picker: &mut Picker,
    now: DateTime<Utc>,
    count: usize,
) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();
    for _ in 0..count {
        let new = random_student(picker, now);
        db.with_transaction(|tx| tx.insert_student(&new))?;
        report.students += 1;
        report.writes += 1;
    }
    Ok(report)
}

pub fn seed_interactions_into(
    db: &DeskDb,
    picker: &mut Picker,
    now: DateTime<Utc>,
    author_id: &str,
) -> Result<SeedReport, DbError> {
    let students = db.list_students(INTERACTION_SEED_LIMIT)?;
    let mut report = SeedReport::default();

    for student in &students {
        let writes = db.with_transaction(|tx| {
            let mut writes = 0;

            for _ in 0..picker.between(2, 4) {
                tx.insert_interaction(
                    &student.id,
                    &NewInteraction {
                        kind: picker
                            .pick(&InteractionKind::ALL)
                            .copied()
                            .unwrap_or(InteractionKind::Login),
                        detail: picker.pick(DETAIL_SENTENCES).map(|s| s.to_string()),
                        timestamp: Some(recent(picker, now, 14)),
                    },
                )?;
                writes += 1;
            }

            let mut last_contact: Option<DateTime<Utc>> = None;
            for _ in 0..picker.between(0, 2) {
                let when = recent(picker, now, 10);
                let channel = picker
                    .pick(&[Channel::Email, Channel::Sms, Channel::Call])
                    .copied()
                    .unwrap_or(Channel::Email);
                let message = compose_outbound(
                    &OutreachInput {
                        name: Some(student.name.as_str()),
                        channel,
                        status: Some(student.status),
                        tags: &student.tags,
                    },
                    picker,
                );
                tx.insert_communication(
                    &student.id,
                    &NewCommunication {
                        channel,
                        direction: Direction::Outbound,
                        subject: Some(message.subject),
                        body: message.body,
                        timestamp: Some(when),
                        author_id: Some(author_id.to_string()),
                    },
                )?;
                last_contact = last_contact.max(Some(when));
                writes += 1;
            }

            if let Some(ts) = last_contact {
                tx.update_student(
                    &student.id,
                    &StudentPatch {
                        last_communication_at: Some(ts),
                        ..Default::default()
                    },
                )?;
                writes += 1;
            }

            if picker.coin() {
                let sentence = pick_str(picker, DETAIL_SENTENCES);
                tx.insert_note(
                    &student.id,
                    &NewNote {
                        text: format!("Advisor note: {}", sentence),
                        author_id: Some(author_id.to_string()),
                        created_at: Some(recent(picker, now, 7)),
                    },
                )?;
                writes += 1;
            }

            if picker.coin() {
                tx.insert_task(
                    &student.id,
                    &NewTask {
                        title: format!("Reminder: {}", pick_str(picker, TASK_TOPICS)),
                        ..Default::default()
                    },
                )?;
                writes += 1;
            }

            Ok(writes)
        })?;

        report.students += 1;
        report.writes += writes;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::session::SessionProvider;
    use crate::types::Config;

    #[test]
    fn test_random_student_fields_in_range() {
        let now = Utc::now();
        let mut picker = Picker::seeded(21);
        for _ in 0..50 {
            let s = random_student(&mut picker, now);
            let grade: u8 = s.grade.as_deref().and_then(|g| g.parse().ok()).expect("grade");
            assert!((9..=12).contains(&grade));
            assert!(s.email.contains('@'));
            let tags = s.tags.expect("tags");
            assert!(tags.len() <= 3);
            assert!(tags.iter().all(|t| SEED_TAGS.contains(&t.as_str())));
            let active = s.last_active.expect("last active");
            assert!(now - active <= Duration::days(14));
            let contact = s.last_communication_at.expect("last contact");
            assert!(now - contact <= Duration::days(10));
        }
    }

    #[test]
    fn test_seed_then_enrich() {
        let db = test_db();
        let now = Utc::now();
        let mut picker = Picker::seeded(99);

        let report = seed_students_into(&db, &mut picker, now, 12).expect("seed");
        assert_eq!(report.students, 12);

        let report = seed_interactions_into(&db, &mut picker, now, "admin-demo").expect("enrich");
        assert_eq!(report.students, 12);
        assert!(report.writes >= 24, "at least two interactions each");

        for student in db.list_students(100).expect("list") {
            let interactions = db.list_interactions(&student.id).expect("interactions");
            assert!((2..=4).contains(&interactions.len()));

            let comms = db.list_communications(&student.id).expect("comms");
            assert!(comms.len() <= 2);
            if let Some(latest) = comms.first() {
                assert_eq!(student.last_communication_at, latest.timestamp);
                assert_eq!(latest.author_id.as_deref(), Some("admin-demo"));
            }

            assert!(db.list_notes(&student.id).expect("notes").len() <= 1);
            for task in db.list_tasks(&student.id).expect("tasks") {
                assert!(task.title.starts_with("Reminder: "));
            }
        }
    }

    #[test]
    fn test_seeding_requires_dev_tools() {
        let state = AppState::with_parts(Config::default(), test_db(), SessionProvider::new(None));
        let result = seed_students(&state, 2);
        if cfg!(debug_assertions) {
            assert_eq!(result.expect("seed").students, 2);
        } else {
            assert!(matches!(result, Err(DeskError::Validation(_))));
        }
    }
}
