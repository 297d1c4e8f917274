//! Advisor brief: a short deterministic-template summary of one student.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ensure_period, first_name, Picker};
use crate::types::{AppStatus, Interaction, InteractionKind, Student};
use crate::util::format_distance;

const UNNAMED: &str = "The student";

/// Tag-gated hints, in the order they are joined.
pub const TAG_HINTS: [(&str, &str); 5] = [
    ("Essay", "needs essay support"),
    ("Scholarship", "is tracking scholarships"),
    ("STEM", "has STEM leaning"),
    ("SAT", "is preparing for SAT"),
    ("TOEFL", "is preparing for TOEFL"),
];

/// Number of `ai_question` interactions that marks active exploration.
pub const AI_QUESTION_INTENT_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct SummaryInput<'a> {
    pub name: Option<&'a str>,
    pub country: Option<&'a str>,
    pub grade: Option<&'a str>,
    pub status: Option<AppStatus>,
    pub tags: &'a [String],
    pub last_active: Option<DateTime<Utc>>,
    pub last_communication_at: Option<DateTime<Utc>>,
    pub interaction_kinds: Vec<InteractionKind>,
}

impl<'a> SummaryInput<'a> {
    /// Inputs for a profile brief. `interactions` are newest first; only the
    /// first `limit` are considered.
    pub fn from_profile(
        student: &'a Student,
        interactions: &[Interaction],
        latest_contact: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Self {
        SummaryInput {
            name: Some(student.name.as_str()),
            country: Some(student.country.as_str()).filter(|c| !c.is_empty()),
            grade: student.grade.as_deref().filter(|g| !g.is_empty()),
            status: Some(student.status),
            tags: &student.tags,
            last_active: student.last_active,
            last_communication_at: latest_contact.or(student.last_communication_at),
            interaction_kinds: interactions.iter().take(limit).map(|i| i.kind).collect(),
        }
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub opener: String,
    /// Each clause ends with a period.
    pub clauses: Vec<String>,
}

impl Summary {
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.opener, self.clauses.join(" "))
    }
}

pub fn openers(first: &str) -> Vec<String> {
    vec![
        format!("Here’s a quick read on {}:", first),
        format!("Snapshot on {}:", first),
        format!("Brief on {}:", first),
    ]
}

pub fn next_step(stage: AppStatus) -> &'static str {
    match stage {
        AppStatus::Applying => {
            "Focus next on locking recommenders and finalizing the activity list."
        }
        AppStatus::Shortlisting => {
            "Focus next on narrowing to 3–4 target programs and checking deadlines."
        }
        AppStatus::Submitted => "Next steps: interview prep and scholarship follow-ups.",
        AppStatus::Exploring => "Encourage deeper exploration and a first draft college list.",
    }
}

fn location_clause(country: Option<&str>, grade: Option<&str>) -> Option<String> {
    match (country, grade) {
        (Some(country), Some(grade)) => Some(format!("Based in {}, grade {}.", country, grade)),
        (Some(country), None) => Some(format!("Based in {}.", country)),
        (None, Some(grade)) => Some(format!("Currently in grade {}.", grade)),
        (None, None) => None,
    }
}

pub fn build_summary(input: &SummaryInput<'_>, now: DateTime<Utc>, picker: &mut Picker) -> Summary {
    let first = first_name(input.name, UNNAMED);
    let stage = input.status.unwrap_or_default();

    let last_seen = input
        .last_active
        .map(|ts| format_distance(ts, now))
        .unwrap_or_else(|| "recently".to_string());
    let last_contact = input
        .last_communication_at
        .map(|ts| format_distance(ts, now))
        .unwrap_or_else(|| "unknown".to_string());

    let tag_hints: Vec<&str> = TAG_HINTS
        .iter()
        .filter(|(tag, _)| input.has_tag(tag))
        .map(|(_, hint)| *hint)
        .collect();

    let ai_questions = input
        .interaction_kinds
        .iter()
        .filter(|k| **k == InteractionKind::AiQuestion)
        .count();

    let mut clauses = vec![format!(
        "{} is in the **{}** stage and last active {}. Latest advisor contact was {}.",
        first, stage, last_seen, last_contact
    )];
    if !tag_hints.is_empty() {
        clauses.push(format!("{} {}", first, tag_hints.join(", ")));
    }
    if ai_questions >= AI_QUESTION_INTENT_THRESHOLD {
        clauses.push(format!("{} is actively exploring via AI Q&A", first));
    }
    clauses.extend(location_clause(input.country, input.grade));
    clauses.push(next_step(stage).to_string());

    let opener = picker.pick_string(&openers(first));

    Summary {
        opener,
        clauses: clauses.iter().map(|c| ensure_period(c)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::student;
    use chrono::Duration;

    fn interaction(kind: InteractionKind) -> Interaction {
        Interaction {
            id: "i".into(),
            student_id: "s".into(),
            kind,
            detail: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_empty_input_degrades_to_generic_phrasing() {
        let now = Utc::now();
        let summary = build_summary(&SummaryInput::default(), now, &mut Picker::seeded(3));
        assert!(openers(UNNAMED).contains(&summary.opener));
        assert_eq!(
            summary.clauses,
            vec![
                "The student is in the **Exploring** stage and last active recently. Latest advisor contact was unknown.",
                "Encourage deeper exploration and a first draft college list.",
            ]
        );
    }

    #[test]
    fn test_full_profile_brief() {
        let now = Utc::now();
        let mut s = student("s", AppStatus::Applying, now);
        s.name = "Amara Okafor".into();
        s.country = "Nigeria".into();
        s.grade = Some("12".into());
        s.tags = vec!["STEM".into(), "Essay".into()];
        s.last_active = Some(now - Duration::days(3));

        let interactions: Vec<Interaction> = [
            InteractionKind::AiQuestion,
            InteractionKind::Login,
            InteractionKind::AiQuestion,
        ]
        .into_iter()
        .map(interaction)
        .collect();

        let input = SummaryInput::from_profile(&s, &interactions, None, 10);
        let summary = build_summary(&input, now, &mut Picker::seeded(9));

        assert_eq!(summary.clauses[0].split(". ").count(), 2);
        assert!(summary.clauses[0].contains("last active 3 days ago"));
        assert_eq!(summary.clauses[1], "Amara needs essay support, has STEM leaning.");
        assert_eq!(summary.clauses[2], "Amara is actively exploring via AI Q&A.");
        assert_eq!(summary.clauses[3], "Based in Nigeria, grade 12.");
        assert_eq!(summary.clauses[4], next_step(AppStatus::Applying));
        assert!(summary.render().starts_with(&summary.opener));
    }

    #[test]
    fn test_interaction_limit_applies() {
        let now = Utc::now();
        let s = student("s", AppStatus::Exploring, now);
        let mut interactions: Vec<Interaction> =
            (0..10).map(|_| interaction(InteractionKind::Login)).collect();
        interactions.push(interaction(InteractionKind::AiQuestion));
        interactions.push(interaction(InteractionKind::AiQuestion));

        let input = SummaryInput::from_profile(&s, &interactions, None, 10);
        let summary = build_summary(&input, now, &mut Picker::seeded(1));
        assert!(!summary.render().contains("AI Q&A"));
    }

    #[test]
    fn test_grade_without_country() {
        let mut input = SummaryInput::default();
        input.grade = Some("10");
        let summary = build_summary(&input, Utc::now(), &mut Picker::seeded(1));
        assert!(summary.clauses.contains(&"Currently in grade 10.".to_string()));
    }

    #[test]
    fn test_every_clause_ends_with_period() {
        let now = Utc::now();
        let tags: Vec<String> = TAG_HINTS.iter().map(|(t, _)| t.to_string()).collect();
        for (i, stage) in AppStatus::ALL.iter().enumerate() {
            let input = SummaryInput {
                name: Some("Li Wei"),
                country: Some("China"),
                grade: None,
                status: Some(*stage),
                tags: &tags,
                last_active: Some(now - Duration::hours(5)),
                last_communication_at: Some(now - Duration::days(40)),
                interaction_kinds: vec![InteractionKind::AiQuestion; 3],
            };
            let summary = build_summary(&input, now, &mut Picker::seeded(i as u64));
            assert!(!summary.render().is_empty());
            assert!(summary.clauses.iter().all(|c| c.ends_with('.')));
            assert!(summary.opener.contains("Li"));
        }
    }
}
