//! Outbound message templates for follow-ups and demo communications.

use serde::Serialize;

use super::{first_name, Picker};
use crate::types::{AppStatus, Channel};

const UNNAMED: &str = "there";
pub const DEFAULT_SUBJECT: &str = "Follow-up";

#[derive(Debug, Clone, Copy)]
pub struct OutreachInput<'a> {
    pub name: Option<&'a str>,
    pub channel: Channel,
    pub status: Option<AppStatus>,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub subject: String,
    pub body: String,
}

pub fn email_subjects() -> Vec<String> {
    [
        "Next steps on your college list",
        "Quick check-in on your applications",
        "Your shortlist looks solid — feedback inside",
        "Essay pointers you can use today",
        "Deadlines coming up — let’s align",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn email_bodies(first: &str) -> Vec<String> {
    vec![
        format!("Hi {first}, I reviewed your interests and shortlisted a few programs that match your profile. Do you have 10 minutes this week to review together?"),
        format!("Hi {first}, based on your activity I suggested two schools that match your GPA and goals. Want me to walk you through the trade-offs?"),
        format!("Hi {first}, nice progress so far. I left comments on your shortlist about fit and deadlines. Shall we finalize 3–4 targets this week?"),
        format!("Hi {first}, I added some essay prompts tied to your strengths. If you share a rough outline, I can give feedback within a day."),
        format!("Hi {first}, a few deadlines are within the next 2–3 weeks. I can help prioritize requirements so you aren’t rushing last minute."),
    ]
}

fn sms_bodies(first: &str) -> Vec<String> {
    vec![
        format!("{first}, quick nudge — ready to pick 3 target schools? I can help you compare deadlines and scholarships."),
        format!("{first}, saw your progress. Want a 10-min call to finalize your shortlist?"),
        format!("{first}, I dropped essay ideas in your notes. Ping me when you’re ready to draft."),
    ]
}

fn call_notes() -> Vec<String> {
    [
        "Discussed shortlist trade-offs and agreed to narrow to 4 programs.",
        "Walked through application timeline; clarified test score reporting.",
        "Aligned on essay theme and next steps for a first draft.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn essay_body(first: &str) -> String {
    format!("Hi {first}, I left notes on your essay outline. Let’s refine the narrative and tighten the opening paragraph.")
}

fn stage_body(first: &str, stage: AppStatus) -> Option<String> {
    match stage {
        AppStatus::Applying => Some(format!("Hi {first}, since you’re in the Applying stage, I recommend we lock your recommenders and finalize the activity list this week.")),
        AppStatus::Submitted => Some(format!("Hi {first}, great job submitting! Next we’ll prep for potential interviews and scholarship forms.")),
        _ => None,
    }
}

/// Every body the picker may choose for `input`. Conditional candidates are
/// placed in front of the base pool: stage first, then essay.
pub fn candidate_bodies(input: &OutreachInput<'_>) -> Vec<String> {
    let first = first_name(input.name, UNNAMED);
    match input.channel {
        Channel::Email => {
            let mut bodies = Vec::new();
            if let Some(body) = stage_body(first, input.status.unwrap_or_default()) {
                bodies.push(body);
            }
            if input.tags.iter().any(|t| t == "Essay") {
                bodies.push(essay_body(first));
            }
            bodies.extend(email_bodies(first));
            bodies
        }
        Channel::Sms => sms_bodies(first),
        Channel::Call | Channel::Note => call_notes(),
    }
}

pub fn candidate_subjects(channel: Channel) -> Vec<String> {
    match channel {
        Channel::Email => email_subjects(),
        _ => vec![DEFAULT_SUBJECT.to_string()],
    }
}

pub fn compose_outbound(input: &OutreachInput<'_>, picker: &mut Picker) -> OutboundMessage {
    OutboundMessage {
        subject: picker.pick_string(&candidate_subjects(input.channel)),
        body: picker.pick_string(&candidate_bodies(input)),
    }
}
