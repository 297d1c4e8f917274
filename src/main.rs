//! studentdesk: advisor back office for prospective students.
//!
//! Sign in once with `studentdesk signin`; the session token is kept under
//! `~/.studentdesk/` and restored on every later invocation.

use std::process::ExitCode;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use studentdesk_lib::commands::{self, ListOptions};
use studentdesk_lib::devtools::DEFAULT_SEED_COUNT;
use studentdesk_lib::error::{DeskError, Notice, NoticeLevel};
use studentdesk_lib::filter::{SortColumn, StatusFilter};
use studentdesk_lib::progress::progress_bar;
use studentdesk_lib::services::dashboard::DashboardResult;
use studentdesk_lib::services::students::StudentProfile;
use studentdesk_lib::state::{self, AppState};
use studentdesk_lib::templates::Picker;
use studentdesk_lib::types::{AppStatus, Channel};
use studentdesk_lib::util::{format_distance, MISSING_TIMESTAMP};
use studentdesk_lib::views::{self, Timeline};

#[derive(Parser)]
#[command(name = "studentdesk")]
#[command(about = "Advisor back office for prospective students")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Signin {
        email: String,
        #[arg(long, env = "STUDENTDESK_PASSWORD")]
        password: String,
    },
    /// End the current session
    Signout,
    /// Show the signed-in advisor
    Whoami,
    /// Create an advisor account
    AddAdvisor {
        email: String,
        #[arg(long, env = "STUDENTDESK_PASSWORD")]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Counters over the most recently active students
    Dashboard,
    /// Filter and sort the student list
    Students {
        /// Case-insensitive match on name or email
        #[arg(long)]
        q: Option<String>,
        /// Exploring, Shortlisting, Applying, Submitted or All
        #[arg(long)]
        status: Option<StatusFilter>,
        #[arg(long)]
        country: Option<String>,
        /// Quick filter token: not_contacted_7d, high_intent, needs_essay_help
        #[arg(long)]
        qf: Option<String>,
        /// name, email, country, status or last-active
        #[arg(long)]
        sort: Option<SortColumn>,
        #[arg(long)]
        desc: bool,
    },
    /// Student profile with its timeline
    Show { id: String },
    /// Move a student to another stage
    Status { id: String, status: AppStatus },
    /// Log a communication by hand
    Log {
        id: String,
        #[arg(long, default_value = "email")]
        channel: Channel,
        #[arg(long)]
        body: String,
    },
    /// Log a templated follow-up email
    FollowUp { id: String },
    /// Internal advisor notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Advisor tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Generate an advisor brief
    Summary { id: String },
    /// Seed demo students (dev tools)
    Seed {
        #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
        count: usize,
    },
    /// Seed interactions, communications, notes and tasks (dev tools)
    SeedInteractions,
    /// Show or change ~/.studentdesk/config.json
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set one field, e.g. `config set developerMode true`
    Set { key: String, value: String },
}

#[derive(Subcommand)]
enum NoteAction {
    Add { id: String, text: String },
    Edit { id: String, note_id: String, text: String },
    Delete { id: String, note_id: String },
}

#[derive(Subcommand)]
enum TaskAction {
    Add { id: String, title: String },
    Toggle { id: String, task_id: String },
    Delete { id: String, task_id: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Command::Config { action } = cli.command {
        return match run_config(action, cli.json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                print_notice(&Notice::from(&e), cli.json);
                ExitCode::FAILURE
            }
        };
    }

    let state = match AppState::new() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&state, cli.command, cli.json) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_notice(&Notice::from(&e), cli.json);
            ExitCode::FAILURE
        }
    }
}

/// Run one command. `Ok(false)` means a notice reported a failed write.
fn run(state: &AppState, command: Command, json: bool) -> Result<bool, DeskError> {
    let now = Utc::now();

    match command {
        Command::Signin { email, password } => {
            let user = commands::sign_in(state, &email, &password)?;
            emit(json, &user, || format!("Signed in as {}", user.display_name));
        }
        Command::Signout => {
            commands::sign_out(state)?;
            emit(json, &Notice::success("Signed out"), || "Signed out".into());
        }
        Command::Whoami => {
            let user = state.session.current_user();
            emit(json, &user, || match user {
                Some(ref u) => format!("{} <{}>", u.display_name, u.email),
                None => "Not signed in".into(),
            });
        }
        Command::AddAdvisor {
            email,
            password,
            name,
        } => {
            let user = commands::add_advisor(state, &email, &password, name.as_deref())?;
            emit(json, &user, || format!("Created advisor {}", user.email));
        }
        Command::Dashboard => {
            let result = commands::dashboard(state, now)?;
            emit(json, &result, || render_dashboard(&result));
            return Ok(!matches!(result, DashboardResult::Error { .. }));
        }
        Command::Students {
            q,
            status,
            country,
            qf,
            sort,
            desc,
        } => {
            let options = ListOptions {
                query: q,
                status,
                country,
                quick: qf,
                sort,
                descending: desc,
            };
            let list = commands::list_students(state, &options)?;
            let rows = list.rows(now);
            emit(json, &rows, || {
                if rows.is_empty() {
                    return "No students match.".into();
                }
                rows.iter()
                    .map(|s| {
                        let active = s
                            .last_active
                            .map(|ts| format_distance(ts, now))
                            .unwrap_or_else(|| MISSING_TIMESTAMP.to_string());
                        format!(
                            "{:<38} {:<26} {:<34} {:<12} {:<13} {}",
                            s.id,
                            s.name,
                            s.email,
                            s.country,
                            s.status.as_str(),
                            active
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        Command::Show { id } => {
            let profile = commands::open_profile(state, &id)?;
            let snapshot = profile.snapshot();
            emit(json, &snapshot, || render_profile(&profile));
        }
        Command::Status { id, status } => {
            let mut profile = commands::open_profile(state, &id)?;
            return Ok(report(profile.update_status(&state.db, status), json));
        }
        Command::Log { id, channel, body } => {
            let mut profile = commands::open_profile(state, &id)?;
            let notice = profile.log_communication(&state.db, channel, &body, now);
            return Ok(report(notice, json));
        }
        Command::FollowUp { id } => {
            let mut profile = commands::open_profile(state, &id)?;
            let notice = profile.send_follow_up(&state.db, &mut Picker::from_entropy(), now);
            return Ok(report(notice, json));
        }
        Command::Note { action } => {
            let notice = match action {
                NoteAction::Add { id, text } => {
                    commands::open_profile(state, &id)?.add_note(&state.db, &text, now)
                }
                NoteAction::Edit { id, note_id, text } => {
                    commands::open_profile(state, &id)?.edit_note(&state.db, &note_id, &text, now)
                }
                NoteAction::Delete { id, note_id } => {
                    commands::open_profile(state, &id)?.delete_note(&state.db, &note_id)
                }
            };
            return Ok(report(notice, json));
        }
        Command::Task { action } => {
            let notice = match action {
                TaskAction::Add { id, title } => {
                    commands::open_profile(state, &id)?.add_task(&state.db, &title, now)
                }
                TaskAction::Toggle { id, task_id } => {
                    commands::open_profile(state, &id)?.toggle_task(&state.db, &task_id)
                }
                TaskAction::Delete { id, task_id } => {
                    commands::open_profile(state, &id)?.delete_task(&state.db, &task_id)
                }
            };
            return Ok(report(notice, json));
        }
        Command::Summary { id } => {
            let profile = commands::open_profile(state, &id)?;
            let summary = profile.generate_summary(&mut Picker::from_entropy(), now);
            emit(json, &summary, || summary.render());
        }
        Command::Seed { count } => {
            let seeded = commands::seed(state, count)?;
            emit(json, &seeded, || format!("Seeded {} students", seeded.students));
        }
        Command::Config { action } => run_config(action, json)?,
        Command::SeedInteractions => {
            let seeded = commands::seed_interactions(state)?;
            emit(json, &seeded, || {
                format!(
                    "Seeded activity for {} students ({} records)",
                    seeded.students, seeded.writes
                )
            });
        }
    }
    Ok(true)
}

/// Config commands run before the store opens so a broken config can be fixed.
fn run_config(action: ConfigAction, json: bool) -> Result<(), DeskError> {
    let path = state::config_path().map_err(DeskError::Config)?;
    let config = match action {
        ConfigAction::Show => state::load_config_from(&path).map_err(DeskError::Config)?,
        ConfigAction::Set { key, value } => commands::set_config(&path, &key, &value)?,
    };
    emit(json, &config, || {
        serde_json::to_string_pretty(&config).unwrap_or_else(|e| e.to_string())
    });
    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("Error: failed to serialize output: {}", e),
        }
    } else {
        println!("{}", text());
    }
}

fn print_notice(notice: &Notice, json: bool) {
    if json {
        emit(json, notice, String::new);
        return;
    }
    match notice.level {
        NoticeLevel::Success => println!("{}", notice.message),
        NoticeLevel::Ignored => println!("Nothing to do: {}", notice.message),
        NoticeLevel::Error => {
            eprintln!("Error: {}", notice.message);
            if let Some(ref hint) = notice.recovery_suggestion {
                eprintln!("{}", hint);
            }
        }
    }
}

fn report(notice: Notice, json: bool) -> bool {
    print_notice(&notice, json);
    notice.level != NoticeLevel::Error
}

fn render_dashboard(result: &DashboardResult) -> String {
    match result {
        DashboardResult::Success { data } => data
            .cards
            .iter()
            .map(|card| match card.href {
                Some(ref href) => format!("{:<22} {:>6}   {}", card.label, card.value, href),
                None => format!("{:<22} {:>6}", card.label, card.value),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        DashboardResult::Empty { message } => message.clone(),
        DashboardResult::Error { message } => format!("Error: {}", message),
    }
}

fn render_profile(profile: &StudentProfile) -> String {
    let student = profile.student();
    let timeline = Timeline::new(&Local);
    let mut out = vec![
        student.name.clone(),
        views::profile_subtitle(&student),
        format!(
            "{}  {} {}%",
            student.status,
            progress_bar(student.status, 20),
            profile.progress()
        ),
    ];
    if !student.tags.is_empty() {
        out.push(format!("Tags: {}", student.tags.join(", ")));
    }

    let sections = [
        (
            "Interactions",
            views::render_interactions(&timeline.interactions(&profile.interactions())),
        ),
        (
            "Communications",
            views::render_communications(&timeline.communications(&profile.communications())),
        ),
        (
            "Notes",
            views::render_notes(&timeline.notes(&profile.notes())),
        ),
        (
            "Tasks",
            views::render_tasks(&timeline.tasks(&profile.tasks())),
        ),
    ];
    for (title, lines) in sections {
        out.push(String::new());
        out.push(format!("## {}", title));
        out.extend(lines);
    }
    out.join("\n")
}
