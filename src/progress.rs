use crate::types::AppStatus;

/// Funnel stage as a completion percentage for the profile progress bar.
pub fn status_to_progress(status: AppStatus) -> u8 {
    match status {
        AppStatus::Exploring => 10,
        AppStatus::Shortlisting => 35,
        AppStatus::Applying => 70,
        AppStatus::Submitted => 100,
    }
}

/// Fixed-width text bar, e.g. `[#######...] 70%`.
pub fn progress_bar(status: AppStatus, width: usize) -> String {
    let pct = status_to_progress(status) as usize;
    let filled = (pct * width + 50) / 100;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        ".".repeat(width.saturating_sub(filled)),
        pct
    )
}
