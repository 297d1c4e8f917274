// View-controller logic for the dashboard, student list and student profile.
// Services read through `RecordStore` and never touch SQLite directly.

pub mod dashboard;
pub mod students;
