//! The record store seam.
//!
//! Services talk to `RecordStore`, never to SQLite directly, so the same view
//! logic runs against `DeskDb` in the binary and against scripted stores in
//! tests. Every call is a single request/response; nothing is retried.

use crate::db::{DbError, DeskDb};
use crate::types::{
    Communication, Interaction, NewCommunication, NewInteraction, NewNote, NewStudent, NewTask,
    Note, Student, StudentPatch, Task, TaskStatus,
};

pub trait RecordStore {
    /// Most recently active students first, at most `limit` of them.
    fn list_students(&self, limit: usize) -> Result<Vec<Student>, DbError>;
    fn get_student(&self, id: &str) -> Result<Option<Student>, DbError>;
    fn create_student(&self, new: &NewStudent) -> Result<Student, DbError>;
    fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<(), DbError>;

    fn list_interactions(&self, student_id: &str) -> Result<Vec<Interaction>, DbError>;
    fn create_interaction(
        &self,
        student_id: &str,
        new: &NewInteraction,
    ) -> Result<Interaction, DbError>;

    fn list_communications(&self, student_id: &str) -> Result<Vec<Communication>, DbError>;
    fn create_communication(
        &self,
        student_id: &str,
        new: &NewCommunication,
    ) -> Result<Communication, DbError>;

    fn list_notes(&self, student_id: &str) -> Result<Vec<Note>, DbError>;
    fn create_note(&self, student_id: &str, new: &NewNote) -> Result<Note, DbError>;
    fn update_note(&self, student_id: &str, note_id: &str, text: &str) -> Result<(), DbError>;
    fn delete_note(&self, student_id: &str, note_id: &str) -> Result<(), DbError>;

    fn list_tasks(&self, student_id: &str) -> Result<Vec<Task>, DbError>;
    fn create_task(&self, student_id: &str, new: &NewTask) -> Result<Task, DbError>;
    fn update_task_status(
        &self,
        student_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), DbError>;
    fn delete_task(&self, student_id: &str, task_id: &str) -> Result<(), DbError>;
}

impl RecordStore for DeskDb {
    fn list_students(&self, limit: usize) -> Result<Vec<Student>, DbError> {
        DeskDb::list_students(self, limit)
    }

    fn get_student(&self, id: &str) -> Result<Option<Student>, DbError> {
        DeskDb::get_student(self, id)
    }

    fn create_student(&self, new: &NewStudent) -> Result<Student, DbError> {
        self.insert_student(new)
    }

    fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<(), DbError> {
        DeskDb::update_student(self, id, patch)
    }

    fn list_interactions(&self, student_id: &str) -> Result<Vec<Interaction>, DbError> {
        DeskDb::list_interactions(self, student_id)
    }

    fn create_interaction(
        &self,
        student_id: &str,
        new: &NewInteraction,
    ) -> Result<Interaction, DbError> {
        self.insert_interaction(student_id, new)
    }

    fn list_communications(&self, student_id: &str) -> Result<Vec<Communication>, DbError> {
        DeskDb::list_communications(self, student_id)
    }

    fn create_communication(
        &self,
        student_id: &str,
        new: &NewCommunication,
    ) -> Result<Communication, DbError> {
        self.insert_communication(student_id, new)
    }

    fn list_notes(&self, student_id: &str) -> Result<Vec<Note>, DbError> {
        DeskDb::list_notes(self, student_id)
    }

    fn create_note(&self, student_id: &str, new: &NewNote) -> Result<Note, DbError> {
        self.insert_note(student_id, new)
    }

    fn update_note(&self, student_id: &str, note_id: &str, text: &str) -> Result<(), DbError> {
        self.update_note_text(student_id, note_id, text)
    }

    fn delete_note(&self, student_id: &str, note_id: &str) -> Result<(), DbError> {
        DeskDb::delete_note(self, student_id, note_id)
    }

    fn list_tasks(&self, student_id: &str) -> Result<Vec<Task>, DbError> {
        DeskDb::list_tasks(self, student_id)
    }

    fn create_task(&self, student_id: &str, new: &NewTask) -> Result<Task, DbError> {
        self.insert_task(student_id, new)
    }

    fn update_task_status(
        &self,
        student_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), DbError> {
        self.set_task_status(student_id, task_id, status)
    }

    fn delete_task(&self, student_id: &str, task_id: &str) -> Result<(), DbError> {
        DeskDb::delete_task(self, student_id, task_id)
    }
}
