//! Local record cache with a pending-write overlay.
//!
//! The cache keeps the last list the store confirmed plus an ordered list of
//! writes still in flight. `visible()` is the confirmed list with the overlay
//! applied. A pending write either merges into the confirmed list
//! (`confirm`) or disappears without a trace (`revert`).

use crate::types::{Communication, Interaction, Note, Student, Task};

pub trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed_by_id {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

keyed_by_id!(Student, Interaction, Communication, Note, Task);

/// Handle to one in-flight write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(u64);

#[derive(Debug, Clone)]
enum PendingOp<T> {
    /// New record shown at the head of the list until the store answers.
    Insert(T),
    Update(T),
    Remove(String),
}

#[derive(Debug, Clone)]
pub struct RecordCache<T> {
    confirmed: Vec<T>,
    pending: Vec<(PendingId, PendingOp<T>)>,
    next_id: u64,
}

impl<T> Default for RecordCache<T> {
    fn default() -> Self {
        Self {
            confirmed: Vec::new(),
            pending: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T: Keyed + Clone> RecordCache<T> {
    pub fn new(confirmed: Vec<T>) -> Self {
        Self {
            confirmed,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.visible().into_iter().find(|r| r.key() == key)
    }

    pub fn visible(&self) -> Vec<T> {
        let mut rows = self.confirmed.clone();
        for (_, op) in &self.pending {
            apply(&mut rows, op);
        }
        rows
    }

    pub fn stage_insert(&mut self, record: T) -> PendingId {
        self.stage(PendingOp::Insert(record))
    }

    pub fn stage_update(&mut self, record: T) -> PendingId {
        self.stage(PendingOp::Update(record))
    }

    pub fn stage_remove(&mut self, key: &str) -> PendingId {
        self.stage(PendingOp::Remove(key.to_string()))
    }

    /// The store accepted the write. For inserts and updates, `stored` is the
    /// store's copy and replaces the optimistic one.
    pub fn confirm(&mut self, id: PendingId, stored: Option<T>) {
        let Some(op) = self.take(id) else {
            log::debug!("confirm for unknown pending write {:?}", id);
            return;
        };
        let op = match (op, stored) {
            (PendingOp::Insert(_), Some(record)) => PendingOp::Insert(record),
            (PendingOp::Update(_), Some(record)) => PendingOp::Update(record),
            (op, _) => op,
        };
        apply(&mut self.confirmed, &op);
    }

    /// The store rejected the write; drop it from the overlay.
    pub fn revert(&mut self, id: PendingId) {
        if self.take(id).is_none() {
            log::debug!("revert for unknown pending write {:?}", id);
        }
    }

    fn stage(&mut self, op: PendingOp<T>) -> PendingId {
        let id = PendingId(self.next_id);
        self.next_id += 1;
        self.pending.push((id, op));
        id
    }

    fn take(&mut self, id: PendingId) -> Option<PendingOp<T>> {
        let pos = self.pending.iter().position(|(p, _)| *p == id)?;
        Some(self.pending.remove(pos).1)
    }
}

fn apply<T: Keyed + Clone>(rows: &mut Vec<T>, op: &PendingOp<T>) {
    match op {
        PendingOp::Insert(record) => rows.insert(0, record.clone()),
        PendingOp::Update(record) => {
            if let Some(slot) = rows.iter_mut().find(|r| r.key() == record.key()) {
                *slot = record.clone();
            }
        }
        PendingOp::Remove(key) => rows.retain(|r| r.key() != key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.into(),
            student_id: "s".into(),
            title: title.into(),
            status: TaskStatus::Todo,
            due_at: None,
            assigned_to: None,
            created_at: None,
        }
    }

    fn ids(cache: &RecordCache<Task>) -> Vec<String> {
        cache.visible().into_iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_failed_insert_leaves_visible_list_unchanged() {
        let mut cache = RecordCache::new(vec![task("a", "A"), task("b", "B")]);
        let before = cache.visible();

        let pending = cache.stage_insert(task("pending-1", "New"));
        assert_eq!(ids(&cache), vec!["pending-1", "a", "b"]);

        cache.revert(pending);
        assert_eq!(cache.visible(), before);
        // Nothing left to settle.
        cache.confirm(pending, Some(task("late", "Late")));
        assert_eq!(cache.visible(), before);
    }

    #[test]
    fn test_confirmed_insert_is_replaced_by_store_copy() {
        let mut cache = RecordCache::new(vec![task("a", "A")]);
        let pending = cache.stage_insert(task("pending-1", "New"));
        cache.confirm(pending, Some(task("uuid-1", "New")));
        assert_eq!(ids(&cache), vec!["uuid-1", "a"]);
        cache.revert(pending);
        assert_eq!(ids(&cache), vec!["uuid-1", "a"]);
    }

    #[test]
    fn test_update_and_remove_overlay() {
        let mut cache = RecordCache::new(vec![task("a", "A"), task("b", "B")]);

        let mut done = task("a", "A");
        done.status = TaskStatus::Done;
        let upd = cache.stage_update(done);
        let rm = cache.stage_remove("b");
        assert_eq!(cache.get("a").map(|t| t.status), Some(TaskStatus::Done));
        assert_eq!(ids(&cache), vec!["a"]);

        cache.revert(upd);
        assert_eq!(cache.get("a").map(|t| t.status), Some(TaskStatus::Todo));

        cache.confirm(rm, None);
        assert_eq!(ids(&cache), vec!["a"]);
        cache.revert(rm);
        assert_eq!(ids(&cache), vec!["a"]);
    }

    #[test]
    fn test_interleaved_writes_resolve_independently() {
        let mut cache = RecordCache::new(vec![task("a", "A")]);
        let first = cache.stage_insert(task("p1", "One"));
        let second = cache.stage_insert(task("p2", "Two"));
        cache.revert(first);
        assert_eq!(ids(&cache), vec!["p2", "a"]);
        cache.confirm(second, Some(task("u2", "Two")));
        assert_eq!(ids(&cache), vec!["u2", "a"]);
    }
}
