// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::error::StoreResult;
use crate::ids::NoteId;
use crate::model::{NewNote, Note, NoteStatus, NoteUpdate};

/// Persistence boundary for notes. Every call is a full round-trip; callers
/// must not assume anything is cached between calls.
pub trait NoteStore {
    /// All notes with `status`, in no particular order.
    fn fetch_by_status(&mut self, status: NoteStatus) -> StoreResult<Vec<Note>>;

    /// Creates a note and returns it with its assigned id and timestamps.
    fn insert(&mut self, note: &NewNote) -> StoreResult<Note>;

    /// Fails with `StoreError::NotFound` when `id` does not exist.
    fn update(&mut self, id: NoteId, update: &NoteUpdate) -> StoreResult<()>;

    /// Applies `update` to every id in one batch; all or nothing.
    fn update_many(&mut self, ids: &[NoteId], update: &NoteUpdate) -> StoreResult<()>;

    fn remove(&mut self, id: NoteId) -> StoreResult<()>;

    fn remove_many(&mut self, ids: &[NoteId]) -> StoreResult<()>;
}

impl<S: NoteStore + ?Sized> NoteStore for &mut S {
    fn fetch_by_status(&mut self, status: NoteStatus) -> StoreResult<Vec<Note>> {
        (**self).fetch_by_status(status)
    }

    fn insert(&mut self, note: &NewNote) -> StoreResult<Note> {
        (**self).insert(note)
    }

    fn update(&mut self, id: NoteId, update: &NoteUpdate) -> StoreResult<()> {
        (**self).update(id, update)
    }

    fn update_many(&mut self, ids: &[NoteId], update: &NoteUpdate) -> StoreResult<()> {
        (**self).update_many(ids, update)
    }

    fn remove(&mut self, id: NoteId) -> StoreResult<()> {
        (**self).remove(id)
    }

    fn remove_many(&mut self, ids: &[NoteId]) -> StoreResult<()> {
        (**self).remove_many(ids)
    }
}
