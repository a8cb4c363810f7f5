// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::editor::{FormatCommand, MarkupEditor, RichTextEditor};
use crate::error::{NoteResult, StoreResult, ValidationError};
use crate::ids::NoteId;
use crate::model::{
    DraftEdit, DraftField, NewNote, Note, NoteDraft, NoteStatus, NoteUpdate, SortKey,
    StatusChange, View,
};
use crate::sort::{filter_notes, sorted};
use crate::store::NoteStore;

/// The note open in the detail view plus its unsaved edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNote {
    pub note: Note,
    pub draft: NoteDraft,
}

/// A destructive action waiting for the user to say yes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteNote(NoteId),
    PurgeSelected(Vec<NoteId>),
}

impl Confirmation {
    pub fn ids(&self) -> Vec<NoteId> {
        match self {
            Self::DeleteNote(id) => vec![*id],
            Self::PurgeSelected(ids) => ids.clone(),
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::DeleteNote(_) => {
                "Delete this note forever? This cannot be undone.".to_owned()
            }
            Self::PurgeSelected(ids) => format!(
                "Delete {} selected {} forever? This cannot be undone.",
                ids.len(),
                plural(ids.len())
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesState {
    pub view: View,
    pub previous_view: View,
    pub notes: Vec<Note>,
    pub active: Option<ActiveNote>,
    pub selection: BTreeSet<NoteId>,
    pub search: String,
    pub sort_key: SortKey,
    pub pending: Option<Confirmation>,
    pub status_line: Option<String>,
}

impl Default for NotesState {
    fn default() -> Self {
        Self {
            view: View::All,
            previous_view: View::All,
            notes: Vec::new(),
            active: None,
            selection: BTreeSet::new(),
            search: String::new(),
            sort_key: SortKey::Newest,
            pending: None,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteCommand {
    ChangeView(View),
    LoadNotes(NoteStatus),
    Reload,
    CreateNote,
    OpenNote(NoteId),
    EditDraft(DraftEdit),
    ApplyFormat(FormatCommand),
    SaveNote,
    Back,
    SetStatus(NoteId, StatusChange),
    ToggleSelect(NoteId),
    SelectAll,
    ClearSelection,
    BulkAction(NoteStatus),
    Confirm,
    Cancel,
    SetSearch(String),
    SetSort(SortKey),
    ShowStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    ViewChanged(View),
    NotesLoaded { view: View, count: usize },
    NoteOpened(NoteId),
    NoteCreated(NoteId),
    DraftChanged(DraftField),
    NoteSaved(NoteId),
    StatusChanged { ids: Vec<NoteId>, status: NoteStatus },
    NotesRemoved(Vec<NoteId>),
    SelectionChanged(usize),
    ConfirmationRequested(Confirmation),
    ConfirmationDeclined,
    SearchChanged(String),
    SortChanged(SortKey),
    StatusUpdated(String),
    StatusCleared,
}

/// Drives note lifecycle transitions against a [`NoteStore`].
///
/// Every operation either completes fully or returns an error with the state
/// untouched: store results are awaited before any field is assigned.
#[derive(Debug)]
pub struct NoteController<S> {
    store: S,
    state: NotesState,
}

impl<S: NoteStore> NoteController<S> {
    pub fn new(store: S) -> Self {
        Self::with_sort(store, SortKey::Newest)
    }

    pub fn with_sort(store: S, sort_key: SortKey) -> Self {
        Self {
            store,
            state: NotesState {
                sort_key,
                ..NotesState::default()
            },
        }
    }

    pub fn state(&self) -> &NotesState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Fetched notes narrowed by the current search, in sort order.
    pub fn visible_notes(&self) -> Vec<&Note> {
        filter_notes(&self.state.notes, &self.state.search)
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.state.selection.contains(&id)
    }

    pub fn dispatch(&mut self, command: NoteCommand) -> NoteResult<Vec<NoteEvent>> {
        match command {
            NoteCommand::ChangeView(view) => self.change_view(view),
            NoteCommand::LoadNotes(status) => self.load_notes(status),
            NoteCommand::Reload => self.reload(),
            NoteCommand::CreateNote => self.create_note(),
            NoteCommand::OpenNote(id) => self.open_note(id),
            NoteCommand::EditDraft(edit) => self.edit_draft(edit),
            NoteCommand::ApplyFormat(format) => self.apply_format(&format),
            NoteCommand::SaveNote => self.save_note(),
            NoteCommand::Back => self.back(),
            NoteCommand::SetStatus(id, change) => self.set_status(id, change),
            NoteCommand::ToggleSelect(id) => self.toggle_select(id),
            NoteCommand::SelectAll => Ok(self.select_all()),
            NoteCommand::ClearSelection => Ok(self.clear_selection()),
            NoteCommand::BulkAction(status) => self.bulk_action(status),
            NoteCommand::Confirm => self.confirm(),
            NoteCommand::Cancel => Ok(self.cancel()),
            NoteCommand::SetSearch(search) => Ok(self.set_search(search)),
            NoteCommand::SetSort(key) => self.set_sort(key),
            NoteCommand::ShowStatus(message) => Ok(self.show_status(&message)),
            NoteCommand::ClearStatus => Ok(self.clear_status()),
        }
    }

    pub fn change_view(&mut self, view: View) -> NoteResult<Vec<NoteEvent>> {
        let notes = self.fetch_sorted(view.status(), self.state.sort_key)?;
        let count = notes.len();
        self.state.view = view;
        self.state.notes = notes;
        self.state.active = None;
        self.state.selection.clear();
        self.state.pending = None;
        debug!(view = view.as_str(), count, "view changed");
        Ok(vec![
            NoteEvent::ViewChanged(view),
            NoteEvent::NotesLoaded { view, count },
        ])
    }

    /// Replaces the snapshot with notes in `status`. Any open draft is
    /// discarded.
    pub fn load_notes(&mut self, status: NoteStatus) -> NoteResult<Vec<NoteEvent>> {
        let notes = self.fetch_sorted(status, self.state.sort_key)?;
        let count = notes.len();
        self.state.notes = notes;
        self.state.active = None;
        self.state.selection.clear();
        Ok(vec![NoteEvent::NotesLoaded {
            view: self.state.view,
            count,
        }])
    }

    pub fn reload(&mut self) -> NoteResult<Vec<NoteEvent>> {
        self.change_view(self.state.view)
    }

    pub fn create_note(&mut self) -> NoteResult<Vec<NoteEvent>> {
        let note = logged("create note", self.store.insert(&NewNote::default()))?;
        let id = note.id;
        debug!(%id, "note created");
        self.state.previous_view = self.state.view;
        self.state.active = Some(ActiveNote {
            draft: NoteDraft::from_note(&note),
            note,
        });
        Ok(vec![
            NoteEvent::NoteCreated(id),
            NoteEvent::NoteOpened(id),
            self.announce("note created"),
        ])
    }

    pub fn open_note(&mut self, id: NoteId) -> NoteResult<Vec<NoteEvent>> {
        let note = self
            .state
            .notes
            .iter()
            .find(|note| note.id == id)
            .cloned()
            .ok_or(ValidationError::UnknownNote(id))?;
        self.state.previous_view = self.state.view;
        self.state.active = Some(ActiveNote {
            draft: NoteDraft::from_note(&note),
            note,
        });
        Ok(vec![NoteEvent::NoteOpened(id)])
    }

    pub fn edit_draft(&mut self, edit: DraftEdit) -> NoteResult<Vec<NoteEvent>> {
        let active = self
            .state
            .active
            .as_mut()
            .ok_or(ValidationError::NoActiveNote)?;
        let field = edit.field();
        match edit {
            DraftEdit::Title(title) => active.draft.title = title,
            DraftEdit::Content(content) => active.draft.content = content,
            DraftEdit::BgColor(color) => active.draft.bg_color = color,
        }
        Ok(vec![NoteEvent::DraftChanged(field)])
    }

    pub fn apply_format(&mut self, format: &FormatCommand) -> NoteResult<Vec<NoteEvent>> {
        let active = self
            .state
            .active
            .as_mut()
            .ok_or(ValidationError::NoActiveNote)?;
        let mut editor = MarkupEditor::from_html(&active.draft.content);
        editor.apply(format);
        active.draft.content = editor.html();
        Ok(vec![NoteEvent::DraftChanged(DraftField::Content)])
    }

    /// Writes the draft and returns to the all-notes view. The draft stays
    /// open when validation or the store call fails.
    pub fn save_note(&mut self) -> NoteResult<Vec<NoteEvent>> {
        let active = self
            .state
            .active
            .as_ref()
            .ok_or(ValidationError::NoActiveNote)?;
        active.draft.validate()?;
        let id = active.note.id;
        let update = active.draft.to_update();
        logged("save note", self.store.update(id, &update))?;
        debug!(%id, "note saved");

        let mut events = vec![NoteEvent::NoteSaved(id)];
        events.extend(self.change_view(View::All)?);
        events.push(self.announce("note saved"));
        Ok(events)
    }

    pub fn back(&mut self) -> NoteResult<Vec<NoteEvent>> {
        self.change_view(self.state.previous_view)
    }

    pub fn set_status(&mut self, id: NoteId, change: StatusChange) -> NoteResult<Vec<NoteEvent>> {
        let current = self.known_status(id)?;
        if !current.allows(change) {
            return Err(ValidationError::IllegalTransition {
                from: current,
                to: change,
            }
            .into());
        }

        let status = match change {
            StatusChange::Permanent => {
                let confirmation = Confirmation::DeleteNote(id);
                self.state.pending = Some(confirmation.clone());
                return Ok(vec![NoteEvent::ConfirmationRequested(confirmation)]);
            }
            StatusChange::To(status) => status,
        };

        logged(
            "update note status",
            self.store.update(id, &NoteUpdate::status(status)),
        )?;
        debug!(%id, status = status.as_str(), "note status changed");

        let mut events = vec![NoteEvent::StatusChanged {
            ids: vec![id],
            status,
        }];
        events.extend(self.reload()?);
        events.push(self.announce(&status_message(1, status)));
        Ok(events)
    }

    pub fn toggle_select(&mut self, id: NoteId) -> NoteResult<Vec<NoteEvent>> {
        if !self.state.notes.iter().any(|note| note.id == id) {
            return Err(ValidationError::UnknownNote(id).into());
        }
        if !self.state.selection.remove(&id) {
            self.state.selection.insert(id);
        }
        Ok(vec![NoteEvent::SelectionChanged(self.state.selection.len())])
    }

    /// Selects every fetched note, including ones hidden by the search.
    pub fn select_all(&mut self) -> Vec<NoteEvent> {
        self.state.selection = self.state.notes.iter().map(|note| note.id).collect();
        vec![NoteEvent::SelectionChanged(self.state.selection.len())]
    }

    pub fn clear_selection(&mut self) -> Vec<NoteEvent> {
        self.state.selection.clear();
        vec![NoteEvent::SelectionChanged(0)]
    }

    pub fn bulk_action(&mut self, status: NoteStatus) -> NoteResult<Vec<NoteEvent>> {
        if self.state.selection.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<NoteId> = self.state.selection.iter().copied().collect();

        if self.state.view == View::Deleted && status == NoteStatus::Deleted {
            let confirmation = Confirmation::PurgeSelected(ids);
            self.state.pending = Some(confirmation.clone());
            return Ok(vec![NoteEvent::ConfirmationRequested(confirmation)]);
        }

        logged(
            "update selected notes",
            self.store.update_many(&ids, &NoteUpdate::status(status)),
        )?;
        debug!(count = ids.len(), status = status.as_str(), "bulk status change");

        let count = ids.len();
        let mut events = vec![NoteEvent::StatusChanged { ids, status }];
        events.extend(self.reload()?);
        events.push(self.announce(&status_message(count, status)));
        Ok(events)
    }

    pub fn confirm(&mut self) -> NoteResult<Vec<NoteEvent>> {
        let Some(pending) = self.state.pending.clone() else {
            return Ok(Vec::new());
        };
        match &pending {
            Confirmation::DeleteNote(id) => {
                logged("delete note", self.store.remove(*id))?;
            }
            Confirmation::PurgeSelected(ids) => {
                logged("delete selected notes", self.store.remove_many(ids))?;
            }
        }
        let ids = pending.ids();
        debug!(count = ids.len(), "notes permanently deleted");
        // The rows are gone from the store; a failed refresh below must not
        // leave them visible or queued for a second delete.
        self.state.pending = None;
        self.state.notes.retain(|note| !ids.contains(&note.id));
        for id in &ids {
            self.state.selection.remove(id);
        }

        let count = ids.len();
        let mut events = vec![NoteEvent::NotesRemoved(ids)];
        events.extend(self.change_view(View::Deleted)?);
        events.push(self.announce(&format!(
            "{count} {} deleted forever",
            plural(count)
        )));
        Ok(events)
    }

    pub fn cancel(&mut self) -> Vec<NoteEvent> {
        match self.state.pending.take() {
            Some(_) => vec![NoteEvent::ConfirmationDeclined],
            None => Vec::new(),
        }
    }

    pub fn set_search(&mut self, search: String) -> Vec<NoteEvent> {
        self.state.search.clone_from(&search);
        vec![NoteEvent::SearchChanged(search)]
    }

    pub fn set_sort(&mut self, key: SortKey) -> NoteResult<Vec<NoteEvent>> {
        let previous = self.state.sort_key;
        self.state.sort_key = key;
        match self.load_notes(self.state.view.status()) {
            Ok(loaded) => {
                let mut events = vec![NoteEvent::SortChanged(key)];
                events.extend(loaded);
                Ok(events)
            }
            Err(error) => {
                self.state.sort_key = previous;
                Err(error)
            }
        }
    }

    pub fn show_status(&mut self, message: &str) -> Vec<NoteEvent> {
        vec![self.announce(message)]
    }

    pub fn clear_status(&mut self) -> Vec<NoteEvent> {
        self.state.status_line = None;
        vec![NoteEvent::StatusCleared]
    }

    fn fetch_sorted(&mut self, status: NoteStatus, key: SortKey) -> NoteResult<Vec<Note>> {
        let notes = logged("fetch notes", self.store.fetch_by_status(status))?;
        debug!(status = status.as_str(), count = notes.len(), "notes fetched");
        Ok(sorted(notes, key))
    }

    fn known_status(&self, id: NoteId) -> NoteResult<NoteStatus> {
        self.state
            .notes
            .iter()
            .find(|note| note.id == id)
            .or_else(|| {
                self.state
                    .active
                    .as_ref()
                    .map(|active| &active.note)
                    .filter(|note| note.id == id)
            })
            .map(|note| note.status)
            .ok_or_else(|| ValidationError::UnknownNote(id).into())
    }

    fn announce(&mut self, message: &str) -> NoteEvent {
        self.state.status_line = Some(message.to_owned());
        NoteEvent::StatusUpdated(message.to_owned())
    }
}

fn logged<T>(operation: &'static str, result: StoreResult<T>) -> NoteResult<T> {
    result.map_err(|error| {
        warn!(operation, %error, "store call failed");
        error.into()
    })
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "note" } else { "notes" }
}

fn status_message(count: usize, status: NoteStatus) -> String {
    let verb = match status {
        NoteStatus::Active => "restored",
        NoteStatus::Archived => "archived",
        NoteStatus::Deleted => "moved to trash",
    };
    format!("{count} {} {verb}", plural(count))
}

#[cfg(test)]
mod tests {
    use super::{Confirmation, status_message};
    use crate::{NoteId, NoteStatus};

    #[test]
    fn confirmation_prompts_count_notes() {
        let single = Confirmation::DeleteNote(NoteId::new(3));
        assert_eq!(single.ids(), vec![NoteId::new(3)]);
        assert!(single.prompt().contains("this note"));

        let many = Confirmation::PurgeSelected(vec![NoteId::new(1), NoteId::new(2)]);
        assert!(many.prompt().starts_with("Delete 2 selected notes forever?"));
    }

    #[test]
    fn status_messages_read_naturally() {
        assert_eq!(status_message(1, NoteStatus::Archived), "1 note archived");
        assert_eq!(status_message(3, NoteStatus::Deleted), "3 notes moved to trash");
        assert_eq!(status_message(2, NoteStatus::Active), "2 notes restored");
    }
}
