// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use markus_app::{
    COLOR_PALETTE, NewNote, Note, NoteId, NoteStatus, NoteStore, NoteUpdate, StoreError,
    StoreResult,
};
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};

const TITLE_SUBJECTS: [&str; 16] = [
    "Groceries",
    "Meeting",
    "Reading list",
    "Trip",
    "Recipe",
    "Budget",
    "Garden",
    "Workout",
    "Gift ideas",
    "Project",
    "Books",
    "Errands",
    "Journal",
    "Packing",
    "Birthday",
    "Weekend",
];

const TITLE_QUALIFIERS: [&str; 10] = [
    "plan",
    "notes",
    "ideas",
    "checklist",
    "draft",
    "follow-up",
    "summary",
    "todo",
    "review",
    "recap",
];

const WORDS: [&str; 24] = [
    "call", "buy", "bring", "check", "schedule", "review", "milk", "bread", "tickets", "slides",
    "agenda", "budget", "chapter", "seeds", "tomatoes", "passport", "charger", "invoice",
    "dentist", "laundry", "coffee", "notes", "weekend", "friday",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for realistic-looking notes. The same seed always yields
/// the same sequence.
#[derive(Debug, Clone)]
pub struct NoteFaker {
    rng: DeterministicRng,
}

impl NoteFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn title(&mut self) -> String {
        format!(
            "{} {}",
            self.pick(&TITLE_SUBJECTS),
            self.pick(&TITLE_QUALIFIERS)
        )
    }

    pub fn content(&mut self, title: &str) -> String {
        let mut html = format!("<h1>{title}</h1>");
        if self.rng.bool() {
            html.push_str("<ul>");
            for _ in 0..=self.rng.int_n(3) {
                html.push_str(&format!("<li>{}</li>", self.sentence(2, 4)));
            }
            html.push_str("</ul>");
        } else {
            html.push_str(&format!("<p>{}</p>", self.sentence(4, 9)));
        }
        html
    }

    pub fn color(&mut self) -> &'static str {
        COLOR_PALETTE[self.rng.int_n(COLOR_PALETTE.len())]
    }

    pub fn status(&mut self) -> NoteStatus {
        match self.rng.int_n(6) {
            0 => NoteStatus::Archived,
            1 => NoteStatus::Deleted,
            _ => NoteStatus::Active,
        }
    }

    pub fn new_note(&mut self) -> NewNote {
        let title = self.title();
        NewNote {
            content: self.content(&title),
            title,
            bg_color: self.color().to_owned(),
            status: self.status(),
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let span = max_words.saturating_sub(min_words) + 1;
        let count = min_words + self.rng.int_n(span);
        let mut sentence = (0..count)
            .map(|_| self.pick(&WORDS))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Fetch,
    Insert,
    Update,
    UpdateMany,
    Remove,
    RemoveMany,
}

impl StoreOp {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fetch => "fetch notes",
            Self::Insert => "insert note",
            Self::Update => "update note",
            Self::UpdateMany => "update notes",
            Self::Remove => "remove note",
            Self::RemoveMany => "remove notes",
        }
    }
}

/// A store round-trip as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Fetch(NoteStatus),
    Insert(NewNote),
    Update(NoteId, NoteUpdate),
    UpdateMany(Vec<NoteId>, NoteUpdate),
    Remove(NoteId),
    RemoveMany(Vec<NoteId>),
}

impl StoreCall {
    pub const fn op(&self) -> StoreOp {
        match self {
            Self::Fetch(_) => StoreOp::Fetch,
            Self::Insert(_) => StoreOp::Insert,
            Self::Update(..) => StoreOp::Update,
            Self::UpdateMany(..) => StoreOp::UpdateMany,
            Self::Remove(_) => StoreOp::Remove,
            Self::RemoveMany(_) => StoreOp::RemoveMany,
        }
    }
}

/// In-memory [`NoteStore`] that records every call and can be told to fail
/// the next call of a given kind. Fetches return notes in insertion order.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    notes: Vec<Note>,
    next_id: i64,
    clock: OffsetDateTime,
    calls: Vec<StoreCall>,
    failures: Vec<StoreOp>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            notes: Vec::new(),
            next_id: 1,
            clock: fixture_datetime(),
            calls: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// A store holding `count` faked notes spread across all statuses.
    pub fn seeded(seed: u64, count: usize) -> Self {
        let mut store = Self::new();
        let mut faker = NoteFaker::new(seed);
        for _ in 0..count {
            let note = faker.new_note();
            store.add(&note);
        }
        store
    }

    /// Inserts without recording a call.
    pub fn add(&mut self, note: &NewNote) -> Note {
        let created = self.tick();
        let stored = Note {
            id: NoteId::new(self.next_id),
            title: note.title.clone(),
            content: note.content.clone(),
            bg_color: note.bg_color.clone(),
            status: note.status,
            created_at: created,
            updated_at: created,
        };
        self.next_id += 1;
        self.notes.push(stored.clone());
        stored
    }

    pub fn add_titled(&mut self, title: &str, status: NoteStatus) -> Note {
        self.add(&NewNote {
            title: title.to_owned(),
            content: format!("<h1>{title}</h1>"),
            status,
            ..NewNote::default()
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    pub fn calls_of(&self, op: StoreOp) -> Vec<&StoreCall> {
        self.calls.iter().filter(|call| call.op() == op).collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// The next call of kind `op` fails with a backend error.
    pub fn fail_next(&mut self, op: StoreOp) {
        self.failures.push(op);
    }

    fn record(&mut self, call: StoreCall) -> StoreResult<()> {
        let op = call.op();
        self.calls.push(call);
        if let Some(index) = self.failures.iter().position(|failure| *failure == op) {
            self.failures.remove(index);
            return Err(StoreError::backend(op.label(), "injected failure"));
        }
        Ok(())
    }

    fn tick(&mut self) -> OffsetDateTime {
        let now = self.clock;
        self.clock += Duration::minutes(1);
        now
    }

    fn position(&self, id: NoteId) -> StoreResult<usize> {
        self.notes
            .iter()
            .position(|note| note.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl NoteStore for MemoryStore {
    fn fetch_by_status(&mut self, status: NoteStatus) -> StoreResult<Vec<Note>> {
        self.record(StoreCall::Fetch(status))?;
        Ok(self
            .notes
            .iter()
            .filter(|note| note.status == status)
            .cloned()
            .collect())
    }

    fn insert(&mut self, note: &NewNote) -> StoreResult<Note> {
        self.record(StoreCall::Insert(note.clone()))?;
        Ok(self.add(note))
    }

    fn update(&mut self, id: NoteId, update: &NoteUpdate) -> StoreResult<()> {
        self.record(StoreCall::Update(id, update.clone()))?;
        let index = self.position(id)?;
        let now = self.tick();
        let note = &mut self.notes[index];
        update.apply_to(note);
        note.updated_at = now;
        Ok(())
    }

    fn update_many(&mut self, ids: &[NoteId], update: &NoteUpdate) -> StoreResult<()> {
        self.record(StoreCall::UpdateMany(ids.to_vec(), update.clone()))?;
        let indexes = ids
            .iter()
            .map(|id| self.position(*id))
            .collect::<StoreResult<Vec<_>>>()?;
        let now = self.tick();
        for index in indexes {
            let note = &mut self.notes[index];
            update.apply_to(note);
            note.updated_at = now;
        }
        Ok(())
    }

    fn remove(&mut self, id: NoteId) -> StoreResult<()> {
        self.record(StoreCall::Remove(id))?;
        let index = self.position(id)?;
        self.notes.remove(index);
        Ok(())
    }

    fn remove_many(&mut self, ids: &[NoteId]) -> StoreResult<()> {
        self.record(StoreCall::RemoveMany(ids.to_vec()))?;
        for id in ids {
            self.position(*id)?;
        }
        self.notes.retain(|note| !ids.contains(&note.id));
        Ok(())
    }
}

/// A note with fixed timestamps `minutes` after the fixture epoch.
pub fn sample_note(id: i64, title: &str, status: NoteStatus, minutes: i64) -> Note {
    let created_at = fixture_datetime() + Duration::minutes(minutes);
    Note {
        id: NoteId::new(id),
        title: title.to_owned(),
        content: format!("<h1>{title}</h1>"),
        bg_color: "#ffffff".to_owned(),
        status,
        created_at,
        updated_at: created_at,
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("markus.db");
    Ok((dir, db_path))
}

/// 2026-02-19T12:34:56Z
pub fn fixture_datetime() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::seconds(1_771_504_496)
}
