// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;
use crate::ids::NoteId;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_CONTENT: &str = "<h1>Untitled</h1>";
pub const DEFAULT_BG_COLOR: &str = "#ffffff";

/// Background colours offered by the colour picker, in cycle order.
pub const COLOR_PALETTE: [&str; 10] = [
    "#ffffff", "#fef3c7", "#fde68a", "#fecaca", "#fbcfe8", "#ddd6fe", "#bfdbfe", "#bbf7d0",
    "#e5e7eb", "#000000",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteStatus {
    Active,
    Archived,
    Deleted,
}

impl NoteStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Archived, Self::Deleted];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Whether a note currently in `self` may move to `change`.
    ///
    /// Every move between the three live statuses is allowed, including
    /// re-applying the current one. Permanent removal is only reachable
    /// from the trash.
    pub const fn allows(self, change: StatusChange) -> bool {
        match change {
            StatusChange::To(_) => true,
            StatusChange::Permanent => matches!(self, Self::Deleted),
        }
    }
}

/// Target of a single-note transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusChange {
    To(NoteStatus),
    Permanent,
}

impl StatusChange {
    pub const fn label(self) -> &'static str {
        match self {
            Self::To(status) => status.as_str(),
            Self::Permanent => "permanent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    All,
    Archived,
    Deleted,
}

impl View {
    pub const ALL: [Self; 3] = [Self::All, Self::Archived, Self::Deleted];

    pub const fn status(self) -> NoteStatus {
        match self {
            Self::All => NoteStatus::Active,
            Self::Archived => NoteStatus::Archived,
            Self::Deleted => NoteStatus::Deleted,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All Notes",
            Self::Archived => "Archived Notes",
            Self::Deleted => "Deleted Notes",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "archived" => Some(Self::Archived),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn rotate(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|view| *view == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    Newest,
    Oldest,
    Az,
    Za,
}

impl SortKey {
    pub const ALL: [Self; 4] = [Self::Newest, Self::Oldest, Self::Az, Self::Za];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Az => "az",
            Self::Za => "za",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "newest" => Some(Self::Newest),
            "oldest" => Some(Self::Oldest),
            "az" => Some(Self::Az),
            "za" => Some(Self::Za),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Oldest => "Oldest",
            Self::Az => "A-Z",
            Self::Za => "Z-A",
        }
    }

    pub fn next(self) -> Self {
        let current = Self::ALL.iter().position(|key| *key == self).unwrap_or(0);
        Self::ALL[(current + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub bg_color: String,
    pub status: NoteStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub bg_color: String,
    pub status: NoteStatus,
}

impl Default for NewNote {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            content: DEFAULT_CONTENT.to_owned(),
            bg_color: DEFAULT_BG_COLOR.to_owned(),
            status: NoteStatus::Active,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub bg_color: Option<String>,
    pub status: Option<NoteStatus>,
}

impl NoteUpdate {
    pub fn status(status: NoteStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.bg_color.is_none()
            && self.status.is_none()
    }

    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            note.content.clone_from(content);
        }
        if let Some(bg_color) = &self.bg_color {
            note.bg_color.clone_from(bg_color);
        }
        if let Some(status) = self.status {
            note.status = status;
        }
    }
}

/// Unsaved edits to the note open in the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub bg_color: String,
}

impl NoteDraft {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            bg_color: note.bg_color.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if parse_hex_color(&self.bg_color).is_none() {
            return Err(ValidationError::InvalidColor(self.bg_color.clone()));
        }
        Ok(())
    }

    pub fn to_update(&self) -> NoteUpdate {
        NoteUpdate {
            title: Some(self.title.trim().to_owned()),
            content: Some(self.content.clone()),
            bg_color: Some(self.bg_color.to_ascii_lowercase()),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftField {
    Title,
    Content,
    BgColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftEdit {
    Title(String),
    Content(String),
    BgColor(String),
}

impl DraftEdit {
    pub const fn field(&self) -> DraftField {
        match self {
            Self::Title(_) => DraftField::Title,
            Self::Content(_) => DraftField::Content,
            Self::BgColor(_) => DraftField::BgColor,
        }
    }
}

/// Parses `#rrggbb` (case-insensitive) into its channels.
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// True when light text reads better than dark text on `value`.
pub fn is_dark_color(value: &str) -> bool {
    let Some((red, green, blue)) = parse_hex_color(value) else {
        return false;
    };
    let luminance =
        0.2126 * f64::from(red) + 0.7152 * f64::from(green) + 0.0722 * f64::from(blue);
    luminance < 128.0
}

pub fn next_palette_color(current: &str, delta: isize) -> &'static str {
    let len = COLOR_PALETTE.len() as isize;
    match COLOR_PALETTE
        .iter()
        .position(|color| color.eq_ignore_ascii_case(current))
    {
        Some(index) => COLOR_PALETTE[(index as isize + delta).rem_euclid(len) as usize],
        None => COLOR_PALETTE[0],
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NoteDraft, NoteStatus, SortKey, StatusChange, View, is_dark_color, next_palette_color,
        parse_hex_color,
    };
    use crate::ValidationError;

    #[test]
    fn views_map_to_fetch_status() {
        assert_eq!(View::All.status(), NoteStatus::Active);
        assert_eq!(View::Archived.status(), NoteStatus::Archived);
        assert_eq!(View::Deleted.status(), NoteStatus::Deleted);
    }

    #[test]
    fn view_rotation_wraps() {
        assert_eq!(View::Deleted.rotate(1), View::All);
        assert_eq!(View::All.rotate(-1), View::Deleted);
    }

    #[test]
    fn status_strings_parse_back() {
        for status in NoteStatus::ALL {
            assert_eq!(NoteStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(NoteStatus::parse("permanent"), None);
    }

    #[test]
    fn permanent_removal_only_from_trash() {
        assert!(NoteStatus::Deleted.allows(StatusChange::Permanent));
        assert!(!NoteStatus::Active.allows(StatusChange::Permanent));
        assert!(!NoteStatus::Archived.allows(StatusChange::Permanent));
        assert!(NoteStatus::Archived.allows(StatusChange::To(NoteStatus::Archived)));
        assert!(NoteStatus::Deleted.allows(StatusChange::To(NoteStatus::Active)));
    }

    #[test]
    fn sort_key_cycles_through_all_keys() {
        let mut key = SortKey::Newest;
        for _ in 0..SortKey::ALL.len() {
            key = key.next();
        }
        assert_eq!(key, SortKey::Newest);
        assert_eq!(SortKey::parse("za"), Some(SortKey::Za));
    }

    #[test]
    fn hex_colors_parse_and_reject_garbage() {
        assert_eq!(parse_hex_color("#FFaa00"), Some((255, 170, 0)));
        assert_eq!(parse_hex_color("ffaa00"), None);
        assert_eq!(parse_hex_color("#ffaa0"), None);
        assert_eq!(parse_hex_color("#ggaa00"), None);
    }

    #[test]
    fn black_is_dark_and_white_is_not() {
        assert!(is_dark_color("#000000"));
        assert!(!is_dark_color("#ffffff"));
        assert!(!is_dark_color("not a color"));
    }

    #[test]
    fn palette_cycles_and_recovers_from_custom_values() {
        assert_eq!(next_palette_color("#ffffff", 1), "#fef3c7");
        assert_eq!(next_palette_color("#FFFFFF", -1), "#000000");
        assert_eq!(next_palette_color("#123456", 1), "#ffffff");
    }

    #[test]
    fn draft_validation_rejects_blank_title_and_bad_color() {
        let mut draft = NoteDraft {
            title: "   ".to_owned(),
            content: String::new(),
            bg_color: "#ffffff".to_owned(),
        };
        assert_eq!(draft.validate(), Err(ValidationError::EmptyTitle));

        draft.title = "Groceries".to_owned();
        draft.bg_color = "white".to_owned();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::InvalidColor("white".to_owned()))
        );

        draft.bg_color = "#FFFFFF".to_owned();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.to_update().bg_color.as_deref(), Some("#ffffff"));
    }
}
