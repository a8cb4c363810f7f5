// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use crate::model::{Note, SortKey};

/// Orders `notes` in place. The sort is stable, so notes that compare equal
/// keep the order the store returned them in.
pub fn sort_notes(notes: &mut [Note], key: SortKey) {
    match key {
        SortKey::Newest => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::Az => notes.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::Za => notes.sort_by(|a, b| compare_titles(&b.title, &a.title)),
    }
}

pub fn sorted(mut notes: Vec<Note>, key: SortKey) -> Vec<Note> {
    sort_notes(&mut notes, key);
    notes
}

/// Notes whose title contains `search`, ignoring case. Relative order is kept.
pub fn filter_notes<'a>(notes: &'a [Note], search: &str) -> Vec<&'a Note> {
    let needle = search.to_lowercase();
    if needle.is_empty() {
        return notes.iter().collect();
    }
    notes
        .iter()
        .filter(|note| note.title.to_lowercase().contains(&needle))
        .collect()
}

/// Dictionary-style title comparison. Base letters decide first, so accents
/// and case never split words apart ("éclair" sorts among the e's). Ties fall
/// back to unaccented before accented, then lowercase before uppercase, then
/// raw text.
pub fn compare_titles(left: &str, right: &str) -> Ordering {
    let lowered = |text: &str| text.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    let (left_lower, right_lower) = (lowered(left), lowered(right));

    left_lower
        .iter()
        .map(|&ch| base_letter(ch))
        .cmp(right_lower.iter().map(|&ch| base_letter(ch)))
        .then_with(|| left_lower.cmp(&right_lower))
        .then_with(|| {
            left.chars()
                .map(char::is_uppercase)
                .cmp(right.chars().map(char::is_uppercase))
        })
        .then_with(|| left.cmp(right))
}

/// Strips the accent from a lowercase Latin letter.
fn base_letter(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ģ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'į' | 'ı' => 'i',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
