// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strike,
    Heading(u8),
    Paragraph,
    BulletList,
    TextColor(String),
}

impl FormatCommand {
    pub fn label(&self) -> String {
        match self {
            Self::Bold => "bold".to_owned(),
            Self::Italic => "italic".to_owned(),
            Self::Underline => "underline".to_owned(),
            Self::Strike => "strike".to_owned(),
            Self::Heading(level) => format!("heading {level}"),
            Self::Paragraph => "paragraph".to_owned(),
            Self::BulletList => "bullet list".to_owned(),
            Self::TextColor(color) => format!("text color {color}"),
        }
    }
}

/// Editing surface bound to a note's HTML content.
pub trait RichTextEditor {
    fn html(&self) -> String;
    fn set_html(&mut self, html: &str);
    fn apply(&mut self, command: &FormatCommand);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    BulletItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub marks: Marks,
    pub text: String,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            marks: Marks::default(),
            text: String::new(),
        }
    }
}

/// Block-oriented markup buffer. Text is typed into the last block and
/// formatting applies to that block as a whole. Marks are tracked per block,
/// so mixed inline formatting inside one block collapses when loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupEditor {
    blocks: Vec<Block>,
}

impl Default for MarkupEditor {
    fn default() -> Self {
        Self {
            blocks: vec![Block::new(BlockKind::Paragraph)],
        }
    }
}

impl MarkupEditor {
    pub fn from_html(html: &str) -> Self {
        let mut editor = Self::default();
        editor.set_html(html);
        editor
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn insert_char(&mut self, value: char) {
        if value == '\n' {
            self.newline();
            return;
        }
        self.current_mut().text.push(value);
    }

    pub fn insert_str(&mut self, value: &str) {
        for ch in value.chars() {
            self.insert_char(ch);
        }
    }

    /// Starts a new block. Inside a list this continues the list; on an
    /// empty list item it leaves the list instead.
    pub fn newline(&mut self) {
        let current = self.current_mut();
        let next_kind = match current.kind {
            BlockKind::BulletItem if current.text.is_empty() => {
                current.kind = BlockKind::Paragraph;
                return;
            }
            BlockKind::BulletItem => BlockKind::BulletItem,
            BlockKind::Paragraph | BlockKind::Heading(_) => BlockKind::Paragraph,
        };
        self.blocks.push(Block::new(next_kind));
    }

    pub fn backspace(&mut self) {
        let current = self.current_mut();
        if current.text.pop().is_some() {
            return;
        }
        if self.blocks.len() > 1 {
            self.blocks.pop();
        } else {
            self.blocks[0] = Block::new(BlockKind::Paragraph);
        }
    }

    fn current_mut(&mut self) -> &mut Block {
        if self.blocks.is_empty() {
            self.blocks.push(Block::new(BlockKind::Paragraph));
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}

impl RichTextEditor for MarkupEditor {
    fn html(&self) -> String {
        let mut output = String::new();
        let mut in_list = false;
        for block in &self.blocks {
            let is_item = block.kind == BlockKind::BulletItem;
            if is_item && !in_list {
                output.push_str("<ul>");
            } else if !is_item && in_list {
                output.push_str("</ul>");
            }
            in_list = is_item;

            let tag = match block.kind {
                BlockKind::Paragraph => "p".to_owned(),
                BlockKind::Heading(level) => format!("h{level}"),
                BlockKind::BulletItem => "li".to_owned(),
            };
            output.push_str(&format!("<{tag}>"));
            output.push_str(&render_inline(block));
            output.push_str(&format!("</{tag}>"));
        }
        if in_list {
            output.push_str("</ul>");
        }
        output
    }

    fn set_html(&mut self, html: &str) {
        self.blocks = parse_blocks(html);
        if self.blocks.is_empty() {
            self.blocks.push(Block::new(BlockKind::Paragraph));
        }
    }

    fn apply(&mut self, command: &FormatCommand) {
        let block = self.current_mut();
        match command {
            FormatCommand::Bold => block.marks.bold = !block.marks.bold,
            FormatCommand::Italic => block.marks.italic = !block.marks.italic,
            FormatCommand::Underline => block.marks.underline = !block.marks.underline,
            FormatCommand::Strike => block.marks.strike = !block.marks.strike,
            FormatCommand::Heading(level) => {
                let level = (*level).clamp(1, 3);
                block.kind = if block.kind == BlockKind::Heading(level) {
                    BlockKind::Paragraph
                } else {
                    BlockKind::Heading(level)
                };
            }
            FormatCommand::Paragraph => block.kind = BlockKind::Paragraph,
            FormatCommand::BulletList => {
                block.kind = if block.kind == BlockKind::BulletItem {
                    BlockKind::Paragraph
                } else {
                    BlockKind::BulletItem
                };
            }
            FormatCommand::TextColor(color) => {
                let color = color.trim();
                block.marks.color = (!color.is_empty()).then(|| color.to_owned());
            }
        }
    }
}

/// Text content of `html` with tags removed and entities decoded, for
/// one-line previews.
pub fn plain_text(html: &str) -> String {
    let mut text = String::new();
    for token in tokenize(html) {
        match token {
            Token::Text(value) => text.push_str(&value),
            Token::Tag(tag) if is_block_tag(&tag.name) || tag.name == "br" => text.push(' '),
            Token::Tag(_) => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_inline(block: &Block) -> String {
    let mut inner = escape_html(&block.text);
    let marks = &block.marks;
    if marks.strike {
        inner = format!("<s>{inner}</s>");
    }
    if marks.underline {
        inner = format!("<u>{inner}</u>");
    }
    if marks.italic {
        inner = format!("<em>{inner}</em>");
    }
    if marks.bold {
        inner = format!("<strong>{inner}</strong>");
    }
    if let Some(color) = &marks.color {
        inner = format!(
            "<span style=\"color: {}\">{inner}</span>",
            escape_html(color)
        );
    }
    inner
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    closing: bool,
    attrs: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Tag(Tag),
}

fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = html;
    while !rest.is_empty() {
        if let Some(after_open) = rest.strip_prefix('<')
            && let Some(end) = after_open.find('>')
        {
            let raw = after_open[..end].trim();
            rest = &after_open[end + 1..];
            let (closing, body) = match raw.strip_prefix('/') {
                Some(body) => (true, body),
                None => (false, raw.trim_end_matches('/')),
            };
            let name_end = body
                .find(|ch: char| ch.is_whitespace())
                .unwrap_or(body.len());
            tokens.push(Token::Tag(Tag {
                name: body[..name_end].to_ascii_lowercase(),
                closing,
                attrs: body[name_end..].trim().to_owned(),
            }));
            continue;
        }

        // A stray '<' with no closing '>' is text; step over the whole first
        // char so the slice stays on a char boundary.
        let skip = rest.chars().next().map_or(1, char::len_utf8);
        let next_tag = rest[skip..]
            .find('<')
            .map_or(rest.len(), |index| index + skip);
        tokens.push(Token::Text(decode_entities(&rest[..next_tag])));
        rest = &rest[next_tag..];
    }
    tokens
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "ul" | "ol" | "div" | "blockquote"
    )
}

fn parse_blocks(html: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut open = false;
    let mut in_item = false;

    for token in tokenize(html) {
        match token {
            Token::Text(text) => {
                if !open {
                    if text.trim().is_empty() {
                        continue;
                    }
                    blocks.push(Block::new(BlockKind::Paragraph));
                    open = true;
                }
                if let Some(block) = blocks.last_mut() {
                    block.text.push_str(&text);
                }
            }
            Token::Tag(tag) => {
                let kind = match tag.name.as_str() {
                    "h1" => Some(BlockKind::Heading(1)),
                    "h2" => Some(BlockKind::Heading(2)),
                    "h3" | "h4" | "h5" | "h6" => Some(BlockKind::Heading(3)),
                    "li" => Some(BlockKind::BulletItem),
                    "p" | "div" | "blockquote" if in_item => None,
                    "p" | "div" | "blockquote" => Some(BlockKind::Paragraph),
                    _ => None,
                };

                if let Some(kind) = kind {
                    if tag.closing {
                        open = false;
                        if kind == BlockKind::BulletItem {
                            in_item = false;
                        }
                    } else {
                        blocks.push(Block::new(kind));
                        open = true;
                        in_item = kind == BlockKind::BulletItem;
                    }
                    continue;
                }

                if tag.closing || !open {
                    continue;
                }
                let Some(block) = blocks.last_mut() else {
                    continue;
                };
                match tag.name.as_str() {
                    "strong" | "b" => block.marks.bold = true,
                    "em" | "i" => block.marks.italic = true,
                    "u" => block.marks.underline = true,
                    "s" | "strike" | "del" => block.marks.strike = true,
                    "span" | "mark" => {
                        if let Some(color) = style_color(&tag.attrs) {
                            block.marks.color = Some(color);
                        }
                    }
                    "br" => block.text.push(' '),
                    _ => {}
                }
            }
        }
    }

    for block in &mut blocks {
        let trimmed = block.text.trim();
        if trimmed.len() != block.text.len() {
            block.text = trimmed.to_owned();
        }
    }
    blocks
}

fn style_color(attrs: &str) -> Option<String> {
    let style_start = attrs.find("style=")? + "style=".len();
    let style = attrs[style_start..].trim_start_matches(['"', '\'']);
    let style = style.split(['"', '\'']).next().unwrap_or_default();
    style.split(';').find_map(|declaration| {
        let (property, value) = declaration.split_once(':')?;
        (property.trim().eq_ignore_ascii_case("color")).then(|| value.trim().to_owned())
    })
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_owned();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
