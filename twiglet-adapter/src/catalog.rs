//! Portable-object (`.po`) translation catalog.
//!
//! ```text
//! # translator comment
//! msgctxt "checkout"
//! msgid "one item"
//! msgid_plural "%count% items"
//! msgstr[0] "ein Artikel"
//! msgstr[1] "%count% Artikel"
//! ```
//!
//! Entries are grouped by text domain (the `msgctxt`, `""` when absent).

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::CatalogError;

/// One catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationRecord {
    pub msgid: String,
    pub msgid_plural: Option<String>,
    /// Plural forms in `msgstr[n]` order; a singular entry has one.
    pub msgstr: Vec<String>,
}

impl TranslationRecord {
    fn form(&self, index: usize) -> Option<&str> {
        self.msgstr
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    domains: HashMap<String, IndexMap<String, TranslationRecord>>,
}

impl Catalog {
    pub fn load_at(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(source: &str) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        let mut entry = PendingEntry::default();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() {
                entry.finish(&mut catalog);
                continue;
            }
            if text.starts_with('#') {
                // Comments introduce the next entry; obsolete `#~` ones are dropped.
                if entry.has_translation() {
                    entry.finish(&mut catalog);
                }
                continue;
            }
            if text.starts_with('"') {
                let value = unquote(text, line)?;
                entry.append(value, line)?;
                continue;
            }
            let (keyword, rest) = text
                .split_once(char::is_whitespace)
                .ok_or_else(|| parse_error(line, format!("expected a keyword and a string, got `{text}`")))?;
            let value = unquote(rest.trim(), line)?;
            match keyword {
                "msgctxt" | "msgid" if entry.has_translation() => {
                    entry.finish(&mut catalog);
                    entry.start(keyword, value, line)?;
                }
                _ => entry.start(keyword, value, line)?,
            }
        }
        entry.finish(&mut catalog);
        Ok(catalog)
    }

    pub fn insert(&mut self, domain: &str, record: TranslationRecord) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .insert(record.msgid.clone(), record);
    }

    pub fn get(&self, domain: &str, msgid: &str) -> Option<&TranslationRecord> {
        self.domains.get(domain)?.get(msgid)
    }

    /// First form of the entry whose `msgid` is `msgid`.
    pub fn singular(&self, domain: &str, msgid: &str) -> Option<&str> {
        self.get(domain, msgid)?.form(0)
    }

    /// Second form of the entry whose `msgid_plural` is `source`, or else
    /// the first form of an entry whose `msgid` is `source`.
    pub fn plural(&self, domain: &str, source: &str) -> Option<&str> {
        let records = self.domains.get(domain)?;
        records
            .values()
            .find(|r| r.msgid_plural.as_deref() == Some(source))
            .and_then(|r| r.form(1))
            .or_else(|| records.get(source).and_then(|r| r.form(0)))
    }

    pub fn len(&self) -> usize {
        self.domains.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Parser state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    IdPlural,
    Str(usize),
}

#[derive(Debug, Default)]
struct PendingEntry {
    context: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstr: Vec<String>,
    current: Option<Field>,
}

impl PendingEntry {
    fn has_translation(&self) -> bool {
        matches!(self.current, Some(Field::Str(_)))
    }

    fn start(&mut self, keyword: &str, value: String, line: usize) -> Result<(), CatalogError> {
        let field = match keyword {
            "msgctxt" => Field::Context,
            "msgid" => Field::Id,
            "msgid_plural" => Field::IdPlural,
            "msgstr" => Field::Str(0),
            other => {
                let index = other
                    .strip_prefix("msgstr[")
                    .and_then(|s| s.strip_suffix(']'))
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| parse_error(line, format!("unknown keyword `{other}`")))?;
                Field::Str(index)
            }
        };
        if matches!(field, Field::Str(_)) && self.msgid.is_none() {
            return Err(parse_error(line, "msgstr without msgid"));
        }
        self.current = Some(field);
        self.append(value, line)
    }

    fn append(&mut self, value: String, line: usize) -> Result<(), CatalogError> {
        let slot = match self.current {
            Some(Field::Context) => self.context.get_or_insert_with(String::new),
            Some(Field::Id) => self.msgid.get_or_insert_with(String::new),
            Some(Field::IdPlural) => self.msgid_plural.get_or_insert_with(String::new),
            Some(Field::Str(index)) => {
                if self.msgstr.len() <= index {
                    self.msgstr.resize(index + 1, String::new());
                }
                &mut self.msgstr[index]
            }
            None => return Err(parse_error(line, "string continuation outside an entry")),
        };
        slot.push_str(&value);
        Ok(())
    }

    fn finish(&mut self, catalog: &mut Catalog) {
        let entry = std::mem::take(self);
        let Some(msgid) = entry.msgid else {
            return;
        };
        let domain = entry.context.unwrap_or_default();
        // The header entry describes the file, not a translation.
        if msgid.is_empty() && domain.is_empty() {
            return;
        }
        catalog.insert(
            &domain,
            TranslationRecord {
                msgid,
                msgid_plural: entry.msgid_plural,
                msgstr: entry.msgstr,
            },
        );
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> CatalogError {
    CatalogError::Parse {
        line,
        message: message.into(),
    }
}

fn unquote(text: &str, line: usize) -> Result<String, CatalogError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| parse_error(line, format!("expected a quoted string, got `{text}`")))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(parse_error(line, format!("unknown escape `\\{other}`"))),
            None => return Err(parse_error(line, "dangling backslash")),
        }
    }
    Ok(out)
}
