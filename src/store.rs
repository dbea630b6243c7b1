//! Sled-backed note store.
//!
//! Notes live in a single sled tree (`notes`), keyed by id, values are the
//! JSON-serialized `Note`. The graph engine only ever sees snapshots taken
//! through `all()`, whose ordering is the canonical iteration order used for
//! title resolution.

use crate::models::{NewNote, Note, NoteUpdate};
use crate::references::suggest_links;
use chrono::Utc;
use rand::Rng;
use std::fs;
use std::path::Path;

const NOTES_TREE: &str = "notes";
const ID_LEN: usize = 16;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum StoreError {
    /// Underlying sled failure
    Db(sled::Error),
    /// Stored or imported JSON could not be (de)serialized
    Serde(serde_json::Error),
    /// Reading an import file failed
    Io(std::io::Error),
    NotFound(String),
    /// Rejected input, e.g. an empty title
    Invalid(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Db(e) => write!(f, "Database error: {}", e),
            StoreError::Serde(e) => write!(f, "Serialization error: {}", e),
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::NotFound(id) => write!(f, "Note not found: {}", id),
            StoreError::Invalid(msg) => write!(f, "Invalid note: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Db(e) => Some(e),
            StoreError::Serde(e) => Some(e),
            StoreError::Io(e) => Some(e),
            StoreError::NotFound(_) | StoreError::Invalid(_) => None,
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Db(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Store
// ============================================================================

#[derive(Clone)]
pub struct NoteStore {
    db: sled::Db,
    notes: sled::Tree,
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

fn validate_title(title: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::Invalid("title must not be empty".to_string()));
    }
    Ok(())
}

impl NoteStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store, removed when dropped.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let notes = db.open_tree(NOTES_TREE)?;
        Ok(Self { db, notes })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    fn put(&self, note: &Note) -> StoreResult<()> {
        let bytes = serde_json::to_vec(note)?;
        self.notes.insert(note.id.as_bytes(), bytes)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Every note, oldest first (ties by id).
    pub fn all(&self) -> StoreResult<Vec<Note>> {
        let mut notes = Vec::with_capacity(self.notes.len());
        for entry in self.notes.iter() {
            let (_, value) = entry?;
            notes.push(serde_json::from_slice::<Note>(&value)?);
        }
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Note>> {
        match self.notes.get(id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive match on title, content or any tag.
    pub fn search(&self, query: &str) -> StoreResult<Vec<Note>> {
        use rayon::prelude::*;

        let query_lower = query.to_lowercase();
        let notes = self.all()?;
        Ok(notes
            .into_par_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query_lower)
                    || note.content.to_lowercase().contains(&query_lower)
                    || note.tags.iter().any(|t| t.to_lowercase().contains(&query_lower))
            })
            .collect())
    }

    pub fn by_tag(&self, tag: &str) -> StoreResult<Vec<Note>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|note| note.tags.iter().any(|t| t == tag))
            .collect())
    }

    /// Most recently updated first.
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<Note>> {
        let mut notes = self.all()?;
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes.truncate(limit);
        Ok(notes)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    pub fn create(&self, new: NewNote) -> StoreResult<Note> {
        validate_title(&new.title)?;
        let now = Utc::now();
        let mut id = generate_id();
        while self.notes.contains_key(id.as_bytes())? {
            id = generate_id();
        }
        let note = Note {
            id,
            title: new.title,
            content: new.content,
            tags: new.tags,
            linked_note_ids: new.linked_note_ids,
            created_at: now,
            updated_at: now,
        };
        self.put(&note)?;
        log::info!("created note {} ({})", note.id, note.title);
        Ok(note)
    }

    pub fn update(&self, id: &str, update: NoteUpdate) -> StoreResult<Note> {
        let mut note = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(title) = update.title {
            validate_title(&title)?;
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(tags) = update.tags {
            note.tags = tags;
        }
        if let Some(linked) = update.linked_note_ids {
            note.linked_note_ids = linked;
        }
        note.updated_at = Utc::now();

        self.put(&note)?;
        log::info!("updated note {}", note.id);
        Ok(note)
    }

    /// Like `update`, but when the content changes, notes it references by
    /// `[[Title]]` are appended to the explicit link list.
    pub fn update_with_backlinks(&self, id: &str, mut update: NoteUpdate) -> StoreResult<Note> {
        let existing = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(content) = update.content.as_deref() {
            let notes = self.all()?;
            let base = update
                .linked_note_ids
                .as_deref()
                .unwrap_or(&existing.linked_note_ids);
            update.linked_note_ids = Some(suggest_links(content, base, &notes, id));
        }

        self.update(id, update)
    }

    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let removed = self.notes.remove(id.as_bytes())?.is_some();
        if removed {
            log::info!("deleted note {}", id);
        }
        Ok(removed)
    }

    /// Load notes from a JSON array file. Ids already present are skipped.
    /// The file is checked as a whole first, so a bad note imports nothing.
    pub fn import_json(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let raw = fs::read_to_string(path.as_ref())?;
        let notes: Vec<Note> = serde_json::from_str(&raw)?;
        for note in &notes {
            validate_title(&note.title)
                .map_err(|_| StoreError::Invalid(format!("note {} has an empty title", note.id)))?;
        }

        let mut imported = 0;
        for note in notes {
            if self.notes.contains_key(note.id.as_bytes())? {
                log::debug!("import skipping existing note {}", note.id);
                continue;
            }
            self.put(&note)?;
            imported += 1;
        }
        log::info!("imported {} notes from {}", imported, path.as_ref().display());
        Ok(imported)
    }
}

// ============================================================================
// Tests
// ============================================================================
