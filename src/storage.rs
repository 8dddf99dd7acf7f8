use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::ChatError;
use crate::session::Conversation;

/// Persistence seam for the session store. Implementations hold the entire
/// conversation list as one durable entry.
pub trait StorageBackend {
    /// Load all stored conversations. A backend with nothing stored yet
    /// returns an empty list; unreadable data is an error.
    fn load(&self) -> Result<Vec<Conversation>>;

    /// Replace the stored conversations with `conversations`.
    fn save(&self, conversations: &[Conversation]) -> Result<()>;
}

/// File-backed storage: a single JSON file holding the serialized
/// conversation array. Writes go through a temp file and rename so a crash
/// mid-write never corrupts the previous state.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> Result<Vec<Conversation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).context("Failed to read conversation store")?;
        let conversations =
            serde_json::from_str(&content).map_err(ChatError::StorageCorruption)?;
        Ok(conversations)
    }

    fn save(&self, conversations: &[Conversation]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let content = serde_json::to_string_pretty(conversations)
            .context("Failed to serialize conversations")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &content).context("Failed to write conversation store")?;
        fs::rename(&tmp_path, &self.path).context("Failed to replace conversation store")?;
        Ok(())
    }
}

/// In-memory storage for tests. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    conversations: Arc<Mutex<Vec<Conversation>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<Conversation>> {
        Ok(self.conversations.lock().unwrap().clone())
    }

    fn save(&self, conversations: &[Conversation]) -> Result<()> {
        *self.conversations.lock().unwrap() = conversations.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;

    fn sample_conversations() -> Vec<Conversation> {
        let mut a = Conversation::new();
        a.title = "greetings".to_string();
        a.messages = vec![Message::user("Hello"), Message::assistant("Hi there")];
        let mut b = Conversation::new();
        b.messages = vec![Message::user("Another thread")];
        vec![a, b]
    }

    #[test]
    fn file_backend_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(tmp.path().join("conversations.json"));

        let original = sample_conversations();
        backend.save(&original).unwrap();
        let loaded = backend.load().unwrap();

        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded[0].id, original[0].id);
        assert_eq!(loaded[0].title, "greetings");
        assert_eq!(loaded[0].messages[1].content, "Hi there");
        assert_eq!(loaded[0].created_at, original[0].created_at);
        assert_eq!(
            loaded[0].messages[0].timestamp,
            original[0].messages[0].timestamp
        );
    }

    #[test]
    fn file_backend_missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(tmp.path().join("nothing_here.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn file_backend_save_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conversations.json");
        let backend = FileBackend::new(path.clone());

        backend.save(&sample_conversations()).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_backend_reports_corruption() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conversations.json");
        fs::write(&path, "{ not json at all").unwrap();

        let backend = FileBackend::new(path);
        let err = backend.load().unwrap_err();
        assert!(err.downcast_ref::<ChatError>().is_some());
    }

    #[test]
    fn memory_backend_clones_share_state() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        backend.save(&sample_conversations()).unwrap();
        assert_eq!(other.load().unwrap().len(), 2);
    }
}
