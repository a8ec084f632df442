use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One revision of the document under refinement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// 1 is the original document supplied to the session; spec §3
    /// requires version numbers to run gap-free from 1.
    pub version: u32,
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Version number the moderator read to produce this one. `None`
    /// for v1, which nothing moderated into existence.
    pub producing_moderator_version: Option<u32>,
    pub length_chars: usize,
}

impl DocumentVersion {
    pub fn initial(content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let content = content.into();
        let length_chars = content.chars().count();
        Self {
            version: 1,
            title: None,
            document_type: None,
            content,
            created_at,
            producing_moderator_version: None,
            length_chars,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn next(&self, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let content = content.into();
        let length_chars = content.chars().count();
        Self {
            version: self.version + 1,
            title: self.title.clone(),
            document_type: self.document_type.clone(),
            content,
            created_at,
            producing_moderator_version: Some(self.version),
            length_chars,
        }
    }
}
