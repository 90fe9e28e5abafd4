//! Record shapes shared with the upload and gallery services.
//!
//! These services live outside SceneReel; only the JSON contract is
//! modelled here.

use serde::{Deserialize, Serialize};

/// A published video as returned by the listing and upload endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    /// Server-relative URL of the stored file (e.g. `uploads/<name>.webm`).
    pub file_url: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub created_at: String,
}

impl VideoRecord {
    /// Card title, falling back to "Untitled".
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled")
    }

    /// Author shown on cards: the local part of the email, or "Anonymous".
    pub fn author_label(&self) -> &str {
        self.user_email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("Anonymous")
    }
}

/// Form fields accompanying a generated video on upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    pub title: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub size_label: String,
    pub created_at: String,
}
