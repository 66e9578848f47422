use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub image_url: String,
    pub source_name: String,
    pub source_url: String,
    #[serde(default)]
    pub published_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_ai_generated: Option<bool>,
    #[serde(default)]
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSource {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// The server derives a name from the URL when none is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSourceCreate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One frame of the news-fetch progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchStatus {
    pub stage: String,
    /// 0..=100, may be fractional.
    pub progress: f64,
    pub message: String,
    #[serde(default)]
    pub is_complete: bool,
}

impl FetchStatus {
    pub fn idle() -> Self {
        Self {
            stage: "Idle".to_string(),
            progress: 0.0,
            message: "Ready to start.".to_string(),
            is_complete: false,
        }
    }

    pub fn connecting() -> Self {
        Self {
            stage: "Connecting".to_string(),
            progress: 0.0,
            message: "Initiating connection...".to_string(),
            is_complete: false,
        }
    }

    /// Log line for this frame: `[stage] message`.
    pub fn log_line(&self) -> String {
        format!("[{}] {}", self.stage, self.message)
    }

    pub fn is_error(&self) -> bool {
        self.stage.to_lowercase().contains("error")
    }
}

/// Command frame sent after the token when starting a fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchCommand {
    pub limit: u32,
    #[serde(default)]
    pub custom_sites: Vec<String>,
}

impl Default for FetchCommand {
    fn default() -> Self {
        Self {
            limit: 10,
            custom_sites: Vec::new(),
        }
    }
}
