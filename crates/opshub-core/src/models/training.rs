use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Server-owned file attached to a lesson. The client only references these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    /// Direct URL to the stored object.
    pub public_url: String,
    #[serde(default)]
    pub storage_key: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub order: i32,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Training {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Training {
    /// All lessons in module order, then lesson order as delivered.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    pub fn find_lesson(&self, lesson_id: i64) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == lesson_id)
    }
}

/// Published training entry used for navigation menus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingListItem {
    pub id: i64,
    pub title: String,
}

/// Superadmin "my trainings" entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingManagementListItem {
    pub id: i64,
    pub title: String,
    pub is_published: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingCreate {
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPublishUpdate {
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCreate {
    pub title: String,
    pub order: i32,
}

/// Body for both lesson creation and lesson update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonWrite {
    pub title: String,
    pub content: Option<String>,
    pub order: i32,
}
