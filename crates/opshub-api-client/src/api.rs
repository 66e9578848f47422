//! Domain methods for the OpsHub API client.
//!
//! Request and response types come from `opshub_core::models`. Collection
//! routes that the server mounts at `/` are addressed with their trailing slash
//! so no redirect is involved.

use crate::{ApiClient, ApiError};
use opshub_core::models::{
    AdminCreate, AdminRegister, AdminSettingsUpdate, FileMetadata, GenerateUploadUrlsRequest,
    Invitation, InvitationCreate, Lesson, LessonWrite, LoginResponse, MessageResponse, Module,
    ModuleCreate, NewsSource, NewsSourceCreate, Post, ProgressCreate, ProgressData, Role,
    StatusUpdate, TokenPair, Training, TrainingCreate, TrainingListItem,
    TrainingManagementListItem, TrainingPublishUpdate, UploadDestination, User,
};

impl ApiClient {
    // --- Auth ---

    /// Exchange credentials for tokens and the user record (form-encoded).
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let form = [("username", email), ("password", password)];
        self.post_form(&self.api_path("/auth/login"), &form).await
    }

    /// Self-service admin registration.
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        company_name: &str,
    ) -> Result<User, ApiError> {
        let body = AdminRegister {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            company_name: company_name.to_string(),
        };
        self.post_json(&self.api_path("/auth/register"), &body).await
    }

    /// Rotate tokens using a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let form = [("refresh_token", refresh_token)];
        self.post_form(&self.api_path("/auth/refresh"), &form).await
    }

    /// Activate an invited account by choosing a password.
    pub async fn accept_invite(
        &self,
        invite_token: &str,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let path = format!("/auth/accept-invite/{}", urlencoding::encode(invite_token));
        self.post_json(
            &self.api_path(&path),
            &serde_json::json!({ "password": password }),
        )
        .await
    }

    // --- Users ---

    pub async fn me(&self) -> Result<User, ApiError> {
        self.get(&self.api_path("/users/me"), &[]).await
    }

    /// Users created by the calling admin.
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get(&self.api_path("/users"), &[]).await
    }

    pub async fn invite_user(
        &self,
        email: &str,
        role: Role,
        full_name: &str,
    ) -> Result<Invitation, ApiError> {
        let body = InvitationCreate {
            email: email.to_string(),
            role,
            full_name: full_name.to_string(),
        };
        self.post_json(&self.api_path("/users/invite"), &body).await
    }

    pub async fn set_user_status(&self, user_id: i64, is_active: bool) -> Result<User, ApiError> {
        self.put_json(
            &self.api_path(&format!("/users/{}/status", user_id)),
            &StatusUpdate { is_active },
        )
        .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("/users/{}", user_id)))
            .await
    }

    // --- Superadmin: admin management ---

    pub async fn list_admins(&self) -> Result<Vec<User>, ApiError> {
        self.get(&self.api_path("/superadmin/admins"), &[]).await
    }

    pub async fn create_admin(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = AdminCreate {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json(&self.api_path("/superadmin/admins"), &body)
            .await
    }

    pub async fn update_admin_settings(
        &self,
        admin_id: i64,
        can_create_users: bool,
        user_creation_limit: i64,
    ) -> Result<User, ApiError> {
        let body = AdminSettingsUpdate {
            can_create_users,
            user_creation_limit,
        };
        self.put_json(
            &self.api_path(&format!("/superadmin/admins/{}/settings", admin_id)),
            &body,
        )
        .await
    }

    pub async fn delete_admin(&self, admin_id: i64) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("/superadmin/admins/{}", admin_id)))
            .await
    }

    // --- Posts ---

    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        self.get(&self.api_path("/posts/"), &[]).await
    }

    pub async fn get_post(&self, post_id: i64) -> Result<Post, ApiError> {
        self.get(&self.api_path(&format!("/posts/{}", post_id)), &[])
            .await
    }

    pub async fn delete_post(&self, post_id: i64) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("/posts/{}", post_id)))
            .await
    }

    // --- News sources ---

    pub async fn list_news_sources(&self) -> Result<Vec<NewsSource>, ApiError> {
        self.get(&self.api_path("/news-sources/"), &[]).await
    }

    pub async fn create_news_source(
        &self,
        url: &str,
        name: Option<&str>,
    ) -> Result<NewsSource, ApiError> {
        let body = NewsSourceCreate {
            url: url.to_string(),
            name: name.map(str::to_string),
        };
        self.post_json(&self.api_path("/news-sources/"), &body)
            .await
    }

    pub async fn delete_news_source(&self, source_id: i64) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("/news-sources/{}", source_id)))
            .await
    }

    // --- Trainings ---

    pub async fn published_trainings(&self) -> Result<Vec<TrainingListItem>, ApiError> {
        self.get(&self.api_path("/trainings/published"), &[]).await
    }

    pub async fn my_trainings(&self) -> Result<Vec<TrainingManagementListItem>, ApiError> {
        self.get(&self.api_path("/trainings/my-trainings"), &[])
            .await
    }

    pub async fn get_training(&self, training_id: i64) -> Result<Training, ApiError> {
        self.get(&self.api_path(&format!("/trainings/{}", training_id)), &[])
            .await
    }

    /// New trainings start unpublished.
    pub async fn create_training(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Training, ApiError> {
        let body = TrainingCreate {
            title: title.to_string(),
            description: description.map(str::to_string),
            is_published: false,
        };
        self.post_json(&self.api_path("/trainings/"), &body).await
    }

    pub async fn set_training_published(
        &self,
        training_id: i64,
        is_published: bool,
    ) -> Result<TrainingManagementListItem, ApiError> {
        self.put_json(
            &self.api_path(&format!("/trainings/{}/publish", training_id)),
            &TrainingPublishUpdate { is_published },
        )
        .await
    }

    pub async fn delete_training(&self, training_id: i64) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("/trainings/{}", training_id)))
            .await
    }

    pub async fn add_module(
        &self,
        training_id: i64,
        title: &str,
        order: i32,
    ) -> Result<Module, ApiError> {
        let body = ModuleCreate {
            title: title.to_string(),
            order,
        };
        self.post_json(
            &self.api_path(&format!("/trainings/{}/modules", training_id)),
            &body,
        )
        .await
    }

    pub async fn add_lesson(
        &self,
        module_id: i64,
        title: &str,
        content: Option<&str>,
        order: i32,
    ) -> Result<Lesson, ApiError> {
        let body = LessonWrite {
            title: title.to_string(),
            content: content.map(str::to_string),
            order,
        };
        self.post_json(
            &self.api_path(&format!("/trainings/modules/{}/lessons", module_id)),
            &body,
        )
        .await
    }

    pub async fn update_lesson(
        &self,
        lesson_id: i64,
        title: &str,
        content: Option<&str>,
        order: i32,
    ) -> Result<Lesson, ApiError> {
        let body = LessonWrite {
            title: title.to_string(),
            content: content.map(str::to_string),
            order,
        };
        self.put_json(
            &self.api_path(&format!("/trainings/lessons/{}", lesson_id)),
            &body,
        )
        .await
    }

    // --- Attachments ---

    /// Negotiate presigned destinations for a batch of files in one call.
    pub async fn generate_upload_urls(
        &self,
        lesson_id: i64,
        files: &[FileMetadata],
    ) -> Result<Vec<UploadDestination>, ApiError> {
        let body = GenerateUploadUrlsRequest {
            lesson_id,
            files: files.to_vec(),
        };
        self.post_json(&self.api_path("/trainings/generate-upload-urls"), &body)
            .await
    }

    /// Mark a pending attachment as uploaded.
    pub async fn complete_upload(&self, attachment_id: i64) -> Result<MessageResponse, ApiError> {
        self.post_empty(&self.api_path(&format!(
            "/trainings/attachments/{}/complete-upload",
            attachment_id
        )))
        .await
    }

    pub async fn delete_attachment(&self, attachment_id: i64) -> Result<(), ApiError> {
        self.delete(&self.api_path(&format!("/trainings/attachments/{}", attachment_id)))
            .await
    }

    // --- Progress ---

    pub async fn get_progress(&self, training_id: i64) -> Result<ProgressData, ApiError> {
        self.get(&self.api_path(&format!("/progress/{}", training_id)), &[])
            .await
    }

    /// Idempotent on the server: completing a lesson twice is not an error.
    pub async fn complete_lesson(&self, lesson_id: i64) -> Result<(), ApiError> {
        self.post_json_discard(&self.api_path("/progress/"), &ProgressCreate { lesson_id })
            .await
    }
}
