//! REST client integration tests against a mockito server.
//!
//! Run with: `cargo test -p opshub-api-client --test api_test`

mod helpers;

use helpers::{anonymous_client, api_path, authed_client, bearer, user_json};
use mockito::{Matcher, Server};
use opshub_api_client::{ApiError, Role};
use serde_json::json;

#[tokio::test]
async fn test_login_posts_form_credentials() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", api_path("/auth/login").as_str())
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "dana@acme.test".into()),
            Matcher::UrlEncoded("password".into(), "hunter2!".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "token": {"access_token": "acc", "refresh_token": "ref", "token_type": "bearer"},
                "user": user_json(3, "dana@acme.test", "admin")
            })
            .to_string(),
        )
        .create_async()
        .await;

    let login = anonymous_client(&server)
        .login("dana@acme.test", "hunter2!")
        .await
        .unwrap();

    assert_eq!(login.token.access_token, "acc");
    assert_eq!(login.user.role, Role::Admin);
    assert_eq!(login.user.display_name(), "Dana Operator");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", api_path("/auth/login").as_str())
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"Incorrect email or password"}"#)
        .create_async()
        .await;

    let err = anonymous_client(&server)
        .login("dana@acme.test", "wrong")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(matches!(
        err,
        ApiError::Unauthorized { status: 401, ref detail } if detail == "Incorrect email or password"
    ));
}

#[tokio::test]
async fn test_refresh_sends_form_field() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", api_path("/auth/refresh").as_str())
        .match_body(Matcher::UrlEncoded("refresh_token".into(), "old-ref".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"new-acc","refresh_token":"new-ref"}"#)
        .create_async()
        .await;

    let pair = anonymous_client(&server).refresh("old-ref").await.unwrap();
    assert_eq!(pair.access_token, "new-acc");
    assert_eq!(pair.token_type, "bearer");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_me_sends_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", api_path("/users/me").as_str())
        .match_header("authorization", bearer().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(user_json(1, "root@acme.test", "superadmin").to_string())
        .create_async()
        .await;

    let me = authed_client(&server).me().await.unwrap();
    assert_eq!(me.role, Role::Superadmin);
    assert_eq!(me.users_created_count, Some(2));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invite_user_body_and_validation_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", api_path("/users/invite").as_str())
        .match_body(Matcher::Json(json!({
            "email": "bad-email",
            "role": "user",
            "full_name": "New Hire"
        })))
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"}]}"#,
        )
        .create_async()
        .await;

    let err = authed_client(&server)
        .invite_user("bad-email", Role::User, "New Hire")
        .await
        .unwrap_err();

    match err {
        ApiError::Validation { status, detail } => {
            assert_eq!(status, 422);
            assert_eq!(detail, "email: value is not a valid email address");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_collection_routes_keep_trailing_slash() {
    let mut server = Server::new_async().await;
    let posts = server
        .mock("GET", api_path("/posts/").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{
                "id": 11,
                "title": "Refinery restarts unit",
                "summary": "Short summary",
                "description": "Longer description",
                "image_url": "https://img.example.com/1.jpg",
                "source_name": "Energy Daily",
                "source_url": "https://energy.example.com/a",
                "published_date": "2025-03-01T08:00:00",
                "created_at": "2025-03-01T08:05:12.5",
                "is_ai_generated": true,
                "author_id": 1
            }])
            .to_string(),
        )
        .create_async()
        .await;
    let source = server
        .mock("POST", api_path("/news-sources/").as_str())
        .match_body(Matcher::Json(json!({"url": "https://energy.example.com/rss"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":4,"name":"energy.example.com","url":"https://energy.example.com/rss"}"#)
        .create_async()
        .await;

    let client = authed_client(&server);
    let list = client.list_posts().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].is_ai_generated, Some(true));

    let created = client
        .create_news_source("https://energy.example.com/rss", None)
        .await
        .unwrap();
    assert_eq!(created.name, "energy.example.com");

    posts.assert_async().await;
    source.assert_async().await;
}

#[tokio::test]
async fn test_training_tree_decodes() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api_path("/trainings/5").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 5,
                "title": "Permit to Work basics",
                "description": null,
                "is_published": true,
                "modules": [{
                    "id": 9,
                    "title": "Introduction",
                    "order": 1,
                    "lessons": [{
                        "id": 21,
                        "title": "Why permits matter",
                        "content": "<p>Read this</p>",
                        "order": 1,
                        "attachments": [{
                            "id": 100,
                            "filename": "ptw.pdf",
                            "mime_type": "application/pdf",
                            "size": 2048,
                            "public_url": "https://cdn.example.com/ptw.pdf",
                            "storage_key": "lessons/21/ptw.pdf",
                            "created_at": "2025-02-10T12:00:00"
                        }]
                    }]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let training = authed_client(&server).get_training(5).await.unwrap();
    let lesson = training.find_lesson(21).unwrap();
    assert_eq!(lesson.attachments[0].filename, "ptw.pdf");
    assert_eq!(lesson.attachments[0].size, 2048);
}

#[tokio::test]
async fn test_missing_training_is_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", api_path("/trainings/404").as_str())
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"Training not found"}"#)
        .create_async()
        .await;

    let err = authed_client(&server).delete_training(404).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref d) if d == "Training not found"));
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_delete_and_progress_calls() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", api_path("/trainings/attachments/100").as_str())
        .with_status(204)
        .create_async()
        .await;
    let complete = server
        .mock("POST", api_path("/progress/").as_str())
        .match_body(Matcher::Json(json!({"lesson_id": 21})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":1,"user_id":3,"lesson_id":21}"#)
        .create_async()
        .await;
    let progress = server
        .mock("GET", api_path("/progress/5").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"completed_lesson_ids":[21],"next_lesson_id":22,"total_lessons":4,"completed_lessons_count":1}"#,
        )
        .create_async()
        .await;

    let client = authed_client(&server);
    client.delete_attachment(100).await.unwrap();
    client.complete_lesson(21).await.unwrap();
    let data = client.get_progress(5).await.unwrap();

    assert_eq!(data.next_lesson_id, Some(22));
    assert_eq!(data.percent_complete(), 25);
    assert!(data.is_lesson_complete(21));

    delete.assert_async().await;
    complete.assert_async().await;
    progress.assert_async().await;
}

#[tokio::test]
async fn test_accept_invite_posts_password() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", api_path("/auth/accept-invite/inv-8f3a").as_str())
        .match_body(Matcher::Json(json!({"password": "s3cret-pass"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"Account activated. You can now log in."}"#)
        .create_async()
        .await;

    let reply = anonymous_client(&server)
        .accept_invite("inv-8f3a", "s3cret-pass")
        .await
        .unwrap();
    assert!(reply.message.contains("activated"));
    mock.assert_async().await;
}
