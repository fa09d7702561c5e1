mod common;

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use tasktrack::models::{TaskView, User};

use common::{admin, bearer, build_app, create_task, register_and_login, send, test_state};

#[actix_rt::test]
async fn test_me_returns_stored_user_without_hash() {
    let state = test_state();
    let app = test::init_service(build_app(state.clone())).await;
    let hana = register_and_login(&app, "Hana", "hana@example.com").await;

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .append_header(bearer(&hana.token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("password_hash").is_none(), "Body: {}", body);

    let me: User = serde_json::from_value(body).unwrap();
    let stored = state.users.find_user_by_id(hana.id).await.unwrap().unwrap();
    assert_eq!(me, stored);
}

#[actix_rt::test]
async fn test_list_users() {
    let app = test::init_service(build_app(test_state())).await;
    let ivan = register_and_login(&app, "Ivan", "ivan@example.com").await;
    let jo = register_and_login(&app, "Jo", "jo@example.com").await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .append_header(bearer(&ivan.token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "id": ivan.id, "name": "Ivan", "email": "ivan@example.com" },
            { "id": jo.id, "name": "Jo", "email": "jo@example.com" },
        ])
    );
}

#[actix_rt::test]
async fn test_delete_user_requires_admin() {
    let state = test_state();
    let app = test::init_service(build_app(state.clone())).await;
    let root = admin(&state, &app, "root@example.com").await;
    let kim = register_and_login(&app, "Kim", "kim@example.com").await;
    let lee = register_and_login(&app, "Lee", "lee@example.com").await;

    let delete = |token: &str, id: Uuid| {
        test::TestRequest::delete()
            .uri(&format!("/api/users/{}", id))
            .append_header(bearer(token))
            .to_request()
    };

    let (status, body) = send(&app, delete(&kim.token, lee.id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
    assert!(state.users.find_user_by_id(lee.id).await.unwrap().is_some());

    let (status, _) = send(&app, delete(&root.token, Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, delete(&root.token, lee.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Deleted" }));
    assert!(state.users.find_user_by_id(lee.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_deleted_user_tasks() {
    let state = test_state();
    let app = test::init_service(build_app(state.clone())).await;
    let root = admin(&state, &app, "root@example.com").await;
    let mia = register_and_login(&app, "Mia", "mia@example.com").await;
    let noah = register_and_login(&app, "Noah", "noah@example.com").await;

    let created_by_noah = create_task(&app, &noah.token, json!({ "title": "by noah" })).await;
    let assigned_to_noah = create_task(
        &app,
        &mia.token,
        json!({ "title": "for noah", "assigned_to": noah.id }),
    )
    .await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", noah.id))
        .append_header(bearer(&root.token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let get = |id: Uuid| {
        test::TestRequest::get()
            .uri(&format!("/api/tasks/{}", id))
            .append_header(bearer(&mia.token))
            .to_request()
    };

    // Created tasks survive with a creator that no longer resolves.
    let (status, body) = send(&app, get(created_by_noah)).await;
    assert_eq!(status, StatusCode::OK);
    let view: TaskView = serde_json::from_value(body).unwrap();
    assert_eq!(view.task.created_by, noah.id);
    assert!(view.creator.is_none());

    // Assigned tasks are unassigned.
    let (status, body) = send(&app, get(assigned_to_noah)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned_to"], Value::Null);
    assert_eq!(body["assignee"], Value::Null);
}
