//! Router-level tests driving the full middleware stack

use super::*;
use crate::db::{create_test_pool, migrations};
use crate::models::{CategoryInput, PostInput, User};
use crate::services::RegisterInput;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use chrono::{Duration, Utc};
use tower::ServiceExt;

struct TestApp {
    state: AppState,
    router: Router,
    admin: User,
    alice: User,
    bob: User,
    category: i64,
}

const PASSWORD: &str = "correct-horse";

async fn register(state: &AppState, username: &str) -> User {
    state
        .user_service
        .register(RegisterInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("Failed to register user")
}

async fn setup() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    let templates = TemplateEngine::new(None).expect("Failed to load templates");
    let state = build_state(pool, &Config::default(), templates);

    // The first account becomes staff
    let admin = register(&state, "admin").await;
    let alice = register(&state, "alice").await;
    let bob = register(&state, "bob").await;

    let category = state
        .category_service
        .create(&CategoryInput {
            title: "Travel".into(),
            description: "Trips".into(),
            slug: "travel".into(),
            is_published: true,
        })
        .await
        .unwrap()
        .id;

    TestApp {
        router: build_router(state.clone()),
        state,
        admin,
        alice,
        bob,
        category,
    }
}

impl TestApp {
    async fn login(&self, username: &str) -> String {
        let (session, _) = self
            .state
            .user_service
            .login(username, PASSWORD)
            .await
            .expect("Failed to log in");
        format!("session={}", session.id)
    }

    async fn post(&self, author: &User, title: &str, published: bool, offset: Duration) -> i64 {
        self.state
            .post_service
            .create(
                author,
                &PostInput {
                    title: title.to_string(),
                    text: format!("{} text", title),
                    pub_date: Utc::now() + offset,
                    location_id: None,
                    category_id: Some(self.category),
                    is_published: published,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn submit(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_index_lists_only_publicly_visible_posts() {
    let app = setup().await;
    app.post(&app.alice, "Visible post", true, Duration::hours(-1)).await;
    app.post(&app.bob, "Draft post", false, Duration::hours(-1)).await;
    app.post(&app.bob, "Scheduled post", true, Duration::hours(1)).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert!(html.contains("Visible post"));
    assert!(!html.contains("Draft post"));
    assert!(!html.contains("Scheduled post"));
}

#[tokio::test]
async fn test_invalid_page_number_falls_back_to_first_page() {
    let app = setup().await;
    app.post(&app.alice, "Only post", true, Duration::hours(-1)).await;

    for uri in ["/?page=abc", "/?page=0", "/?page=999"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert!(body_text(response).await.contains("Only post"), "{}", uri);
    }
}

#[tokio::test]
async fn test_author_sees_own_unpublished_post() {
    let app = setup().await;
    let draft = app.post(&app.bob, "Bob draft", false, Duration::hours(-1)).await;
    let uri = format!("/posts/{}/", draft);

    let bob = app.login("bob").await;
    let response = app.get(&uri, Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Bob draft"));

    let alice = app.login("alice").await;
    assert_eq!(app.get(&uri, Some(&alice)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_visibility_depends_on_viewer() {
    let app = setup().await;
    app.post(&app.bob, "Bob public", true, Duration::hours(-1)).await;
    app.post(&app.bob, "Bob hidden", false, Duration::hours(-1)).await;

    let bob = app.login("bob").await;
    let own = body_text(app.get("/profile/bob/", Some(&bob)).await).await;
    assert!(own.contains("Bob public"));
    assert!(own.contains("Bob hidden"));

    let alice = app.login("alice").await;
    let guest = body_text(app.get("/profile/bob/", Some(&alice)).await).await;
    assert!(guest.contains("Bob public"));
    assert!(!guest.contains("Bob hidden"));

    assert_eq!(
        app.get("/profile/nobody/", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_unpublished_category_page_is_not_found() {
    let app = setup().await;
    app.state
        .category_service
        .create(&CategoryInput {
            title: "Hidden".into(),
            description: "Nope".into(),
            slug: "hidden".into(),
            is_published: false,
        })
        .await
        .unwrap();

    assert_eq!(app.get("/category/travel/", None).await.status(), StatusCode::OK);
    assert_eq!(
        app.get("/category/hidden/", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_login_required_redirects_with_next() {
    let app = setup().await;

    let response = app.get("/posts/create/", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Fposts%2Fcreate%2F");
}

#[tokio::test]
async fn test_create_post_redirects_to_profile() {
    let app = setup().await;
    let alice = app.login("alice").await;
    let body = format!(
        "title=Hello&text=World&pub_date=2024-01-01T10%3A00&location=&category={}",
        app.category
    );

    let response = app.submit("/posts/create/", &body, Some(&alice)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alice/");
    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("Hello"));
}

#[tokio::test]
async fn test_invalid_post_form_is_rerendered() {
    let app = setup().await;
    let alice = app.login("alice").await;

    let response = app
        .submit("/posts/create/", "title=&text=Body&pub_date=nope", Some(&alice))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("Enter a valid date&#x2F;time."));
    assert_eq!(
        app.state
            .post_service
            .count(&crate::models::PostQuery::default())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_non_author_edit_redirects_without_changes() {
    let app = setup().await;
    let post = app.post(&app.alice, "Alice post", true, Duration::hours(-1)).await;
    let bob = app.login("bob").await;
    let body = format!(
        "title=Hacked&text=Hacked&pub_date=2024-01-01T10%3A00&category={}",
        app.category
    );

    let edit = app
        .submit(&format!("/posts/{}/edit/", post), &body, Some(&bob))
        .await;
    assert_eq!(edit.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&edit), format!("/posts/{}/", post));

    let delete = app
        .submit(&format!("/posts/{}/delete/", post), "", Some(&bob))
        .await;
    assert_eq!(delete.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&delete), format!("/posts/{}/", post));

    let stored = app.state.post_service.get_details(post).await.unwrap();
    assert_eq!(stored.post.title, "Alice post");
}

#[tokio::test]
async fn test_author_deletes_post() {
    let app = setup().await;
    let post = app.post(&app.alice, "Short lived", true, Duration::hours(-1)).await;
    let alice = app.login("alice").await;

    let confirm = app.get(&format!("/posts/{}/delete/", post), Some(&alice)).await;
    assert_eq!(confirm.status(), StatusCode::OK);

    let response = app
        .submit(&format!("/posts/{}/delete/", post), "", Some(&alice))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alice/");
    assert!(app.state.post_service.get_details(post).await.is_err());
}

#[tokio::test]
async fn test_comment_flow() {
    let app = setup().await;
    let post = app.post(&app.alice, "Discuss", true, Duration::hours(-1)).await;
    let bob = app.login("bob").await;
    let alice = app.login("alice").await;

    let added = app
        .submit(&format!("/posts/{}/comment/", post), "text=First%21", Some(&bob))
        .await;
    assert_eq!(added.status(), StatusCode::SEE_OTHER);

    let empty = app
        .submit(&format!("/posts/{}/comment/", post), "text=", Some(&bob))
        .await;
    assert_eq!(empty.status(), StatusCode::OK);
    assert!(body_text(empty).await.contains("This field is required."));

    let comments = app.state.comment_service.list_for_post(post).await.unwrap();
    assert_eq!(comments.len(), 1);
    let comment_id = comments[0].comment.id;

    // Alice may not touch Bob's comment
    let edit_uri = format!("/posts/{}/edit_comment/{}/", post, comment_id);
    let response = app.submit(&edit_uri, "text=Changed", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post));
    let unchanged = app.state.comment_service.get(post, comment_id).await.unwrap();
    assert_eq!(unchanged.text, "First!");

    // A comment addressed through the wrong post does not exist
    let other = app.post(&app.alice, "Other", true, Duration::hours(-1)).await;
    let wrong = app
        .get(&format!("/posts/{}/edit_comment/{}/", other, comment_id), Some(&bob))
        .await;
    assert_eq!(wrong.status(), StatusCode::NOT_FOUND);

    let delete_uri = format!("/posts/{}/delete_comment/{}/", post, comment_id);
    let deleted = app.submit(&delete_uri, "", Some(&bob)).await;
    assert_eq!(deleted.status(), StatusCode::SEE_OTHER);
    assert!(app.state.comment_service.list_for_post(post).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_author_cannot_delete_comment() {
    let app = setup().await;
    let post = app.post(&app.alice, "Keep comments", true, Duration::hours(-1)).await;
    let comment = app
        .state
        .comment_service
        .add(post, &app.bob, "Bob was here")
        .await
        .unwrap();
    let alice = app.login("alice").await;

    let uri = format!("/posts/{}/delete_comment/{}/", post, comment.id);
    let response = app.submit(&uri, "", Some(&alice)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post));
    let stored = app.state.comment_service.get(post, comment.id).await.unwrap();
    assert_eq!(stored.text, "Bob was here");
}

#[tokio::test]
async fn test_cannot_comment_on_hidden_post() {
    let app = setup().await;
    let draft = app.post(&app.alice, "Draft", false, Duration::hours(-1)).await;
    let bob = app.login("bob").await;

    let response = app
        .submit(&format!("/posts/{}/comment/", draft), "text=Hi", Some(&bob))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_profile_rejects_taken_username() {
    let app = setup().await;
    let bob = app.login("bob").await;

    let taken = app
        .submit("/edit_profile/", "username=alice&email=", Some(&bob))
        .await;
    assert_eq!(taken.status(), StatusCode::OK);
    assert!(body_text(taken).await.contains("already exists"));

    let renamed = app
        .submit(
            "/edit_profile/",
            "first_name=Robert&last_name=&username=robert&email=bob%40example.com",
            Some(&bob),
        )
        .await;
    assert_eq!(renamed.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&renamed), "/profile/robert/");
}

#[tokio::test]
async fn test_login_sets_cookie_and_follows_local_next() {
    let app = setup().await;

    let response = app
        .submit(
            "/auth/login/",
            &format!("username=alice&password={}&next=%2Fposts%2Fcreate%2F", PASSWORD),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts/create/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let offsite = app
        .submit(
            "/auth/login/",
            &format!("username=alice&password={}&next=https%3A%2F%2Fevil.example", PASSWORD),
            None,
        )
        .await;
    assert_eq!(location(&offsite), "/");

    let wrong = app
        .submit("/auth/login/", "username=alice&password=nope", None)
        .await;
    assert_eq!(wrong.status(), StatusCode::OK);
    assert!(body_text(wrong).await.contains("correct username and password"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let alice = app.login("alice").await;

    let response = app.submit("/auth/logout/", "", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    // The old cookie no longer logs anyone in
    let after = app.get("/posts/create/", Some(&alice)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_registration_redirects_to_login() {
    let app = setup().await;

    let response = app
        .submit(
            "/auth/registration/",
            "username=carol&email=carol%40example.com&password=longenough&password_confirm=longenough",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/");

    let duplicate = app
        .submit(
            "/auth/registration/",
            "username=carol&email=&password=longenough&password_confirm=longenough",
            None,
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_requires_staff() {
    let app = setup().await;
    assert!(app.admin.is_staff);

    let anonymous = app.get("/admin/", None).await;
    assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);

    let alice = app.login("alice").await;
    let forbidden = app.get("/admin/", Some(&alice)).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    assert!(body_text(forbidden).await.contains("403"));

    let admin = app.login("admin").await;
    for uri in [
        "/admin/",
        "/admin/posts/",
        "/admin/posts/add/",
        "/admin/categories/",
        "/admin/categories/add/",
        "/admin/locations/",
        "/admin/locations/add/",
        "/admin/comments/",
    ] {
        assert_eq!(app.get(uri, Some(&admin)).await.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn test_admin_post_list_bulk_edit() {
    let app = setup().await;
    let post = app.post(&app.alice, "Bulk", true, Duration::hours(-1)).await;
    let admin = app.login("admin").await;

    // Unchecked box unpublishes; empty category clears it
    let body = format!("post={}&category_{}=", post, post);
    let response = app.submit("/admin/posts/", &body, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = app.state.post_service.get_details(post).await.unwrap();
    assert!(!stored.post.is_published);
    assert_eq!(stored.post.category_id, None);

    let search = body_text(app.get("/admin/posts/?q=bUlK", Some(&admin)).await).await;
    assert!(search.contains("Bulk"));
    let miss = body_text(app.get("/admin/posts/?q=nothing", Some(&admin)).await).await;
    assert!(!miss.contains("Bulk"));
}

#[tokio::test]
async fn test_admin_post_list_save_keeps_page() {
    let app = setup().await;
    let post = app.post(&app.alice, "Paged", true, Duration::hours(-1)).await;
    let admin = app.login("admin").await;

    let body = format!("post={}&published_{}=on&category_{}={}", post, post, post, app.category);
    let response = app
        .submit("/admin/posts/?q=paged&is_published=1&page=2", &body, Some(&admin))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/posts/?q=paged&is_published=1&page=2");
    let stored = app.state.post_service.get_details(post).await.unwrap();
    assert!(stored.post.is_published);
}

#[tokio::test]
async fn test_admin_category_inline_toggle() {
    let app = setup().await;
    let post = app.post(&app.bob, "Inline", true, Duration::hours(-1)).await;
    let admin = app.login("admin").await;

    let body = format!(
        "title=Travel&description=Trips&slug=travel&is_published=on&inline_post={}",
        post
    );
    let response = app
        .submit(&format!("/admin/categories/{}/", app.category), &body, Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = app.state.post_service.get_details(post).await.unwrap();
    assert!(!stored.post.is_published);
}

#[tokio::test]
async fn test_unknown_route_renders_not_found_page() {
    let app = setup().await;

    let response = app.get("/no/such/page/", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("404"));
}
