use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use client_core::{
    ControllerEvent, LaneKind, LaneStatus, ResourceController, ServiceEndpoints, Settings,
};
use serde_json::{json, Value};
use shared::domain::UserDraft;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Directory {
    users: Arc<Mutex<Vec<Value>>>,
}

async fn list_users(State(directory): State<Directory>) -> Json<Vec<Value>> {
    Json(directory.users.lock().await.clone())
}

async fn create_user(
    State(directory): State<Directory>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut users = directory.users.lock().await;
    let record = json!({ "id": users.len() + 1, "name": body["name"], "email": body["email"] });
    users.push(record.clone());
    (StatusCode::CREATED, Json(json!({ "user": record })))
}

async fn spawn_directory(directory: Directory) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    // Products are deliberately not routed: that lane 404s throughout.
    let app = Router::new()
        .route("/users", get(list_users).post(create_user))
        .with_state(directory);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn overlapping_submits_converge_on_server_list() {
    let directory = Directory::default();
    let base = spawn_directory(directory.clone()).await;
    let endpoints = ServiceEndpoints::from_base(&base).expect("endpoints");
    let controller = ResourceController::new(&Settings::default(), &endpoints).expect("controller");

    controller.set_user_draft(UserDraft {
        name: "Ana".into(),
        email: "a@x.com".into(),
        password: "pw".into(),
    });
    let (first, second) = tokio::join!(controller.create_user(), controller.create_user());
    first.expect("first create");
    second.expect("second create");

    let server_side = directory.users.lock().await.clone();
    assert_eq!(server_side.len(), 2, "both submits reached the server");

    // Whichever refresh response landed last owns the list, so it may lag
    // behind the server, but it is always a full server list.
    let snapshot = controller.snapshot();
    assert!(!snapshot.users.items.is_empty());
    assert!(snapshot.users.items.len() <= server_side.len());
    assert_eq!(snapshot.users.draft, UserDraft::default());
    assert_eq!(snapshot.users.status, LaneStatus::Loaded);

    controller.fetch_users().await.expect("explicit refresh");
    assert_eq!(controller.snapshot().users.items.len(), server_side.len());
}

#[tokio::test]
async fn one_broken_lane_does_not_disturb_the_other() {
    let directory = Directory::default();
    let base = spawn_directory(directory).await;
    let endpoints = ServiceEndpoints::from_base(&base).expect("endpoints");
    let controller = ResourceController::new(&Settings::default(), &endpoints).expect("controller");
    let mut events = controller.subscribe_events();

    let (users, products) = controller.fetch_all().await;
    users.expect("users lane");
    let err = products.expect_err("products lane is not routed");
    assert_eq!(err.lane, LaneKind::Products);
    assert_eq!(err.source.status(), Some(404));

    controller.edit_user_draft(|draft| {
        draft.name = "Bo".into();
        draft.email = "b@x.com".into();
        draft.password = "pw".into();
    });
    controller.create_user().await.expect("create");

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.users.display_lines(), vec!["Bo - b@x.com"]);
    assert_eq!(
        snapshot.products.error.as_deref(),
        Some("HTTP error! status: 404")
    );
    assert_eq!(snapshot.products.status, LaneStatus::Failed);

    let mut created = false;
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::Created { lane, .. } = event {
            assert_eq!(lane, LaneKind::Users);
            created = true;
        }
    }
    assert!(created);
}
