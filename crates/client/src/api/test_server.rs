//! In-process stand-in for the API with request recording.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, patch, post},
};
use serde_json::{Value, json};

pub const TOKEN: &str = "stub-token";
pub const PASSWORD: &str = "secret";

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Default)]
pub struct Recorder {
    hits: Mutex<HashMap<String, usize>>,
    bodies: Mutex<HashMap<String, Vec<Value>>>,
}

impl Recorder {
    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn bodies(&self, route: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .get(route)
            .cloned()
            .unwrap_or_default()
    }

    fn hit(&self, route: &str, body: Option<&Value>) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_default() += 1;
        if let Some(body) = body {
            self.bodies
                .lock()
                .unwrap()
                .entry(route.to_string())
                .or_default()
                .push(body.clone());
        }
    }
}

pub struct StubServer {
    pub base_url: String,
    pub recorder: Arc<Recorder>,
}

pub async fn spawn() -> StubServer {
    let recorder = Arc::new(Recorder::default());
    let app = Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/tasks", get(list_tasks))
        .route("/api/v1/tasks/{task_id}", patch(update_task))
        .route("/api/v1/projects/{project_id}", get(get_project))
        .route("/api/v1/themes", post(create_theme))
        .route("/api/v1/project-types/{id}", get(get_project_type))
        .route("/api/v1/project-types/{id}/stats", get(project_type_stats))
        .route("/api/v1/project-types/{id}/migrate", post(migrate_project_type))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    StubServer {
        base_url: format!("http://{addr}"),
        recorder,
    }
}

fn ok(data: Value) -> Reply {
    Ok(Json(json!({"success": true, "data": data, "message": null})))
}

fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"success": false, "data": null, "message": message})),
    )
}

fn authorize(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value.as_bytes() == expected.as_bytes() => Ok(()),
        _ => Err(fail(
            StatusCode::UNAUTHORIZED,
            "Could not validate credentials",
        )),
    }
}

const TIMESTAMP: &str = "2026-10-01T12:00:00Z";

pub fn task_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "display_id": format!("CORE-{id}"),
        "project_id": 7,
        "team_id": 1,
        "task_type_id": 1,
        "release_id": null,
        "title": format!("Task {id}"),
        "description": null,
        "status": status,
        "estimation": null,
        "custom_data": {},
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP
    })
}

pub fn task_type_json(id: i64, workflow: &[&str]) -> Value {
    json!({
        "id": id,
        "team_id": 1,
        "name": "Story",
        "slug": "story",
        "description": null,
        "workflow": workflow,
        "color": null,
        "fields": [],
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP
    })
}

fn project_type_json(id: i64, workflow: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("Type {id}"),
        "slug": format!("type-{id}"),
        "description": null,
        "workflow": workflow,
        "color": null,
        "fields": [],
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP
    })
}

async fn login(State(recorder): State<Arc<Recorder>>, Json(body): Json<Value>) -> Reply {
    recorder.hit("login", Some(&body));
    if body["password"] != PASSWORD {
        return Err(fail(StatusCode::UNAUTHORIZED, "Incorrect email or password"));
    }
    ok(json!({"access_token": TOKEN, "token_type": "bearer"}))
}

async fn me(State(recorder): State<Arc<Recorder>>, headers: HeaderMap) -> Reply {
    recorder.hit("me", None);
    authorize(&headers)?;
    ok(json!({
        "id": 1,
        "email": "admin@corepm.local",
        "full_name": "Admin User",
        "role": "admin",
        "is_active": true,
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP
    }))
}

async fn list_tasks(State(recorder): State<Arc<Recorder>>, headers: HeaderMap) -> Reply {
    recorder.hit("list_tasks", None);
    authorize(&headers)?;
    ok(json!({
        "items": [task_json(42, "Backlog")],
        "total": 1,
        "page": 1,
        "page_size": 50,
        "pages": 1
    }))
}

async fn update_task(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    Path(task_id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    recorder.hit("update_task", Some(&body));
    authorize(&headers)?;
    let status = body["status"].as_str().unwrap_or("Backlog").to_string();
    ok(task_json(task_id, &status))
}

async fn get_project(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    Path(project_id): Path<i64>,
) -> Reply {
    recorder.hit("get_project", None);
    authorize(&headers)?;
    ok(json!({
        "id": project_id,
        "theme_id": null,
        "project_type_id": 1,
        "title": "Platform",
        "description": null,
        "status": "Planning",
        "custom_data": {},
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP,
        "theme": null,
        "project_type": null,
        "dependencies": [],
        "dependents": [],
        "tasks": [{"id": 42, "display_id": "CORE-42", "title": "Task 42", "status": "Backlog"}]
    }))
}

async fn create_theme(State(recorder): State<Arc<Recorder>>, headers: HeaderMap) -> Reply {
    recorder.hit("create_theme", None);
    authorize(&headers)?;
    Err(fail(
        StatusCode::BAD_REQUEST,
        "Invalid status 'paused'. Must be one of: active, completed, archived",
    ))
}

async fn get_project_type(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    recorder.hit("get_project_type", None);
    authorize(&headers)?;
    ok(project_type_json(id, &["Open", "Closed"]))
}

async fn project_type_stats(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    recorder.hit("project_type_stats", None);
    authorize(&headers)?;
    ok(json!({
        "project_type_id": id,
        "name": format!("Type {id}"),
        "workflow": ["Backlog", "Review", "Done"],
        "total": 3,
        "by_status": {"Backlog": 2, "Review": 1}
    }))
}

async fn migrate_project_type(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    recorder.hit("migrate_project_type", Some(&body));
    authorize(&headers)?;
    ok(json!({"migrated": 3, "source_deleted": body["delete_source"] == true}))
}
