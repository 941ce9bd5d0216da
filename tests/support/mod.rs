#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use registrard::config::{Config, Environment};
use registrard::db;
use registrard::http::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header")
    }

    pub fn id(&self, field: &str) -> i64 {
        self.body[field].as_i64().expect("numeric id")
    }

    pub fn row_version(&self) -> String {
        self.body["rowVersion"]
            .as_str()
            .expect("rowVersion")
            .to_string()
    }
}

pub struct TestApp {
    router: Router,
    pub workspace: PathBuf,
}

impl TestApp {
    pub fn new(prefix: &str) -> Self {
        Self::with_environment(prefix, Environment::Production)
    }

    pub fn with_environment(prefix: &str, environment: Environment) -> Self {
        let workspace = temp_dir(prefix);
        let conn = db::open_db(&workspace).expect("open db");
        let config = Config {
            workspace: workspace.clone(),
            environment,
            ..Config::default()
        };
        Self {
            router: router(AppState::new(conn, config)),
            workspace,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");
        self.send_raw(request).await
    }

    pub async fn send_raw(&self, request: Request<Body>) -> Reply {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Reply {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Reply {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Reply {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn create_student(&self, last: &str, first: &str) -> i64 {
        let reply = self
            .post(
                "/api/students",
                json!({ "lastName": last, "firstMidName": first, "enrollmentDate": "2024-09-01" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.id("id")
    }

    pub async fn create_instructor(&self, last: &str, first: &str) -> i64 {
        let reply = self
            .post(
                "/api/instructors",
                json!({ "lastName": last, "firstMidName": first, "hireDate": "2010-07-01" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.id("id")
    }

    pub async fn create_department(&self, name: &str) -> i64 {
        let reply = self
            .post(
                "/api/departments",
                json!({ "name": name, "budget": 350000.0, "startDate": "2007-09-01" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.id("departmentId")
    }

    pub async fn create_course(&self, number: i64, title: &str, department_id: i64) -> i64 {
        let reply = self
            .post(
                "/api/courses",
                json!({
                    "courseNumber": number,
                    "title": title,
                    "credits": 3,
                    "departmentId": department_id
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.id("courseId")
    }

    pub async fn enroll(&self, student_id: i64, course_id: i64, grade: Option<&str>) -> i64 {
        let reply = self
            .post(
                "/api/enrollments",
                json!({ "studentId": student_id, "courseId": course_id, "grade": grade }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.id("enrollmentId")
    }
}
