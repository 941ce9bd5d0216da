mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::TestApp;

#[tokio::test]
async fn create_read_update_delete_roundtrip() {
    let app = TestApp::new("registrard-students-crud");

    let created = app
        .post(
            "/api/students",
            json!({
                "lastName": "Alexander",
                "firstMidName": "Carson",
                "enrollmentDate": "2019-09-01T00:00:00"
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.id("id");
    assert_eq!(created.location(), format!("/api/students/{id}"));
    assert_eq!(created.body["fullName"], "Alexander, Carson");
    assert_eq!(created.body["enrollmentDate"], "2019-09-01");
    assert_eq!(created.body["enrollmentCount"], 0);

    let fetched = app.get(&format!("/api/students/{id}")).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, created.body);

    let updated = app
        .put(
            &format!("/api/students/{id}"),
            json!({
                "lastName": "Alexander",
                "firstMidName": "Carla",
                "enrollmentDate": "2019-09-02",
                "rowVersion": created.row_version()
            }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["firstMidName"], "Carla");
    assert_ne!(updated.row_version(), created.row_version());

    let deleted = app.delete(&format!("/api/students/{id}")).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.get(&format!("/api/students/{id}")).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["detail"], format!("Student with ID {id} not found"));

    let again = app.delete(&format!("/api/students/{id}")).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn third_page_of_twenty_five_students() {
    let app = TestApp::new("registrard-students-paging");
    for i in 0..25 {
        app.create_student(&format!("Student{i:02}"), "Test").await;
    }

    let page = app.get("/api/students?pageNumber=3&pageSize=10").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["totalCount"], 25);
    assert_eq!(page.body["totalPages"], 3);
    assert_eq!(page.body["pageNumber"], 3);
    assert_eq!(page.body["pageSize"], 10);
    assert_eq!(page.body["hasPrevious"], true);
    assert_eq!(page.body["hasNext"], false);
    let data = page.body["data"].as_array().expect("data");
    assert_eq!(data.len(), 5);
    assert_eq!(data[0]["lastName"], "Student20");

    let beyond = app.get("/api/students?pageNumber=9").await;
    assert_eq!(beyond.status, StatusCode::OK);
    assert_eq!(beyond.body["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(beyond.body["hasNext"], false);
}

#[tokio::test]
async fn search_matches_first_or_last_name() {
    let app = TestApp::new("registrard-students-search");
    app.create_student("Alonso", "Meredith").await;
    app.create_student("Anand", "Arturo").await;
    app.create_student("Barzdukas", "Gytis").await;

    let page = app.get("/api/students?searchString=ar").await;
    let names: Vec<&str> = page.body["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|s| s["lastName"].as_str())
        .collect();
    assert_eq!(names, vec!["Anand", "Barzdukas"]);
    assert_eq!(page.body["totalCount"], 2);
}

#[tokio::test]
async fn invalid_student_lists_every_field() {
    let app = TestApp::new("registrard-students-invalid");
    let reply = app
        .post(
            "/api/students",
            json!({ "lastName": "", "firstMidName": "x".repeat(51) }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.content_type(), "application/problem+json");
    assert_eq!(reply.body["title"], "Validation Error");
    let errors = reply.body["errors"].as_object().expect("errors");
    assert!(errors.contains_key("lastName"));
    assert!(errors.contains_key("firstMidName"));
    assert!(errors.contains_key("enrollmentDate"));
}

#[tokio::test]
async fn stale_row_version_is_a_conflict() {
    let app = TestApp::new("registrard-students-conflict");
    let id = app.create_student("Li", "Yan").await;
    let original = app.get(&format!("/api/students/{id}")).await.row_version();

    let first = app
        .put(
            &format!("/api/students/{id}"),
            json!({
                "lastName": "Li",
                "firstMidName": "Yan",
                "enrollmentDate": "2024-09-02",
                "rowVersion": original
            }),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app
        .put(
            &format!("/api/students/{id}"),
            json!({
                "lastName": "Lee",
                "firstMidName": "Yan",
                "enrollmentDate": "2024-09-03",
                "rowVersion": original
            }),
        )
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["title"], "Concurrency Conflict");
    assert_eq!(
        second.body["detail"],
        "The record was modified by another user. Please refresh and try again."
    );

    let current = app.get(&format!("/api/students/{id}")).await;
    assert_eq!(current.body["lastName"], "Li");
    assert_eq!(current.body["enrollmentDate"], "2024-09-02");
}

#[tokio::test]
async fn update_without_row_version_overwrites() {
    let app = TestApp::new("registrard-students-lww");
    let id = app.create_student("Norman", "Laura").await;

    let reply = app
        .put(
            &format!("/api/students/{id}"),
            json!({ "lastName": "Norman", "firstMidName": "Lara", "enrollmentDate": "2024-09-01" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["firstMidName"], "Lara");
}

#[tokio::test]
async fn update_of_missing_student_is_not_found() {
    let app = TestApp::new("registrard-students-missing");
    let reply = app
        .put(
            "/api/students/404",
            json!({ "lastName": "Olivetto", "firstMidName": "Nino", "enrollmentDate": "2024-09-01" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn student_with_enrollments_cannot_be_deleted() {
    let app = TestApp::new("registrard-students-guard");
    let student = app.create_student("Justice", "Peggy").await;
    let department = app.create_department("Economics").await;
    let course = app.create_course(4022, "Microeconomics", department).await;
    let enrollment = app.enroll(student, course, Some("C")).await;

    let check = app.get(&format!("/api/students/{student}/can-delete")).await;
    assert_eq!(check.status, StatusCode::OK);
    assert_eq!(check.body["canDelete"], false);
    assert_eq!(check.body["dependentCount"], 1);

    let refused = app.delete(&format!("/api/students/{student}")).await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        refused.body["detail"],
        "Cannot delete student Justice, Peggy because they have 1 enrollment(s). Remove enrollments first."
    );
    assert_eq!(
        app.get(&format!("/api/students/{student}")).await.body["enrollmentCount"],
        1
    );

    assert_eq!(
        app.delete(&format!("/api/enrollments/{enrollment}")).await.status,
        StatusCode::NO_CONTENT
    );
    let check = app.get(&format!("/api/students/{student}/can-delete")).await;
    assert_eq!(check.body["canDelete"], true);
    assert_eq!(
        app.delete(&format!("/api/students/{student}")).await.status,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn can_delete_unknown_student_is_not_found() {
    let app = TestApp::new("registrard-students-can-delete-missing");
    let reply = app.get("/api/students/77/can-delete").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
