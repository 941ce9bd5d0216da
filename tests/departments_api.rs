mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::TestApp;

#[tokio::test]
async fn department_with_administrator() {
    let app = TestApp::new("registrard-departments-admin");
    let instructor = app.create_instructor("Kapoor", "Candace").await;

    let created = app
        .post(
            "/api/departments",
            json!({
                "name": "Mathematics",
                "budget": 100000.0,
                "startDate": "2007-09-01",
                "instructorId": instructor
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.id("departmentId");
    assert_eq!(created.location(), format!("/api/departments/{id}"));
    assert_eq!(created.body["administratorName"], "Kapoor, Candace");
    assert_eq!(created.body["courseCount"], 0);
}

#[tokio::test]
async fn unknown_administrator_is_a_field_error() {
    let app = TestApp::new("registrard-departments-bad-admin");
    let reply = app
        .post(
            "/api/departments",
            json!({ "name": "Physics", "budget": 1.0, "startDate": "2007-09-01", "instructorId": 999 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["errors"]["instructorId"][0],
        "Instructor with ID 999 does not exist"
    );
}

#[tokio::test]
async fn negative_budget_and_short_name_are_rejected() {
    let app = TestApp::new("registrard-departments-invalid");
    let reply = app
        .post(
            "/api/departments",
            json!({ "name": "IT", "budget": -5.0, "startDate": "2007-09-01" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let errors = reply.body["errors"].as_object().expect("errors");
    assert!(errors.contains_key("name"));
    assert!(errors.contains_key("budget"));
}

#[tokio::test]
async fn department_with_courses_cannot_be_deleted() {
    let app = TestApp::new("registrard-departments-guard");
    let department = app.create_department("Engineering").await;
    let course = app.create_course(3141, "Trigonometry", department).await;
    app.create_course(2021, "Composition", department).await;

    let check = app
        .get(&format!("/api/departments/{department}/can-delete"))
        .await;
    assert_eq!(check.body["canDelete"], false);
    assert_eq!(check.body["dependentCount"], 2);

    let refused = app.delete(&format!("/api/departments/{department}")).await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        refused.body["detail"],
        "Cannot delete department Engineering because it has 2 course(s). Reassign or remove the courses first."
    );

    assert_eq!(
        app.delete(&format!("/api/courses/{course}")).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.delete("/api/courses/2021").await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.delete(&format!("/api/departments/{department}")).await.status,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn departments_are_listed_by_name() {
    let app = TestApp::new("registrard-departments-order");
    app.create_department("Mathematics").await;
    app.create_department("Economics").await;
    app.create_department("English").await;

    let page = app.get("/api/departments").await;
    let names: Vec<&str> = page.body["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|d| d["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Economics", "English", "Mathematics"]);

    let search = app.get("/api/departments?searchString=math").await;
    assert_eq!(search.body["totalCount"], 1);
}

#[tokio::test]
async fn removing_administrator_moves_department_row_version() {
    let app = TestApp::new("registrard-departments-admin-removed");
    let instructor = app.create_instructor("Abercrombie", "Kim").await;
    let created = app
        .post(
            "/api/departments",
            json!({
                "name": "English",
                "budget": 350000.0,
                "startDate": "2007-09-01",
                "instructorId": instructor
            }),
        )
        .await;
    let id = created.id("departmentId");
    let stale = created.row_version();

    assert_eq!(
        app.delete(&format!("/api/instructors/{instructor}")).await.status,
        StatusCode::NO_CONTENT
    );

    let current = app.get(&format!("/api/departments/{id}")).await;
    assert!(current.body["instructorId"].is_null());
    assert!(current.body["administratorName"].is_null());
    assert_ne!(current.row_version(), stale);

    let edit = app
        .put(
            &format!("/api/departments/{id}"),
            json!({
                "name": "English Literature",
                "budget": 350000.0,
                "startDate": "2007-09-01",
                "instructorId": instructor,
                "rowVersion": stale
            }),
        )
        .await;
    assert_eq!(edit.status, StatusCode::BAD_REQUEST);

    let edit = app
        .put(
            &format!("/api/departments/{id}"),
            json!({
                "name": "English Literature",
                "budget": 350000.0,
                "startDate": "2007-09-01",
                "rowVersion": stale
            }),
        )
        .await;
    assert_eq!(edit.status, StatusCode::CONFLICT);
}
