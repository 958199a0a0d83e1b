mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{acquire_db_lock, json_body, TestApp};
use fluxo::status::SurveyStatus;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct Badge {
    label: String,
    urgent: bool,
}

#[derive(Deserialize)]
struct SurveyResponse {
    id: i64,
    status: SurveyStatus,
    column: String,
    badge: Badge,
    needed_date: Option<NaiveDate>,
    admin_deadline: Option<NaiveDate>,
    mine: bool,
}

#[derive(Deserialize)]
struct DeadlineOverview {
    pending: Vec<SurveyResponse>,
    scheduled: Vec<SurveyResponse>,
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
}

#[tokio::test]
async fn submitting_picks_initial_status_from_urgency() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("ana@fluxo.test", "Ana", "secret1", "user")
        .await?;
    let token = app.login_token("ana@fluxo.test", "secret1").await?;
    let contract = app.insert_contract("CT-1", "Operations").await?;

    let response = app
        .post_json(
            "/api/surveys",
            &json!({
                "contract_id": contract,
                "requester": "Ana Lima",
                "needed_date": "2025-05-20",
                "request_text": "Weekly sales panel",
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let regular: SurveyResponse = json_body(response).await?;
    assert_eq!(regular.status, SurveyStatus::Submitted);
    assert_eq!(regular.column, "OPEN");
    assert!(regular.mine);
    assert!(!regular.badge.urgent);

    let response = app
        .post_json(
            "/api/surveys",
            &json!({
                "contract_id": contract,
                "requester": "Ana Lima",
                "needed_date": "2025-05-10",
                "request_text": "Board meeting numbers",
                "urgent": true,
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let urgent: SurveyResponse = json_body(response).await?;
    assert_eq!(urgent.status, SurveyStatus::UrgentReview);
    assert!(urgent.badge.urgent);
    assert_eq!(urgent.badge.label, "Open");

    let response = app
        .post_json(
            "/api/surveys",
            &json!({ "contract_id": contract, "requester": "  ", "needed_date": "2025-05-10", "request_text": "x" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/surveys",
            &json!({ "contract_id": 999, "requester": "Ana", "needed_date": "2025-05-10", "request_text": "x" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listed: Vec<SurveyResponse> = json_body(
        app.get(&format!("/api/surveys?contract_id={contract}"), Some(&token))
            .await?,
    )
    .await?;
    assert_eq!(listed.len(), 2);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn status_writes_are_limited_to_own_rows() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let owner = app
        .insert_user("owner@fluxo.test", "Owner", "secret1", "user")
        .await?;
    app.insert_user("stranger@fluxo.test", "Stranger", "secret1", "user")
        .await?;
    app.insert_user("admin@fluxo.test", "Admin", "secret1", "admin")
        .await?;
    let owner_token = app.login_token("owner@fluxo.test", "secret1").await?;
    let stranger_token = app.login_token("stranger@fluxo.test", "secret1").await?;
    let admin_token = app.login_token("admin@fluxo.test", "secret1").await?;

    let contract = app.insert_contract("CT-2", "Finance").await?;
    let survey = app
        .insert_survey(contract, owner, SurveyStatus::Submitted, Some(date(12)))
        .await?;
    let path = format!("/api/surveys/{survey}/status");

    let response = app
        .patch_json(&path, &json!({ "status": "CANCELLED" }), Some(&stranger_token))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.survey_status(survey).await?, SurveyStatus::Submitted);

    let response = app
        .patch_json(&path, &json!({ "status": "CANCELLED" }), Some(&owner_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled: SurveyResponse = json_body(response).await?;
    assert_eq!(cancelled.status, SurveyStatus::Cancelled);
    assert_eq!(cancelled.column, "CANCELLED");

    let response = app
        .patch_json(&path, &json!({ "status": "SCHEDULING" }), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.survey_status(survey).await?, SurveyStatus::Scheduling);

    let response = app
        .patch_json(&path, &json!({ "status": "ARCHIVED" }), Some(&admin_token))
        .await?;
    assert!(response.status().is_client_error());

    let response = app
        .patch_json(
            &format!("/api/surveys/{survey}/schedule"),
            &json!({ "needed_date": "2025-05-30" }),
            Some(&owner_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let scheduled: SurveyResponse = json_body(response).await?;
    assert_eq!(scheduled.status, SurveyStatus::Scheduled);
    assert_eq!(scheduled.needed_date, Some(date(30)));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn admin_deadlines_split_pending_and_scheduled() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let user = app
        .insert_user("user@fluxo.test", "User", "secret1", "user")
        .await?;
    app.insert_user("admin@fluxo.test", "Admin", "secret1", "admin")
        .await?;
    let user_token = app.login_token("user@fluxo.test", "secret1").await?;
    let admin_token = app.login_token("admin@fluxo.test", "secret1").await?;

    let contract = app.insert_contract("CT-3", "Logistics").await?;
    let later = app
        .insert_survey(contract, user, SurveyStatus::Submitted, Some(date(25)))
        .await?;
    let sooner = app
        .insert_survey(contract, user, SurveyStatus::Submitted, Some(date(5)))
        .await?;

    let response = app.get("/api/admin/deadlines", Some(&user_token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .patch_json(
            &format!("/api/admin/surveys/{later}/deadline"),
            &json!({ "admin_deadline": "2025-05-22", "schedule": true }),
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: SurveyResponse = json_body(response).await?;
    assert_eq!(updated.admin_deadline, Some(date(22)));
    assert_eq!(updated.status, SurveyStatus::Scheduled);

    let overview: DeadlineOverview =
        json_body(app.get("/api/admin/deadlines", Some(&admin_token)).await?).await?;
    let pending: Vec<_> = overview.pending.iter().map(|s| s.id).collect();
    let scheduled: Vec<_> = overview.scheduled.iter().map(|s| s.id).collect();
    assert_eq!(pending, [sooner]);
    assert_eq!(scheduled, [later]);

    let response = app
        .patch_json(
            &format!("/api/admin/surveys/{later}/deadline"),
            &json!({ "admin_deadline": null }),
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared: SurveyResponse = json_body(response).await?;
    assert_eq!(cleared.admin_deadline, None);
    assert_eq!(cleared.status, SurveyStatus::Scheduled);

    let response = app
        .patch_json(
            &format!("/api/admin/surveys/{later}/deadline"),
            &json!({}),
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .patch_json(
            "/api/admin/surveys/9999/deadline",
            &json!({ "admin_deadline": "2025-05-22" }),
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}
