use axum::{extract::State, http::StatusCode, response::Json};
use diesel::{connection::SimpleConnection, pg::PgConnection};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.db().map(|mut conn| ping(&mut conn)) {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "ok" }))),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "database ping failed");
            unavailable()
        }
        Err(err) => {
            tracing::warn!(error = %err.message(), "database pool unavailable");
            unavailable()
        }
    }
}

fn ping(conn: &mut PgConnection) -> diesel::QueryResult<()> {
    conn.batch_execute("SELECT 1")
}

fn unavailable() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "degraded", "database": "unreachable" })),
    )
}
