use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{auth::AuthenticatedUser, db::PgPool, schema::surveys, status::SurveyStatus};

/// Row returned by a status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedStatus {
    pub id: i64,
    pub status: SurveyStatus,
    pub completed_at: Option<NaiveDateTime>,
}

/// Persists a survey status and reports the rows it actually changed. An empty
/// result means the row policy filtered the write out.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn update_status(&self, survey_id: i64, status: SurveyStatus)
        -> Result<Vec<UpdatedStatus>>;
}

/// Which survey rows an actor may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    Any,
    CreatedBy(Uuid),
}

impl RowPolicy {
    pub fn for_user(user: &AuthenticatedUser) -> Self {
        if user.is_admin() {
            RowPolicy::Any
        } else {
            RowPolicy::CreatedBy(user.user_id)
        }
    }
}

/// `UPDATE surveys SET status = ... WHERE id = ...` restricted by the row
/// policy, returning the updated rows.
pub fn update_status(
    conn: &mut PgConnection,
    survey_id: i64,
    status: SurveyStatus,
    policy: RowPolicy,
) -> Result<Vec<UpdatedStatus>> {
    let now = Utc::now().naive_utc();
    let changes = (
        surveys::status.eq(status.as_str()),
        surveys::updated_at.eq(now),
    );
    let returning = (surveys::id, surveys::status, surveys::completed_at);

    let rows: Vec<(i64, String, Option<NaiveDateTime>)> = match policy {
        RowPolicy::Any => diesel::update(surveys::table.filter(surveys::id.eq(survey_id)))
            .set(changes)
            .returning(returning)
            .get_results(conn)?,
        RowPolicy::CreatedBy(user_id) => diesel::update(
            surveys::table
                .filter(surveys::id.eq(survey_id))
                .filter(surveys::created_by.eq(user_id)),
        )
        .set(changes)
        .returning(returning)
        .get_results(conn)?,
    };

    rows.into_iter()
        .map(|(id, raw_status, completed_at)| {
            let status = raw_status
                .parse()
                .map_err(|err| anyhow!("survey {id} has invalid status: {err}"))?;
            Ok(UpdatedStatus {
                id,
                status,
                completed_at,
            })
        })
        .collect()
}

pub struct PgStatusWriter {
    pool: PgPool,
    policy: RowPolicy,
}

impl PgStatusWriter {
    pub fn new(pool: PgPool, policy: RowPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl StatusWriter for PgStatusWriter {
    async fn update_status(
        &self,
        survey_id: i64,
        status: SurveyStatus,
    ) -> Result<Vec<UpdatedStatus>> {
        let pool = self.pool.clone();
        let policy = self.policy;
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            update_status(&mut conn, survey_id, status, policy)
        })
        .await
        .context("status update task panicked")?
    }
}
