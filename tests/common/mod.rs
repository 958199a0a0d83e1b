use std::env;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use fluxo::auth::jwt::JwtService;
use fluxo::config::AppConfig;
use fluxo::db::{self, PgPool};
use fluxo::kanban::DEFAULT_COMPLETED_RETENTION_DAYS;
use fluxo::models::{NewContract, NewSurvey, NewUser};
use fluxo::routes;
use fluxo::schema::{contracts, surveys, users};
use fluxo::state::AppState;
use fluxo::status::SurveyStatus;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[allow(dead_code)]
pub const ADMIN_EMAIL: &str = "admin@fluxo.test";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            refresh_token_expiry_days: 30,
            refresh_cookie_secure: false,
            refresh_cookie_domain: None,
            cors_allowed_origin: None,
            admin_emails: vec![ADMIN_EMAIL.to_string()],
            completed_retention_days: DEFAULT_COMPLETED_RETENTION_DAYS,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    pub async fn insert_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: &str,
    ) -> Result<Uuid> {
        let user = NewUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: hash_password(password)?,
            role: role.to_string(),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_contract(&self, code: &str, title: &str) -> Result<i64> {
        let contract = NewContract {
            code: code.to_string(),
            title: title.to_string(),
            created_by: None,
        };
        self.with_conn(move |conn| {
            diesel::insert_into(contracts::table)
                .values(&contract)
                .returning(contracts::id)
                .get_result(conn)
                .context("failed to insert contract")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_survey(
        &self,
        contract_id: i64,
        created_by: Uuid,
        status: SurveyStatus,
        needed_date: Option<NaiveDate>,
    ) -> Result<i64> {
        let survey = NewSurvey {
            contract_id,
            status: status.as_str().to_string(),
            urgent: status == SurveyStatus::UrgentReview,
            created_by,
            requester: Some("Field team".to_string()),
            request_text: Some("Quarterly report".to_string()),
            needed_date,
        };
        self.with_conn(move |conn| {
            diesel::insert_into(surveys::table)
                .values(&survey)
                .returning(surveys::id)
                .get_result(conn)
                .context("failed to insert survey")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn survey_status(&self, survey_id: i64) -> Result<SurveyStatus> {
        let raw: String = self
            .with_conn(move |conn| {
                surveys::table
                    .find(survey_id)
                    .select(surveys::status)
                    .first(conn)
                    .context("failed to load survey status")
            })
            .await?;
        raw.parse().map_err(|err| anyhow!("{err}"))
    }

    #[allow(dead_code)]
    pub async fn set_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        let role = role.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(users::table.find(user_id))
                .set(users::role.eq(role))
                .execute(conn)
                .context("failed to update role")?;
            ensure!(updated == 1, "user {user_id} not found");
            Ok(())
        })
        .await
    }

    /// Moves a survey's completion timestamp `days` into the past.
    #[allow(dead_code)]
    pub async fn backdate_completion(&self, survey_id: i64, days: i64) -> Result<()> {
        let completed_at = (Utc::now() - Duration::days(days)).naive_utc();
        self.with_conn(move |conn| {
            let updated = diesel::update(surveys::table.find(survey_id))
                .set(surveys::completed_at.eq(Some(completed_at)))
                .execute(conn)
                .context("failed to backdate completion")?;
            ensure!(updated == 1, "survey {survey_id} not found");
            Ok(())
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/api/auth/login", &LoginPayload { email, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = json_body(response).await?;
        Ok(parsed.access_token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn json_body<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).context("failed to decode response body")
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE surveys, contracts, refresh_tokens, users RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::Argon2;

    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string())
}
