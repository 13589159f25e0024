//! Router, handlers and server lifecycle.

use axum::{
    Router,
    extract::{FromRequest, Path, Query, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::Caller;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::referrals::ReferralService;
use crate::tracking::TaskService;
use crate::types::{
    AddTask, AnnotatedTask, DateRange, MemberStatus, MemberTasks, NewReferral, Referral,
    ReferralPatch, StartTask, TaskPatch, TaskRecord, User, UserSummary,
};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
    pub referrals: Arc<ReferralService>,
}

impl AppState {
    pub fn new(tasks: Arc<TaskService>, referrals: Arc<ReferralService>) -> Self {
        Self { tasks, referrals }
    }
}

/// JSON body extractor whose rejections use the API error shape.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::new(ErrorCode::ValidationError, rejection.body_text())
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeParams {
    start_date: Option<String>,
    end_date: Option<String>,
    user_id: Option<String>,
}

fn parse_date(field: &str, value: &str) -> ApiResult<NaiveDate> {
    // Accept full timestamps by keeping only the date part.
    let date = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        ApiError::invalid_value(field, format!("{} must be a YYYY-MM-DD date", field))
    })
}

impl RangeParams {
    fn optional_range(&self) -> ApiResult<Option<DateRange>> {
        match (&self.start_date, &self.end_date) {
            (None, None) => Ok(None),
            _ => self.range().map(Some),
        }
    }

    fn range(&self) -> ApiResult<DateRange> {
        let from = self
            .start_date
            .as_deref()
            .ok_or_else(|| ApiError::missing_field("startDate"))?;
        let to = self
            .end_date
            .as_deref()
            .ok_or_else(|| ApiError::missing_field("endDate"))?;
        Ok(DateRange {
            from: parse_date("startDate", from)?,
            to: parse_date("endDate", to)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    days: Option<u32>,
}

#[derive(Serialize)]
struct QueuesResponse<'a> {
    team: &'a str,
    queues: &'a [String],
}

#[derive(Serialize)]
struct TasksEnvelope {
    tasks: Vec<AnnotatedTask>,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn me(caller: Caller) -> Json<User> {
    Json(caller.user)
}

async fn queues(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    let team = caller.identity.team.as_str();
    let queues = state.tasks.queues().allowed_for(team);
    Json(QueuesResponse { team, queues }).into_response()
}

// ----------------------------------------------------------------------------
// Tasks
// ----------------------------------------------------------------------------

async fn start_task(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(body): ApiJson<StartTask>,
) -> ApiResult<(StatusCode, Json<TaskRecord>)> {
    let task = state.tasks.start(&caller.identity, body)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn complete_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskRecord>> {
    Ok(Json(state.tasks.complete(&caller.identity, &task_id)?))
}

async fn edit_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<TaskRecord>> {
    Ok(Json(state.tasks.edit(&caller.identity, &task_id, patch)?))
}

async fn delete_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.tasks.delete(&caller.identity, &task_id)?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

async fn today_tasks(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    Ok(Json(state.tasks.today(&caller.identity)?))
}

async fn recent_tasks(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<RecentParams>,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    Ok(Json(
        state.tasks.trailing_window(&caller.identity, params.days)?,
    ))
}

async fn own_tasks(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<RangeParams>,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    let range = params.optional_range()?;
    Ok(Json(state.tasks.owner_range(&caller.identity, range)?))
}

async fn add_task_for_member(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<AddTask>,
) -> ApiResult<(StatusCode, Json<TaskRecord>)> {
    let task = state.tasks.admin_add(&caller.identity, &user_id, body)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn current_tasks(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<MemberStatus>>> {
    Ok(Json(state.tasks.current_status(&caller.identity)?))
}

async fn team_members(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.tasks.team_members(&caller.identity)?))
}

async fn tasks_by_team_member(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<RangeParams>,
) -> ApiResult<Json<MemberTasks>> {
    // Role check before parameter validation so non-admins learn nothing.
    if !caller.identity.is_admin() {
        return Err(ApiError::forbidden());
    }
    let user_id = params
        .user_id
        .as_deref()
        .ok_or_else(|| ApiError::missing_field("userId"))?;
    let range = params.range()?;
    Ok(Json(
        state.tasks.member_range(&caller.identity, user_id, range)?,
    ))
}

async fn all_tasks_by_date(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<RangeParams>,
) -> ApiResult<Json<TasksEnvelope>> {
    if !caller.identity.is_admin() {
        return Err(ApiError::forbidden());
    }
    let range = params.range()?;
    let tasks = state.tasks.all_in_range(&caller.identity, range)?;
    Ok(Json(TasksEnvelope { tasks }))
}

// ----------------------------------------------------------------------------
// Referrals
// ----------------------------------------------------------------------------

async fn list_referrals(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Referral>>> {
    Ok(Json(state.referrals.list(&caller.identity)?))
}

async fn create_referral(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(body): ApiJson<NewReferral>,
) -> ApiResult<(StatusCode, Json<Referral>)> {
    let referral = state.referrals.create(&caller.identity, body)?;
    Ok((StatusCode::CREATED, Json(referral)))
}

async fn update_referral(
    State(state): State<AppState>,
    caller: Caller,
    Path(referral_id): Path<String>,
    ApiJson(patch): ApiJson<ReferralPatch>,
) -> ApiResult<Json<Referral>> {
    Ok(Json(
        state
            .referrals
            .update(&caller.identity, &referral_id, patch)?,
    ))
}

async fn delete_referral(
    State(state): State<AppState>,
    caller: Caller,
    Path(referral_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.referrals.delete(&caller.identity, &referral_id)?;
    Ok(Json(json!({ "message": "Referral deleted successfully" })))
}

async fn referrals_due(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Referral>>> {
    Ok(Json(state.referrals.due_for_update(&caller.identity)?))
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/me", get(me))
        .route("/api/queues", get(queues))
        // Task routes
        .route("/api/tasks", get(own_tasks).post(start_task))
        .route("/api/tasks/today", get(today_tasks))
        .route("/api/tasks/recent", get(recent_tasks))
        .route("/api/tasks/complete/{task_id}", put(complete_task))
        .route("/api/tasks/add-task/{user_id}", post(add_task_for_member))
        .route("/api/tasks/current-tasks", get(current_tasks))
        .route("/api/tasks/team-members", get(team_members))
        .route("/api/tasks/tasks-by-team-member", get(tasks_by_team_member))
        .route("/api/tasks/all-tasks-by-date", get(all_tasks_by_date))
        .route(
            "/api/tasks/{task_id}",
            put(edit_task).delete(delete_task),
        )
        // Referral routes
        .route(
            "/api/referrals",
            get(list_referrals).post(create_referral),
        )
        .route("/api/referrals/due-today", get(referrals_due))
        .route(
            "/api/referrals/{referral_id}",
            put(update_referral).delete(delete_referral),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until `shutdown` flips to true or its sender is dropped.
pub async fn start_server(
    state: AppState,
    host: &str,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Workforce tracker listening on http://{}", bound_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
            info!("HTTP server shutting down");
        })
        .await?;

    Ok(())
}
