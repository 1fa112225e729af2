use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION},
    response::IntoResponse,
    routing::get,
};
use tokio_util::sync::CancellationToken;

use crate::auth::{Caller, RequireAuth};
use crate::error;
use crate::robot::{CreateRobot, ListQuery, RequestContext, RobotManager, UpdateRobot};
use crate::server::AppState;
use crate::server::dto::{
    CreateRobotRequest, CreatedRobotResponse, ListRobotsParams, RobotResponse, UpdateRobotRequest,
};
use crate::server::response::{ApiError, ApiResponse};

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

pub fn robot_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/{project}/robots",
            get(list_robots).post(create_robot),
        )
        .route(
            "/projects/{project}/robots/{robot_id}",
            get(get_robot).put(update_robot).delete(delete_robot),
        )
}

/// Runs a robot operation on the blocking pool under the request deadline.
///
/// The context is cancelled when the deadline passes or when the handler
/// future is dropped, e.g. because the client disconnected.
async fn run<T, F>(state: &AppState, caller: Caller, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&RobotManager, &RequestContext) -> error::Result<T> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let ctx = RequestContext::with_cancellation(caller, cancel);
    let robots = state.robots.clone();

    let task = tokio::task::spawn_blocking(move || op(robots.as_ref(), &ctx));

    match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(e)) => {
            tracing::error!("Robot operation panicked: {e}");
            Err(ApiError::internal("Internal server error"))
        }
        Err(_) => {
            tracing::warn!(
                "Robot operation exceeded {}ms deadline",
                state.request_timeout.as_millis()
            );
            Err(ApiError::unavailable("request timed out"))
        }
    }
}

pub async fn create_robot(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    Json(req): Json<CreateRobotRequest>,
) -> impl IntoResponse {
    let req = CreateRobot {
        name: req.name,
        description: req.description,
        expires_at: req.expires_at,
        access: req.access,
    };

    let target = project.clone();
    let created = run(&state, caller, move |robots, ctx| {
        robots.create(ctx, &target, req)
    })
    .await?;

    let location = format!("/api/v2.0/projects/{project}/robots/{}", created.robot.id);
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(LOCATION, value);
    }

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        headers,
        Json(ApiResponse::success(CreatedRobotResponse::from(created))),
    ))
}

pub async fn list_robots(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    Query(params): Query<ListRobotsParams>,
) -> impl IntoResponse {
    let query =
        ListQuery::new(params.q, params.page, params.page_size).map_err(ApiError::from)?;

    let list = run(&state, caller, move |robots, ctx| {
        robots.list(ctx, &project, &query)
    })
    .await?;

    let mut headers = HeaderMap::new();
    headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(list.total_count));

    let items: Vec<RobotResponse> = list.items.into_iter().map(RobotResponse::from).collect();

    Ok::<_, ApiError>((headers, Json(ApiResponse::success(items))))
}

pub async fn get_robot(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project, robot_id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let robot = run(&state, caller, move |robots, ctx| {
        robots.get(ctx, &project, robot_id)
    })
    .await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(RobotResponse::from(robot))))
}

pub async fn update_robot(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project, robot_id)): Path<(String, i64)>,
    Json(req): Json<UpdateRobotRequest>,
) -> impl IntoResponse {
    let req = UpdateRobot {
        disabled: req.disable,
        description: req.description,
    };

    run(&state, caller, move |robots, ctx| {
        robots.update(ctx, &project, robot_id, req)
    })
    .await?;

    Ok::<_, ApiError>(StatusCode::OK)
}

pub async fn delete_robot(
    RequireAuth(caller): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project, robot_id)): Path<(String, i64)>,
) -> impl IntoResponse {
    run(&state, caller, move |robots, ctx| {
        robots.delete(ctx, &project, robot_id)
    })
    .await?;

    Ok::<_, ApiError>(StatusCode::OK)
}
