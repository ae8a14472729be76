use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use clap::Parser;
use fooder::algorithms::{EngineError, NeighborGraphs};
use fooder::services::recommendation::ServiceError;
use fooder::services::session::SessionError;
use fooder::utils::validation::validate_config;
use fooder::{init_tracing, AppState, Config};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    dish: fooder::DishType,
    user_id: Option<fooder::UserId>,
}

#[derive(Debug, Deserialize)]
struct RateRequest {
    rating: fooder::Rating,
}

#[derive(Debug, Serialize)]
struct RateResponse {
    recipe_id: fooder::RecipeId,
    rating: fooder::Rating,
    previous: Option<fooder::Rating>,
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn error_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::Engine(EngineError::InvalidInput(_)) | ServiceError::WrongDish { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::Session(SessionError::NotFound(_))
        | ServiceError::Session(SessionError::NotRated { .. })
        | ServiceError::UnknownRecipe(_) => StatusCode::NOT_FOUND,
        ServiceError::CatalogExhausted(_) => StatusCode::CONFLICT,
        ServiceError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::warn!("Request rejected: {}", err);
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "fooder".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    status.insert("sessions".to_string(), state.sessions.len().to_string());
    status.insert("recipes".to_string(), state.store.catalog().len().to_string());

    Json(ApiResponse::success(status))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<fooder::RecipeId>,
) -> ApiResult<fooder::Recipe> {
    state
        .store
        .recipe(recipe_id)
        .cloned()
        .map(|recipe| Json(ApiResponse::success(recipe)))
        .ok_or_else(|| error_response(ServiceError::UnknownRecipe(recipe_id)))
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Json<ApiResponse<fooder::ActiveUserProfile>> {
    let profile = state.sessions.create(request.dish, request.user_id);
    Json(ApiResponse::success(profile))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<fooder::ActiveUserProfile> {
    state
        .sessions
        .profile(session_id)
        .map(|profile| Json(ApiResponse::success(profile)))
        .map_err(|e| error_response(e.into()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<String> {
    if state.sessions.remove(session_id) {
        Ok(Json(ApiResponse::success("Session closed".to_string())))
    } else {
        Err(error_response(SessionError::NotFound(session_id).into()))
    }
}

async fn rate_recipe(
    State(state): State<AppState>,
    Path((session_id, recipe_id)): Path<(Uuid, fooder::RecipeId)>,
    Json(request): Json<RateRequest>,
) -> ApiResult<RateResponse> {
    match state
        .recommendation_service
        .rate_recipe(session_id, recipe_id, request.rating)
    {
        Ok(previous) => Ok(Json(ApiResponse::success(RateResponse {
            recipe_id,
            rating: request.rating,
            previous,
        }))),
        Err(e) => Err(error_response(e)),
    }
}

async fn unrate_recipe(
    State(state): State<AppState>,
    Path((session_id, recipe_id)): Path<(Uuid, fooder::RecipeId)>,
) -> ApiResult<fooder::Rating> {
    state
        .sessions
        .unrate(session_id, recipe_id)
        .map(|rating| Json(ApiResponse::success(rating)))
        .map_err(|e| error_response(e.into()))
}

async fn next_recipe(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<NextQuery>,
) -> ApiResult<fooder::NextRecipe> {
    match state.recommendation_service.next_recipe(session_id, params.k).await {
        Ok(next) => Ok(Json(ApiResponse::success(next))),
        Err(e) => Err(error_response(e)),
    }
}

async fn neighbor_graphs(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<NeighborGraphs> {
    match state.recommendation_service.neighbor_graphs(session_id).await {
        Ok(graphs) => Ok(Json(ApiResponse::success(graphs))),
        Err(e) => Err(error_response(e)),
    }
}

async fn neighbor_summaries(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Vec<fooder::NeighborSummary>> {
    match state.recommendation_service.neighbor_summaries(session_id).await {
        Ok(summaries) => Ok(Json(ApiResponse::success(summaries))),
        Err(e) => Err(error_response(e)),
    }
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recipes/:recipe_id", get(get_recipe))
        .route("/sessions", post(create_session))
        .route("/sessions/:session_id", get(get_session).delete(delete_session))
        .route(
            "/sessions/:session_id/ratings/:recipe_id",
            put(rate_recipe).delete(unrate_recipe),
        )
        .route("/sessions/:session_id/next", get(next_recipe))
        .route("/sessions/:session_id/graphs", get(neighbor_graphs))
        .route("/sessions/:session_id/neighbors", get(neighbor_summaries))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    std::env::set_var("RUST_LOG", &args.log_level);

    let config = Config::load_or_default(&args.config)?;
    validate_config(&config)?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()?
        .block_on(serve(args, config))
}

async fn serve(args: Args, config: Config) -> anyhow::Result<()> {
    init_tracing().await;
    info!(
        "Starting fooder recommendation server ({}) with config: {:?}",
        args.config, config.server
    );

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
