//! services/kitchen/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::session::StartOptions;
use crate::training::TrainingError;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sous_core::domain::{
    DataCollectionPreferences, ManualParsing, RecipeIngredient, RecipeRef, RecipeStep, Token,
};
use sous_core::parsing::{auto_assign, fill_unassigned, step_timer_secs};
use sous_core::session::{CompletionSummary, SessionView};
use sous_core::sync::{original_content_map, resync};
use sous_core::training::TrainingExport;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_session_handler,
        start_session_handler,
        end_session_handler,
        pause_session_handler,
        resume_session_handler,
        history_handler,
        segment_handler,
        structure_handler,
        resync_handler,
        export_training_handler,
        import_training_handler,
        save_example_handler,
        clear_examples_handler,
        delete_example_handler,
        get_preferences_handler,
        put_preferences_handler,
    ),
    components(
        schemas(StartSessionRequest, SegmentRequest, PreferencesBody, ImportResponse)
    ),
    tags(
        (name = "Sous Kitchen API", description = "Cooking sessions, ingredient structuring and training data.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Starts a cooking session for a recipe.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub recipe_id: String,
    pub title: String,
    pub step_count: usize,
    /// One-based step to begin on. Defaults to the first step.
    pub start_step: Option<usize>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EndSessionQuery {
    /// Record the session in the history list. Defaults to true.
    pub save: Option<bool>,
}

/// The outcome of a session command along with the resulting view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub accepted: bool,
    pub view: SessionView,
}

#[derive(Deserialize, ToSchema)]
pub struct SegmentRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SegmentResponse {
    pub tokens: Vec<Token>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureRequest {
    pub original_text: String,
    pub tokens: Vec<Token>,
    /// Fill untouched tokens with the heuristics before structuring.
    #[serde(default)]
    pub auto_fill: bool,
    /// When given, a recipe step is seeded from the action tokens.
    #[serde(default)]
    pub ingredient_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureResponse {
    pub display_text: String,
    pub manual_parsing: ManualParsing,
    pub seeded_step: Option<RecipeStep>,
    /// Timer length for the seeded step, read from its timing phrase.
    pub suggested_timer_secs: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncRequest {
    pub steps: Vec<RecipeStep>,
    pub ingredients: Vec<RecipeIngredient>,
    /// Step texts as first written, keyed by step id. Defaults to the current texts.
    #[serde(default)]
    pub original_content: Option<HashMap<String, String>>,
}

#[derive(Serialize)]
pub struct ResyncResponse {
    pub steps: Vec<RecipeStep>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveExampleRequest {
    pub original_text: String,
    pub tokens: Vec<Token>,
}

#[derive(Serialize, ToSchema)]
pub struct ImportResponse {
    pub imported: usize,
}

/// Mirror of the stored preferences for the OpenAPI document.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesBody {
    pub manual_parsing_enabled: bool,
    pub session_history_enabled: bool,
}

impl From<DataCollectionPreferences> for PreferencesBody {
    fn from(p: DataCollectionPreferences) -> Self {
        Self {
            manual_parsing_enabled: p.manual_parsing_enabled,
            session_history_enabled: p.session_history_enabled,
        }
    }
}

impl From<PreferencesBody> for DataCollectionPreferences {
    fn from(p: PreferencesBody) -> Self {
        Self {
            manual_parsing_enabled: p.manual_parsing_enabled,
            session_history_enabled: p.session_history_enabled,
        }
    }
}

type HandlerResult<T> = Result<T, (StatusCode, String)>;

fn command_response(app_state: &AppState, accepted: bool, ok: StatusCode) -> impl IntoResponse {
    let status = if accepted { ok } else { StatusCode::CONFLICT };
    (
        status,
        Json(CommandResponse {
            accepted,
            view: app_state.sessions.view(),
        }),
    )
}

fn training_failure(e: TrainingError) -> (StatusCode, String) {
    match e {
        TrainingError::CollectionDisabled => (
            StatusCode::FORBIDDEN,
            "Manual parsing collection is disabled".to_string(),
        ),
        TrainingError::Port(inner) => {
            error!("Training store failure: {:?}", inner);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Training store failure".to_string(),
            )
        }
    }
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// The current session view.
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Derived session view"))
)]
pub async fn get_session_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.sessions.view())
}

/// Start cooking a recipe. Only one session may be live at a time.
#[utoipa::path(
    post,
    path = "/session",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started"),
        (status = 400, description = "Step numbers start at 1"),
        (status = 409, description = "A session is already live or the request is invalid")
    )
)]
pub async fn start_session_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<StartSessionRequest>,
) -> HandlerResult<impl IntoResponse> {
    let start_step_index = request.start_step.unwrap_or(1).checked_sub(1).ok_or_else(|| {
        warn!("Rejected session start at step 0.");
        (StatusCode::BAD_REQUEST, "Step numbers start at 1".to_string())
    })?;
    let recipe = RecipeRef {
        id: request.recipe_id,
        title: request.title,
        step_count: request.step_count,
    };
    let options = StartOptions {
        start_step_index,
        session_id: None,
    };
    let accepted = app_state.sessions.start_session(recipe, options).await;
    Ok(command_response(&app_state, accepted, StatusCode::CREATED))
}

/// End the live session.
#[utoipa::path(
    delete,
    path = "/session",
    params(EndSessionQuery),
    responses(
        (status = 200, description = "Session ended"),
        (status = 409, description = "No live session")
    )
)]
pub async fn end_session_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<EndSessionQuery>,
) -> impl IntoResponse {
    let accepted = app_state
        .sessions
        .end_session(query.save.unwrap_or(true))
        .await;
    command_response(&app_state, accepted, StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/session/pause",
    responses(
        (status = 200, description = "Session paused"),
        (status = 409, description = "No active session to pause")
    )
)]
pub async fn pause_session_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let accepted = app_state.sessions.pause_session().await;
    command_response(&app_state, accepted, StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/session/resume",
    responses(
        (status = 200, description = "Session resumed"),
        (status = 409, description = "No paused session to resume")
    )
)]
pub async fn resume_session_handler(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let accepted = app_state.sessions.resume_session().await;
    command_response(&app_state, accepted, StatusCode::OK)
}

/// Finished sessions, newest first.
#[utoipa::path(
    get,
    path = "/session/history",
    responses(
        (status = 200, description = "Completion summaries"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn history_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<Json<Vec<CompletionSummary>>> {
    app_state.sessions.history().await.map(Json).map_err(|e| {
        error!("Failed to load session history: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load session history".to_string(),
        )
    })
}

//=========================================================================================
// Ingredient and Step Handlers
//=========================================================================================

/// Split a raw ingredient line into tokens with suggested roles.
#[utoipa::path(
    post,
    path = "/ingredients/segment",
    request_body = SegmentRequest,
    responses((status = 200, description = "Tokens with suggested types"))
)]
pub async fn segment_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SegmentRequest>,
) -> impl IntoResponse {
    let tokens = auto_assign(&request.text, app_state.heuristics.as_ref());
    Json(SegmentResponse { tokens })
}

/// Turn a typed token list into a structured ingredient.
#[utoipa::path(
    post,
    path = "/ingredients/structure",
    request_body(content_type = "application/json", description = "Original text and typed tokens."),
    responses(
        (status = 200, description = "Structured ingredient and optional seeded step"),
        (status = 400, description = "No tokens supplied")
    )
)]
pub async fn structure_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<StructureRequest>,
) -> HandlerResult<Json<StructureResponse>> {
    if request.tokens.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one token is required".to_string(),
        ));
    }
    let heuristics = app_state.heuristics.as_ref();
    let tokens = if request.auto_fill {
        fill_unassigned(&request.tokens, heuristics)
    } else {
        request.tokens
    };
    let manual_parsing = ManualParsing::from_tokens(&request.original_text, &tokens);
    let seeded_step = request.ingredient_id.and_then(|ingredient_id| {
        manual_parsing.seed_step(Uuid::new_v4().to_string(), ingredient_id, heuristics)
    });
    let suggested_timer_secs = seeded_step
        .as_ref()
        .and_then(|step| step_timer_secs(step, heuristics));
    Ok(Json(StructureResponse {
        display_text: manual_parsing.display_text(),
        manual_parsing,
        seeded_step,
        suggested_timer_secs,
    }))
}

/// Rewrite step text so first mentions carry full ingredient amounts.
#[utoipa::path(
    post,
    path = "/steps/resync",
    request_body(content_type = "application/json", description = "Steps, ingredients and optional original step texts."),
    responses((status = 200, description = "Synchronized steps"))
)]
pub async fn resync_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ResyncRequest>,
) -> impl IntoResponse {
    let original_content = request
        .original_content
        .unwrap_or_else(|| original_content_map(&request.steps));
    let steps = resync(
        &request.steps,
        &request.ingredients,
        &original_content,
        app_state.heuristics.as_ref(),
    );
    Json(ResyncResponse { steps })
}

//=========================================================================================
// Training Data Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/training/export",
    responses(
        (status = 200, description = "Training export document"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn export_training_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<Json<TrainingExport>> {
    app_state
        .training
        .export()
        .await
        .map(Json)
        .map_err(training_failure)
}

#[utoipa::path(
    post,
    path = "/training/import",
    request_body(content_type = "application/json", description = "A training export document."),
    responses(
        (status = 200, description = "Examples merged by id", body = ImportResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn import_training_handler(
    State(app_state): State<Arc<AppState>>,
    Json(document): Json<TrainingExport>,
) -> HandlerResult<Json<ImportResponse>> {
    let imported = app_state
        .training
        .import(document)
        .await
        .map_err(training_failure)?;
    Ok(Json(ImportResponse { imported }))
}

#[utoipa::path(
    post,
    path = "/training/examples",
    request_body(content_type = "application/json", description = "Original text and the user's token assignment."),
    responses(
        (status = 201, description = "Example stored"),
        (status = 403, description = "Manual parsing collection is disabled")
    )
)]
pub async fn save_example_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SaveExampleRequest>,
) -> HandlerResult<impl IntoResponse> {
    let example = app_state
        .training
        .record(&request.original_text, &request.tokens)
        .await
        .map_err(training_failure)?;
    Ok((StatusCode::CREATED, Json(example)))
}

#[utoipa::path(
    delete,
    path = "/training/examples",
    responses((status = 204, description = "All examples removed"))
)]
pub async fn clear_examples_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<StatusCode> {
    app_state
        .training
        .clear()
        .await
        .map_err(training_failure)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/training/examples/{id}",
    params(("id" = String, Path, description = "Example id")),
    responses(
        (status = 204, description = "Example removed"),
        (status = 404, description = "No example with that id")
    )
)]
pub async fn delete_example_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    let removed = app_state
        .training
        .delete(&id)
        .await
        .map_err(training_failure)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("No example with id {}", id)))
    }
}

#[utoipa::path(
    get,
    path = "/preferences",
    responses((status = 200, description = "Data collection preferences", body = PreferencesBody))
)]
pub async fn get_preferences_handler(
    State(app_state): State<Arc<AppState>>,
) -> HandlerResult<Json<PreferencesBody>> {
    let preferences = app_state
        .training
        .preferences()
        .await
        .map_err(training_failure)?;
    Ok(Json(preferences.into()))
}

#[utoipa::path(
    put,
    path = "/preferences",
    request_body = PreferencesBody,
    responses((status = 200, description = "Preferences stored", body = PreferencesBody))
)]
pub async fn put_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<PreferencesBody>,
) -> HandlerResult<Json<PreferencesBody>> {
    let preferences: DataCollectionPreferences = body.into();
    app_state
        .training
        .set_preferences(&preferences)
        .await
        .map_err(training_failure)?;
    Ok(Json(preferences.into()))
}
