//! Scheduling API routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use common::error::SchedulingError;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::{AuthUser, auth_middleware},
    models::{
        UserRole,
        availability::{CreateBlockRequest, CreateRuleRequest, Slot, SlotQuery},
        meeting::{CreateMeetingRequest, DeclineRequest, RatingRequest},
    },
    resolver,
    state::AppState,
};

/// Create the router for the scheduling service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/availability/rules", post(create_rule).get(list_rules))
        .route("/availability/rules/:id", delete(delete_rule))
        .route("/availability/blocks", post(create_block).get(list_blocks))
        .route("/availability/blocks/:id", delete(delete_block))
        .route("/users/:id/slots", get(get_available_slots))
        .route("/meetings", post(request_meeting).get(list_meetings))
        .route("/meetings/:id", get(get_meeting))
        .route("/meetings/:id/accept", post(accept_meeting))
        .route("/meetings/:id/decline", post(decline_meeting))
        .route("/meetings/:id/cancel", post(cancel_meeting))
        .route("/meetings/:id/rating", post(rate_meeting))
        .route("/analytics/meetings", get(get_meeting_analytics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "scheduler-service"
    }))
}

/// Create an availability rule for the authenticated user
pub async fn create_rule(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state.availability.create_rule(user.id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(rule)))
}

/// List the authenticated user's availability rules
pub async fn list_rules(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let rules = state.availability.list_rules(user.id).await?;
    Ok(Json(rules))
}

/// Delete one of the authenticated user's availability rules
pub async fn delete_rule(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.availability.delete_rule(user.id, id).await?;
    Ok(Json(json!({"message": "Rule deleted successfully"})))
}

/// Create an unavailability block for the authenticated user
pub async fn create_block(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateBlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let block = state.availability.create_block(user.id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(block)))
}

/// List the authenticated user's unavailability blocks
pub async fn list_blocks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let blocks = state.availability.list_blocks(user.id).await?;
    Ok(Json(blocks))
}

/// Delete one of the authenticated user's unavailability blocks
pub async fn delete_block(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.availability.delete_block(user.id, id).await?;
    Ok(Json(json!({"message": "Block deleted successfully"})))
}

/// Bookable slots for a user on a date
pub async fn get_available_slots(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state.users.find_role(id).await?.is_none() {
        return Err(SchedulingError::NotFound("user").into());
    }

    let granularity = query
        .granularity
        .unwrap_or(resolver::DEFAULT_GRANULARITY_MINUTES);
    let slots = state
        .resolver
        .available_slots(id, query.date, granularity)
        .await?;

    let slots: Vec<Slot> = slots.into_iter().map(Slot::from).collect();
    Ok(Json(slots))
}

/// Book a meeting against a free slot
pub async fn request_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateMeetingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meeting = state.lifecycle.request(user.id, &payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(meeting)))
}

/// List the authenticated user's meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let meetings = state.meetings.list_for_user(user.id).await?;
    Ok(Json(meetings))
}

/// Fetch a single meeting; parties only
pub async fn get_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let meeting = state
        .meetings
        .find_by_id(id)
        .await?
        .ok_or(SchedulingError::NotFound("meeting"))?;

    if !meeting.is_party(user.id) {
        return Err(SchedulingError::Authorization(
            "only a meeting party may view a meeting".to_string(),
        )
        .into());
    }

    Ok(Json(meeting))
}

/// Accept a requested meeting (recipient only)
pub async fn accept_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let meeting = state.lifecycle.accept(id, user.id).await?;
    Ok(Json(meeting))
}

/// Decline a requested meeting (recipient only)
pub async fn decline_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeclineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meeting = state.lifecycle.decline(id, user.id, &payload.reason).await?;
    Ok(Json(meeting))
}

/// Cancel a non-terminal meeting (either party, before it starts)
pub async fn cancel_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let meeting = state.lifecycle.cancel(id, user.id).await?;
    Ok(Json(meeting))
}

/// Submit a post-meeting rating (parties of a completed meeting)
pub async fn rate_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = crate::models::meeting::MeetingRating {
        success: payload.success_rating,
        platform: payload.platform_rating,
    };
    let meeting = state.lifecycle.rate(id, user.id, rating).await?;
    Ok(Json(meeting))
}

/// Meeting analytics rollup (admin only)
pub async fn get_meeting_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    if user.role != UserRole::Admin {
        return Err(SchedulingError::Authorization(
            "only administrators may view analytics".to_string(),
        )
        .into());
    }

    let analytics = state.analytics.meeting_analytics().await?;
    Ok(Json(analytics))
}
