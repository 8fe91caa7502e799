use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::Utc;
use marquee_core::{CatalogPage, InteractionSubmission, Item, MarqueeError, PageParams};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::training::ModelSummary;

/// Query parameters for the recommendation endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    /// Item the user is currently viewing
    pub current_movie_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub catalog: bool,
    pub interactions: bool,
    pub models: ModelSummary,
}

/// GET /api/movies - One catalog page
///
/// Query parameters:
/// - page: 1-based page number (default: 1)
pub async fn list_movies(
    state: web::Data<AppState>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, MarqueeError> {
    let request = params.to_request(state.config.api.page_size)?;
    let rows = state
        .catalog
        .fetch_page(request.offset(), request.fetch_limit())
        .await?;

    let rows: Vec<Item> = rows.into_iter().map(Item::canonicalized).collect();
    Ok(HttpResponse::Ok().json(CatalogPage::from_overfetch(rows, &request)))
}

/// GET /api/recommend/{user_id} - Hybrid recommendations
///
/// Query parameters:
/// - current_movie_id: item being viewed; blank counts as absent
pub async fn recommend(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RecommendQuery>,
) -> Result<HttpResponse, MarqueeError> {
    let user_id = path.into_inner();
    let current = query
        .current_movie_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let recommendations = state
        .engine
        .hybrid_recommend(&user_id, current, state.config.api.top_n)
        .await?;

    info!(
        user_id = %user_id,
        strategy = ?recommendations.strategy,
        count = recommendations.items.len(),
        "Served recommendations"
    );

    Ok(HttpResponse::Ok().json(recommendations.items))
}

/// GET /api/recommend/{user_id}/collaborative - User-based recommendations
pub async fn recommend_collaborative(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, MarqueeError> {
    let user_id = path.into_inner();
    let items = state
        .engine
        .collaborative_recommend(&user_id, state.config.api.top_n)
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

/// POST /api/interact - Record one rating
pub async fn interact(
    state: web::Data<AppState>,
    body: web::Json<InteractionSubmission>,
) -> Result<HttpResponse, MarqueeError> {
    let interaction = body.into_inner().into_interaction(Utc::now())?;
    state.interactions.append(&interaction).await?;

    info!(
        user_id = %interaction.user_id,
        item_id = %interaction.item_id,
        "Interaction recorded"
    );

    Ok(HttpResponse::Created().json(serde_json::json!({"msg": "Interaction recorded"})))
}

/// POST /api/admin/retrain - Rebuild both models from the stores
///
/// Requires `Authorization: Bearer <api.admin_token>`.
pub async fn retrain(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, MarqueeError> {
    authorize_admin(&req, state.config.api.admin_token.as_deref())?;

    let summary = state
        .engine
        .models()
        .retrain(
            state.catalog.as_ref(),
            state.interactions.as_ref(),
            &state.config,
        )
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

fn authorize_admin(req: &HttpRequest, expected: Option<&str>) -> Result<(), MarqueeError> {
    let Some(expected) = expected else {
        warn!("Admin call refused: no admin token configured");
        return Err(MarqueeError::Unauthorized(
            "admin endpoints are disabled".to_string(),
        ));
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| MarqueeError::Unauthorized("missing bearer token".to_string()))?;

    if presented != expected {
        warn!("Admin call refused: bad token");
        return Err(MarqueeError::Unauthorized("invalid admin token".to_string()));
    }
    Ok(())
}

/// GET /ready - Store reachability and the served model sizes
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let catalog = state.catalog.ping().await.is_ok();
    let interactions = state.interactions.ping().await.is_ok();
    let models = state.engine.models().snapshot().await.summary();

    let ready = catalog && interactions;
    if !ready {
        warn!(catalog, interactions, "Readiness check failed");
    }

    let body = ReadinessResponse {
        status: if ready { "ready" } else { "unavailable" },
        catalog,
        interactions,
        models,
    };

    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
