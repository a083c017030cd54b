use std::sync::Arc;

use rocket::request::{FromRequest, Outcome};
use rocket::serde::json::{self, Json};
use rocket::http::{ContentType, Status};
use rocket::{delete, get, post, put, FromForm, Request, State};
use shared::{models::*, user_info::UserInfo};
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::{
    clock::Countdown,
    config::Config,
    error::ApiError,
    maintenance::MaintenanceFlag,
    processor::VoteProcessor,
    rate_limiter::RateLimiter,
    store::BallotStore,
    utils::tokens_match,
};

pub struct AppState {
    pub processor: VoteProcessor,
    pub countdown: Countdown,
    pub maintenance: MaintenanceFlag,
    pub vote_limiter: RateLimiter,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn BallotStore>) -> Self {
        Self {
            processor: VoteProcessor::new(store.clone(), config.nominees.clone(), config.store_timeout),
            countdown: Countdown::new(
                store.clone(),
                time::Duration::days(config.countdown_days),
                config.store_timeout,
            ),
            maintenance: MaintenanceFlag::new(store, config.store_timeout),
            vote_limiter: RateLimiter::new(config.vote_rate_limit, config.vote_rate_window),
            admin_token: config.admin_token.clone(),
        }
    }
}

/// Present only on requests carrying the configured `X-Admin-Token`.
pub struct AdminToken;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let expected = req
            .rocket()
            .state::<AppState>()
            .and_then(|state| state.admin_token.as_deref());
        let Some(expected) = expected else {
            warn!("Admin endpoint called but no ADMIN_TOKEN is configured");
            return Outcome::Error((Status::Forbidden, ApiError::Forbidden));
        };

        match req.headers().get_one("X-Admin-Token") {
            Some(given) if tokens_match(given, expected) => Outcome::Success(AdminToken),
            _ => {
                warn!("Rejected admin request to {}", req.uri().path());
                Outcome::Error((Status::Forbidden, ApiError::Forbidden))
            }
        }
    }
}

#[derive(Debug, Default, FromForm)]
pub struct ResetOptions {
    #[field(name = "clearVoters")]
    pub clear_voters: bool,
}

#[get("/votes")]
pub async fn get_votes(state: &State<AppState>) -> Json<Tally> {
    Json(state.processor.tally_or_default().await)
}

#[instrument(skip(state, content_type, request, user_info), fields(client = %user_info.fingerprint))]
#[post("/votes", data = "<request>")]
pub async fn submit_vote(
    state: &State<AppState>,
    content_type: Option<&ContentType>,
    request: Result<Json<SubmitVoteRequest>, json::Error<'_>>,
    user_info: UserInfo,
) -> Result<Json<Tally>, ApiError> {
    state
        .vote_limiter
        .check(&format!("submit_vote:{}", user_info.fingerprint))
        .map_err(ApiError::RateLimited)?;

    if !content_type.is_some_and(|ct| ct.is_json()) {
        debug!("Rejected vote body with content type {:?}", content_type);
        return Err(ApiError::InvalidRequest(
            "Request body must be sent as application/json".into(),
        ));
    }

    let request = request.map_err(|e| {
        debug!("Rejected vote body: {}", e);
        ApiError::InvalidRequest("Request body must be JSON with nomineeId and voterId".into())
    })?;

    state
        .processor
        .submit_vote(&request)
        .await
        .map(Json)
        .map_err(ApiError::from)
}

#[instrument(skip(state, _admin))]
#[delete("/votes?<options..>")]
pub async fn reset_votes(
    state: &State<AppState>,
    _admin: AdminToken,
    options: ResetOptions,
) -> Result<Json<ResetSummary>, ApiError> {
    state
        .processor
        .reset(options.clear_voters)
        .await
        .map(Json)
        .map_err(|e| ApiError::storage("Failed to reset votes", &e))
}

#[get("/nominees")]
pub async fn list_nominees(state: &State<AppState>) -> Json<Vec<Nominee>> {
    Json(state.processor.nominees().to_vec())
}

#[get("/clock")]
pub async fn get_clock(state: &State<AppState>) -> Result<Json<ClockResponse>, ApiError> {
    let deadline = state
        .countdown
        .deadline()
        .await
        .map_err(|e| ApiError::storage("Failed to read countdown", &e))?;

    Ok(Json(ClockResponse {
        deadline,
        current_time: OffsetDateTime::now_utc(),
    }))
}

#[get("/check-maintenance")]
pub async fn check_maintenance(state: &State<AppState>) -> Json<MaintenanceStatus> {
    Json(MaintenanceStatus {
        maintenance: state.maintenance.is_enabled().await,
    })
}

#[put("/maintenance", format = "json", data = "<flag>")]
pub async fn set_maintenance(
    state: &State<AppState>,
    _admin: AdminToken,
    flag: Json<MaintenanceRecord>,
) -> Result<Json<MaintenanceStatus>, ApiError> {
    state
        .maintenance
        .set(flag.enabled)
        .await
        .map_err(|e| ApiError::storage("Failed to update maintenance flag", &e))?;

    Ok(Json(MaintenanceStatus { maintenance: flag.enabled }))
}

#[get("/health")]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".into(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}
