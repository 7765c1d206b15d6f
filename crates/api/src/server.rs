//! HTTP surface of the oracle.
//!
//! Keyed routes take their quota from the `X-API-Key` header before doing any
//! work; a batch assessment consumes one unit per wallet up front. Errors are
//! rendered as `{"error": {"code", "message", "details"?}}`.

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use aura_core::constants::MODEL_VERSION;
use aura_core::types::{ApiTier, VerificationLevel, WalletAddress};
use aura_engine::credit::CreditGrade;
use aura_engine::reputation::{ReputationResult, TrustScore};
use aura_engine::scoring::Assessment;
use aura_oracle::config::Config;
use aura_oracle::context::AppContext;
use aura_oracle::events::EventType;
use aura_oracle::feature_store::ALL_FEATURES;
use aura_oracle::gate::{KeyStats, KeySummary};
use aura_oracle::scheduler::SchedulerStatus;
use aura_oracle::storage::{
    ApiKeyRecord, BadgeRecord, DatabaseStats, EnrollmentStatus, EventRecord, PassportRecord,
};
use aura_oracle::{OracleError, RateLimit};
use aura_prover::threshold::DEFAULT_THRESHOLD;
use aura_prover::{
    generate_threshold_proof, verify_threshold_proof, Attestations, Credential, Proof,
    ThresholdInput, ThresholdProof,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Most wallets one batch assessment may name.
pub const MAX_BATCH_WALLETS: usize = 100;

const DEFAULT_EVENT_LIMIT: u32 = 50;
const MAX_EVENT_LIMIT: u32 = 500;

#[derive(Clone)]
struct AppState {
    ctx: AppContext,
}

fn router_for_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/risk/assess", post(assess_risk))
        .route("/v1/risk/batch-assess", post(batch_assess))
        .route("/v1/reputation", post(get_reputation))
        .route("/v1/trust-score", post(get_trust_score))
        .route(
            "/v1/passports/:wallet",
            get(get_passport).delete(deactivate_passport),
        )
        .route("/v1/passports/:wallet/refresh", post(refresh_passport))
        .route("/v1/badges/:wallet", get(list_badges))
        .route("/v1/features/:wallet", get(get_features))
        .route("/v1/cache/invalidate/:wallet", post(invalidate_features))
        .route("/v1/events/recent/:event_type", get(recent_events))
        .route("/v1/poh/enroll", post(poh_enroll))
        .route("/v1/poh/prove", post(poh_prove))
        .route("/v1/poh/issue", post(poh_issue))
        .route("/v1/threshold/proof", post(threshold_proof))
        .route("/v1/api-keys", post(create_api_key))
        .route("/v1/api-keys/:key/stats", get(api_key_stats))
        .route("/v1/api-keys/:key", axum::routing::delete(revoke_api_key))
        .route("/v1/users/:user_id/api-keys", get(list_user_api_keys))
        .route("/v1/oracle/status", get(oracle_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Router over an already built context.
pub fn router(ctx: AppContext) -> Router {
    router_for_state(AppState { ctx })
}

/// Build an in-process API router from explicit configuration.
///
/// The event recorder is spawned on the current runtime; the scheduler is
/// not started.
pub async fn build_app(config: Config) -> anyhow::Result<Router> {
    let (ctx, recorder) = AppContext::build(config).await?;
    if let Some(recorder) = recorder {
        tokio::spawn(recorder.run());
    }
    Ok(router(ctx))
}

/// Run the API server, the refresh scheduler and the event recorder until
/// a shutdown signal arrives.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let port = config.server.port;
    let (ctx, recorder) = AppContext::build(config).await?;

    let recorder_task = recorder.map(|recorder| tokio::spawn(recorder.run()));

    let scheduler = if ctx.config.scheduler.enabled {
        Some(ctx.scheduler.spawn())
    } else {
        info!("Refresh scheduler disabled");
        None
    };

    let storage = ctx.storage.clone();
    let app = router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Aura API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        info!("Stopping refresh scheduler");
        scheduler.stop().await;
    }

    // Every sink clone is gone once the router and scheduler are dropped.
    if let Some(task) = recorder_task {
        match tokio::time::timeout(Duration::from_secs(5), task).await {
            Ok(Ok(recorded)) => info!("Event recorder drained ({} events recorded)", recorded),
            Ok(Err(e)) => error!("Event recorder task failed: {}", e),
            Err(_) => warn!("Event recorder did not drain in time"),
        }
    }

    storage.close().await;
    info!("Aura API server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn health() -> &'static str {
    "OK"
}

const ERROR_CODE_INVALID_REQUEST: &str = "invalid_request";
const ERROR_CODE_NOT_FOUND: &str = "not_found";
const ERROR_CODE_DUPLICATE_IDENTITY: &str = "duplicate_identity";
const ERROR_CODE_RATE_LIMITED: &str = "rate_limited";
const ERROR_CODE_MISSING_API_KEY: &str = "missing_api_key";
const ERROR_CODE_INVALID_API_KEY: &str = "invalid_api_key";
const ERROR_CODE_UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
const ERROR_CODE_INTERNAL_ERROR: &str = "internal_error";

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorInfo {
                code,
                message: message.into(),
                details: None,
            },
        }),
    )
}

fn api_error_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorInfo {
                code,
                message: message.into(),
                details: Some(details),
            },
        }),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, ERROR_CODE_INVALID_REQUEST, msg)
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ERROR_CODE_INTERNAL_ERROR,
        format!("Internal error: {}", err),
    )
}

fn oracle_error(err: OracleError) -> ApiError {
    match err {
        OracleError::NotFound(msg) => api_error(StatusCode::NOT_FOUND, ERROR_CODE_NOT_FOUND, msg),
        OracleError::InvalidInput(msg) => bad_request(msg),
        OracleError::DuplicateIdentity { nullifier } => api_error_details(
            StatusCode::CONFLICT,
            ERROR_CODE_DUPLICATE_IDENTITY,
            "Identity already holds a badge",
            serde_json::json!({ "nullifier": nullifier }),
        ),
        OracleError::RateLimited(limit) => {
            let message = match limit {
                RateLimit::Quota { .. } => "API key quota exhausted",
                RateLimit::Cooldown { .. } => "Refresh cooldown active",
            };
            api_error_details(
                StatusCode::TOO_MANY_REQUESTS,
                ERROR_CODE_RATE_LIMITED,
                message,
                serde_json::to_value(limit).unwrap_or_default(),
            )
        }
        OracleError::InvalidKey => api_error(
            StatusCode::FORBIDDEN,
            ERROR_CODE_INVALID_API_KEY,
            "Invalid or revoked API key",
        ),
        OracleError::UpstreamUnavailable(msg) => api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            ERROR_CODE_UPSTREAM_UNAVAILABLE,
            msg,
        ),
        OracleError::Internal(e) => {
            error!("Request failed: {:#}", e);
            internal_error(e)
        }
    }
}

fn parse_wallet(raw: &str) -> Result<WalletAddress, ApiError> {
    raw.trim()
        .parse::<WalletAddress>()
        .map_err(|e| oracle_error(e.into()))
}

fn parse_amount(field: &str, amount: Option<f64>) -> Result<Option<f64>, ApiError> {
    match amount {
        Some(v) if !v.is_finite() || v < 0.0 => Err(api_error_details(
            StatusCode::BAD_REQUEST,
            ERROR_CODE_INVALID_REQUEST,
            format!("{} must be a non-negative number", field),
            serde_json::json!({ "field": field }),
        )),
        other => Ok(other),
    }
}

/// Consume one request from the caller's key.
async fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    require_api_key_units(state, headers, 1).await
}

async fn require_api_key_units(
    state: &AppState,
    headers: &HeaderMap,
    units: u32,
) -> Result<(), ApiError> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                ERROR_CODE_MISSING_API_KEY,
                "Missing X-API-Key header",
            )
        })?;

    let gate = &state.ctx.gate;
    let owner = gate.verify(key).await.map_err(oracle_error)?;
    let consumed = gate
        .check_and_consume_units(key, units)
        .await
        .map_err(oracle_error)?;

    debug!(
        user_id = %owner.user_id,
        tier = %owner.tier,
        used = consumed.used,
        limit = consumed.limit,
        "API key accepted"
    );
    Ok(())
}

// Risk assessment

#[derive(Debug, Deserialize)]
struct AssessRequest {
    wallet_address: String,
    #[serde(default)]
    requested_amount: Option<f64>,
}

#[derive(Serialize)]
struct AssessResponse {
    #[serde(flatten)]
    assessment: Assessment,
    credit_score: u32,
    credit_grade: CreditGrade,
}

async fn assess_risk(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AssessRequest>,
) -> Result<Json<AssessResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&req.wallet_address)?;
    let amount = parse_amount("requested_amount", req.requested_amount)?;

    let outcome = state
        .ctx
        .pipeline
        .refresh(&wallet, amount)
        .await
        .map_err(|e| oracle_error(e.into()))?;

    Ok(Json(AssessResponse {
        assessment: outcome.assessment,
        credit_score: outcome.credit.credit_score,
        credit_grade: outcome.credit.grade,
    }))
}

#[derive(Debug, Deserialize)]
struct BatchAssessRequest {
    wallet_addresses: Vec<String>,
    #[serde(default)]
    requested_amount: Option<f64>,
}

#[derive(Serialize)]
struct BatchAssessItem {
    wallet_address: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<AssessResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BatchAssessItem {
    fn failed(wallet_address: String, error: impl Into<String>) -> Self {
        Self {
            wallet_address,
            success: false,
            assessment: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize)]
struct BatchAssessResponse {
    total: usize,
    results: Vec<BatchAssessItem>,
}

/// Re-assess wallets that already hold a passport. Unknown wallets are
/// reported per item and never get a passport created.
async fn batch_assess(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchAssessRequest>,
) -> Result<Json<BatchAssessResponse>, ApiError> {
    if req.wallet_addresses.is_empty() {
        return Err(bad_request("wallet_addresses must not be empty"));
    }
    if req.wallet_addresses.len() > MAX_BATCH_WALLETS {
        return Err(bad_request(format!(
            "At most {} wallets per batch",
            MAX_BATCH_WALLETS
        )));
    }
    let amount = parse_amount("requested_amount", req.requested_amount)?;
    let units = u32::try_from(req.wallet_addresses.len()).map_err(internal_error)?;
    require_api_key_units(&state, &headers, units).await?;

    let ctx = &state.ctx;
    let results = join_all(req.wallet_addresses.into_iter().map(|raw| async move {
        let wallet = match raw.trim().parse::<WalletAddress>() {
            Ok(wallet) => wallet,
            Err(e) => return BatchAssessItem::failed(raw, e.to_string()),
        };
        match ctx.storage.get_passport(&wallet).await {
            Ok(Some(_)) => {}
            Ok(None) => return BatchAssessItem::failed(raw, "Passport not found"),
            Err(e) => {
                error!(%wallet, "Batch passport lookup failed: {:#}", e);
                return BatchAssessItem::failed(raw, "Internal error");
            }
        }
        match ctx.pipeline.refresh(&wallet, amount).await {
            Ok(outcome) => BatchAssessItem {
                wallet_address: raw,
                success: true,
                assessment: Some(AssessResponse {
                    assessment: outcome.assessment,
                    credit_score: outcome.credit.credit_score,
                    credit_grade: outcome.credit.grade,
                }),
                error: None,
            },
            Err(e) => {
                warn!(%wallet, "Batch assessment failed: {:#}", e);
                BatchAssessItem::failed(raw, "Assessment failed")
            }
        }
    }))
    .await;

    Ok(Json(BatchAssessResponse {
        total: results.len(),
        results,
    }))
}

// Reputation and trust

#[derive(Debug, Deserialize)]
struct WalletRequest {
    wallet_address: String,
}

#[derive(Serialize)]
struct ReputationResponse {
    wallet_address: WalletAddress,
    #[serde(flatten)]
    reputation: ReputationResult,
}

async fn get_reputation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WalletRequest>,
) -> Result<Json<ReputationResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&req.wallet_address)?;

    let reputation = state.ctx.reputation.calculate(&wallet).await;
    Ok(Json(ReputationResponse {
        wallet_address: wallet,
        reputation,
    }))
}

#[derive(Debug, Deserialize)]
struct TrustScoreRequest {
    wallet_address: String,
    #[serde(default)]
    loan_amount: Option<f64>,
}

#[derive(Serialize)]
struct TrustScoreResponse {
    wallet_address: WalletAddress,
    #[serde(flatten)]
    trust: TrustScore,
}

async fn get_trust_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TrustScoreRequest>,
) -> Result<Json<TrustScoreResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&req.wallet_address)?;
    let loan_amount = parse_amount("loan_amount", req.loan_amount)?;

    let trust = state.ctx.reputation.trust_score(&wallet, loan_amount).await;
    Ok(Json(TrustScoreResponse {
        wallet_address: wallet,
        trust,
    }))
}

// Passports

async fn get_passport(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet): Path<String>,
) -> Result<Json<PassportRecord>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&wallet)?;

    state
        .ctx
        .storage
        .get_passport(&wallet)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| oracle_error(OracleError::NotFound(format!("No passport for {}", wallet))))
}

async fn refresh_passport(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet): Path<String>,
) -> Result<Json<PassportRecord>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&wallet)?;

    state
        .ctx
        .scheduler
        .force_refresh(&wallet)
        .await
        .map(Json)
        .map_err(oracle_error)
}

#[derive(Serialize)]
struct DeactivateResponse {
    wallet_address: WalletAddress,
    is_active: bool,
}

/// Passports are never deleted; deactivation takes them out of the refresh cycle.
async fn deactivate_passport(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet): Path<String>,
) -> Result<Json<DeactivateResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&wallet)?;

    let updated = state
        .ctx
        .storage
        .set_passport_active(&wallet, false)
        .await
        .map_err(internal_error)?;
    if !updated {
        return Err(oracle_error(OracleError::NotFound(format!(
            "No passport for {}",
            wallet
        ))));
    }

    info!(%wallet, "Passport deactivated");
    Ok(Json(DeactivateResponse {
        wallet_address: wallet,
        is_active: false,
    }))
}

// Badges, features and events

#[derive(Serialize)]
struct BadgesResponse {
    wallet_address: WalletAddress,
    count: usize,
    badges: Vec<BadgeRecord>,
}

async fn list_badges(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<BadgesResponse>, ApiError> {
    let wallet = parse_wallet(&wallet)?;
    let badges = state
        .ctx
        .storage
        .badges_for_wallet(&wallet)
        .await
        .map_err(internal_error)?;

    Ok(Json(BadgesResponse {
        wallet_address: wallet,
        count: badges.len(),
        badges,
    }))
}

#[derive(Serialize)]
struct FeaturesResponse {
    wallet_address: WalletAddress,
    features: HashMap<String, f64>,
    feature_vector: [f64; 8],
}

async fn get_features(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet): Path<String>,
) -> Result<Json<FeaturesResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&wallet)?;

    let features = &state.ctx.features;
    Ok(Json(FeaturesResponse {
        wallet_address: wallet,
        features: features.get_many(&wallet, &ALL_FEATURES),
        feature_vector: features.get_vector(&wallet),
    }))
}

#[derive(Serialize)]
struct InvalidateResponse {
    wallet_address: WalletAddress,
    invalidated: bool,
}

async fn invalidate_features(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(wallet): Path<String>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    require_api_key(&state, &headers).await?;
    let wallet = parse_wallet(&wallet)?;

    state.ctx.features.invalidate(&wallet);
    Ok(Json(InvalidateResponse {
        wallet_address: wallet,
        invalidated: true,
    }))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Serialize)]
struct EventsResponse {
    event_type: EventType,
    count: usize,
    events: Vec<EventRecord>,
}

async fn recent_events(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let event_type: EventType = event_type.parse().map_err(oracle_error)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);

    let events = state
        .ctx
        .storage
        .recent_events(Some(event_type), limit)
        .await
        .map_err(internal_error)?;

    Ok(Json(EventsResponse {
        event_type,
        count: events.len(),
        events,
    }))
}

// Proof of humanity

#[derive(Debug, Deserialize)]
struct EnrollRequest {
    user_id: String,
    wallet_address: String,
    #[serde(default)]
    github_handle: Option<String>,
    #[serde(default)]
    twitter_handle: Option<String>,
}

#[derive(Serialize)]
struct EnrollResponse {
    enrollment_id: String,
    wallet_address: WalletAddress,
    attestations: Attestations,
    uniqueness_score: f64,
    verification_level: VerificationLevel,
    status: EnrollmentStatus,
}

async fn poh_enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let wallet = parse_wallet(&req.wallet_address)?;

    let enrollment = state
        .ctx
        .poh
        .enroll(
            &req.user_id,
            &wallet,
            req.github_handle.as_deref(),
            req.twitter_handle.as_deref(),
        )
        .await
        .map_err(oracle_error)?;

    let score = enrollment.attestations.score;
    Ok(Json(EnrollResponse {
        enrollment_id: enrollment.id,
        wallet_address: enrollment.wallet_address,
        attestations: enrollment.attestations,
        uniqueness_score: score,
        verification_level: VerificationLevel::from_score(score),
        status: enrollment.status,
    }))
}

#[derive(Debug, Deserialize)]
struct ProveRequest {
    enrollment_id: String,
    identity_secret: String,
}

#[derive(Serialize)]
struct ProveResponse {
    enrollment_id: String,
    wallet_address: WalletAddress,
    proof: Proof,
    credential: Credential,
}

async fn poh_prove(
    State(state): State<AppState>,
    Json(req): Json<ProveRequest>,
) -> Result<Json<ProveResponse>, ApiError> {
    let record = state
        .ctx
        .poh
        .prove(&req.enrollment_id, &req.identity_secret)
        .await
        .map_err(oracle_error)?;

    Ok(Json(ProveResponse {
        enrollment_id: record.enrollment_id,
        wallet_address: record.wallet_address,
        proof: record.proof,
        credential: record.credential,
    }))
}

#[derive(Debug, Deserialize)]
struct IssueRequest {
    proof_hash: String,
    nullifier: String,
    wallet_address: String,
}

async fn poh_issue(
    State(state): State<AppState>,
    Json(req): Json<IssueRequest>,
) -> Result<(StatusCode, Json<BadgeRecord>), ApiError> {
    let wallet = parse_wallet(&req.wallet_address)?;

    let badge = state
        .ctx
        .poh
        .issue_badge(&req.proof_hash, &req.nullifier, &wallet)
        .await
        .map_err(oracle_error)?;

    Ok((StatusCode::CREATED, Json(badge)))
}

// Threshold proofs

#[derive(Debug, Deserialize)]
struct ThresholdRequest {
    wallet_address: String,
    #[serde(default)]
    github_verified: bool,
    #[serde(default)]
    twitter_verified: bool,
    #[serde(default)]
    wallet_age_days: u64,
    #[serde(default)]
    transaction_count: u64,
    #[serde(default)]
    threshold: Option<u64>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Serialize)]
struct ThresholdResponse {
    #[serde(flatten)]
    proof: ThresholdProof,
    verified: bool,
}

async fn threshold_proof(Json(req): Json<ThresholdRequest>) -> Result<Json<ThresholdResponse>, ApiError> {
    let input = ThresholdInput {
        wallet_address: parse_wallet(&req.wallet_address)?,
        github_verified: req.github_verified,
        twitter_verified: req.twitter_verified,
        wallet_age_days: req.wallet_age_days,
        transaction_count: req.transaction_count,
    };
    let threshold = req.threshold.unwrap_or(DEFAULT_THRESHOLD);
    if threshold > 100 {
        return Err(bad_request("threshold must be between 0 and 100"));
    }

    let proof = generate_threshold_proof(&input, threshold, req.timestamp)
        .map_err(|e| oracle_error(e.into()))?;
    let verified = verify_threshold_proof(&proof.proof_hash, &proof.nullifier);

    Ok(Json(ThresholdResponse { proof, verified }))
}

// API keys

#[derive(Debug, Deserialize)]
struct CreateKeyRequest {
    user_id: String,
    #[serde(default)]
    tier: Option<String>,
}

async fn create_api_key(
    State(state): State<AppState>,
    Json(req): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyRecord>), ApiError> {
    let tier = match req.tier.as_deref() {
        Some(raw) => raw
            .parse::<ApiTier>()
            .map_err(|e| oracle_error(e.into()))?,
        None => ApiTier::Free,
    };

    let record = state
        .ctx
        .gate
        .create_key(tier, &req.user_id)
        .await
        .map_err(oracle_error)?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn api_key_stats(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KeyStats>, ApiError> {
    state.ctx.gate.stats(&key).await.map(Json).map_err(oracle_error)
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: bool,
}

async fn revoke_api_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RevokeResponse>, ApiError> {
    state.ctx.gate.revoke(&key).await.map_err(oracle_error)?;
    Ok(Json(RevokeResponse { revoked: true }))
}

#[derive(Serialize)]
struct UserKeysResponse {
    user_id: String,
    total: usize,
    api_keys: Vec<KeySummary>,
}

async fn list_user_api_keys(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserKeysResponse>, ApiError> {
    let api_keys = state
        .ctx
        .gate
        .summaries_for_user(&user_id)
        .await
        .map_err(oracle_error)?;

    Ok(Json(UserKeysResponse {
        user_id,
        total: api_keys.len(),
        api_keys,
    }))
}

// Status

#[derive(Serialize)]
struct StatusResponse {
    version: &'static str,
    model_version: &'static str,
    scheduler: SchedulerStatus,
    database: DatabaseStats,
    cached_entities: usize,
    events_dropped: u64,
}

async fn oracle_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let database = state.ctx.storage.stats().await.map_err(internal_error)?;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        model_version: MODEL_VERSION,
        scheduler: state.ctx.scheduler.status().await,
        database,
        cached_entities: state.ctx.features.entity_count(),
        events_dropped: state.ctx.events.dropped(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    async fn setup() -> (AppContext, Router, NamedTempFile) {
        let db = NamedTempFile::new().unwrap();
        let config = Config::for_test(format!("sqlite://{}", db.path().display()));
        let (ctx, _recorder) = AppContext::build(config).await.unwrap();
        let app = router(ctx.clone());
        (ctx, app, db)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, key: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn test_error_mapping() {
        let (status, Json(body)) = oracle_error(OracleError::RateLimited(RateLimit::Quota {
            limit: 5,
            used: 5,
        }));
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error.code, "rate_limited");
        assert_eq!(body.error.details, Some(serde_json::json!({"limit": 5, "used": 5})));

        let (status, _) = oracle_error(OracleError::DuplicateIdentity {
            nullifier: "n".into(),
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, Json(body)) = oracle_error(OracleError::InvalidKey);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error.code, "invalid_api_key");

        let (status, _) = oracle_error(OracleError::UpstreamUnavailable("ledger".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = oracle_error(OracleError::Internal(anyhow::anyhow!("boom")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_assess_requires_key() {
        let (_ctx, app, _db) = setup().await;
        let body = serde_json::json!({"wallet_address": format!("0x{}", "11".repeat(20))});

        let response = app
            .clone()
            .oneshot(post_json("/v1/risk/assess", None, body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(post_json("/v1/risk/assess", Some("aura_sk_nope"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_api_key");
    }

    #[tokio::test]
    async fn test_assess_creates_passport() {
        let (ctx, app, _db) = setup().await;
        let key = ctx.gate.create_key(ApiTier::Free, "tester").await.unwrap();
        let wallet = format!("0x{}", "22".repeat(20));

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/risk/assess",
                Some(&key.api_key),
                serde_json::json!({"wallet_address": wallet, "requested_amount": 1000.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["wallet_address"], wallet);
        assert_eq!(json["model_version"], "2.0.0");
        assert!(json["risk_score"].as_f64().is_some());
        assert!(json["proof"]["proof_hash"].as_str().unwrap().starts_with("0x"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/passports/{}", wallet))
                    .header("X-API-Key", &key.api_key)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["score_history"].as_array().unwrap().len(), 1);

        let stats = ctx.gate.stats(&key.api_key).await.unwrap();
        assert_eq!(stats.requests_used, 2);
    }

    #[tokio::test]
    async fn test_bad_wallet_is_invalid_request() {
        let (ctx, app, _db) = setup().await;
        let key = ctx.gate.create_key(ApiTier::Free, "tester").await.unwrap();

        let response = app
            .oneshot(post_json(
                "/v1/trust-score",
                Some(&key.api_key),
                serde_json::json!({"wallet_address": "0x1234"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
    }
}
