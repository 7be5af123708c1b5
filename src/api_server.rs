// HTTP API Server Module
//
// Purpose: axum endpoints for crop recommendation, yield prediction, disease
// detection, market prices and profit/sustainability estimates.
// Handlers validate input, gather weather and prices, then hand CPU-bound
// inference to the blocking pool.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::catalog::CropCatalog;
use crate::config::ServerConfig;
use crate::economics::EconomicsReport;
use crate::inference::{
    CropRecommendation, DiseaseDiagnosis, ModelError, ModelRegistry, NumericFeatures, DEFAULT_TOP_K,
};
use crate::pricing::{DataGovClient, MarketPriceSource, PriceResolver};
use crate::season::Season;
use crate::weather::{OpenMeteoClient, WeatherObservation, WeatherProvider};

/// Upload limit for `/detect-disease`
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub models: ModelRegistry,
    pub catalog: Arc<CropCatalog>,
    pub prices: Arc<PriceResolver>,
    pub weather: Arc<dyn WeatherProvider>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading crop catalog...");
        let catalog = Arc::new(CropCatalog::load(&config.crop_data_path)?);
        tracing::info!("Loaded {} crop profiles", catalog.len());

        tracing::info!("Loading models...");
        let models_dir = config.models_dir.clone();
        let models = tokio::task::spawn_blocking(move || ModelRegistry::load(&models_dir)).await?;

        let price_source: Option<Arc<dyn MarketPriceSource>> = match &config.price_api_key {
            Some(key) => {
                tracing::info!("Price API key configured; live and seasonal price tiers enabled");
                Some(Arc::new(DataGovClient::new(
                    &config.price_api_base_url,
                    key,
                    config.live_price_timeout,
                    config.seasonal_price_timeout,
                )?))
            }
            None => {
                tracing::warn!("API_GOV_KEY not set; prices will use catalog placeholders");
                None
            }
        };

        tracing::info!("Initializing weather client...");
        let weather = Arc::new(OpenMeteoClient::new(
            &config.weather_api_url,
            config.weather_timeout,
            config.weather_cache_ttl,
        )?);

        Ok(Self::from_parts(config, models, catalog, price_source, weather))
    }

    /// Assemble state from already-built components
    pub fn from_parts(
        config: ServerConfig,
        models: ModelRegistry,
        catalog: Arc<CropCatalog>,
        price_source: Option<Arc<dyn MarketPriceSource>>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Self {
        let prices = Arc::new(PriceResolver::new(price_source, catalog.clone()));
        Self {
            config: Arc::new(config),
            models,
            catalog,
            prices,
            weather,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Reference data
        .route("/api/crops", get(list_crops))
        .route("/api/prices", get(get_prices))

        // Model endpoints
        .route("/recommend-crop", post(recommend_crop))
        .route("/predict-yield", post(predict_yield))
        .route("/detect-disease", post(detect_disease))
        .route("/calculate-profit-sustainability", post(calculate_profit_sustainability))

        // Middleware (applied in reverse order)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(CorsLayer::permissive()) // Allow all origins
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    fn validate(&self) -> Result<(), AppError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::Unprocessable(format!("lat must be within [-90, 90], got {}", self.lat)));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(AppError::Unprocessable(format!("lon must be within [-180, 180], got {}", self.lon)));
        }
        Ok(())
    }
}

/// Soil test values shared by every model endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SoilReadings {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
    pub season: String,
}

impl SoilReadings {
    fn validate(&self) -> Result<Season, AppError> {
        for (name, value) in [
            ("nitrogen", self.nitrogen),
            ("phosphorus", self.phosphorus),
            ("potassium", self.potassium),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Unprocessable(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.ph.is_finite() || !(0.0..=14.0).contains(&self.ph) {
            return Err(AppError::Unprocessable(format!("ph must be within [0, 14], got {}", self.ph)));
        }
        Season::parse(&self.season).ok_or_else(|| {
            AppError::Unprocessable(format!(
                "unknown season '{}' (expected kharif, rabi or zaid)",
                self.season
            ))
        })
    }

    fn with_weather(&self, weather: &WeatherObservation) -> NumericFeatures {
        NumericFeatures {
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
            temperature: weather.temperature,
            humidity: weather.humidity,
            ph: self.ph,
            rainfall: weather.rainfall,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendCropRequest {
    #[serde(flatten)]
    pub soil: SoilReadings,
    pub soil_type: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictYieldRequest {
    #[serde(flatten)]
    pub soil: SoilReadings,
    pub crop: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfitRequest {
    #[serde(flatten)]
    pub soil: SoilReadings,
    pub crop: String,
    pub state: String,
    pub district: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    pub state: String,
    pub district: String,
    pub crop: String,
}

#[derive(Debug, Serialize)]
pub struct YieldResponse {
    pub predicted_crop: String,
    pub estimated_yield_tons_per_hectare: f64,
    pub weather_data_used: WeatherObservation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub crop: String,
    pub state: String,
    pub district: String,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
    pub market: String,
    pub data_source: &'static str,
    pub is_market_data: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfitResponse {
    pub crop: String,
    #[serde(flatten)]
    pub report: EconomicsReport,
    #[serde(rename = "priceDataSource")]
    pub price_data_source: &'static str,
    pub weather_data_used: WeatherObservation,
}

fn require_text(name: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Unprocessable(format!("{} must not be empty", name)));
    }
    Ok(())
}

fn model_unavailable(name: &str) -> AppError {
    AppError::ServiceUnavailable(format!("{} model is not loaded", name))
}

/// Run CPU-bound model work on the blocking pool
async fn run_model<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, ModelError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
        .map_err(AppError::from)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "models": state.models.status(),
        "crops_loaded": state.catalog.len(),
        "price_api_key_configured": state.prices.has_credential(),
    }))
}

async fn list_crops(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "crops": state.catalog.listing()
    }))
}

async fn get_prices(
    State(state): State<AppState>,
    Query(params): Query<PriceParams>,
) -> Result<Json<PriceResponse>, AppError> {
    require_text("state", &params.state)?;
    require_text("district", &params.district)?;
    require_text("crop", &params.crop)?;

    let query = state.prices.query_for(&params.state, &params.district, &params.crop);
    let quote = state.prices.resolve(&query).await;
    tracing::info!(
        "Price for '{}' in {}/{}: {:.2} ({})",
        query.crop, query.state, query.district, quote.modal_price, quote.source_tier.label()
    );

    Ok(Json(PriceResponse {
        crop: params.crop,
        state: params.state,
        district: params.district,
        min_price: quote.min_price,
        max_price: quote.max_price,
        modal_price: quote.modal_price,
        market: quote.market.clone().unwrap_or_else(|| "N/A".to_string()),
        data_source: quote.source_tier.label(),
        is_market_data: quote.source_tier.is_market_data(),
    }))
}

async fn recommend_crop(
    State(state): State<AppState>,
    Query(coords): Query<Coordinates>,
    Json(payload): Json<RecommendCropRequest>,
) -> Result<Json<Vec<CropRecommendation>>, AppError> {
    coords.validate()?;
    let season = payload.soil.validate()?;
    require_text("soil_type", &payload.soil_type)?;

    let model = state
        .models
        .crop_recommender
        .clone()
        .ok_or_else(|| model_unavailable("Crop recommendation"))?;

    let weather = state.weather.seasonal_averages(coords.lat, coords.lon, season).await;
    let features = payload.soil.with_weather(&weather);
    let soil_type = payload.soil_type;

    let recommendations = run_model(move || model.recommend(&features, &soil_type, DEFAULT_TOP_K)).await?;
    tracing::info!(
        "Recommended {:?} for ({:.2}, {:.2}) in {}",
        recommendations.iter().map(|r| r.crop.as_str()).collect::<Vec<_>>(),
        coords.lat, coords.lon, season
    );

    Ok(Json(recommendations))
}

async fn predict_yield(
    State(state): State<AppState>,
    Query(coords): Query<Coordinates>,
    Json(payload): Json<PredictYieldRequest>,
) -> Result<Json<YieldResponse>, AppError> {
    coords.validate()?;
    let season = payload.soil.validate()?;
    require_text("crop", &payload.crop)?;

    let model = state
        .models
        .yield_predictor
        .clone()
        .ok_or_else(|| model_unavailable("Yield prediction"))?;

    let weather = state.weather.seasonal_averages(coords.lat, coords.lon, season).await;
    let features = payload.soil.with_weather(&weather);
    let crop = payload.crop.clone();

    let estimated = run_model(move || model.predict(&features, &crop)).await?;
    tracing::info!("Predicted {} t/ha for '{}' in {}", estimated, payload.crop, season);

    Ok(Json(YieldResponse {
        predicted_crop: payload.crop,
        estimated_yield_tons_per_hectare: estimated,
        weather_data_used: weather,
    }))
}

async fn detect_disease(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DiseaseDiagnosis>, AppError> {
    let model = state
        .models
        .disease_detector
        .clone()
        .ok_or_else(|| model_unavailable("Disease detection"))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            upload = Some(bytes);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| AppError::BadRequest("Missing multipart field 'file'".to_string()))?;

    tracing::info!("Running disease detection on {} byte upload", bytes.len());
    let diagnosis = run_model(move || model.detect(&bytes)).await?;
    tracing::info!("Detected '{}' ({})", diagnosis.predicted_disease, diagnosis.confidence);

    Ok(Json(diagnosis))
}

async fn calculate_profit_sustainability(
    State(state): State<AppState>,
    Query(coords): Query<Coordinates>,
    Json(payload): Json<ProfitRequest>,
) -> Result<Json<ProfitResponse>, AppError> {
    coords.validate()?;
    let season = payload.soil.validate()?;
    require_text("crop", &payload.crop)?;
    require_text("state", &payload.state)?;
    require_text("district", &payload.district)?;

    let model = state
        .models
        .yield_predictor
        .clone()
        .ok_or_else(|| model_unavailable("Yield prediction"))?;

    // 1. Yield
    let weather = state.weather.seasonal_averages(coords.lat, coords.lon, season).await;
    let features = payload.soil.with_weather(&weather);
    let crop = payload.crop.clone();
    let predicted_yield = run_model(move || model.predict(&features, &crop)).await?;

    // 2. Market price
    let query = state.prices.query_for(&payload.state, &payload.district, &payload.crop);
    let quote = state.prices.resolve(&query).await;

    // 3. Economics (unknown crops use the Default profile)
    let profile = state.catalog.profile_or_default(&payload.crop);
    let report = EconomicsReport::compute(predicted_yield, &quote, profile);
    tracing::info!(
        "Economics for '{}': net profit {:.0}/ha, sustainability {} ({})",
        payload.crop,
        report.estimated_net_profit_per_hectare,
        report.sustainability_score_out_of_10,
        quote.source_tier.label()
    );

    Ok(Json(ProfitResponse {
        crop: payload.crop,
        report,
        price_data_source: quote.source_tier.label(),
        weather_data_used: weather,
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unprocessable(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Preprocess(e) => AppError::Unprocessable(e.to_string()),
            ModelError::Image(e) => AppError::BadRequest(e.to_string()),
            ModelError::Inference(e) => AppError::Internal(format!("Inference failed: {}", e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => {
                tracing::error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
