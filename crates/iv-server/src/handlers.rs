//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::request::OptimizeRequest;
use crate::response::OptimizeResponse;
use crate::service;
use crate::state::AppState;

/// `POST /api/optimize/`: run the full multi-model inverse search.
///
/// The search is CPU-bound and spawns its own worker threads, so it runs on
/// the blocking pool rather than on the async executor.
pub async fn optimize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<OptimizeResponse>> {
    let Json(body) = payload?;
    let request = OptimizeRequest::from_value(body)?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("optimize", %run_id);
    span.in_scope(|| {
        info!(
            rows = request.data.len(),
            features = request.search.features.len(),
            target = %request.search.target,
            target_value = request.search.target_value,
            "Optimize request accepted"
        )
    });

    let split = state.config.split;
    let response = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        service::optimize(&request.data, &request.search, &split)
    })
    .await??;

    Ok(Json(response))
}

/// `GET /api/health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::ApiError;
    use axum::http::StatusCode;
    use serde_json::json;

    fn state() -> State<Arc<AppState>> {
        State(Arc::new(AppState::new(ServerConfig::default())))
    }

    fn body(target_value: Value) -> Value {
        let data: Vec<Value> = (0..20)
            .map(|i| json!({"x": i as f64, "y": 3.0 * i as f64}))
            .collect();
        json!({
            "data": data,
            "features": ["x"],
            "target": "y",
            "target_value": target_value,
            "models": ["linear_regression"],
            "pso_config": {
                "lb": [0.0], "ub": [19.0],
                "swarmsize": 10, "maxiter": 20,
                "omega": 0.5, "phip": 0.5, "phig": 0.5,
                "n_solutions": 2, "nprocessors": 2, "max_rounds": 1
            }
        })
    }

    #[tokio::test]
    async fn optimize_returns_the_best_model() {
        let Json(response) = optimize(state(), Ok(Json(body(json!(30.0))))).await.unwrap();
        assert_eq!(response.best_model, "Linear Regression");
        assert_eq!(response.best_solution.len(), 2);
        let x = response.best_solution[0].features[0].1;
        assert!((x - 10.0).abs() < 0.5, "x = {x}");
    }

    #[tokio::test]
    async fn missing_target_value_is_a_bad_request() {
        let err = optimize(state(), Ok(Json(body(Value::Null)))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing 'target_value' in request data.");
    }

    #[tokio::test]
    async fn unknown_model_is_a_bad_request() {
        let mut request = body(json!(1.0));
        request["models"] = json!(["gradient boosting"]);
        let err = optimize(state(), Ok(Json(request))).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(value) = health_check(state()).await;
        assert_eq!(value["status"], "ok");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
