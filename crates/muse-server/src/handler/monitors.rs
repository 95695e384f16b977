//! Liveness endpoint.

use axum::Router;
use axum::routing::get;

use crate::extract::Json;
use crate::handler::response::HealthResponse;
use crate::service::ServiceState;

#[tracing::instrument(skip_all)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::handler::test::create_test_server;

    #[tokio::test]
    async fn health_reports_version() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        Ok(())
    }
}
