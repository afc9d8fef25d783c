//! Read-only city views: tourism, air quality, emergency services and the
//! gateway's orchestration endpoints.

use serde_json::Value;

use super::{CityClient, ServiceError};
use crate::auth::ApiRequest;

/// Zone used by the trip planner when none is given.
pub const DEFAULT_ZONE: &str = "Centre-Ville";

impl CityClient {
    /// Aggregated snapshot of every service.
    pub async fn city_dashboard(&self) -> Result<Value, ServiceError> {
        self.fetch_json(
            ApiRequest::get("/api/orchestration/city-dashboard"),
            "city dashboard",
        )
        .await
    }

    /// Tourist attractions (GraphQL backend).
    pub async fn attractions(&self) -> Result<Value, ServiceError> {
        self.fetch_json(ApiRequest::get("/api/tourism/attractions"), "attractions")
            .await
    }

    /// Air quality measures (SOAP backend).
    pub async fn air_quality(&self) -> Result<Value, ServiceError> {
        self.fetch_json(
            ApiRequest::get("/api/air-quality/measures"),
            "air quality measures",
        )
        .await
    }

    /// Emergency vehicles (gRPC backend).
    pub async fn emergency_vehicles(&self) -> Result<Value, ServiceError> {
        self.fetch_json(
            ApiRequest::get("/api/emergency/vehicles"),
            "emergency vehicles",
        )
        .await
    }

    /// Active emergency interventions.
    pub async fn emergency_interventions(&self) -> Result<Value, ServiceError> {
        self.fetch_json(
            ApiRequest::get("/api/emergency/interventions"),
            "emergency interventions",
        )
        .await
    }

    /// Trip plan combining transport, air quality and emergency data for a
    /// zone.
    pub async fn plan_trip(&self, zone: &str) -> Result<Value, ServiceError> {
        let zone = match zone.trim() {
            "" => DEFAULT_ZONE,
            z => z,
        };
        self.fetch_json(
            ApiRequest::get("/api/orchestration/plan-trip").with_query("zone", zone),
            "trip plan",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{client_for, has_authorization};
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn dashboard_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orchestration/city-dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"transport": {"total": 4}, "air_quality": {"average_aqi": 42}}),
            ))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let dashboard = client.city_dashboard().await.unwrap();
        assert_eq!(dashboard["air_quality"]["average_aqi"], 42);
    }

    #[tokio::test]
    async fn plan_trip_defaults_zone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orchestration/plan-trip"))
            .and(query_param("zone", "Centre-Ville"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"zone": "Centre-Ville"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let plan = client.plan_trip("  ").await.unwrap();
        assert_eq!(plan["zone"], "Centre-Ville");
    }

    #[tokio::test]
    async fn logged_in_reads_carry_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tourism/attractions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("user")).await;
        client.attractions().await.unwrap();

        let received = server.received_requests().await.unwrap();
        let last = received.last().unwrap();
        assert!(has_authorization(last));
    }

    #[tokio::test]
    async fn unavailable_backend_surfaces_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/air-quality/measures"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string("Service air indisponible"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client.air_quality().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Gateway { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/emergency/vehicles"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        assert!(matches!(
            client.emergency_vehicles().await,
            Err(ServiceError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn gateway_health_uses_health_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        assert!(client.gateway_health().await);
    }
}
