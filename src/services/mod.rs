//! City-service client.
//!
//! Typed calls against the gateway's service routes. Every request goes
//! through [`SessionController::wrap`], so credentials are attached exactly
//! when a session exists and never assembled here.
//!
//! ## Design
//! - Transport (REST backend): full CRUD; mutations are admin-only
//! - Tourism, air quality, emergency and orchestration views: read-only,
//!   returned as JSON since their shape belongs to the downstream services
//! - Local privilege checks only fail fast for the UI; the gateway is the
//!   authority on what a token may do

pub mod city;
pub mod transport;

pub use transport::{NewTransport, Transport, TransportUpdate};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::{ApiRequest, AuthError};
use crate::session::SessionController;

/// Errors from city-service calls.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Input rejected before any request was sent.
    #[error("invalid input: {0}")]
    Invalid(&'static str),

    #[error("{0} not found")]
    NotFound(String),

    /// Any other non-success status (the gateway reports unavailable
    /// backends as 503).
    #[error("gateway returned {status}: {body}")]
    Gateway { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ServiceError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(e) => e.user_message(),
            Self::Invalid(what) => format!("Please check your input: {what}."),
            Self::NotFound(what) => format!("{what} not found."),
            Self::Gateway { status, .. } if *status == StatusCode::SERVICE_UNAVAILABLE => {
                "The city service is currently unavailable.".into()
            }
            Self::Gateway { status, .. } => format!("The gateway reported an error ({status})."),
            Self::Decode(_) => "The gateway sent an unexpected response.".into(),
        }
    }
}

/// Client for the gateway's city-service routes.
#[derive(Clone)]
pub struct CityClient {
    session: Arc<SessionController>,
}

impl CityClient {
    pub fn new(session: Arc<SessionController>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Check if the gateway answers its health endpoint.
    pub async fn gateway_health(&self) -> bool {
        matches!(
            self.session.wrap(ApiRequest::get("/health")).await,
            Ok(resp) if resp.status().is_success()
        )
    }

    /// Send `request` and decode a JSON body, mapping error statuses.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        resource: &str,
    ) -> Result<T, ServiceError> {
        let resp = self.execute(request, resource).await?;
        resp.json::<T>().await.map_err(ServiceError::Decode)
    }

    /// Send `request` and map non-success statuses to errors.
    async fn execute(
        &self,
        request: ApiRequest,
        resource: &str,
    ) -> Result<reqwest::Response, ServiceError> {
        let path = request.path.clone();
        let resp = self.session.wrap(request).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        tracing::debug!(%status, path = %path, "Gateway call failed");
        match status {
            StatusCode::UNAUTHORIZED => Err(AuthError::Authentication { status }.into()),
            StatusCode::FORBIDDEN => Err(AuthError::Forbidden.into()),
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound(resource.to_string())),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ServiceError::Gateway { status, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_backend_has_friendly_message() {
        let err = ServiceError::Gateway {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "Service transport indisponible".into(),
        };
        assert_eq!(
            err.user_message(),
            "The city service is currently unavailable."
        );
    }

    #[test]
    fn auth_errors_keep_their_message() {
        let err: ServiceError = AuthError::Forbidden.into();
        assert!(err.user_message().contains("administrators"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = ServiceError::NotFound("transport 42".into());
        assert_eq!(err.to_string(), "transport 42 not found");
    }
}
