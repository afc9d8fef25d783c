//! Transport lines (REST backend behind the gateway).
//!
//! Reads are public. Create, update and delete require an admin session and
//! fail with `Forbidden` before any request is sent otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{CityClient, ServiceError};
use crate::auth::ApiRequest;

const TRANSPORTS_PATH: &str = "/api/transport/transports";

/// A transport line as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    pub id: i64,
    /// `Métro`, `Bus`, `Train`, `Taxi`, ...
    pub mode: String,
    /// Line or itinerary, e.g. `Ligne 1 (Sud → Nord)`.
    pub route: String,
    /// Backend values: `operationnel`, `retard`, `en_maintenance`.
    pub status: String,
    /// Server timestamps (ISO 8601). `updated_at` is unset until the first
    /// update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Payload for creating a transport line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransport {
    pub mode: String,
    pub route: String,
    pub status: String,
}

impl NewTransport {
    pub fn new(
        mode: impl Into<String>,
        route: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            mode: mode.into(),
            route: route.into(),
            status: status.into(),
        }
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.mode.trim().is_empty() {
            return Err(ServiceError::Invalid("mode is empty"));
        }
        if self.route.trim().is_empty() {
            return Err(ServiceError::Invalid("route is empty"));
        }
        if self.status.trim().is_empty() {
            return Err(ServiceError::Invalid("status is empty"));
        }
        Ok(())
    }

    fn to_body(&self) -> Value {
        json!({
            "mode": self.mode,
            "route": self.route,
            "status": self.status,
        })
    }
}

/// Partial update; `None` fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TransportUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        let fields = [&self.mode, &self.route, &self.status];
        if fields.iter().all(|f| f.is_none()) {
            return Err(ServiceError::Invalid("nothing to update"));
        }
        if fields
            .iter()
            .any(|f| f.as_deref().is_some_and(|v| v.trim().is_empty()))
        {
            return Err(ServiceError::Invalid("fields cannot be empty"));
        }
        Ok(())
    }

    /// Only the fields being changed.
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        let fields = [
            ("mode", &self.mode),
            ("route", &self.route),
            ("status", &self.status),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                body.insert(name.to_string(), Value::String(value.clone()));
            }
        }
        Value::Object(body)
    }
}

fn transport_path(id: i64) -> String {
    format!("{TRANSPORTS_PATH}/{id}")
}

impl CityClient {
    pub async fn list_transports(&self) -> Result<Vec<Transport>, ServiceError> {
        self.fetch_json(ApiRequest::get(TRANSPORTS_PATH), "transports")
            .await
    }

    pub async fn get_transport(&self, id: i64) -> Result<Transport, ServiceError> {
        self.fetch_json(ApiRequest::get(transport_path(id)), &format!("transport {id}"))
            .await
    }

    /// Admin only.
    pub async fn create_transport(&self, new: &NewTransport) -> Result<Transport, ServiceError> {
        self.session().require_privileged()?;
        new.validate()?;

        let created: Transport = self
            .fetch_json(ApiRequest::post(TRANSPORTS_PATH, new.to_body()), "transports")
            .await?;
        tracing::info!(id = created.id, mode = %created.mode, "Transport created");
        Ok(created)
    }

    /// Admin only.
    pub async fn update_transport(
        &self,
        id: i64,
        update: &TransportUpdate,
    ) -> Result<Transport, ServiceError> {
        self.session().require_privileged()?;
        update.validate()?;

        let updated: Transport = self
            .fetch_json(
                ApiRequest::put(transport_path(id), update.to_body()),
                &format!("transport {id}"),
            )
            .await?;
        tracing::info!(id, "Transport updated");
        Ok(updated)
    }

    /// Admin only.
    pub async fn delete_transport(&self, id: i64) -> Result<(), ServiceError> {
        self.session().require_privileged()?;

        self.execute(ApiRequest::delete(transport_path(id)), &format!("transport {id}"))
            .await?;
        tracing::info!(id, "Transport deleted");
        Ok(())
    }
}
