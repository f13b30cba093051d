// src/web/handlers/system_handlers.rs
use chrono::Utc;
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::web::types::{AppState, HealthResponse, HealthServices, MessageResponse};

pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Transcript Insight API is running".to_string(),
    })
}

pub async fn health_handler(state: &State<AppState>) -> Json<HealthResponse> {
    let database = match state.records() {
        None => "not_configured",
        Some(records) => match records.health_check().await {
            Ok(()) => "connected",
            Err(e) => {
                app_log!(warn, "Record store health check failed: {:#}", e);
                "disconnected"
            }
        },
    };

    let queue = match state.queue.health_check().await {
        Ok(()) => "connected",
        Err(e) => {
            app_log!(warn, "Job queue health check failed: {:#}", e);
            "disconnected"
        }
    };

    let status = if queue == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        services: HealthServices {
            api: "running".to_string(),
            database: database.to_string(),
            queue: queue.to_string(),
        },
    })
}
