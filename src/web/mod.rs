// src/web/mod.rs
//! HTTP surface: routes, CORS and error catchers

pub mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;
pub use types::*;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};

use crate::app_log;
use crate::core::config_manager::ServerConfig;
use crate::types::{AnalysisKind, AnalysisRecord, IcebreakerRequest, TranscriptRequest};

const DEFAULT_ALLOWED_HEADERS: &str = "Content-Type, Authorization, Accept";

// CORS Fairing
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|pattern| origin_matches(pattern, origin))
    }
}

/// Exact match, `*` for any origin, or a single `*` standing for a subdomain
/// label sequence, e.g. `https://*.netlify.app`.
fn origin_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            origin.len() > prefix.len() + suffix.len()
                && origin.starts_with(prefix)
                && origin.ends_with(suffix)
                && !origin[prefix.len()..origin.len() - suffix.len()].contains('/')
        }
        None => pattern == origin,
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = request.headers().get_one("Origin") else {
            return;
        };
        if !self.allows(origin) {
            return;
        }

        response.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        response.set_header(Header::new("Vary", "Origin"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        let allowed_headers = request
            .headers()
            .get_one("Access-Control-Request-Headers")
            .unwrap_or(DEFAULT_ALLOWED_HEADERS)
            .to_string();
        response.set_header(Header::new("Access-Control-Allow-Headers", allowed_headers));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// ===== Transcripts =====

#[post("/transcripts", data = "<request>")]
pub async fn create_transcript(
    request: Json<TranscriptRequest>,
    state: &State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    handlers::submit_handler(state, request.into_inner().into()).await
}

#[get("/transcripts/job/<job_id>")]
pub async fn transcript_job_status(
    job_id: &str,
    state: &State<AppState>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    handlers::job_status_handler(state, AnalysisKind::Transcript, job_id).await
}

#[get("/transcripts")]
pub async fn list_transcripts(state: &State<AppState>) -> Json<Vec<AnalysisRecord>> {
    handlers::list_handler(state, AnalysisKind::Transcript).await
}

#[get("/transcripts/<id>")]
pub async fn get_transcript(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    handlers::get_handler(state, AnalysisKind::Transcript, id).await
}

// ===== LinkedIn icebreakers =====

#[post("/linkedin-icebreakers", data = "<request>")]
pub async fn create_icebreaker(
    request: Json<IcebreakerRequest>,
    state: &State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    handlers::submit_handler(state, request.into_inner().into()).await
}

#[get("/linkedin-icebreakers/job/<job_id>")]
pub async fn icebreaker_job_status(
    job_id: &str,
    state: &State<AppState>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    handlers::job_status_handler(state, AnalysisKind::Icebreaker, job_id).await
}

#[get("/linkedin-icebreakers")]
pub async fn list_icebreakers(state: &State<AppState>) -> Json<Vec<AnalysisRecord>> {
    handlers::list_handler(state, AnalysisKind::Icebreaker).await
}

#[get("/linkedin-icebreakers/<id>")]
pub async fn get_icebreaker(
    id: &str,
    state: &State<AppState>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    handlers::get_handler(state, AnalysisKind::Icebreaker, id).await
}

// ===== System =====

#[get("/")]
pub async fn root() -> Json<MessageResponse> {
    handlers::root_handler().await
}

#[get("/health")]
pub async fn health(state: &State<AppState>) -> Json<HealthResponse> {
    handlers::health_handler(state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable_entity() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body does not match the expected fields".to_string(),
        "VALIDATION_ERROR".to_string(),
        vec![
            "Send every field as a string".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

/// Assemble the Rocket instance without launching it
pub fn build_rocket(state: AppState, server: &ServerConfig) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
        .merge(("log_level", "critical"));

    rocket::custom(figment)
        .attach(Cors::new(server.cors_allowed_origins.clone()))
        .manage(state)
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable_entity, internal_error],
        )
        .mount(
            "/",
            routes![
                root,
                health,
                create_transcript,
                transcript_job_status,
                list_transcripts,
                get_transcript,
                create_icebreaker,
                icebreaker_job_status,
                list_icebreakers,
                get_icebreaker,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(state: AppState, server: &ServerConfig) -> Result<()> {
    app_log!(
        info,
        "Starting Transcript Insight API on {}:{}",
        server.address,
        server.port
    );

    build_rocket(state, server)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Web server failed: {}", e))?;

    app_log!(info, "Web server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TempStores, UnreachableQueue, UnreachableRecordStore};
    use rocket::http::ContentType;
    use rocket::local::asynchronous::Client;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn server() -> ServerConfig {
        ServerConfig {
            address: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://*.netlify.app".to_string(),
            ],
        }
    }

    async fn client(state: AppState) -> Client {
        Client::tracked(build_rocket(state, &server())).await.unwrap()
    }

    async fn json_body(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    fn acme() -> Value {
        json!({
            "company_name": "Acme",
            "attendees": "A,B",
            "date": "2025-01-01",
            "transcript_text": "Kickoff call about the Q3 roadmap"
        })
    }

    #[test]
    fn test_origin_patterns() {
        let cors = Cors::new(server().cors_allowed_origins);
        assert!(cors.allows("http://localhost:3000"));
        assert!(cors.allows("https://my-app.netlify.app"));
        assert!(!cors.allows("https://netlify.app"));
        assert!(!cors.allows("http://my-app.netlify.app"));
        assert!(!cors.allows("https://evil.com/x.netlify.app"));
        assert!(Cors::new(vec!["*".to_string()]).allows("https://anything.dev"));
    }

    #[tokio::test]
    async fn test_submit_returns_ids_and_pending_status() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(
            Some(stores.records.clone()),
            stores.queue.clone(),
        ))
        .await;

        let response = client
            .post("/transcripts")
            .header(ContentType::JSON)
            .body(acme().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();
        let transcript_id = body["transcript_id"].as_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&job_id).is_ok());

        let status = json_body(
            client
                .get(format!("/transcripts/job/{}", job_id))
                .dispatch()
                .await,
        )
        .await;
        assert_eq!(status["status"], "pending");
        assert!(status.get("result").is_none());

        let record = json_body(
            client
                .get(format!("/transcripts/{}", transcript_id))
                .dispatch()
                .await,
        )
        .await;
        assert_eq!(record["company_name"], "Acme");
        assert_eq!(record["analysis"], "");
        assert_eq!(record["job_id"], job_id.as_str());

        let list = json_body(client.get("/transcripts").dispatch().await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        // The icebreaker routes do not see transcript jobs
        let other = json_body(
            client
                .get(format!("/linkedin-icebreakers/job/{}", job_id))
                .dispatch()
                .await,
        )
        .await;
        assert_eq!(other["status"], "unknown");
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(None, stores.queue.clone())).await;

        let response = client
            .post("/linkedin-icebreakers")
            .header(ContentType::JSON)
            .body(json!({"linkedin_bio": "  ", "pitch_deck": "Deck"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body = json_body(response).await;
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert_eq!(body["type"], "error");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_standard_error() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(None, stores.queue.clone())).await;

        let response = client
            .post("/transcripts")
            .header(ContentType::JSON)
            .body(json!({"company_name": "Acme"}).to_string())
            .dispatch()
            .await;
        assert!([Status::BadRequest, Status::UnprocessableEntity].contains(&response.status()));
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(
            Some(stores.records.clone()),
            stores.queue.clone(),
        ))
        .await;

        let response = client.get("/transcripts/does-not-exist").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(json_body(response).await["error_code"], "NOT_FOUND");

        let status = json_body(client.get("/transcripts/job/does-not-exist").dispatch().await).await;
        assert_eq!(
            status,
            json!({"job_id": "does-not-exist", "status": "unknown", "state": null})
        );
    }

    #[tokio::test]
    async fn test_unconfigured_store_degrades() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(None, stores.queue.clone())).await;

        let list = json_body(client.get("/linkedin-icebreakers").dispatch().await).await;
        assert_eq!(list, json!([]));

        let response = client.get("/linkedin-icebreakers/abc").dispatch().await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
        assert_eq!(
            json_body(response).await["error_code"],
            "DATABASE_NOT_CONFIGURED"
        );

        let response = client
            .post("/transcripts")
            .header(ContentType::JSON)
            .body(acme().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert!(json_body(response).await["job_id"].is_string());
    }

    #[tokio::test]
    async fn test_unreachable_store_degrades() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(
            Some(Arc::new(UnreachableRecordStore)),
            stores.queue.clone(),
        ))
        .await;

        let list = json_body(client.get("/transcripts").dispatch().await).await;
        assert_eq!(list, json!([]));

        let response = client
            .post("/transcripts")
            .header(ContentType::JSON)
            .body(acme().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/transcripts/abc").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
        assert_eq!(json_body(response).await["error_code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_queue_down_fails_submission() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(
            Some(stores.records.clone()),
            Arc::new(UnreachableQueue),
        ))
        .await;

        let response = client
            .post("/transcripts")
            .header(ContentType::JSON)
            .body(acme().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
        assert_eq!(json_body(response).await["error_code"], "QUEUE_UNAVAILABLE");

        let response = client.get("/transcripts/job/abc").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);

        let health = json_body(client.get("/health").dispatch().await).await;
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["services"]["queue"], "disconnected");
    }

    #[tokio::test]
    async fn test_root_health_and_cors() {
        let stores = TempStores::new().await;
        let client = client(AppState::new(None, stores.queue.clone())).await;

        let root = json_body(client.get("/").dispatch().await).await;
        assert_eq!(root["message"], "Transcript Insight API is running");

        let health = json_body(client.get("/health").dispatch().await).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(health["services"]["api"], "running");
        assert_eq!(health["services"]["database"], "not_configured");
        assert_eq!(health["services"]["queue"], "connected");

        let preflight = client
            .options("/transcripts")
            .header(Header::new("Origin", "https://preview.netlify.app"))
            .dispatch()
            .await;
        assert_eq!(preflight.status(), Status::Ok);
        assert_eq!(
            preflight.headers().get_one("Access-Control-Allow-Origin"),
            Some("https://preview.netlify.app")
        );
        assert_eq!(
            preflight.headers().get_one("Access-Control-Allow-Headers"),
            Some(DEFAULT_ALLOWED_HEADERS)
        );

        // Credentialed preflights get the requested headers echoed back
        let requested = client
            .options("/transcripts")
            .header(Header::new("Origin", "http://localhost:3000"))
            .header(Header::new("Access-Control-Request-Headers", "content-type, x-request-id"))
            .dispatch()
            .await;
        assert_eq!(
            requested.headers().get_one("Access-Control-Allow-Headers"),
            Some("content-type, x-request-id")
        );
        assert_eq!(
            requested.headers().get_one("Access-Control-Allow-Credentials"),
            Some("true")
        );

        let foreign = client
            .get("/")
            .header(Header::new("Origin", "https://evil.example"))
            .dispatch()
            .await;
        assert!(foreign
            .headers()
            .get_one("Access-Control-Allow-Origin")
            .is_none());
    }
}
