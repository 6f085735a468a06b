//! Echo service HTTP server.
//!
//! Small demo of schema-guarded JSON endpoints with mapped error responses.
//!
//! - `POST /echo`: request validated against `echo-request.json`, echoed back
//! - `POST /greetings`: request and response both validated
//! - `GET /orders/:id`: only order `1` exists, everything else is `NOT_FOUND`
//! - `GET /maintenance`: always `SERVICE_UNAVAILABLE`

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use jsondata_core::{JsonBean, JsonEntity, ServiceError};
use jsondata_web::{AppError, AppState, CorrelationId, Entity, WebConfig, WebResult, install};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo_service=info,jsondata_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting echo service");

    // Load configuration
    let config = WebConfig::from_env()?;
    info!(
        schema_dir = %config.schema_dir.display(),
        correlation_header = %config.correlation_header,
        catch_panics = config.catch_panics,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);
    let app = install(router(), &config)?
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn router() -> Router<AppState> {
    Router::new()
        .route("/echo", post(echo))
        .route("/greetings", post(greet))
        .route("/orders/:id", get(order))
        .route("/maintenance", get(maintenance))
}

async fn echo(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Entity(request): Entity<JsonBean>,
) -> WebResult<Entity<JsonBean>> {
    info!(correlation_id = %correlation_id.0, "Echoing message");

    let response = state
        .request_guard("echo-request.json")
        .call(request, Ok::<_, AppError>)?;
    Ok(Entity(response))
}

async fn greet(
    State(state): State<AppState>,
    Entity(request): Entity<JsonBean>,
) -> WebResult<Entity<JsonBean>> {
    let response = state
        .guards("greeting-request.json", "greeting-response.json")
        .call_async(request, |request| async move { Ok::<_, AppError>(greeting(&request)) })
        .await?;
    Ok(Entity(response))
}

fn greeting(request: &JsonBean) -> JsonBean {
    let name = request.get_str("name").unwrap_or_default();
    let greeting = if request.get_bool("shout").unwrap_or(false) {
        format!("HELLO, {}!", name.to_uppercase())
    } else {
        format!("Hello, {name}!")
    };
    JsonBean::new().put_string("greeting", greeting)
}

async fn order(Path(id): Path<u64>) -> WebResult<Entity<JsonBean>> {
    if id != 1 {
        return Err(ServiceError::not_found().into());
    }

    Ok(Entity(
        JsonBean::new()
            .put("id", id)
            .put_string("status", "shipped"),
    ))
}

async fn maintenance() -> WebResult<Entity<JsonBean>> {
    Err(ServiceError::unavailable("MAINTENANCE").into())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use jsondata_core::{SchemaDirectory, ValidatorSource};

    fn schemas() -> SchemaDirectory {
        SchemaDirectory::new(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas"))
    }

    fn greeting_request(name: &str, shout: bool) -> JsonBean {
        JsonBean::new()
            .put_string("name", name)
            .put("shout", shout)
    }

    #[test]
    fn test_longest_accepted_name_gets_a_valid_greeting() {
        let schemas = schemas();
        let request_schema = schemas.validator("greeting-request.json").unwrap();
        let response_schema = schemas.validator("greeting-response.json").unwrap();
        let name = "n".repeat(32);

        for shout in [false, true] {
            let request = greeting_request(&name, shout);
            assert!(request_schema.validate(request.as_map()).is_ok());

            let response = greeting(&request);
            assert!(response_schema.validate(response.as_map()).is_ok());
        }
    }

    #[test]
    fn test_overlong_name_is_rejected_up_front() {
        let request_schema = schemas().validator("greeting-request.json").unwrap();

        let request = greeting_request(&"n".repeat(33), false);

        assert!(request_schema.validate(request.as_map()).is_err());
    }
}
