use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use packhouse_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Auth service for token issuance and request validation
    let auth_cfg = api::auth::AuthConfig::new(
        cfg.jwt_secret.clone(),
        cfg.auth_issuer.clone(),
        cfg.auth_audience.clone(),
        Duration::from_secs(cfg.jwt_expiration),
    );
    let auth_service = Arc::new(api::auth::AuthService::new(auth_cfg));

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

    // Compose shared app state
    let app_state = api::AppState {
        db: db_arc.clone(),
        config: cfg.clone(),
        event_sender,
        services,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .into(),
        );
    };

    // Build router: status/health + full v1 API
    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "packhouse-api up" }))
        .nest("/api/v1", api::api_v1_routes())
        .nest(
            "/auth",
            api::auth::auth_routes().with_state(auth_service.clone()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service.clone(),
            |axum::extract::State(auth): axum::extract::State<Arc<api::auth::AuthService>>,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(app_state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("packhouse-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
