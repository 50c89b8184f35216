use axum::extract::DefaultBodyLimit;
use interview_backend::{
    build_router,
    config::{get_config, init_config, Config},
    database::{pool::create_pool, PgStore},
    services::{
        ai_service::GeminiClient,
        storage_service::{HttpObjectStorage, LocalDiskStorage, ObjectStorage},
    },
    AppParts, AppState,
};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn object_storage(config: &Config, client: Client) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    match (
        config.storage_upload_url.clone(),
        config.storage_api_key.clone(),
        config.storage_api_secret.clone(),
    ) {
        (Some(url), Some(key), Some(secret)) => {
            info!("Uploading interview audio to {}", url);
            Ok(Arc::new(HttpObjectStorage::new(client, url, key, secret)))
        }
        _ => {
            info!("Storing interview audio under {}", config.uploads_dir.display());
            Ok(Arc::new(LocalDiskStorage::new(
                config.uploads_dir.clone(),
                &config.public_base_url,
            )?))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    init_config()?;
    let config = get_config()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let http_client = Client::builder()
        .timeout(Duration::from_secs(config.ai_timeout_secs))
        .build()?;

    let ai_client = GeminiClient::new(
        http_client.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        Duration::from_secs(config.ai_timeout_secs),
        config.max_audio_bytes,
    );

    let state = AppState::new(AppParts {
        store: Arc::new(PgStore::new(pool)),
        ai_client: Arc::new(ai_client),
        storage: object_storage(config, http_client)?,
        jwt_secret: config.jwt_secret.clone(),
        assembler: config.assembler(),
        analysis: config.analysis(),
        ingest: config.ingest(),
    });

    info!("Serving uploads from: {}", config.uploads_dir.display());
    let app = build_router(state)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // room for the multipart framing around the audio part
        .layer(DefaultBodyLimit::max(config.max_audio_bytes + 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
