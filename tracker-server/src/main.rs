use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracker_server::cache::{CacheConfig, TrainCache, spawn_auto_refresh};
use tracker_server::dataset::TrainDataset;
use tracker_server::web::{AppState, create_router};

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cache_dir = std::env::var("CACHE_DIR").unwrap_or_else(|_| "cache".to_string());
    let expiry = Duration::from_secs(env_u64("CACHE_EXPIRY_SECS", 30));
    let refresh_period = Duration::from_secs(env_u64("REFRESH_INTERVAL_SECS", 30));
    let port = env_u64("PORT", 5000) as u16;

    let config = CacheConfig::new(&cache_dir).with_expiry(expiry);
    let cache = TrainCache::new(&config).expect("Failed to initialise cache store");
    let dataset = Arc::new(TrainDataset::new());

    let state = AppState::new(cache.clone(), dataset);

    // Prime the cache before accepting traffic.
    if let Err(e) = state.regenerate_all().await {
        eprintln!("Warning: initial cache fill failed: {e}");
    }

    // Detached background task: full regeneration on a fixed period.
    let refresh_state = state.clone();
    spawn_auto_refresh(cache, refresh_period, move || {
        let state = refresh_state.clone();
        async move { state.regenerate_all().await }
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("Train tracker listening on http://{addr}");
    println!("Cache directory: {cache_dir} (expiry {expiry:?}, refresh {refresh_period:?})");
    println!();
    println!("API Endpoints:");
    println!("  GET  /api/trains               - List trains (station/type/status filters)");
    println!("  GET  /api/trains/{{id}}          - Train details");
    println!("  GET  /api/trains/{{id}}/position - Live train position");
    println!("  GET  /api/stations             - All stations");
    println!("  GET  /api/search?q=            - Search trains");
    println!("  GET  /api/status               - System status");
    println!("  GET  /api/cache/info           - Cache introspection");
    println!("  POST /api/cache/refresh        - Force cache regeneration");
    println!("  POST /api/cache/clear          - Clear cache (optional ?cache_type=)");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
