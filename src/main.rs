use std::net::{IpAddr, SocketAddr};

use orquestulator::{
    AppState, app,
    config::Config,
    session::{SessionStore, spawn_purge_task},
    stackstorm::ConnectionsConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    if config.passphrase_auth && config.passphrase == Config::default().passphrase {
        tracing::warn!("PASSPHRASE is still the built-in default; set it before exposing the server");
    }

    let session_config = config.session_config();
    tracing::info!(
        "Session store: timeout {}s, proactive cleanup {}, sweep limit {:?}",
        config.session_timeout().as_secs(),
        session_config.proactive_cleanup,
        session_config.sweep_limit
    );
    let sessions = SessionStore::new(session_config);

    if let Some(every) = config.session_purge_interval() {
        tracing::info!("Purging expired sessions every {}s", every.as_secs());
        spawn_purge_task(sessions.clone(), every);
    }

    let connections = ConnectionsConfig::load(&config.stackstorm_connections_config);

    let state = AppState::new(config, sessions, connections)
        .expect("Failed to build StackStorm HTTP client");

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );

    let router = app(state);

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
