use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingSmsTransport};
use crate::routes::with_records_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gradebook::config::AppConfig;
use gradebook::error::AppError;
use gradebook::records::{InMemoryRecordStore, RecordStore, RecordsApi, SqliteRecordStore};
use gradebook::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let transport = Arc::new(LoggingSmsTransport::new(
        config.notifications.sms_sender.clone(),
    ));

    match config.storage.database_path.clone() {
        Some(path) => {
            let store = Arc::new(SqliteRecordStore::open(&path)?);
            info!(path = %path.display(), "sqlite record store opened");
            serve_with(config, store, transport).await
        }
        None => {
            warn!("APP_DATABASE_PATH not set, records are kept in memory only");
            serve_with(config, Arc::new(InMemoryRecordStore::default()), transport).await
        }
    }
}

async fn serve_with<S>(
    config: AppConfig,
    store: Arc<S>,
    transport: Arc<LoggingSmsTransport>,
) -> Result<(), AppError>
where
    S: RecordStore + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let api = Arc::new(RecordsApi::new(store, transport, config.access.clone()));
    let app = with_records_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    let granted: Vec<&str> = config.access.granted().map(|c| c.key()).collect();
    info!(?config.environment, %addr, ?granted, "student records service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
