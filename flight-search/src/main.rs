use flight_search::graph::Neo4jRouteGraph;
use flight_search::schedules::{ScheduleIndex, SqliteScheduleStore};
use flight_search::settings::Settings;
use flight_search::web::{AppState, create_router};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_search=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().expect("Invalid settings");

    // Relational store and the index built from it
    let store = SqliteScheduleStore::open(&settings.database).expect("Failed to open database");
    let index = ScheduleIndex::new();
    match index.sync_from(&store).await {
        Ok(count) => info!(schedules = count, "Schedule index loaded"),
        Err(e) => warn!(error = %e, "Schedule index unavailable, searches will use the database"),
    }

    // Graph backend is optional; without it routes come from the store
    let graph = match settings.neo4j.clone() {
        Some(config) => match Neo4jRouteGraph::new(config) {
            Ok(graph) => match graph.probe().await {
                Ok(()) => {
                    info!("Neo4j graph backend available");
                    Some(graph)
                }
                Err(e) => {
                    warn!(error = %e, "Neo4j unreachable, using depth-first route search");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to create Neo4j client, using depth-first route search");
                None
            }
        },
        None => {
            info!("No graph backend configured, using depth-first route search");
            None
        }
    };

    let state = AppState::new(store, index, graph, settings.search_config());
    let app = create_router(state);

    info!(addr = %settings.addr, "Flight search listening");

    let listener = tokio::net::TcpListener::bind(settings.addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
