//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::domain::RouteEdge;
use crate::graph::{GraphError, MAX_GRAPH_HOPS};
use crate::planner::{Planner, SearchError};
use crate::schedules::StoreError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search_get).post(search_post))
        .route("/admin/routes", get(admin_routes))
        .route("/admin/sync/index", post(sync_index))
        .route("/admin/sync/graph", post(sync_graph))
        .route("/admin/cache", delete(clear_cache))
        .route("/admin/health/database", get(database_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Search with query-string parameters.
async fn search_get(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    run_search(&state, &query).await
}

/// Search with a JSON body.
async fn search_post(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    run_search(&state, &query).await
}

async fn run_search(state: &AppState, query: &SearchQuery) -> Result<Json<SearchResponse>, AppError> {
    let request = query
        .to_request()
        .map_err(|message| AppError::BadRequest { message })?;

    info!(
        origin = %request.origin,
        destination = %request.destination,
        seats = request.seats,
        "Flight search request"
    );

    let planner = Planner::new(
        state.graph.as_deref(),
        Some(state.index.as_ref()),
        state.store.as_ref(),
        state.cache.as_ref(),
        &state.config,
    );
    let page = planner.search(&request).await?;

    Ok(Json(SearchResponse::from_page(&page)))
}

/// Enumerate routes between two airports.
async fn admin_routes(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RoutesResponse>, AppError> {
    let (origin, destination) = query
        .codes()
        .map_err(|message| AppError::BadRequest { message })?;

    let planner = Planner::new(
        state.graph.as_deref(),
        Some(state.index.as_ref()),
        state.store.as_ref(),
        state.cache.as_ref(),
        &state.config,
    );

    let routes = match query.hops {
        Some(hops) if hops > MAX_GRAPH_HOPS => {
            return Err(AppError::BadRequest {
                message: format!("hops must be at most {MAX_GRAPH_HOPS}"),
            });
        }
        Some(1) => planner.one_stop_routes(origin, destination).await,
        Some(hops) => {
            planner
                .find_routes_with_hops(origin, destination, hops)
                .await
        }
        None => planner.shortest_routes(origin, destination).await,
    };

    Ok(Json(RoutesResponse { routes }))
}

/// Rebuild the in-memory index from the relational store.
async fn sync_index(State(state): State<AppState>) -> Result<Json<IndexSyncResponse>, AppError> {
    let schedules = state.index.sync_from(&state.store).await?;
    // Cached results may predate the new schedules.
    state.cache.evict_all();
    Ok(Json(IndexSyncResponse { schedules }))
}

/// Push airports and aggregated routes into the graph backend.
async fn sync_graph(State(state): State<AppState>) -> Result<Json<GraphSyncResponse>, AppError> {
    let Some(graph) = state.graph.as_deref() else {
        return Err(AppError::ServiceUnavailable {
            message: "No graph backend configured".to_string(),
        });
    };

    let airports = state.store.airports().await?;
    let schedules = state.store.all_schedules().await?;
    let edges = RouteEdge::aggregate(&schedules, &airports);

    let airports = graph.sync_airports(&airports).await?;
    let routes = graph.sync_routes(&edges).await?;
    info!(airports, routes, "Graph synced");

    Ok(Json(GraphSyncResponse { airports, routes }))
}

/// Evict every cached search.
async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    let entries = state.cache.entry_count();
    state.cache.evict_all();
    info!(entries, "Search cache cleared");
    StatusCode::NO_CONTENT
}

/// Report relational store connectivity.
async fn database_health(State(state): State<AppState>) -> Response {
    match state.store.count_schedules().await {
        Ok(count) => Json(DatabaseHealthResponse {
            status: "healthy",
            schedule_count: Some(count),
            message: "Database connection successful".to_string(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Database health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DatabaseHealthResponse {
                    status: "unhealthy",
                    schedule_count: None,
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidRequest(message) => AppError::BadRequest { message },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<GraphError> for AppError {
    fn from(e: GraphError) -> Self {
        AppError::ServiceUnavailable {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::ServiceUnavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Airport, AirportCode, Fare, Schedule, ScheduleId};
    use crate::planner::SearchConfig;
    use crate::schedules::{ScheduleIndex, SqliteScheduleStore};
    use chrono::{Duration, NaiveDate};

    async fn state() -> AppState {
        let store = SqliteScheduleStore::open_in_memory().unwrap();
        let dep = NaiveDate::from_ymd_opt(2025, 8, 20)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        for (code, name) in [("DEL", "Delhi"), ("BLR", "Bengaluru"), ("BOM", "Mumbai")] {
            store
                .insert_airport(Airport::new(AirportCode::parse(code).unwrap(), name, name, "India"))
                .await
                .unwrap();
        }
        let flights = [
            (1, "DEL", "BOM", dep, 15000.0),
            (2, "DEL", "BLR", dep, 4000.0),
            (3, "BLR", "BOM", dep + Duration::hours(4), 3500.0),
        ];
        for (id, from, to, at, fare) in flights {
            store
                .insert_schedule(Schedule {
                    id: ScheduleId(id),
                    flight_number: format!("AI{id}"),
                    airline: "Air India".into(),
                    origin: AirportCode::parse(from).unwrap(),
                    destination: AirportCode::parse(to).unwrap(),
                    departure: at,
                    arrival: at + Duration::hours(2),
                    available_seats: 9,
                    fare: Fare::from_major(fare),
                })
                .await
                .unwrap();
        }

        AppState::new(store, ScheduleIndex::new(), None, SearchConfig::default())
    }

    fn query() -> SearchQuery {
        SearchQuery {
            source: "DEL".into(),
            destination: "BOM".into(),
            departure_date: Some("2025-08-20".into()),
            no_of_seats: 1,
            sort_by_price: true,
            ..SearchQuery::default()
        }
    }

    #[tokio::test]
    async fn search_finds_direct_and_connecting() {
        let state = state().await;

        let Json(response) = search_get(State(state), Query(query())).await.unwrap();

        assert_eq!(response.total_elements, 2);
        assert_eq!(response.content[0].flight_number, "AI2+AI3");
        assert_eq!(response.content[0].price, Fare::from_major(7500.0));
        assert_eq!(response.content[1].flight_number, "AI1");
    }

    #[tokio::test]
    async fn index_sync_then_search() {
        let state = state().await;

        let Json(synced) = sync_index(State(state.clone())).await.unwrap();
        assert_eq!(synced.schedules, 3);

        let Json(response) = search_post(State(state), Json(query())).await.unwrap();
        assert_eq!(response.total_elements, 2);
    }

    #[tokio::test]
    async fn bad_input_is_a_client_error() {
        let state = state().await;

        let mut bad_code = query();
        bad_code.source = "DELHI".into();
        let err = search_get(State(state.clone()), Query(bad_code)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));

        let mut no_seats = query();
        no_seats.no_of_seats = 0;
        let err = search_get(State(state), Query(no_seats)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn graph_sync_needs_a_backend() {
        let state = state().await;
        let err = sync_graph(State(state)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn route_listing() {
        let state = state().await;

        let query = RouteQuery {
            source: "DEL".into(),
            destination: "BOM".into(),
            hops: Some(1),
        };
        let Json(response) = admin_routes(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].to_string(), "DEL->BLR->BOM");

        let too_deep = RouteQuery {
            source: "DEL".into(),
            destination: "BOM".into(),
            hops: Some(4),
        };
        assert!(admin_routes(State(state), Query(too_deep)).await.is_err());
    }

    #[tokio::test]
    async fn database_health_reports_count() {
        let state = state().await;
        let response = database_health(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cache_clear() {
        let state = state().await;
        assert_eq!(clear_cache(State(state)).await, StatusCode::NO_CONTENT);
    }
}
