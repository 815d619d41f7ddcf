//! Neo4j route graph over the HTTP transactional endpoint.
//!
//! Statements are posted to `{base_url}/db/{database}/tx/commit`. Airports are
//! `(:Airport {code})` nodes; connections are `[:CONNECTED_TO]` relationships
//! carrying the aggregated [`RouteEdge`] fields.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::domain::{Airport, AirportCode, RouteEdge};

use super::{GraphError, MAX_GRAPH_HOPS, RouteGraph};

/// Default database name.
const DEFAULT_DATABASE: &str = "neo4j";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Configuration for the Neo4j client.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Server root, e.g. `http://localhost:7474`
    pub base_url: String,
    /// Database name
    pub database: String,
    /// Basic-auth credentials (username, password)
    pub credentials: Option<(String, String)>,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Neo4jConfig {
    /// Create a new config for the given server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: DEFAULT_DATABASE.to_string(),
            credentials: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 10,
        }
    }

    /// Use a database other than the default.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Authenticate with basic auth.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.base_url.trim_end_matches('/'),
            self.database
        )
    }
}

/// Route graph backed by a Neo4j server.
#[derive(Debug, Clone)]
pub struct Neo4jRouteGraph {
    http: reqwest::Client,
    commit_url: String,
    semaphore: Arc<Semaphore>,
}

impl Neo4jRouteGraph {
    /// Create a new client. Does not contact the server; see [`Self::probe`].
    pub fn new(config: Neo4jConfig) -> Result<Self, GraphError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some((user, password)) = &config.credentials {
            let token = STANDARD.encode(format!("{user}:{password}"));
            let value = HeaderValue::from_str(&format!("Basic {token}")).map_err(|_| {
                GraphError::ApiError {
                    status: 0,
                    message: "Invalid credentials format".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            commit_url: config.commit_url(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// Check the server is reachable and accepts our credentials.
    pub async fn probe(&self) -> Result<(), GraphError> {
        self.execute("RETURN 1", json!({})).await.map(|_| ())
    }

    /// Merge airport nodes. Returns the number of airports sent.
    pub async fn sync_airports(&self, airports: &[Airport]) -> Result<usize, GraphError> {
        let rows: Vec<Value> = airports
            .iter()
            .map(|a| {
                json!({
                    "code": a.code.as_str(),
                    "name": a.name,
                    "city": a.city,
                    "country": a.country,
                    "latitude": a.coordinates.map(|c| c.latitude),
                    "longitude": a.coordinates.map(|c| c.longitude),
                })
            })
            .collect();

        self.execute(
            "UNWIND $airports AS a \
             MERGE (n:Airport {code: a.code}) \
             SET n.name = a.name, n.city = a.city, n.country = a.country, \
                 n.latitude = a.latitude, n.longitude = a.longitude",
            json!({ "airports": rows }),
        )
        .await?;

        info!(airports = airports.len(), "Synced airports to graph");
        Ok(airports.len())
    }

    /// Merge `CONNECTED_TO` relationships. Endpoints must already exist.
    pub async fn sync_routes(&self, edges: &[RouteEdge]) -> Result<usize, GraphError> {
        let rows: Vec<Value> = edges
            .iter()
            .map(|e| {
                json!({
                    "origin": e.origin.as_str(),
                    "destination": e.destination.as_str(),
                    "flightNumber": e.flight_number,
                    "airline": e.airline,
                    "distanceKm": e.distance_km,
                    "avgDurationMins": e.avg_duration_mins,
                    "avgFare": e.avg_fare,
                    "frequency": e.frequency,
                })
            })
            .collect();

        self.execute(
            "UNWIND $edges AS e \
             MATCH (a:Airport {code: e.origin}), (b:Airport {code: e.destination}) \
             MERGE (a)-[r:CONNECTED_TO {flightNumber: e.flightNumber}]->(b) \
             SET r.airline = e.airline, r.distanceKm = e.distanceKm, \
                 r.avgDurationMins = e.avgDurationMins, r.avgFare = e.avgFare, \
                 r.frequency = e.frequency",
            json!({ "edges": rows }),
        )
        .await?;

        info!(edges = edges.len(), "Synced route edges to graph");
        Ok(edges.len())
    }

    /// Run one statement in an auto-commit transaction.
    async fn execute(&self, statement: &str, parameters: Value) -> Result<TxResponse, GraphError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GraphError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self.http.post(&self.commit_url).json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GraphError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = response.text().await?;
        parse_response(&text)
    }

    async fn query_routes(
        &self,
        statement: &str,
        parameters: Value,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        let response = self.execute(statement, parameters).await?;
        let routes = extract_routes(response);
        debug!(routes = routes.len(), "Graph query complete");
        Ok(routes)
    }
}

/// Statement for simple paths with exactly `edges` relationships.
///
/// Variable-length bounds cannot be parameters in Cypher, so the count is
/// formatted into the statement.
fn exact_hops_statement(edges: usize) -> String {
    format!(
        "MATCH path = (start:Airport {{code: $source}})-[:CONNECTED_TO*{edges}]->(end:Airport {{code: $destination}}) \
         WHERE ALL(node IN nodes(path) WHERE size([x IN nodes(path) WHERE x = node]) = 1) \
         RETURN DISTINCT [node IN nodes(path) | node.code] AS route \
         LIMIT $maxResults"
    )
}

fn shortest_paths_statement() -> String {
    format!(
        "MATCH path = (start:Airport {{code: $source}})-[:CONNECTED_TO*1..{}]->(end:Airport {{code: $destination}}) \
         WHERE ALL(node IN nodes(path) WHERE size([x IN nodes(path) WHERE x = node]) = 1) \
         WITH [node IN nodes(path) | node.code] AS route, length(path) AS len, \
              reduce(total = 0.0, rel IN relationships(path) | total + coalesce(rel.avgFare, 0.0)) AS fare \
         RETURN route ORDER BY len ASC, fare ASC \
         LIMIT $maxResults",
        MAX_GRAPH_HOPS + 1
    )
}

const ONE_STOP_STATEMENT: &str = "MATCH (start:Airport {code: $source})-[r1:CONNECTED_TO]->(mid:Airport)-[r2:CONNECTED_TO]->(end:Airport {code: $destination}) \
     WHERE mid <> start AND mid <> end \
     RETURN [start.code, mid.code, end.code] AS route \
     ORDER BY coalesce(r1.avgFare, 0.0) + coalesce(r2.avgFare, 0.0) ASC \
     LIMIT $maxResults";

impl RouteGraph for Neo4jRouteGraph {
    async fn shortest_paths(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_results: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        self.query_routes(
            &shortest_paths_statement(),
            route_params(origin, destination, max_results),
        )
        .await
    }

    async fn paths_with_exact_hops(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
        max_results: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        self.query_routes(
            &exact_hops_statement(hops + 1),
            route_params(origin, destination, max_results),
        )
        .await
    }

    async fn one_stop_connections(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_results: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        self.query_routes(
            ONE_STOP_STATEMENT,
            route_params(origin, destination, max_results),
        )
        .await
    }
}

fn route_params(origin: AirportCode, destination: AirportCode, max_results: usize) -> Value {
    json!({
        "source": origin.as_str(),
        "destination": destination.as_str(),
        "maxResults": max_results,
    })
}

// Transactional endpoint response shapes.

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

fn parse_response(body: &str) -> Result<TxResponse, GraphError> {
    let response: TxResponse = serde_json::from_str(body).map_err(|e| GraphError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })?;

    if let Some(err) = response.errors.first() {
        return Err(GraphError::Query {
            code: err.code.clone(),
            message: err.message.clone(),
        });
    }

    Ok(response)
}

/// First column of every row as a list of airport codes, duplicates removed.
fn extract_routes(response: TxResponse) -> Vec<Vec<AirportCode>> {
    let mut routes: Vec<Vec<AirportCode>> = Vec::new();
    for row in response.results.into_iter().flat_map(|r| r.data) {
        let Some(first) = row.row.into_iter().next() else {
            continue;
        };
        match serde_json::from_value::<Vec<AirportCode>>(first) {
            Ok(route) => {
                if !routes.contains(&route) {
                    routes.push(route);
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed route row"),
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> AirportCode {
        AirportCode::parse(s).unwrap()
    }

    #[test]
    fn commit_url() {
        let config = Neo4jConfig::new("http://localhost:7474/");
        assert_eq!(config.commit_url(), "http://localhost:7474/db/neo4j/tx/commit");

        let config = Neo4jConfig::new("http://graph:7474").with_database("flights");
        assert_eq!(config.commit_url(), "http://graph:7474/db/flights/tx/commit");
    }

    #[test]
    fn config_builders() {
        let config = Neo4jConfig::new("http://graph:7474")
            .with_credentials("neo4j", "secret")
            .with_timeout(3);
        assert_eq!(
            config.credentials,
            Some(("neo4j".to_string(), "secret".to_string()))
        );
        assert_eq!(config.timeout_secs, 3);
        assert!(Neo4jRouteGraph::new(config).is_ok());
    }

    #[test]
    fn exact_hops_statement_embeds_edge_count() {
        let stmt = exact_hops_statement(3);
        assert!(stmt.contains("[:CONNECTED_TO*3]"));
        assert!(stmt.contains("{code: $source}"));
        assert!(stmt.contains("LIMIT $maxResults"));
    }

    #[test]
    fn shortest_paths_statement_bounds_length() {
        assert!(shortest_paths_statement().contains("[:CONNECTED_TO*1..4]"));
    }

    #[test]
    fn parses_routes_and_drops_duplicates() {
        let body = r#"{
            "results": [{
                "columns": ["route"],
                "data": [
                    {"row": [["DEL", "BLR", "BOM"]], "meta": [null]},
                    {"row": [["DEL", "HYD", "BOM"]], "meta": [null]},
                    {"row": [["DEL", "BLR", "BOM"]], "meta": [null]}
                ]
            }],
            "errors": []
        }"#;
        let routes = extract_routes(parse_response(body).unwrap());
        assert_eq!(
            routes,
            vec![
                vec![code("DEL"), code("BLR"), code("BOM")],
                vec![code("DEL"), code("HYD"), code("BOM")],
            ]
        );
    }

    #[test]
    fn skips_rows_with_bad_codes() {
        let body = r#"{
            "results": [{"columns": ["route"], "data": [
                {"row": [["DEL", "b1", "BOM"]]},
                {"row": [null]},
                {"row": []},
                {"row": [["DEL", "BOM"]]}
            ]}],
            "errors": []
        }"#;
        let routes = extract_routes(parse_response(body).unwrap());
        assert_eq!(routes, vec![vec![code("DEL"), code("BOM")]]);
    }

    #[test]
    fn statement_errors_become_query_errors() {
        let body = r#"{
            "results": [],
            "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "Invalid input 'X'"}]
        }"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, GraphError::Query { ref code, .. } if code.ends_with("SyntaxError")));
    }

    #[test]
    fn garbage_body_is_json_error() {
        let err = parse_response("<html>bad gateway</html>").unwrap_err();
        match err {
            GraphError::Json { body, .. } => assert_eq!(body.as_deref(), Some("<html>bad gateway</html>")),
            other => panic!("expected Json error, got {other:?}"),
        }
    }
}
