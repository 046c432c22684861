use std::sync::Arc;

use crate::models::{QueryResult, SendQueryRequest, ServerSummary};
use crate::services::dispatcher::QueryDispatcher;
use crate::services::server_registry::ServerRegistry;

/// Server name reported when the requested id is not in the registry
pub const UNKNOWN_SERVER: &str = "unknown";

/// Ad-hoc query entry point: resolves the server, then hands off to the dispatcher
pub struct QueryService {
    registry: Arc<ServerRegistry>,
    dispatcher: Arc<QueryDispatcher>,
}

impl QueryService {
    pub fn new(registry: Arc<ServerRegistry>, dispatcher: Arc<QueryDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub async fn run_query(&self, request: SendQueryRequest) -> QueryResult {
        let Some(server) = self.registry.get(request.server_id) else {
            tracing::error!("Server {} not found", request.server_id);
            return QueryResult::failed(
                UNKNOWN_SERVER,
                format!("Server {} not found", request.server_id),
            );
        };

        tracing::info!("Executing query on server '{}' ({})", server.name, server.dialect);
        self.dispatcher.run(server, &request.query).await
    }

    pub fn list_servers(&self) -> Vec<ServerSummary> {
        self.registry.summaries()
    }
}
