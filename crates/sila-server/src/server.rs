use std::future::Future;

use sila_inventory::Inventory;
use sila_store::Documents;
use tokio::net::TcpListener;

use crate::config::SilaConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Sila inventory server.
pub struct SilaServer {
    config: SilaConfig,
    state: AppState,
}

impl SilaServer {
    /// Validate `config` and open its document store.
    pub fn open(config: SilaConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = config.store.open()?;
        let documents = Documents::with_config(store, config.store.documents_config());
        let inventory = Inventory::new(documents, config.hierarchy);
        Ok(Self::with_inventory(config, inventory))
    }

    /// Serve an existing inventory. The store settings in `config` are ignored.
    pub fn with_inventory(config: SilaConfig, inventory: Inventory) -> Self {
        Self {
            config,
            state: AppState::new(inventory),
        }
    }

    pub fn config(&self) -> &SilaConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until the process is killed.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start serving requests until `shutdown` resolves, then drain.
    pub async fn serve_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let app = self.router();
        let addr = self.config.server.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Sila server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("Sila server stopped");
        Ok(())
    }
}
