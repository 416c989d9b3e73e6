pub mod api;
mod error;
pub mod tasks;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

pub use api::{router, Server, ServerConfig};
pub use error::{ApiError, ControllerError, ErrorBody, ErrorEnvelope};

use crate::config::{Config, Listen};
use crate::datastore::{self, SharedStorage};

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the runtime serving the HTTP API.
pub struct TaskController {
    runtime: Runtime,
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl TaskController {
    /// Connects the storage named in `config` and starts serving.
    #[instrument(skip(config))]
    pub fn start(config: &Config) -> Result<Self, ControllerError> {
        let runtime = build_runtime()?;
        let storage = runtime.block_on(datastore::connect(&config.storage))?;
        Self::serve(runtime, &config.listen, storage)
    }

    /// Starts serving on top of an already opened storage.
    pub fn start_with_storage(
        listen: &Listen,
        storage: SharedStorage,
    ) -> Result<Self, ControllerError> {
        let runtime = build_runtime()?;
        Self::serve(runtime, listen, storage)
    }

    fn serve(
        runtime: Runtime,
        listen: &Listen,
        storage: SharedStorage,
    ) -> Result<Self, ControllerError> {
        let (tx_shutdown, rx_shutdown) = oneshot::channel::<()>();
        let server = Server::new(ServerConfig::from(listen), storage);
        let (local_addr, handle) = runtime.block_on(server.spawn(async move {
            rx_shutdown.await.ok();
        }))?;

        Ok(Self {
            runtime,
            local_addr,
            shutdown: Some(tx_shutdown),
            server: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections, lets in-flight requests finish and tears
    /// the runtime down.
    pub fn stop(mut self) -> Result<(), ControllerError> {
        info!("Stopping api...");
        if let Some(tx_shutdown) = self.shutdown.take() {
            let _ = tx_shutdown.send(());
        }
        if let Some(server) = self.server.take() {
            let drained = self.runtime.block_on(async {
                tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, server).await
            });
            if drained.is_err() {
                warn!("Api did not drain in time, dropping open connections.");
            }
        }
        self.runtime.shutdown_timeout(Duration::from_millis(100));
        Ok(())
    }
}

fn build_runtime() -> Result<Runtime, ControllerError> {
    let runtime = Builder::new_multi_thread()
        .thread_name("http-api")
        .enable_all()
        .build()?;
    Ok(runtime)
}
