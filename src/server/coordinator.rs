//! # Coordinator - Listener Setup and Accept Loops
//!
//! The coordinator owns two TCP listeners and runs them concurrently for the
//! lifetime of the process:
//!
//! ```text
//! worker port ── accept ──> WorkerRegistry::register
//! client port ── accept ──> spawn run_session ──> DistributionEngine::distribute
//! ```
//!
//! Each client connection gets its own task and its own distribution round
//! against the workers registered at that moment.

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{lookup_host, TcpListener, TcpSocket};

use crate::common::config::CoordinatorConfig;
use crate::server::distribution::DistributionEngine;
use crate::server::metrics::CoordinatorMetrics;
use crate::server::registry::WorkerRegistry;
use crate::server::session::run_session;

/// A coordinator with both listeners bound, ready to [`run`](Coordinator::run).
pub struct Coordinator {
    worker_listener: TcpListener,
    client_listener: TcpListener,
    registry: Arc<WorkerRegistry>,
    engine: DistributionEngine,
    metrics: CoordinatorMetrics,
}

impl Coordinator {
    /// Bind the worker and client listeners described by `config`.
    ///
    /// # Example
    /// ```ignore
    /// let config: CoordinatorConfig = load_config("config/coordinator.toml")?;
    /// let coordinator = Coordinator::bind(&config).await?;
    /// coordinator.run().await;
    /// ```
    pub async fn bind(config: &CoordinatorConfig) -> Result<Self> {
        config.validate()?;

        let worker_listener =
            bind_listener(&config.listen.worker_address, config.listen.worker_backlog).await?;
        let client_listener =
            bind_listener(&config.listen.client_address, config.listen.client_backlog).await?;

        let metrics = CoordinatorMetrics::new();
        let registry = Arc::new(WorkerRegistry::new(metrics.clone()));
        let engine = DistributionEngine::new(
            registry.clone(),
            metrics.clone(),
            config.distribution.task_timeout(),
        );

        Ok(Self {
            worker_listener,
            client_listener,
            registry,
            engine,
            metrics,
        })
    }

    pub fn worker_addr(&self) -> Result<SocketAddr> {
        Ok(self.worker_listener.local_addr()?)
    }

    pub fn client_addr(&self) -> Result<SocketAddr> {
        Ok(self.client_listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<WorkerRegistry> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> CoordinatorMetrics {
        self.metrics.clone()
    }

    /// Run both accept loops. Returns only if one of them stops.
    pub async fn run(self) {
        let Self {
            worker_listener,
            client_listener,
            registry,
            engine,
            metrics,
        } = self;

        tokio::select! {
            _ = accept_workers(worker_listener, registry) => error!("❌ Worker listener terminated"),
            _ = accept_clients(client_listener, engine, metrics) => error!("❌ Client listener terminated"),
        }
    }
}

/// Create a listener with an explicit accept backlog.
async fn bind_listener(address: &str, backlog: u32) -> Result<TcpListener> {
    let addr = lookup_host(address)
        .await
        .with_context(|| format!("failed to resolve {}", address))?
        .next()
        .with_context(|| format!("{} resolved to no addresses", address))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {}", addr))?;

    Ok(socket.listen(backlog)?)
}

async fn accept_workers(listener: TcpListener, registry: Arc<WorkerRegistry>) {
    if let Ok(addr) = listener.local_addr() {
        info!("📡 Listening for workers on {}", addr);
    }

    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                if let Err(e) = socket.set_nodelay(true) {
                    warn!("⚠️  Could not disable Nagle for worker {}: {}", addr, e);
                }
                registry.register(socket, addr.to_string()).await;
            }
            Err(e) => error!("❌ Worker accept error: {}", e),
        }
    }
}

async fn accept_clients(
    listener: TcpListener,
    engine: DistributionEngine,
    metrics: CoordinatorMetrics,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("📡 Listening for clients on {}", addr);
    }

    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let engine = engine.clone();
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    run_session(engine, metrics, socket, addr.to_string()).await;
                });
            }
            Err(e) => error!("❌ Client accept error: {}", e),
        }
    }
}
