use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::database::DatabaseError;

/// Opens handles to persistent storage.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    /// Human-readable target for logs (no credentials).
    fn target(&self) -> String;

    async fn connect(&self) -> anyhow::Result<Self::Handle>;

    async fn close(&self, _handle: Self::Handle) {}
}

type Attempt<H> = Shared<BoxFuture<'static, Result<H, Arc<anyhow::Error>>>>;

struct State<H> {
    handle: Option<(u64, H)>,
    pending: Option<(u64, Attempt<H>)>,
    generation: u64,
}

/// Lazily establishes one storage handle and hands out clones of it.
///
/// Concurrent callers that arrive while the first attempt is still running all
/// await that same attempt. A failed attempt is discarded and the next call
/// starts over.
pub struct ConnectionProvider<C: Connector> {
    connector: Arc<C>,
    timeout: Duration,
    state: Mutex<State<C::Handle>>,
}

impl<C: Connector> ConnectionProvider<C> {
    pub fn new(connector: C, timeout: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            timeout,
            state: Mutex::new(State {
                handle: None,
                pending: None,
                generation: 0,
            }),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn is_connected(&self) -> bool {
        self.lock().handle.is_some()
    }

    /// Returns the established handle, connecting first if needed.
    pub async fn acquire(&self) -> Result<C::Handle, DatabaseError> {
        let (generation, attempt) = {
            let mut state = self.lock();
            if let Some((_, handle)) = &state.handle {
                return Ok(handle.clone());
            }
            match &state.pending {
                Some((generation, attempt)) => (*generation, attempt.clone()),
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let attempt = self.start_attempt();
                    state.pending = Some((generation, attempt.clone()));
                    (generation, attempt)
                }
            }
        };

        let result = attempt.await;

        let mut state = self.lock();
        let current = matches!(&state.pending, Some((g, _)) if *g == generation);
        match result {
            Ok(handle) => {
                if current {
                    state.handle = Some((generation, handle.clone()));
                    state.pending = None;
                    return Ok(handle);
                }
                match &state.handle {
                    Some((g, _)) if *g == generation => Ok(handle),
                    // close() took this attempt over and owns the handle
                    _ => Err(DatabaseError::EstablishmentFailed(Arc::new(anyhow::anyhow!(
                        "connection closed while it was being established"
                    )))),
                }
            }
            Err(e) => {
                if current {
                    state.pending = None;
                }
                Err(DatabaseError::EstablishmentFailed(e))
            }
        }
    }

    /// Teardown hook for process shutdown. An attempt still in flight is
    /// awaited and its handle closed too. A later `acquire` reconnects.
    pub async fn close(&self) {
        let (handle, pending) = {
            let mut state = self.lock();
            (state.handle.take(), state.pending.take())
        };

        let mut handles: Vec<C::Handle> = handle.into_iter().map(|(_, h)| h).collect();
        if let Some((_, attempt)) = pending {
            if let Ok(h) = attempt.await {
                handles.push(h);
            }
        }

        for handle in handles {
            self.connector.close(handle).await;
            info!("Closed database connection to {}", self.connector.target());
        }
    }

    fn start_attempt(&self) -> Attempt<C::Handle> {
        let connector = Arc::clone(&self.connector);
        let timeout = self.timeout;

        async move {
            let target = connector.target();
            let outcome = match tokio::time::timeout(timeout, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "timed out after {}ms selecting a server",
                    timeout.as_millis()
                )),
            };

            match outcome {
                Ok(handle) => {
                    info!("Database connected: {}", target);
                    Ok(handle)
                }
                Err(e) => {
                    error!("Database connection to {} failed: {:#}", target, e);
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, State<C::Handle>> {
        // State is only ever replaced wholesale, so a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Postgres connector backed by an sqlx pool.
pub struct PgConnector {
    config: DatabaseConfig,
}

impl PgConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn provider(config: DatabaseConfig) -> ConnectionProvider<Self> {
        let timeout = Duration::from_millis(config.server_selection_timeout_ms);
        ConnectionProvider::new(Self::new(config), timeout)
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgPool;

    fn target(&self) -> String {
        redact_url(&self.config.url)
    }

    async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_pool_size)
            .acquire_timeout(Duration::from_millis(self.config.server_selection_timeout_ms))
            .idle_timeout(Duration::from_millis(self.config.idle_timeout_ms))
            .connect(&self.config.url)
            .await?;
        Ok(pool)
    }

    async fn close(&self, handle: PgPool) {
        handle.close().await;
    }
}

/// Host, port and database of a connection URI, without credentials.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("localhost");
            match url.port() {
                Some(port) => format!("{}:{}{}", host, port, url.path()),
                None => format!("{}{}", host, url.path()),
            }
        }
        Err(_) => "<invalid database url>".to_string(),
    }
}
