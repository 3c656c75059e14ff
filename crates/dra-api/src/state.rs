//! Application state management
//!
//! Author: hephaex@gmail.com

use dra_channel::{ChannelSession, TelegramClient};
use dra_core::AppConfig;
use dra_pipeline::{Pipeline, RunReport};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Request statistics for one route
#[derive(Debug, Clone, Default)]
pub struct EndpointMetrics {
    pub count: u64,
    pub total_latency_us: u64,
    pub status_counts: HashMap<u16, u64>,
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Completed pipeline runs
    pub pipeline_runs: AtomicU64,
    /// Per-route request metrics
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
    pipeline: Pipeline,
    /// Channel sessions keyed by the SHA-256 of the bot token. Only
    /// sessions holding a cursor are kept.
    sessions: Mutex<HashMap<String, Arc<Mutex<ChannelSession>>>>,
}

/// Stable, non-reversible session key for a bot token
pub fn session_key(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

impl AppState {
    /// Create state with a pipeline built from the config
    pub fn new(config: AppConfig) -> dra_core::Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create state around an existing pipeline
    pub fn with_pipeline(config: AppConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            pipeline_runs: AtomicU64::new(0),
            metrics: RwLock::new(HashMap::new()),
            pipeline,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn get_pipeline_runs(&self) -> u64 {
        self.pipeline_runs.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Record one request against a route
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();
        entry.count += 1;
        entry.total_latency_us += latency_us;
        *entry.status_counts.entry(status).or_insert(0) += 1;
    }

    /// Get or create the session for a token
    async fn session(&self, key: &str, token: &str) -> dra_core::Result<Arc<Mutex<ChannelSession>>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(key) {
            return Ok(session.clone());
        }

        let client = TelegramClient::from_config(token, &self.config.telegram, &self.config.http)?;
        let session = Arc::new(Mutex::new(ChannelSession::new(Arc::new(client))));
        sessions.insert(key.to_string(), session.clone());
        debug!(session = %&key[..12], "created session");
        Ok(session)
    }

    /// Run the pipeline for a token; runs for the same token are serialized.
    ///
    /// A session that ends the run without a cursor (failed fetch, bad
    /// token, empty channel) is dropped again.
    pub async fn process(&self, token: &str) -> dra_core::Result<RunReport> {
        let key = session_key(token);
        let session = self.session(&key, token).await?;

        let report = {
            let mut channel = session.lock().await;
            let report = self.pipeline.run(&mut channel).await;
            if channel.cursor().is_none() {
                self.evict(&key, &session).await;
            }
            report
        };

        self.pipeline_runs.fetch_add(1, Ordering::SeqCst);
        Ok(report)
    }

    async fn evict(&self, key: &str, session: &Arc<Mutex<ChannelSession>>) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.remove(key);
            info!(session = %&key[..12], "dropped session without cursor");
        }
    }
}
