//! Application state management

use notes_core::{AppConfig, MemoryStore, NoteRepository, PgStore, UserRepository};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::auth::{AuthService, JwtManager, PasswordHasher};
use crate::notes::NoteService;

/// Latency histogram buckets
#[derive(Debug, Clone, Default)]
pub struct LatencyBuckets {
    pub under_10ms: u64,
    pub ms_10_50: u64,
    pub ms_50_100: u64,
    pub ms_100_500: u64,
    pub ms_500_1000: u64,
    pub over_1s: u64,
}

impl LatencyBuckets {
    fn record(&mut self, latency_us: u64) {
        match latency_us {
            0..=9_999 => self.under_10ms += 1,
            10_000..=49_999 => self.ms_10_50 += 1,
            50_000..=99_999 => self.ms_50_100 += 1,
            100_000..=499_999 => self.ms_100_500 += 1,
            500_000..=999_999 => self.ms_500_1000 += 1,
            _ => self.over_1s += 1,
        }
    }

    /// Bucket upper bounds in seconds with their counts, excluding `+Inf`
    pub fn bounded(&self) -> [(&'static str, u64); 5] {
        [
            ("0.01", self.under_10ms),
            ("0.05", self.ms_10_50),
            ("0.1", self.ms_50_100),
            ("0.5", self.ms_100_500),
            ("1", self.ms_500_1000),
        ]
    }
}

/// Per-endpoint request metrics
#[derive(Debug, Clone, Default)]
pub struct EndpointMetrics {
    pub status_counts: BTreeMap<u16, u64>,
    pub latency_count: u64,
    pub total_latency_us: u64,
    pub latency_buckets: LatencyBuckets,
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token issuer and verifier
    pub jwt: Arc<JwtManager>,
    /// Registration, login, refresh and logout
    pub auth: AuthService,
    /// Note CRUD
    pub notes: NoteService,
    /// PostgreSQL store, when one is configured
    pub db: Option<PgStore>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Request metrics keyed by route template
    pub metrics: RwLock<BTreeMap<String, EndpointMetrics>>,
}

/// Errors building the application state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] notes_core::ConfigError),

    #[error(transparent)]
    Password(#[from] crate::auth::PasswordError),
}

impl AppState {
    /// Wire services over the given stores
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        notes: Arc<dyn NoteRepository>,
        db: Option<PgStore>,
    ) -> Result<Self, StateError> {
        let jwt = Arc::new(JwtManager::from_config(&config.auth)?);
        let hasher = PasswordHasher::new(&config.auth.password)?;

        Ok(Self {
            auth: AuthService::new(users, jwt.clone(), hasher),
            notes: NoteService::new(notes),
            jwt,
            db,
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(BTreeMap::new()),
        })
    }

    /// State backed by a PostgreSQL store
    pub fn with_postgres(config: AppConfig, store: PgStore) -> Result<Self, StateError> {
        let shared = Arc::new(store.clone());
        Self::new(config, shared.clone(), shared, Some(store))
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(config: AppConfig) -> Result<Self, StateError> {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store, None)
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Whether the backing store answers
    ///
    /// Always true for the in-memory store.
    pub async fn store_reachable(&self) -> bool {
        match &self.db {
            Some(store) => store.ping().await,
            None => true,
        }
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.increment_requests();

        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();
        *entry.status_counts.entry(status).or_insert(0) += 1;
        entry.latency_count += 1;
        entry.total_latency_us += latency_us;
        entry.latency_buckets.record(latency_us);
    }
}
