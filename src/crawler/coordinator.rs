//! Crawl coordinator - main crawl orchestration logic
//!
//! Profiles are dealt round-robin to a fixed number of workers. Each worker
//! walks its profiles one at a time: plan the chunks, run one fetcher task
//! per chunk, and join them all before moving on. Every fetcher of a run
//! shares one dedup set and one ingest sink; the sink is stopped once all
//! workers are done, whatever happened to them.

use crate::config::Config;
use crate::crawler::credentials::CredentialPool;
use crate::crawler::dedup::SeenSet;
use crate::crawler::fetcher::{ChunkFetcher, ChunkOutcome};
use crate::crawler::planner::plan;
use crate::crawler::throttle::Throttle;
use crate::output::{IngestSink, SinkHandle, SinkReport};
use crate::source::{HttpSource, MemorySource, PostSource, SourceError};
use crate::state::ChunkState;
use crate::{ConfigError, ConfigResult, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

const DEFAULT_CHUNKS_PER_PROFILE: usize = 5;
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BATCH_SIZE: usize = 100;

/// Summary of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Records emitted by all chunk fetchers
    pub records: usize,

    /// Chunks that reached their end or the end of the profile
    pub chunks_done: usize,

    /// Chunks that gave up after their retry budget
    pub chunks_exhausted: usize,

    /// Profiles that were not found or had a chunk task fail
    pub failed_profiles: Vec<String>,

    /// What the sink writer reported on shutdown
    pub sink: SinkReport,
}

impl CrawlReport {
    fn absorb(&mut self, tally: WorkerTally) {
        self.records += tally.records;
        self.chunks_done += tally.chunks_done;
        self.chunks_exhausted += tally.chunks_exhausted;
        self.failed_profiles.extend(tally.failed_profiles);
    }
}

/// Per-worker counters, merged into the report once the worker ends
#[derive(Debug, Default)]
struct WorkerTally {
    records: usize,
    chunks_done: usize,
    chunks_exhausted: usize,
    failed_profiles: Vec<String>,
}

impl WorkerTally {
    fn record_chunk(&mut self, outcome: &ChunkOutcome) {
        self.records += outcome.fetched;
        match outcome.state {
            ChunkState::Exhausted => self.chunks_exhausted += 1,
            _ => self.chunks_done += 1,
        }
    }
}

/// Everything a worker task needs, shared by all workers of a run
struct RunContext {
    coordinator: Coordinator,
    sink: SinkHandle,
    seen: SeenSet,
    max_posts_per_profile: usize,
}

/// Main crawler coordinator structure
#[derive(Clone)]
pub struct Coordinator {
    source: Arc<dyn PostSource>,
    pool: CredentialPool,
    throttle: Throttle,
    chunks_per_profile: usize,
    max_attempts: u32,
    batch_size: usize,
    output_path: PathBuf,
}

impl Coordinator {
    /// Creates a coordinator with default tuning
    ///
    /// # Arguments
    ///
    /// * `source` - Data source every fetcher reads from
    /// * `pool` - Sessions handed out as failover pairs
    /// * `output_path` - JSON array file the sink writes
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ConfigError)` - The pool has no credentials
    pub fn new(
        source: Arc<dyn PostSource>,
        pool: CredentialPool,
        output_path: impl Into<PathBuf>,
    ) -> ConfigResult<Self> {
        if pool.is_empty() {
            return Err(ConfigError::Validation(
                "At least one crawl session is required".to_string(),
            ));
        }

        Ok(Self {
            source,
            pool,
            throttle: Throttle::default(),
            chunks_per_profile: DEFAULT_CHUNKS_PER_PROFILE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            batch_size: DEFAULT_BATCH_SIZE,
            output_path: output_path.into(),
        })
    }

    /// Builds a coordinator from a validated configuration
    ///
    /// Uses the HTTP source when `base-url` is set, the fixture otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source: Arc<dyn PostSource> =
            match (&config.source.base_url, &config.source.fixture_path) {
                (Some(base_url), _) => {
                    Arc::new(HttpSource::new(base_url, &config.source.user_agent)?)
                }
                (None, Some(fixture)) => {
                    Arc::new(MemorySource::from_fixture(Path::new(fixture))?)
                }
                (None, None) => {
                    return Err(ConfigError::Validation(
                        "Either source.base-url or source.fixture-path must be set".to_string(),
                    )
                    .into())
                }
            };

        let coordinator = Self::new(
            source,
            CredentialPool::from_sessions(&config.source.sessions),
            &config.output.path,
        )?
        .with_throttle(Throttle::new(&config.throttle))
        .with_chunks_per_profile(config.crawler.chunks_per_profile)
        .with_max_attempts(config.crawler.max_attempts)
        .with_batch_size(config.output.batch_size);

        Ok(coordinator)
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_chunks_per_profile(mut self, chunks: usize) -> Self {
        self.chunks_per_profile = chunks.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Redirects the sink to another file
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn chunks_per_profile(&self) -> usize {
        self.chunks_per_profile
    }

    /// Runs a complete crawl
    ///
    /// Profiles that cannot be crawled are logged and listed in the report;
    /// they do not fail the run. Fewer than `max_posts_per_profile` records
    /// per profile is normal: duplicates, short histories and exhausted
    /// chunks all reduce the count.
    ///
    /// # Arguments
    ///
    /// * `profiles` - Profiles to crawl
    /// * `max_posts_per_profile` - Upper bound of records per profile
    /// * `worker_count` - Number of profiles processed concurrently
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run finished; `records` is the total emitted
    /// * `Err(HarvestError)` - The sink could not be started or stopped
    pub async fn run(
        &self,
        profiles: &[String],
        max_posts_per_profile: usize,
        worker_count: usize,
    ) -> Result<CrawlReport> {
        let worker_count = worker_count.max(1);
        tracing::info!(
            "Starting crawl of {} profiles with {} workers, {} posts each",
            profiles.len(),
            worker_count,
            max_posts_per_profile
        );

        let sink = IngestSink::spawn(&self.output_path, self.batch_size)?;
        let context = Arc::new(RunContext {
            coordinator: self.clone(),
            sink: sink.handle(),
            seen: SeenSet::new(),
            max_posts_per_profile,
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let assigned: Vec<String> = profiles
                .iter()
                .skip(worker_id)
                .step_by(worker_count)
                .cloned()
                .collect();
            if assigned.is_empty() {
                continue;
            }

            let context = Arc::clone(&context);
            workers.spawn(run_worker(context, worker_id, assigned));
        }

        let mut report = CrawlReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => report.absorb(tally),
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        // Every producer has finished once all workers are joined
        drop(context);
        report.sink = sink.finish().await?;

        tracing::info!(
            "Crawl finished: {} records, {} chunks done, {} exhausted, {} failed profiles",
            report.records,
            report.chunks_done,
            report.chunks_exhausted,
            report.failed_profiles.len()
        );

        Ok(report)
    }
}

/// Processes a worker's profiles one after another
async fn run_worker(
    context: Arc<RunContext>,
    worker_id: usize,
    profiles: Vec<String>,
) -> WorkerTally {
    let mut tally = WorkerTally::default();

    for profile in profiles {
        tracing::info!("Worker {} crawling profile {}", worker_id, profile);
        crawl_profile(&context, worker_id, &profile, &mut tally).await;
    }

    tracing::debug!("Worker {} finished", worker_id);
    tally
}

/// Runs every chunk of one profile concurrently and waits for all of them
async fn crawl_profile(
    context: &RunContext,
    worker_id: usize,
    profile: &str,
    tally: &mut WorkerTally,
) {
    let coordinator = &context.coordinator;
    let chunks = plan(
        profile,
        context.max_posts_per_profile,
        coordinator.chunks_per_profile,
    );

    let mut fetchers = JoinSet::new();
    for (index, chunk) in chunks.into_iter().enumerate() {
        let Some(pair) = coordinator
            .pool
            .pair(worker_id * coordinator.chunks_per_profile + index)
        else {
            continue;
        };

        let fetcher = ChunkFetcher::new(
            chunk,
            pair,
            Arc::clone(&coordinator.source),
            context.sink.clone(),
            context.seen.clone(),
            coordinator.throttle.clone(),
            coordinator.max_attempts,
        );
        fetchers.spawn(fetcher.run());
    }

    let mut failed = false;
    let mut fetched = 0;
    while let Some(joined) = fetchers.join_next().await {
        match joined {
            Ok(Ok(outcome)) => {
                fetched += outcome.fetched;
                tally.record_chunk(&outcome);
            }
            Ok(Err(SourceError::ProfileNotFound(name))) => {
                if !failed {
                    tracing::error!("Profile {} does not exist", name);
                }
                failed = true;
            }
            Ok(Err(e)) => {
                tracing::error!("Chunk of profile {} failed: {}", profile, e);
                failed = true;
            }
            Err(e) => {
                tracing::error!("Chunk task of profile {} failed: {}", profile, e);
                failed = true;
            }
        }
    }

    if failed {
        tally.failed_profiles.push(profile.to_string());
    } else {
        tracing::info!("Fetched {} posts for profile {}", fetched, profile);
    }
}

/// Runs the crawl described by a configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(HarvestError)` - The source or sink could not be set up
pub async fn run_crawl(config: &Config) -> Result<CrawlReport> {
    let coordinator = Coordinator::from_config(config)?;
    coordinator
        .run(
            &config.profiles,
            config.crawler.max_posts_per_profile,
            config.crawler.worker_count,
        )
        .await
}
