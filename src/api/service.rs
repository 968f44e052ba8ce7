use crate::api::AppState;
use crate::output::read_records;
use crate::storage::StoredPost;
use crate::{HarvestError, Result};
use std::path::Path;
use uuid::Uuid;

/// Returns stored posts of `username`, crawling the profile first when the
/// store has none
///
/// A crawl writes to its own scratch file under the state's scratch
/// directory. The file is removed whether the crawl succeeds or not.
///
/// # Returns
///
/// * `Ok(posts)` - Stored posts, or the freshly crawled and stored ones
/// * `Err(HarvestError::EmptyCrawl)` - The crawl produced nothing
/// * `Err(HarvestError)` - Store, crawl or scratch file I/O failed
pub async fn fetch_or_crawl(
    state: &AppState,
    username: &str,
    count: usize,
) -> Result<Vec<StoredPost>> {
    let stored = state.store.find(username, count).await?;
    if !stored.is_empty() {
        return Ok(stored);
    }

    tracing::info!("No stored posts for {}, crawling", username);

    tokio::fs::create_dir_all(&state.scratch_dir).await?;
    let scratch = state
        .scratch_dir
        .join(format!("{}.json", Uuid::new_v4().simple()));

    let result = crawl_and_store(state, username, count, &scratch).await;

    match tokio::fs::remove_file(&scratch).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", scratch.display(), e),
    }

    result
}

async fn crawl_and_store(
    state: &AppState,
    username: &str,
    count: usize,
    scratch: &Path,
) -> Result<Vec<StoredPost>> {
    let report = state
        .coordinator
        .clone()
        .with_output(scratch)
        .run(&[username.to_string()], count, 1)
        .await?;

    let records = read_records(scratch)?;
    if records.is_empty() {
        return Err(HarvestError::EmptyCrawl(username.to_string()));
    }

    let posts: Vec<StoredPost> = records.into_iter().map(StoredPost::tag).collect();
    state.store.insert_many(posts.clone()).await?;

    tracing::info!(
        "Fetched and stored {} posts for {} ({} chunks exhausted)",
        posts.len(),
        username,
        report.chunks_exhausted
    );
    Ok(posts)
}
