//! In-memory post source
//!
//! Serves fixture posts without touching the network. Failures can be
//! scripted per profile so the crawler's retry and rotation behaviour can be
//! replayed offline.

use crate::source::{Credential, PostListing, PostSource, RawPost, SourceError, SourceResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A failure injected into the next listing opened for a profile
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    /// Opening the listing fails outright
    OnOpen(SourceError),

    /// The listing yields `after` posts and then fails
    AfterPosts { after: usize, error: SourceError },
}

#[derive(Default)]
struct Script {
    /// Consumed one per opened listing
    queued: VecDeque<ScriptedFailure>,
    /// Every open is rate limited
    always_rate_limited: bool,
}

/// Post source holding every profile's posts in memory
#[derive(Default)]
pub struct MemorySource {
    profiles: HashMap<String, Arc<Vec<RawPost>>>,
    scripts: Mutex<HashMap<String, Script>>,
    opens: AtomicUsize,
    sessions_used: Mutex<Vec<(String, String)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fixture file mapping profile names to arrays of posts
    ///
    /// Posts are served newest-first regardless of their order in the file.
    pub fn from_fixture(path: &Path) -> Result<Self, crate::HarvestError> {
        let content = std::fs::read_to_string(path)?;
        let fixture: HashMap<String, Vec<RawPost>> = serde_json::from_str(&content)?;

        let mut source = Self::new();
        for (profile, mut posts) in fixture {
            posts.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
            source = source.with_profile(profile, posts);
        }

        tracing::info!("Loaded fixture with {} profiles", source.profiles.len());
        Ok(source)
    }

    /// Registers a profile; `posts` must already be newest-first
    pub fn with_profile(mut self, profile: impl Into<String>, posts: Vec<RawPost>) -> Self {
        self.profiles.insert(profile.into(), Arc::new(posts));
        self
    }

    /// Queues a failure for the next listing opened on `profile`
    pub fn fail_next(&self, profile: &str, failure: ScriptedFailure) {
        self.lock_scripts()
            .entry(profile.to_string())
            .or_default()
            .queued
            .push_back(failure);
    }

    /// Makes every listing open on `profile` hit the rate limit
    pub fn always_rate_limit(&self, profile: &str) {
        self.lock_scripts()
            .entry(profile.to_string())
            .or_default()
            .always_rate_limited = true;
    }

    /// Number of listings opened so far, failed opens included
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Session names used to open listings on `profile`, in order
    pub fn sessions_used(&self, profile: &str) -> Vec<String> {
        self.sessions_used
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(p, _)| p == profile)
            .map(|(_, session)| session.clone())
            .collect()
    }

    /// Profiles available in this source
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }

    fn lock_scripts(&self) -> MutexGuard<'_, HashMap<String, Script>> {
        self.scripts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PostSource for MemorySource {
    async fn open_listing(
        &self,
        profile: &str,
        credential: &Credential,
    ) -> SourceResult<Box<dyn PostListing>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.sessions_used
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((profile.to_string(), credential.name.clone()));

        let posts = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| SourceError::ProfileNotFound(profile.to_string()))?;

        let failure = {
            let mut scripts = self.lock_scripts();
            match scripts.get_mut(profile) {
                Some(script) if script.always_rate_limited => {
                    return Err(SourceError::RateLimited { retry_after: None });
                }
                Some(script) => script.queued.pop_front(),
                None => None,
            }
        };

        let fail_after = match failure {
            Some(ScriptedFailure::OnOpen(error)) => return Err(error),
            Some(ScriptedFailure::AfterPosts { after, error }) => Some((after, error)),
            None => None,
        };

        Ok(Box::new(MemoryListing {
            posts,
            position: 0,
            fail_after,
        }))
    }
}

struct MemoryListing {
    posts: Arc<Vec<RawPost>>,
    position: usize,
    fail_after: Option<(usize, SourceError)>,
}

#[async_trait]
impl PostListing for MemoryListing {
    async fn next_post(&mut self) -> SourceResult<Option<RawPost>> {
        if let Some((after, error)) = &self.fail_after {
            if self.position >= *after {
                return Err(error.clone());
            }
        }

        let post = self.posts.get(self.position).cloned();
        if post.is_some() {
            self.position += 1;
        }
        Ok(post)
    }
}
