//! Credential pool and failover pairs
//!
//! Each chunk fetcher owns a [`CredentialPair`]. When the source throttles or
//! fails, the pair flips to its other session; the crawl position lives in
//! the fetcher, so rotating never loses progress.

use crate::config::SessionEntry;
use crate::source::Credential;
use std::fmt;

/// Which member of a pair is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSlot {
    Primary,
    Secondary,
}

impl CredentialSlot {
    /// The other slot
    pub fn rotate(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

impl fmt::Display for CredentialSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// Two interchangeable sessions with one of them active
#[derive(Debug, Clone)]
pub struct CredentialPair {
    primary: Credential,
    secondary: Credential,
    active: CredentialSlot,
}

impl CredentialPair {
    /// Creates a pair with `primary` active
    pub fn new(primary: Credential, secondary: Credential) -> Self {
        Self {
            primary,
            secondary,
            active: CredentialSlot::Primary,
        }
    }

    /// Returns the active credential
    pub fn current(&self) -> &Credential {
        match self.active {
            CredentialSlot::Primary => &self.primary,
            CredentialSlot::Secondary => &self.secondary,
        }
    }

    /// Switches to the other credential and returns it
    pub fn rotate(&mut self) -> &Credential {
        self.active = self.active.rotate();
        self.current()
    }

    pub fn active_slot(&self) -> CredentialSlot {
        self.active
    }
}

/// Every configured session, handed out as pairs
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Creates a pool; pairs are only distinct with at least two credentials
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    /// Builds the pool from configured sessions
    pub fn from_sessions(sessions: &[SessionEntry]) -> Self {
        Self::new(
            sessions
                .iter()
                .map(|s| Credential::new(s.name.clone(), s.token.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Returns the `n`th pair: credentials `2n` and `2n + 1`, wrapping around
    ///
    /// Returns `None` for an empty pool.
    pub fn pair(&self, n: usize) -> Option<CredentialPair> {
        let len = self.credentials.len();
        if len == 0 {
            return None;
        }

        let first = (2 * n) % len;
        let second = (2 * n + 1) % len;
        Some(CredentialPair::new(
            self.credentials[first].clone(),
            self.credentials[second].clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(names: &[&str]) -> CredentialPool {
        CredentialPool::new(names.iter().map(|n| Credential::anonymous(*n)).collect())
    }

    #[test]
    fn test_slot_rotation() {
        assert_eq!(CredentialSlot::Primary.rotate(), CredentialSlot::Secondary);
        assert_eq!(CredentialSlot::Secondary.rotate(), CredentialSlot::Primary);
    }

    #[test]
    fn test_pair_alternates() {
        let mut pair = CredentialPair::new(Credential::anonymous("a"), Credential::anonymous("b"));

        assert_eq!(pair.current().name, "a");
        assert_eq!(pair.rotate().name, "b");
        assert_eq!(pair.active_slot(), CredentialSlot::Secondary);
        assert_eq!(pair.rotate().name, "a");
        assert_eq!(pair.current().name, "a");
    }

    #[test]
    fn test_pool_pairs_wrap() {
        let pool = pool(&["a", "b", "c"]);

        let pair0 = pool.pair(0).unwrap();
        assert_eq!(pair0.current().name, "a");

        let mut pair1 = pool.pair(1).unwrap();
        assert_eq!(pair1.current().name, "c");
        assert_eq!(pair1.rotate().name, "a");
    }

    #[test]
    fn test_pool_pairs_are_distinct() {
        let pool = pool(&["a", "b", "c", "d", "e"]);
        for n in 0..20 {
            let mut pair = pool.pair(n).unwrap();
            let first = pair.current().name.clone();
            assert_ne!(first, pair.rotate().name);
        }
    }

    #[test]
    fn test_empty_pool() {
        assert!(pool(&[]).pair(0).is_none());
    }
}
