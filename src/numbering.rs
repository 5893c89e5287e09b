//! Memoised "next available increment number".
//!
//! The cache is owned by the caller and handed to the lifecycle managers,
//! which invalidate it after every move.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::fs_ops;
use crate::layout::Layout;
use crate::models::{IncrementName, IncrementNumber, Zone};

#[derive(Debug, Clone, Default)]
pub struct IncrementNumberCache {
    next: Arc<Mutex<Option<IncrementNumber>>>,
}

impl IncrementNumberCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// One past the highest number held in any zone. Computed on first use
    /// after construction or invalidation.
    pub fn next_number(&self, layout: &Layout) -> Result<IncrementNumber> {
        let mut next = self.next.lock().expect("numbering cache lock poisoned");
        if let Some(number) = *next {
            return Ok(number);
        }

        let mut highest = 0;
        for zone in [Zone::Active, Zone::Archived, Zone::Abandoned] {
            for dir in fs_ops::list_dir_names(&layout.increments_dir(zone))? {
                if let Ok(name) = IncrementName::parse(&dir) {
                    highest = highest.max(name.number().value());
                }
            }
        }

        let number = IncrementNumber(highest + 1);
        *next = Some(number);
        Ok(number)
    }

    pub fn invalidate(&self) {
        let mut next = self.next.lock().expect("numbering cache lock poisoned");
        if next.take().is_some() {
            tracing::debug!("increment numbering cache invalidated");
        }
    }

    pub fn is_cached(&self) -> bool {
        self.next
            .lock()
            .expect("numbering cache lock poisoned")
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn counts_every_zone_and_memoises() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let layout = Layout::new(tmp.path());
        fs::create_dir_all(layout.increments_dir(Zone::Active).join("0003-a")).unwrap();
        fs::create_dir_all(layout.increments_dir(Zone::Archived).join("0009-b")).unwrap();
        fs::create_dir_all(layout.increments_dir(Zone::Abandoned).join("0005-c")).unwrap();

        let cache = IncrementNumberCache::new();
        assert_eq!(cache.next_number(&layout).unwrap(), IncrementNumber(10));

        fs::create_dir_all(layout.increments_dir(Zone::Active).join("0010-d")).unwrap();
        assert_eq!(cache.next_number(&layout).unwrap(), IncrementNumber(10));

        cache.invalidate();
        assert!(!cache.is_cached());
        assert_eq!(cache.next_number(&layout).unwrap(), IncrementNumber(11));
    }

    #[test]
    fn empty_repository_starts_at_one() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = IncrementNumberCache::new();
        assert_eq!(
            cache.next_number(&Layout::new(tmp.path())).unwrap(),
            IncrementNumber(1)
        );
    }
}
