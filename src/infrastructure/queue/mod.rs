//! In-process conversion queue.
//!
//! Holds at most one live job per media id. Requests enqueue on a cache
//! miss; the drain loop claims jobs oldest-first and removes them when the
//! conversion finishes, whatever the outcome.

use parking_lot::Mutex;
use std::collections::HashMap;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
pub struct ConversionJob {
    pub enqueued_at: OffsetDateTime,
    pub claimed: bool,
}

#[derive(Default)]
pub struct ConversionQueue {
    jobs: Mutex<HashMap<String, ConversionJob>>,
}

impl ConversionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job for `media_id` unless one already exists. Returns whether
    /// a new job was created.
    pub fn enqueue(&self, media_id: &str) -> bool {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(media_id) {
            return false;
        }
        jobs.insert(
            media_id.to_string(),
            ConversionJob {
                enqueued_at: OffsetDateTime::now_utc(),
                claimed: false,
            },
        );
        true
    }

    /// Claims the oldest unclaimed job, if any. The job stays in the queue,
    /// marked claimed, so a duplicate claim cannot happen.
    pub fn claim_next(&self) -> Option<String> {
        let mut jobs = self.jobs.lock();
        let media_id = jobs
            .iter()
            .filter(|(_, job)| !job.claimed)
            .min_by_key(|(_, job)| job.enqueued_at)
            .map(|(id, _)| id.clone())?;
        if let Some(job) = jobs.get_mut(&media_id) {
            job.claimed = true;
        }
        Some(media_id)
    }

    /// Drops the job for `media_id`, if present. Idempotent.
    pub fn remove(&self, media_id: &str) {
        self.jobs.lock().remove(media_id);
    }

    pub fn contains(&self, media_id: &str) -> bool {
        self.jobs.lock().contains_key(media_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn enqueue_is_deduplicated() {
        let queue = ConversionQueue::new();
        assert!(queue.enqueue("abc"));
        assert!(!queue.enqueue("abc"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn duplicate_enqueue_survives_claim() {
        let queue = ConversionQueue::new();
        queue.enqueue("abc");
        let claimed = queue.claim_next();
        assert_eq!(claimed.as_deref(), Some("abc"));
        // still one live job; a re-request must not create a second one
        assert!(!queue.enqueue("abc"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn claim_is_fifo_by_arrival() {
        let queue = ConversionQueue::new();
        queue.enqueue("first");
        // enqueued_at has nanosecond resolution; force distinct stamps
        std::thread::sleep(Duration::from_millis(2));
        queue.enqueue("second");
        std::thread::sleep(Duration::from_millis(2));
        queue.enqueue("third");

        assert_eq!(queue.claim_next().as_deref(), Some("first"));
        assert_eq!(queue.claim_next().as_deref(), Some("second"));
        assert_eq!(queue.claim_next().as_deref(), Some("third"));
        assert_eq!(queue.claim_next(), None);
    }

    #[test]
    fn claimed_jobs_are_not_reclaimed() {
        let queue = ConversionQueue::new();
        queue.enqueue("abc");
        assert!(queue.claim_next().is_some());
        assert_eq!(queue.claim_next(), None);
        assert!(queue.contains("abc"));
    }

    #[test]
    fn remove_is_idempotent() {
        let queue = ConversionQueue::new();
        queue.enqueue("abc");
        queue.remove("abc");
        queue.remove("abc");
        assert!(queue.is_empty());
        assert!(!queue.contains("abc"));
    }
}
