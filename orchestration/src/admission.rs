use std::sync::Arc;
use std::time::Duration;

use common::{error::AppError, metrics::Metrics};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded admission queue of capacity C. Every orchestration run acquires
/// one ticket for its entire lifetime; `acquire` returns `TooManyRequests`
/// once the configured timeout elapses without a free slot.
#[derive(Clone)]
pub struct AdmissionQueue {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    timeout: Duration,
    metrics: Metrics,
}

pub struct AdmissionTicket {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionQueue {
    pub fn new(capacity: usize, timeout: Duration, metrics: Metrics) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            timeout,
            metrics,
        }
    }

    pub async fn acquire(&self) -> Result<AdmissionTicket, AppError> {
        let result = tokio::time::timeout(self.timeout, Arc::clone(&self.semaphore).acquire_owned()).await;

        self.metrics
            .set_admission_queue_length((self.capacity - self.semaphore.available_permits()) as i64);

        match result {
            Ok(Ok(permit)) => Ok(AdmissionTicket { _permit: permit }),
            Ok(Err(_)) => Err(AppError::InternalError("admission semaphore closed".into())),
            Err(_) => Err(AppError::TooManyRequests(format!(
                "no admission ticket available within {:?}",
                self.timeout
            ))),
        }
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    #[tokio::test]
    async fn exactly_c_plus_one_runs_get_rejected() {
        let metrics = Metrics::new_for_test();
        let queue = AdmissionQueue::new(3, Duration::from_millis(200), metrics);

        let futures = (0..5).map(|_| {
            let queue = queue.clone();
            async move {
                let ticket = queue.acquire().await;
                if ticket.is_ok() {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                ticket.is_ok()
            }
        });

        let results = join_all(futures).await;
        let accepted = results.iter().filter(|ok| **ok).count();
        let rejected = results.iter().filter(|ok| !**ok).count();
        assert_eq!(accepted, 3);
        assert_eq!(rejected, 2);
    }
}
