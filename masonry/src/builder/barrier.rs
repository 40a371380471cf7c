use std::time::Duration;

use tokio::sync::Barrier;

use crate::{
    Day,
    error::{BuildError, BuildResult},
};

/// Rendezvous closing one simulated day.
///
/// A fresh barrier is built every day, sized to that day's active slots plus
/// the controller. Each worker arrives once after its single foot of work;
/// the controller's wait completes only when all of them have.
#[derive(Debug)]
pub struct DayBarrier {
    day: Day,
    inner: Barrier,
}

impl DayBarrier {
    pub fn for_round(day: Day, active: usize) -> Self {
        Self {
            day,
            inner: Barrier::new(active + 1),
        }
    }

    pub fn day(&self) -> Day {
        self.day
    }

    /// Worker side: signal this worker's work for the day is done.
    pub async fn arrive(&self) {
        self.inner.wait().await;
    }

    /// Controller side: wait for every active worker, at most `timeout`.
    pub async fn release(&self, timeout: Duration) -> BuildResult<()> {
        tokio::time::timeout(timeout, self.inner.wait())
            .await
            .map(|_| ())
            .map_err(|_| BuildError::Deadlock {
                day: self.day,
                waited: timeout,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn releases_once_every_worker_arrived() {
        let barrier = Arc::new(DayBarrier::for_round(4, 3));
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let barrier = barrier.clone();
                tokio::spawn(async move { barrier.arrive().await })
            })
            .collect();

        barrier.release(Duration::from_secs(5)).await.unwrap();
        for w in workers {
            w.await.unwrap();
        }
    }

    #[tokio::test]
    async fn missing_worker_is_reported_as_deadlock() {
        let barrier = Arc::new(DayBarrier::for_round(2, 2));
        let b = barrier.clone();
        tokio::spawn(async move { b.arrive().await });

        let err = barrier
            .release(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Deadlock { day: 2, .. }));
    }
}
