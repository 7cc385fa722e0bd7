use std::time::Duration;

/// Sleeps between consecutive requests, never before the first.
#[derive(Debug)]
pub(crate) struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    pub(crate) async fn pace(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_not_delayed() {
        let mut pacer = Pacer::new(Duration::from_millis(100));
        let start = Instant::now();

        pacer.pace().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.pace().await;
        pacer.pace().await;
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }
}
