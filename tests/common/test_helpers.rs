use bandwidth_limiter::{ManualClock, Sleeper, Waiter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Waiter that advances a manual clock instead of blocking, recording each wait.
#[derive(Debug, Clone)]
pub struct AdvancingWaiter {
    clock: ManualClock,
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl AdvancingWaiter {
    pub fn new(clock: ManualClock) -> Self {
        Self { clock, calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

impl Waiter for AdvancingWaiter {
    fn wait(&self, duration: Duration) {
        self.calls.lock().unwrap().push(duration);
        self.clock.advance(duration);
    }
}

/// Async counterpart of [`AdvancingWaiter`].
#[derive(Debug, Clone)]
pub struct AdvancingSleeper {
    clock: ManualClock,
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl AdvancingSleeper {
    pub fn new(clock: ManualClock) -> Self {
        Self { clock, calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

impl Sleeper for AdvancingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.calls.lock().unwrap().push(duration);
        self.clock.advance(duration);
        Box::pin(async {})
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
