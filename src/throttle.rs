//! Tower middleware that charges a bucket for every request.
//!
//! Without `max_wait` a request that finds the bucket empty fails immediately with
//! [`ThrottleError::Throttled`]. With `max_wait` the call waits for tokens through the
//! bucket's sleeper, up to that long, before giving up.
//!
//! ```rust
//! use bandwidth_limiter::{BucketBuilder, ThrottleLayer};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//!
//! let bucket = Arc::new(
//!     BucketBuilder::new().with_limited_bandwidth(100, Duration::from_secs(1)).build().unwrap(),
//! );
//! let svc = ServiceBuilder::new()
//!     .layer(ThrottleLayer::new(bucket).with_max_wait(Duration::from_millis(50)))
//!     .service_fn(|req: u32| async move { Ok::<_, std::io::Error>(req) });
//! ```

use crate::bucket::SharedBucket;
use crate::error::ThrottleError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_layer::Layer;
use tower_service::Service;

/// Layer that wraps services in a [`ThrottleService`].
#[derive(Clone, Debug)]
pub struct ThrottleLayer {
    bucket: Arc<SharedBucket>,
    cost: u64,
    max_wait: Option<Duration>,
}

impl ThrottleLayer {
    /// Charge one token per request and never wait.
    pub fn new(bucket: Arc<SharedBucket>) -> Self {
        Self { bucket, cost: 1, max_wait: None }
    }

    /// Tokens charged per request.
    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = cost;
        self
    }

    /// Wait up to `max_wait` for tokens instead of failing right away.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

impl<S> Layer<S> for ThrottleLayer {
    type Service = ThrottleService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ThrottleService {
            inner: service,
            bucket: self.bucket.clone(),
            cost: self.cost,
            max_wait: self.max_wait,
        }
    }
}

/// Middleware service that takes tokens before forwarding a request.
#[derive(Clone, Debug)]
pub struct ThrottleService<S> {
    inner: S,
    bucket: Arc<SharedBucket>,
    cost: u64,
    max_wait: Option<Duration>,
}

impl<S, Req> Service<Req> for ThrottleService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = ThrottleError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(ThrottleError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let bucket = self.bucket.clone();
        let cost = self.cost;
        let max_wait = self.max_wait;
        // keep the instance that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let granted = match max_wait {
                None => bucket.try_consume(cost)?,
                Some(wait) => bucket.consume_async(cost, Some(wait)).await?,
            };
            if !granted {
                tracing::debug!(cost, "throttle: request rejected");
                return Err(ThrottleError::Throttled { cost });
            }
            inner.call(req).await.map_err(ThrottleError::Inner)
        })
    }
}
