//! Rate-limited transport over a single catalog endpoint.
//!
//! This module provides:
//! - A [`Wire`] trait for one raw HTTP exchange, with [`HttpWire`] as the
//!   production implementation and mocks injected in tests.
//! - A [`Delay`] trait so every wall-clock wait is an injected dependency,
//!   not a hardcoded sleep — deterministic tests never wait for real time.
//! - [`CancelToken`], a shared cancellation flag that also wakes any
//!   in-progress delay immediately.
//! - [`RateLimitedTransport`], which paces consecutive sends to a minimum
//!   interval and retries throttled requests with bounded exponential
//!   backoff.
//!
//! The transport owns all pacing/backoff state; nothing else in the crate
//! blocks.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::wire::QueryBody;

/// HTTP status the catalog service uses to signal throttling.
const THROTTLE_STATUS: u16 = 429;

/// Connect timeout for the production HTTP wire.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Full-request timeout for the production HTTP wire.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire seam
// ---------------------------------------------------------------------------

/// Raw status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireReply {
    pub status: u16,
    pub body: String,
}

/// One raw exchange with the catalog service.
///
/// The production implementation is [`HttpWire`]; tests inject scripted
/// implementations to exercise throttling and failure paths deterministically.
pub trait Wire: Send + Sync {
    /// POST a query body to `{base}/{endpoint}`.
    fn post(&self, endpoint: &str, body: &QueryBody) -> Result<WireReply, TransportError>;

    /// GET `{base}/{endpoint}` (used for the stats-style aggregate call).
    fn get(&self, endpoint: &str) -> Result<WireReply, TransportError>;
}

/// Blocking reqwest-backed [`Wire`].
pub struct HttpWire {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpWire {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("catalog-census/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(format!("building http client: {e}")))?;
        let mut base_url: String = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(HttpWire { client, base_url })
    }

    fn reply(response: reqwest::blocking::Response) -> Result<WireReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().map_err(map_reqwest_error)?;
        Ok(WireReply { status, body })
    }
}

impl Wire for HttpWire {
    fn post(&self, endpoint: &str, body: &QueryBody) -> Result<WireReply, TransportError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(map_reqwest_error)?;
        Self::reply(response)
    }

    fn get(&self, endpoint: &str) -> Result<WireReply, TransportError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.client.get(&url).send().map_err(map_reqwest_error)?;
        Self::reply(response)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionRefused
    } else {
        TransportError::Network(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Cancellation and delay
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Shared cancellation flag.
///
/// Cloning yields a handle to the same flag. `cancel()` also wakes any
/// [`ClockDelay`] wait in progress, so cancellation takes effect immediately
/// rather than after the current backoff interval elapses.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Reset for a fresh run. Only meaningful between operations.
    pub fn reset(&self) {
        *self.inner.cancelled.lock() = false;
    }

    /// Block until `duration` elapses or the token is cancelled.
    /// Returns `true` if the full duration elapsed.
    fn wait_for(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self.inner.wake.wait_until(&mut cancelled, deadline).timed_out() {
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Injected wall-clock wait.
///
/// Returns `true` when the full duration elapsed, `false` when the wait was
/// cut short by cancellation.
pub trait Delay: Send + Sync {
    fn wait(&self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Production delay: a condvar timed wait woken by [`CancelToken::cancel`].
/// Never parks the process in an uninterruptible sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockDelay;

impl Delay for ClockDelay {
    fn wait(&self, duration: Duration, cancel: &CancelToken) -> bool {
        cancel.wait_for(duration)
    }
}

// ---------------------------------------------------------------------------
// Rate-limited transport
// ---------------------------------------------------------------------------

/// Pacing and backoff parameters. All caller-supplied; nothing hardcoded.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum spacing between consecutive sends, throttled or not.
    /// Also the starting backoff interval after a throttling response.
    pub min_interval: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
    /// Total send attempts per request before `RateLimitExceeded`.
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(150),
            max_backoff: Duration::from_secs(5),
            max_attempts: 4,
        }
    }
}

/// Issues single requests to the catalog service while respecting its shared
/// rate limit.
///
/// Every send is paced to at least `min_interval` after the previous one. A
/// throttling response triggers exponential backoff (starting at
/// `min_interval`, doubling, capped at `max_backoff`) for up to
/// `max_attempts` total attempts, after which the request fails with
/// [`TransportError::RateLimitExceeded`]. Any other non-2xx status fails
/// immediately.
pub struct RateLimitedTransport<W: Wire, D: Delay> {
    wire: W,
    delay: D,
    config: RateLimitConfig,
    last_send: Mutex<Option<Instant>>,
}

impl<W: Wire, D: Delay> RateLimitedTransport<W, D> {
    pub fn new(wire: W, delay: D, config: RateLimitConfig) -> Self {
        Self {
            wire,
            delay,
            config,
            last_send: Mutex::new(None),
        }
    }

    /// POST `body` to `endpoint`, returning the raw response body on 2xx.
    pub fn send(
        &self,
        endpoint: &str,
        body: &QueryBody,
        cancel: &CancelToken,
    ) -> Result<String, TransportError> {
        self.dispatch(endpoint, cancel, || self.wire.post(endpoint, body))
    }

    /// GET `endpoint`, returning the raw response body on 2xx.
    pub fn get(&self, endpoint: &str, cancel: &CancelToken) -> Result<String, TransportError> {
        self.dispatch(endpoint, cancel, || self.wire.get(endpoint))
    }

    fn dispatch<F>(
        &self,
        endpoint: &str,
        cancel: &CancelToken,
        mut exchange: F,
    ) -> Result<String, TransportError>
    where
        F: FnMut() -> Result<WireReply, TransportError>,
    {
        let mut backoff = self.config.min_interval;
        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            self.pace(cancel)?;

            debug!(
                endpoint,
                attempt,
                max_attempts = self.config.max_attempts,
                "sending catalog request"
            );
            let reply = exchange()?;
            *self.last_send.lock() = Some(Instant::now());

            match reply.status {
                200..=299 => return Ok(reply.body),
                THROTTLE_STATUS => {
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "catalog throttled request"
                    );
                    if attempt == self.config.max_attempts {
                        break;
                    }
                    if !self.delay.wait(backoff, cancel) {
                        return Err(TransportError::Cancelled);
                    }
                    backoff = backoff.saturating_mul(2).min(self.config.max_backoff);
                }
                status => return Err(TransportError::HttpStatus(status)),
            }
        }
        Err(TransportError::RateLimitExceeded)
    }

    #[cfg(test)]
    pub(crate) fn wire_ref(&self) -> &W {
        &self.wire
    }

    /// Enforce the minimum spacing since the previous send.
    fn pace(&self, cancel: &CancelToken) -> Result<(), TransportError> {
        let remaining = {
            let last = self.last_send.lock();
            last.map_or(Duration::ZERO, |at| {
                self.config.min_interval.saturating_sub(at.elapsed())
            })
        };
        if !remaining.is_zero() && !self.delay.wait(remaining, cancel) {
            return Err(TransportError::Cancelled);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
