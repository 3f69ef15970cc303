//! Inference client: one submission contract, three concurrency strategies.
//!
//! The client is process-wide shared state: constructed once at startup with
//! its transport, batch shape, and [`DispatchMode`], then reused read-only by
//! every cycle. `submit` hands one finalized input buffer to the transport
//! and returns a [`PendingBatch`]; `wait` is the single point where the
//! cycle's task may suspend.
//!
//! - [`DispatchMode::Sync`] resolves the remote call inside `submit`.
//! - [`DispatchMode::Async`] spawns the call onto the runtime so independent
//!   cycles' requests can be in flight concurrently; `wait` awaits the task.
//! - [`DispatchMode::PseudoAsync`] also dispatches in the background but
//!   `wait` bounded-polls a completion slot, the portability fallback for
//!   hosts without true async completion delivery.
//!
//! A batch once submitted runs to completion or failure; there is no
//! mid-flight cancellation in any mode.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use hcal_recon_core::{
    BatchShape, CoreResult, DispatchMode, InferenceTransport, TransportError,
};

/// Default bounded-poll interval for pseudo-async waits.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default overall deadline for pseudo-async waits.
const DEFAULT_WAIT_DEADLINE: Duration = Duration::from_secs(30);

type BatchResult = Result<Vec<f32>, TransportError>;
type SharedSlot = Arc<Mutex<Option<BatchResult>>>;

/// Shared, immutable handle to the remote inference endpoint.
#[derive(Clone)]
pub struct InferenceClient {
    transport: Arc<dyn InferenceTransport>,
    shape: BatchShape,
    mode: DispatchMode,
    poll_interval: Duration,
    wait_deadline: Duration,
}

impl InferenceClient {
    /// Creates a client over the given transport.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a degenerate batch shape.
    pub fn new(
        transport: Arc<dyn InferenceTransport>,
        shape: BatchShape,
        mode: DispatchMode,
    ) -> CoreResult<Self> {
        shape.validate()?;
        Ok(Self {
            transport,
            shape,
            mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_deadline: DEFAULT_WAIT_DEADLINE,
        })
    }

    /// Sets the pseudo-async poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the pseudo-async overall wait deadline.
    #[must_use]
    pub fn with_wait_deadline(mut self, deadline: Duration) -> Self {
        self.wait_deadline = deadline;
        self
    }

    /// The batch shape negotiated at construction.
    #[must_use]
    pub fn shape(&self) -> &BatchShape {
        &self.shape
    }

    /// The configured dispatch mode.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Submits one finalized input buffer.
    ///
    /// The buffer length must equal `shape.input_len()`; finalized batches
    /// satisfy this by construction. Errors surface at
    /// [`PendingBatch::wait`], never here.
    pub async fn submit(&self, input: Vec<f32>) -> PendingBatch {
        debug_assert_eq!(input.len(), self.shape.input_len());
        debug!(
            transport = self.transport.name(),
            mode = %self.mode,
            "submitting batch"
        );

        match self.mode {
            DispatchMode::Sync => {
                let result = run_checked(&*self.transport, &input, &self.shape).await;
                PendingBatch {
                    inner: Pending::Ready(result),
                }
            }
            DispatchMode::Async => {
                let transport = Arc::clone(&self.transport);
                let shape = self.shape;
                let handle =
                    tokio::spawn(
                        async move { run_checked(&*transport, &input, &shape).await },
                    );
                PendingBatch {
                    inner: Pending::Spawned(handle),
                }
            }
            DispatchMode::PseudoAsync => {
                let slot: SharedSlot = Arc::new(Mutex::new(None));
                let transport = Arc::clone(&self.transport);
                let shape = self.shape;
                let task_slot = Arc::clone(&slot);
                tokio::spawn(async move {
                    let result = run_checked(&*transport, &input, &shape).await;
                    // A poisoned slot surfaces as a timeout at the wait point.
                    if let Ok(mut guard) = task_slot.lock() {
                        *guard = Some(result);
                    }
                });
                PendingBatch {
                    inner: Pending::Polled {
                        slot,
                        interval: self.poll_interval,
                        deadline: self.wait_deadline,
                    },
                }
            }
        }
    }
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("transport", &self.transport.name())
            .field("shape", &self.shape)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Runs the transport call and length-checks the response.
async fn run_checked(
    transport: &dyn InferenceTransport,
    input: &[f32],
    shape: &BatchShape,
) -> BatchResult {
    let output = transport.infer(input, shape).await?;
    if output.len() != shape.output_len() {
        warn!(
            expected = shape.output_len(),
            actual = output.len(),
            "transport returned malformed output buffer"
        );
        return Err(TransportError::ShapeMismatch {
            expected: shape.output_len(),
            actual: output.len(),
        });
    }
    Ok(output)
}

/// Completion handle for one submitted batch.
///
/// Consumed exactly once by [`wait`](Self::wait); the output buffer cannot
/// be read before the wait point.
#[derive(Debug)]
pub struct PendingBatch {
    inner: Pending,
}

#[derive(Debug)]
enum Pending {
    Ready(BatchResult),
    Spawned(JoinHandle<BatchResult>),
    Polled {
        slot: SharedSlot,
        interval: Duration,
        deadline: Duration,
    },
}

impl PendingBatch {
    /// Returns `true` if `wait` would resolve without suspending.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match &self.inner {
            Pending::Ready(_) => true,
            Pending::Spawned(handle) => handle.is_finished(),
            Pending::Polled { slot, .. } => slot
                .lock()
                .map(|guard| guard.is_some())
                .unwrap_or(false),
        }
    }

    /// Waits for the batch to complete and returns the output buffer.
    ///
    /// This is the cycle's suspension point: sync batches resolve
    /// immediately, async batches await the spawned call, pseudo-async
    /// batches poll the completion slot at the configured interval until the
    /// deadline.
    ///
    /// # Errors
    ///
    /// Returns the transport failure of the underlying call, a dispatch
    /// error if the background task died, or a timeout if a pseudo-async
    /// wait exhausted its deadline. All are fatal to the submitting cycle.
    pub async fn wait(self) -> BatchResult {
        match self.inner {
            Pending::Ready(result) => result,
            Pending::Spawned(handle) => handle
                .await
                .map_err(|e| TransportError::dispatch(e.to_string()))?,
            Pending::Polled {
                slot,
                interval,
                deadline,
            } => {
                let start = Instant::now();
                loop {
                    if let Some(result) = slot
                        .lock()
                        .map_err(|_| TransportError::dispatch("completion slot poisoned"))?
                        .take()
                    {
                        return result;
                    }
                    if start.elapsed() >= deadline {
                        return Err(TransportError::Timeout {
                            duration_ms: deadline.as_millis() as u64,
                        });
                    }
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use hcal_recon_core::NINPUT;

    fn shape() -> BatchShape {
        BatchShape::new(NINPUT, 1, 2)
    }

    fn client(mode: DispatchMode, transport: MockTransport) -> InferenceClient {
        InferenceClient::new(Arc::new(transport), shape(), mode).unwrap()
    }

    #[tokio::test]
    async fn test_sync_submit_is_already_resolved() {
        let client = client(DispatchMode::Sync, MockTransport::new());
        let pending = client.submit(vec![0.0; shape().input_len()]).await;
        assert!(pending.is_ready());
        assert_eq!(pending.wait().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_async_submit_resolves_at_wait() {
        let client = client(DispatchMode::Async, MockTransport::new());
        let pending = client.submit(vec![0.0; shape().input_len()]).await;
        assert_eq!(pending.wait().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pseudo_async_polls_to_completion() {
        let transport = MockTransport::new().with_latency(Duration::from_millis(5));
        let client = client(DispatchMode::PseudoAsync, transport);
        let pending = client.submit(vec![0.0; shape().input_len()]).await;
        assert_eq!(pending.wait().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pseudo_async_deadline_times_out() {
        let transport = MockTransport::new().with_latency(Duration::from_secs(60));
        let client = client(DispatchMode::PseudoAsync, transport)
            .with_wait_deadline(Duration::from_millis(10));
        let pending = client.submit(vec![0.0; shape().input_len()]).await;
        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_malformed_response_is_shape_mismatch() {
        let transport = MockTransport::new().with_raw_response(vec![1.0; 7]);
        let client = client(DispatchMode::Sync, transport);
        let pending = client.submit(vec![0.0; shape().input_len()]).await;
        let err = pending.wait().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShapeMismatch {
                expected: 2,
                actual: 7
            }
        ));
    }
}
