//! Inference transports: in-process mock and TCP wire client.
//!
//! Both implement [`InferenceTransport`] and are interchangeable behind the
//! client; the pipeline never sees the wire encoding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use hcal_recon_core::{BatchShape, InferenceTransport, TransportError};

/// Per-slot response function: maps one input slot's feature slice to its
/// output values.
type SlotFn = dyn Fn(&[f32]) -> Vec<f32> + Send + Sync;

/// Failure factory invoked instead of answering.
type FailFn = dyn Fn() -> TransportError + Send + Sync;

/// In-process transport for tests and synthetic runs.
///
/// Answers each slot through a configurable function (default: sum of the
/// slot's features), optionally after a simulated round-trip latency.
/// Tracks call counts and peak concurrent in-flight requests so tests can
/// assert pipelining behavior.
pub struct MockTransport {
    slot_fn: Arc<SlotFn>,
    failure: Option<Arc<FailFn>>,
    raw_response: Option<Vec<f32>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Creates a mock answering each slot with the sum of its features.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot_fn: Arc::new(|slot| vec![slot.iter().sum()]),
            failure: None,
            raw_response: None,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets the per-slot response function.
    #[must_use]
    pub fn with_slot_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f32]) -> Vec<f32> + Send + Sync + 'static,
    {
        self.slot_fn = Arc::new(f);
        self
    }

    /// Makes every call fail with the produced error.
    #[must_use]
    pub fn failing_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> TransportError + Send + Sync + 'static,
    {
        self.failure = Some(Arc::new(f));
        self
    }

    /// Returns this fixed buffer for every call, bypassing the slot
    /// function. Used to exercise response-shape checking.
    #[must_use]
    pub fn with_raw_response(mut self, response: Vec<f32>) -> Self {
        self.raw_response = Some(response);
        self
    }

    /// Adds a simulated round-trip latency per call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Total calls answered or failed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously in-flight calls observed.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn infer(&self, input: &[f32], shape: &BatchShape) -> Result<Vec<f32>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight
            .fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = if let Some(failure) = &self.failure {
            Err(failure())
        } else if let Some(raw) = &self.raw_response {
            Ok(raw.clone())
        } else {
            let mut output = Vec::with_capacity(shape.output_len());
            for slot in 0..shape.batch_size {
                let features = &input[shape.input_range(slot)];
                output.extend((self.slot_fn)(features));
            }
            Ok(output)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// TCP transport speaking a length-prechecked flat-array exchange.
///
/// # Wire Format
///
/// Request: three `u32` LE header words (`batch_size`, `ninput`, `noutput`)
/// followed by the input buffer as LE `f32` values. Response: the output
/// buffer as `noutput * batch_size` LE `f32` values. One connection per
/// request; the whole exchange runs under one deadline.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    endpoint: String,
    timeout: Duration,
}

impl TcpTransport {
    /// Creates a transport for the given `host:port` endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// The configured endpoint address.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn exchange(&self, input: &[f32], shape: &BatchShape) -> Result<Vec<f32>, TransportError> {
        let mut stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| TransportError::connection(&self.endpoint, e.to_string()))?;

        let mut request = Vec::with_capacity(12 + 4 * input.len());
        request.extend_from_slice(&(shape.batch_size as u32).to_le_bytes());
        request.extend_from_slice(&(shape.ninput as u32).to_le_bytes());
        request.extend_from_slice(&(shape.noutput as u32).to_le_bytes());
        for value in input {
            request.extend_from_slice(&value.to_le_bytes());
        }
        stream.write_all(&request).await?;

        let mut response = vec![0u8; 4 * shape.output_len()];
        stream.read_exact(&mut response).await?;

        debug!(endpoint = %self.endpoint, bytes = response.len(), "batch exchanged");
        Ok(response
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

#[async_trait]
impl InferenceTransport for TcpTransport {
    fn name(&self) -> &str {
        "tcp"
    }

    async fn infer(&self, input: &[f32], shape: &BatchShape) -> Result<Vec<f32>, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(input, shape)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn shape() -> BatchShape {
        BatchShape::new(4, 1, 2)
    }

    #[tokio::test]
    async fn test_mock_answers_per_slot() {
        let transport = MockTransport::new();
        let input = vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0];
        let output = transport.infer(&input, &shape()).await.unwrap();
        assert_eq!(output, vec![10.0, 100.0]);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let transport =
            MockTransport::new().failing_with(|| TransportError::connection("mock", "down"));
        let err = transport
            .infer(&vec![0.0; shape().input_len()], &shape())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));
    }

    /// Serves exactly `n` requests, answering each slot with twice the sum
    /// of its features.
    async fn serve_doubling(listener: TcpListener, n: usize) {
        for _ in 0..n {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut header = [0u8; 12];
            socket.read_exact(&mut header).await.unwrap();
            let batch_size = u32::from_le_bytes(header[0..4].try_into().unwrap()) as usize;
            let ninput = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
            let noutput = u32::from_le_bytes(header[8..12].try_into().unwrap()) as usize;
            assert_eq!(noutput, 1);

            let mut payload = vec![0u8; 4 * batch_size * ninput];
            socket.read_exact(&mut payload).await.unwrap();
            let input: Vec<f32> = payload
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();

            let mut response = Vec::with_capacity(4 * batch_size);
            for slot in 0..batch_size {
                let sum: f32 = input[slot * ninput..(slot + 1) * ninput].iter().sum();
                response.extend_from_slice(&(2.0 * sum).to_le_bytes());
            }
            socket.write_all(&response).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_doubling(listener, 1));

        let transport = TcpTransport::new(addr.to_string(), Duration::from_secs(5));
        let input = vec![1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0];
        let output = transport.infer(&input, &shape()).await.unwrap();
        assert_eq!(output, vec![20.0, 8.0]);
    }

    #[tokio::test]
    async fn test_tcp_connect_failure_is_connection_error() {
        // Bind-then-drop reserves a port with nothing listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = TcpTransport::new(addr.to_string(), Duration::from_secs(1));
        let err = transport
            .infer(&vec![0.0; shape().input_len()], &shape())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connection { .. } | TransportError::Timeout { .. }
        ));
    }
}
