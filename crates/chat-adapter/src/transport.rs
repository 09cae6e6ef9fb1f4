use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, TryStreamExt as _};
use tracing::debug;

use crate::errors::AdapterError;
use crate::model::ProviderId;
use crate::request::RequestDescriptor;

/// Pull-based response body. Dropping it releases the connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AdapterError>> + Send + 'static>>;

/// Performs HTTP calls described by a [`RequestDescriptor`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response body as a byte stream.
    ///
    /// Non-success statuses fail with `UpstreamHttp` before any body byte is
    /// handed to a decoder.
    async fn open_stream(
        &self,
        provider: &ProviderId,
        request: &RequestDescriptor,
    ) -> Result<ByteStream, AdapterError>;

    /// Sends the request and reads the whole response body.
    async fn send(
        &self,
        provider: &ProviderId,
        request: &RequestDescriptor,
    ) -> Result<Bytes, AdapterError>;
}

/// `reqwest`-backed transport.
///
/// No timeout is configured; callers bound a request by cancelling the run.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-configured client (proxies, custom TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(
        &self,
        provider: &ProviderId,
        request: &RequestDescriptor,
    ) -> Result<reqwest::Response, AdapterError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .body(request.body_bytes());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AdapterError::transport(provider, format!("request failed: {e}")))?;
        let status = response.status();
        debug!(provider = %provider, url = %request.url, status = status.as_u16(), "upstream responded");
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AdapterError::upstream_http(provider, status.as_u16(), body));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open_stream(
        &self,
        provider: &ProviderId,
        request: &RequestDescriptor,
    ) -> Result<ByteStream, AdapterError> {
        let response = self.execute(provider, request).await?;
        let provider = provider.clone();
        Ok(Box::pin(response.bytes_stream().map_err(move |e| {
            AdapterError::transport(&provider, format!("streaming read failed: {e}"))
        })))
    }

    async fn send(
        &self,
        provider: &ProviderId,
        request: &RequestDescriptor,
    ) -> Result<Bytes, AdapterError> {
        let response = self.execute(provider, request).await?;
        response
            .bytes()
            .await
            .map_err(|e| AdapterError::transport(provider, format!("reading body failed: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::{StreamExt as _, stream};

    use super::*;

    /// Canned response for [`ScriptedTransport`].
    #[derive(Clone)]
    pub(crate) enum Script {
        /// Body delivered as these chunks, then end of stream.
        Chunks(Vec<&'static str>),
        /// Chunks, then a stream that never yields again.
        ChunksThenPending(Vec<&'static str>),
        /// Chunks, then a read error.
        ChunksThenError(Vec<&'static str>, AdapterError),
        /// The call itself fails.
        Fail(AdapterError),
    }

    struct ReleaseGuard(Arc<AtomicBool>);

    impl Drop for ReleaseGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Transport returning a fixed script and recording every call.
    #[derive(Clone)]
    pub(crate) struct ScriptedTransport {
        script: Script,
        pub(crate) calls: Arc<AtomicUsize>,
        pub(crate) released: Arc<AtomicBool>,
        pub(crate) last_request: Arc<Mutex<Option<RequestDescriptor>>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: Script) -> Self {
            Self {
                script,
                calls: Arc::new(AtomicUsize::new(0)),
                released: Arc::new(AtomicBool::new(false)),
                last_request: Arc::new(Mutex::new(None)),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn was_released(&self) -> bool {
            self.released.load(Ordering::SeqCst)
        }

        pub(crate) fn last_request(&self) -> Option<RequestDescriptor> {
            self.last_request.lock().ok().and_then(|guard| guard.clone())
        }

        fn record(&self, request: &RequestDescriptor) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut guard) = self.last_request.lock() {
                *guard = Some(request.clone());
            }
        }

        fn chunk_stream(chunks: &[&'static str]) -> impl Stream<Item = Result<Bytes, AdapterError>> + Send + 'static {
            let items: Vec<Result<Bytes, AdapterError>> = chunks
                .iter()
                .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
                .collect();
            stream::iter(items)
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn open_stream(
            &self,
            _provider: &ProviderId,
            request: &RequestDescriptor,
        ) -> Result<ByteStream, AdapterError> {
            self.record(request);
            let guard = ReleaseGuard(self.released.clone());
            let body: ByteStream = match &self.script {
                Script::Chunks(chunks) => Box::pin(Self::chunk_stream(chunks)),
                Script::ChunksThenPending(chunks) => {
                    Box::pin(Self::chunk_stream(chunks).chain(stream::pending()))
                }
                Script::ChunksThenError(chunks, err) => Box::pin(
                    Self::chunk_stream(chunks).chain(stream::iter(vec![Err(err.clone())])),
                ),
                Script::Fail(err) => return Err(err.clone()),
            };
            Ok(Box::pin(body.map(move |item| {
                let _ = &guard;
                item
            })))
        }

        async fn send(
            &self,
            _provider: &ProviderId,
            request: &RequestDescriptor,
        ) -> Result<Bytes, AdapterError> {
            self.record(request);
            match &self.script {
                Script::Chunks(chunks) | Script::ChunksThenPending(chunks) => {
                    Ok(Bytes::from(chunks.concat()))
                }
                Script::ChunksThenError(_, err) | Script::Fail(err) => Err(err.clone()),
            }
        }
    }
}
