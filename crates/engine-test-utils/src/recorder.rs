//! Fake encoder with test-driven chunk emission.

use async_trait::async_trait;
use bytes::Bytes;
use rtc_engine::{
    CompositeStream, EngineError, MediaRecorder, RecorderHandle, RecorderOptions,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Chunk channel capacity; large enough for any test recording.
const CHUNK_BUFFER: usize = 256;

type ChunkSender = mpsc::Sender<Result<Bytes, EngineError>>;
type ChunkReceiver = mpsc::Receiver<Result<Bytes, EngineError>>;

/// Fake `MediaRecorder` with a configurable supported-type list.
pub struct FakeRecorder {
    supported: Mutex<Vec<String>>,
    fail_start: AtomicBool,
    last_handle: Mutex<Option<Arc<FakeRecorderHandle>>>,
}

impl FakeRecorder {
    /// A recorder supporting the full vp9/vp8/webm ladder.
    pub fn with_default_support() -> Self {
        Self::supporting(&[
            "video/webm;codecs=vp9,opus",
            "video/webm;codecs=vp8,opus",
            "video/webm",
        ])
    }

    /// A recorder supporting exactly the given MIME types.
    pub fn supporting(types: &[&str]) -> Self {
        Self {
            supported: Mutex::new(types.iter().map(|s| s.to_string()).collect()),
            fail_start: AtomicBool::new(false),
            last_handle: Mutex::new(None),
        }
    }

    /// Make the next `start` call fail with `EncoderUnavailable`.
    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// The handle produced by the most recent `start`, for assertions and
    /// chunk injection.
    pub fn last_handle(&self) -> Option<Arc<FakeRecorderHandle>> {
        self.last_handle.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaRecorder for FakeRecorder {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported
            .lock()
            .unwrap()
            .iter()
            .any(|t| t == mime_type)
    }

    async fn start(
        &self,
        stream: CompositeStream,
        options: RecorderOptions,
    ) -> Result<Arc<dyn RecorderHandle>, EngineError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(EngineError::EncoderUnavailable(
                "injected encoder failure".to_string(),
            ));
        }
        let handle = Arc::new(FakeRecorderHandle::new(stream, options));
        *self.last_handle.lock().unwrap() = Some(handle.clone());
        Ok(handle as Arc<dyn RecorderHandle>)
    }
}

/// Fake handle for one encoder run. Tests push chunks through it.
pub struct FakeRecorderHandle {
    stream: CompositeStream,
    options: RecorderOptions,
    chunk_tx: Mutex<Option<ChunkSender>>,
    chunk_rx: Mutex<Option<ChunkReceiver>>,
    released: AtomicBool,
}

impl FakeRecorderHandle {
    fn new(stream: CompositeStream, options: RecorderOptions) -> Self {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        Self {
            stream,
            options,
            chunk_tx: Mutex::new(Some(tx)),
            chunk_rx: Mutex::new(Some(rx)),
            released: AtomicBool::new(false),
        }
    }

    /// The composite stream this run was started with.
    pub fn stream(&self) -> &CompositeStream {
        &self.stream
    }

    /// The options this run was started with.
    pub fn options(&self) -> &RecorderOptions {
        &self.options
    }

    /// Emit an encoded chunk, as the real encoder would on its cadence.
    pub fn push_chunk(&self, data: impl Into<Bytes>) {
        if let Some(tx) = self.chunk_tx.lock().unwrap().as_ref() {
            let _ = tx.try_send(Ok(data.into()));
        }
    }

    /// Emit a runtime failure and end the chunk stream, simulating a source
    /// device disconnecting mid-capture.
    pub fn fail_runtime(&self, message: impl Into<String>) {
        let tx = self.chunk_tx.lock().unwrap().take();
        if let Some(tx) = tx {
            let _ = tx.try_send(Err(EngineError::RecorderRuntime(message.into())));
        }
        self.released.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecorderHandle for FakeRecorderHandle {
    fn take_chunks(&self) -> Option<ChunkReceiver> {
        self.chunk_rx.lock().unwrap().take()
    }

    async fn stop(&self) -> Result<(), EngineError> {
        // Dropping the sender closes the chunk stream after pending chunks
        // drain, which is the flush the composer waits on.
        self.chunk_tx.lock().unwrap().take();
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
