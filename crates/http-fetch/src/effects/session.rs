use tracing::{debug, trace};

use crate::core::{detect_charset, detect_charset_lenient};
use crate::data::SessionState;
use crate::effects::pipeline::DecodePipeline;
use crate::effects::transport::ResponseHead;
use crate::error::{FetchError, Result};

/// State of one in-flight fetch, advanced by discrete transport events.
///
/// The session owns the text buffer, the active charset and the decode
/// pipeline. Its completion is called exactly once, when the session enters
/// [`SessionState::Completed`] or [`SessionState::Failed`]; events that
/// arrive afterwards are ignored. A session dropped before either state
/// completes with [`FetchError::Cancelled`].
///
/// # Examples
///
/// ```
/// use http_fetch::{FetchSession, ResponseHead, SessionState};
///
/// let mut delivered = None;
/// let mut session = FetchSession::new("utf8", |result| delivered = Some(result));
///
/// session.on_sent();
/// session.on_response(&ResponseHead::new(200));
/// session.on_chunk(b"hello");
/// session.on_end();
///
/// assert_eq!(session.state(), SessionState::Completed);
/// drop(session);
/// assert_eq!(delivered.unwrap().unwrap(), "hello");
/// ```
pub struct FetchSession<F>
where
    F: FnOnce(Result<String>),
{
    state:      SessionState,
    buffer:     String,
    charset:    String,
    lenient:    bool,
    pipeline:   Option<DecodePipeline>,
    completion: Option<F>,
}

impl<F> FetchSession<F>
where
    F: FnOnce(Result<String>),
{
    /// Create a session decoding with `charset` unless the response declares
    /// another one.
    pub fn new(charset: impl Into<String>, completion: F) -> Self {
        Self {
            state:      SessionState::Idle,
            buffer:     String::new(),
            charset:    charset.into(),
            lenient:    false,
            pipeline:   None,
            completion: Some(completion),
        }
    }

    /// Match `charset=` in any letter case when reading the Content-Type.
    #[must_use]
    pub fn lenient_charset(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn state(&self) -> SessionState { self.state }

    /// Charset in effect; overwritten once the response head is seen.
    pub fn charset(&self) -> &str { &self.charset }

    pub fn is_finished(&self) -> bool { self.state.is_terminal() }

    /// Request written and body flushed.
    pub fn on_sent(&mut self) {
        if self.state == SessionState::Idle {
            self.transition(SessionState::Sent);
        }
    }

    /// Response head arrived: resolve the charset and attach the pipeline.
    pub fn on_response(&mut self, head: &ResponseHead) {
        if !matches!(self.state, SessionState::Idle | SessionState::Sent) {
            return;
        }

        if let Some(content_type) = head.content_type() {
            let detected = if self.lenient {
                detect_charset_lenient(content_type)
            } else {
                detect_charset(content_type)
            };
            if let Some(charset) = detected {
                self.charset = charset.to_string();
            }
        }

        match DecodePipeline::for_response(head, &self.charset) {
            Ok(pipeline) => {
                debug!(
                    status = head.status,
                    charset = %self.charset,
                    gzip = pipeline.is_gzip(),
                    "response head received"
                );
                self.pipeline = Some(pipeline);
                self.transition(SessionState::Connected);
            }
            Err(e) => self.fail(e),
        }
    }

    /// One body chunk, in transport order.
    pub fn on_chunk(&mut self, chunk: &[u8]) {
        if self.is_finished() {
            return;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            self.fail(FetchError::Transport("body received before response head".to_string()));
            return;
        };

        trace!(len = chunk.len(), "body chunk");
        match pipeline.push(chunk) {
            Ok(text) => {
                self.buffer.push_str(&text);
                if self.state != SessionState::Streaming {
                    self.transition(SessionState::Streaming);
                }
            }
            Err(e) => self.fail(e),
        }
    }

    /// End of the body stream.
    pub fn on_end(&mut self) {
        if self.is_finished() {
            return;
        }
        let Some(mut pipeline) = self.pipeline.take() else {
            self.fail(FetchError::Transport("stream ended before response head".to_string()));
            return;
        };

        match pipeline.finish() {
            Ok(tail) => {
                self.buffer.push_str(&tail);
                self.transition(SessionState::Completed);
                let text = std::mem::take(&mut self.buffer);
                if let Some(completion) = self.completion.take() {
                    completion(Ok(text));
                }
            }
            Err(e) => self.fail(e),
        }
    }

    /// Transport or stream error.
    pub fn on_error(&mut self, error: FetchError) {
        if self.is_finished() {
            return;
        }
        self.fail(error);
    }

    fn fail(&mut self, error: FetchError) {
        self.transition(SessionState::Failed);
        self.buffer.clear();
        self.pipeline = None;
        if let Some(completion) = self.completion.take() {
            completion(Err(error));
        }
    }

    fn transition(&mut self, next: SessionState) {
        trace!(from = %self.state, to = %next, "session transition");
        self.state = next;
    }
}

impl<F> Drop for FetchSession<F>
where
    F: FnOnce(Result<String>),
{
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            debug!(state = %self.state, "session dropped before finishing");
            completion(Err(FetchError::Cancelled));
        }
    }
}

impl<F> std::fmt::Debug for FetchSession<F>
where
    F: FnOnce(Result<String>),
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchSession")
            .field("state", &self.state)
            .field("charset", &self.charset)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
