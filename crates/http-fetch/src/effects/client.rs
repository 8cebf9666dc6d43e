use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{resolve_target, serialize, snapshot};
use crate::data::{
    DEFAULT_CHARSET, DEFAULT_METHOD, DEFAULT_USER_AGENT, FetchConfig, OptionMap, OptionValue,
    RequestOptions, RequestSnapshot, option_map,
};
use crate::effects::dispatch::Dispatcher;
use crate::effects::session::FetchSession;
use crate::error::{FetchError, Result};

/// Web content fetcher.
///
/// The client keeps a request option template and a default charset. Both
/// persist across fetches until changed. Every fetch merges its own options
/// into a private copy of the template, so the client itself is never
/// modified by a fetch and may be shared between concurrent fetches.
///
/// # Examples
///
/// ```no_run
/// use http_fetch::{option_map, HttpFetch};
///
/// # async fn run() -> http_fetch::Result<()> {
/// let mut client = HttpFetch::new()?;
/// client.set_user_agent(Some("crawler/1.0")).set_cookie([("sid", "abc")]);
///
/// let html = client
///     .fetch("http://www.example.com/cross.asp", None, Some(&option_map([("recordId", 2)])))
///     .await?;
/// println!("{html}");
/// # Ok(())
/// # }
/// ```
pub struct HttpFetch {
    options:    RequestOptions,
    char_code:  String,
    config:     FetchConfig,
    dispatcher: Dispatcher,
}

impl HttpFetch {
    /// Client with default settings and `reqwest` transports.
    #[cfg(feature = "reqwest")]
    pub fn new() -> Result<Self> { Self::with_config(FetchConfig::default()) }

    /// Client with `config` and `reqwest` transports.
    #[cfg(feature = "reqwest")]
    pub fn with_config(config: FetchConfig) -> Result<Self> {
        Ok(Self::with_dispatcher(config, Dispatcher::with_defaults()?))
    }

    /// Client with `config` and caller-provided transports.
    pub fn with_dispatcher(config: FetchConfig, dispatcher: Dispatcher) -> Self {
        let charset = config.charset.clone();
        let user_agent = config.user_agent.clone();

        let mut client = Self {
            options: RequestOptions::default(),
            char_code: DEFAULT_CHARSET.to_string(),
            config,
            dispatcher,
        };
        client.set_char_code(Some(&charset));
        if let Some(user_agent) = user_agent {
            client.set_user_agent(Some(&user_agent));
        }
        client
    }

    /// Deep-merge `partial` into the option template.
    pub fn set_options(&mut self, partial: OptionMap) -> &mut Self {
        self.options.merge(partial);
        self
    }

    /// Set the request method; `None` or empty selects `GET`.
    pub fn set_method(&mut self, method: Option<&str>) -> &mut Self {
        let method = non_empty(method).unwrap_or(DEFAULT_METHOD);
        self.set_options(option_map([("method", method)]))
    }

    /// Serialize `pairs` into the `Cookie` header.
    pub fn set_cookie<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: std::fmt::Display,
        V: std::fmt::Display,
    {
        let cookie = serialize(pairs);
        self.set_headers([("Cookie", cookie)])
    }

    /// Merge `headers` into the header template, key by key.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OptionValue>,
    {
        let headers = option_map(headers);
        self.set_options(option_map([("headers", OptionValue::Map(headers))]))
    }

    /// Set the `User-Agent` header; `None` or empty selects `http-fetch`.
    pub fn set_user_agent(&mut self, user_agent: Option<&str>) -> &mut Self {
        let user_agent = non_empty(user_agent).unwrap_or(DEFAULT_USER_AGENT);
        self.set_headers([("User-Agent", user_agent)])
    }

    /// Set the charset used when a response declares none; `None` or empty
    /// selects `utf8`.
    pub fn set_char_code(&mut self, char_code: Option<&str>) -> &mut Self {
        self.char_code = non_empty(char_code).unwrap_or(DEFAULT_CHARSET).to_string();
        self
    }

    pub fn options(&self) -> &RequestOptions { &self.options }

    pub fn char_code(&self) -> &str { &self.char_code }

    pub fn config(&self) -> &FetchConfig { &self.config }

    /// Fetch `url` and return the body decoded to text.
    ///
    /// `options` are merged over the template for this call only; host, port
    /// and path from the URL take precedence over them. When `data` is given
    /// it is serialized and sent as the request body.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`]; no partial text is returned on failure.
    pub async fn fetch(
        &self,
        url: &str,
        options: Option<OptionMap>,
        data: Option<&OptionMap>,
    ) -> Result<String> {
        let mut outcome = None;
        self.run(url, options, data, None, |result| outcome = Some(result)).await;
        outcome.unwrap_or(Err(FetchError::Cancelled))
    }

    /// Like [`fetch`](Self::fetch), delivering the outcome to an error-first
    /// callback that is invoked exactly once. Dropping the returned future
    /// before it finishes invokes the callback with [`FetchError::Cancelled`].
    pub async fn fetch_with<F>(
        &self,
        url: &str,
        options: Option<OptionMap>,
        data: Option<&OptionMap>,
        callback: F,
    ) where
        F: FnOnce(Result<String>),
    {
        self.run(url, options, data, None, callback).await;
    }

    /// Like [`fetch`](Self::fetch), ending with [`FetchError::Cancelled`]
    /// as soon as `token` is cancelled.
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        options: Option<OptionMap>,
        data: Option<&OptionMap>,
        token: &CancellationToken,
    ) -> Result<String> {
        let mut outcome = None;
        self.run(url, options, data, Some(token), |result| outcome = Some(result)).await;
        outcome.unwrap_or(Err(FetchError::Cancelled))
    }

    /// Build the immutable request for one call.
    pub fn prepare(
        &self,
        url: &str,
        options: Option<OptionMap>,
        data: Option<&OptionMap>,
    ) -> Result<RequestSnapshot> {
        let target = resolve_target(url)?;
        let mut merged = self.options.clone();
        if let Some(options) = options {
            merged.merge(options);
        }
        let body = data.map(|data| serialize(data));
        Ok(snapshot(&merged, target, body))
    }

    async fn run<F>(
        &self,
        url: &str,
        options: Option<OptionMap>,
        data: Option<&OptionMap>,
        token: Option<&CancellationToken>,
        completion: F,
    ) where
        F: FnOnce(Result<String>),
    {
        let mut session = FetchSession::new(self.char_code.clone(), completion)
            .lenient_charset(self.config.lenient_charset);

        let request = match self.prepare(url, options, data) {
            Ok(request) => request,
            Err(e) => {
                session.on_error(e);
                return;
            }
        };

        let interrupted = {
            let exchange = self.exchange(&request, &mut session);
            let limit = self.config.timeout_duration();
            let bounded = async move {
                match limit {
                    Some(limit) => tokio::time::timeout(limit, exchange)
                        .await
                        .err()
                        .map(|_| FetchError::Timeout),
                    None => {
                        exchange.await;
                        None
                    }
                }
            };

            match token {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Some(FetchError::Cancelled),
                    interrupted = bounded => interrupted,
                },
                None => bounded.await,
            }
        };

        if let Some(error) = interrupted {
            debug!(url, %error, "fetch interrupted");
            session.on_error(error);
        }
    }

    /// Drive one request/response exchange through the session.
    async fn exchange<F>(&self, request: &RequestSnapshot, session: &mut FetchSession<F>)
    where
        F: FnOnce(Result<String>),
    {
        let response = match self.dispatcher.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                session.on_error(e);
                return;
            }
        };

        session.on_sent();
        session.on_response(&response.head);

        let mut body = response.body;
        while !session.is_finished() {
            match body.next().await {
                Some(Ok(chunk)) => session.on_chunk(&chunk),
                Some(Err(e)) => session.on_error(e),
                None => session.on_end(),
            }
        }
    }
}

impl std::fmt::Debug for HttpFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetch")
            .field("options", &self.options)
            .field("char_code", &self.char_code)
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> { value.filter(|v| !v.is_empty()) }

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;

    use super::*;
    use crate::data::Scheme;
    use crate::effects::transport::{BoxStream, ResponseHead, Transport, TransportResponse};

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<RequestSnapshot>>>);

    impl Recorded {
        fn requests(&self) -> Vec<RequestSnapshot> { self.0.lock().unwrap().clone() }
    }

    enum Body {
        Chunks(Vec<&'static [u8]>),
        Pending,
        Reset,
        Refused,
    }

    struct MockTransport {
        head:     ResponseHead,
        body:     Body,
        recorded: Recorded,
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn scheme(&self) -> Scheme { Scheme::Http }

        async fn send(&self, request: &RequestSnapshot) -> Result<TransportResponse> {
            self.recorded.0.lock().unwrap().push(request.clone());
            let body: BoxStream<'static, Result<Bytes>> = match &self.body {
                Body::Chunks(chunks) => Box::pin(stream::iter(
                    chunks.clone().into_iter().map(|chunk| Ok(Bytes::from_static(chunk))),
                )),
                Body::Pending => Box::pin(stream::pending()),
                Body::Reset => Box::pin(stream::iter(vec![
                    Ok(Bytes::from_static(b"partial")),
                    Err(FetchError::Transport("connection reset".to_string())),
                ])),
                Body::Refused => return Err(FetchError::Transport("connection refused".to_string())),
            };
            Ok(TransportResponse {
                head: self.head.clone(),
                body,
            })
        }
    }

    fn html() -> ResponseHead { ResponseHead::new(200).with_header("Content-Type", "text/html") }

    fn client_with(config: FetchConfig, body: Body) -> (HttpFetch, Recorded) {
        let recorded = Recorded::default();
        let transport = MockTransport {
            head: html(),
            body,
            recorded: recorded.clone(),
        };
        let dispatcher = Dispatcher::new().with(Box::new(transport));
        (HttpFetch::with_dispatcher(config, dispatcher), recorded)
    }

    fn client(body: Body) -> (HttpFetch, Recorded) { client_with(FetchConfig::default(), body) }

    #[test]
    fn setters_persist_and_fall_back_to_defaults() {
        let (mut client, _) = client(Body::Pending);
        client
            .set_user_agent(Some("X"))
            .set_method(Some("POST"))
            .set_cookie([("a", 1), ("b", 2)])
            .set_char_code(Some("gbk"));

        assert_eq!(client.options().header("User-Agent").as_deref(), Some("X"));
        assert_eq!(client.options().header("Cookie").as_deref(), Some("a=1&b=2"));
        assert_eq!(client.options().method(), "POST");
        assert_eq!(client.char_code(), "gbk");

        client
            .set_user_agent(Some(""))
            .set_method(None)
            .set_cookie(Vec::<(&str, &str)>::new())
            .set_char_code(None);

        assert_eq!(client.options().header("User-Agent").as_deref(), Some("http-fetch"));
        assert_eq!(client.options().header("Cookie").as_deref(), Some(""));
        assert_eq!(client.options().method(), "GET");
        assert_eq!(client.char_code(), "utf8");
    }

    #[test]
    fn set_headers_keeps_other_defaults() {
        let (mut client, _) = client(Body::Pending);
        client.set_headers([("Referer", "http://example.com/")]);

        assert_eq!(client.options().header("Referer").as_deref(), Some("http://example.com/"));
        assert_eq!(client.options().header("Pragma").as_deref(), Some("no-cache"));
    }

    #[test]
    fn config_seeds_charset_and_user_agent() {
        let config = FetchConfig::default().charset("gb2312").user_agent("bot/2");
        let (client, _) = client_with(config, Body::Pending);

        assert_eq!(client.char_code(), "gb2312");
        assert_eq!(client.options().header("User-Agent").as_deref(), Some("bot/2"));
        assert_eq!(client.config().user_agent.as_deref(), Some("bot/2"));
        assert!(!client.config().lenient_charset);
    }

    #[test]
    fn url_components_win_over_options() {
        let (client, _) = client(Body::Pending);
        let options = option_map([
            ("hostname", OptionValue::from("other.example")),
            ("port", OptionValue::from(9000)),
            ("path", OptionValue::from("/ignored")),
        ]);

        let request = client
            .prepare("http://www.example.com:8080/cross.asp?id=1", Some(options), None)
            .unwrap();
        assert_eq!(request.hostname, "www.example.com");
        assert_eq!(request.port, 8080);
        assert_eq!(request.path, "/cross.asp?id=1");
    }

    #[test]
    fn option_port_applies_without_url_port() {
        let (client, _) = client(Body::Pending);
        let request = client
            .prepare("http://example.com/", Some(option_map([("port", 9000)])), None)
            .unwrap();
        assert_eq!(request.port, 9000);

        let https = client.prepare("https://example.com/", None, None).unwrap();
        assert_eq!(https.port, 443);
    }

    #[test]
    fn call_options_do_not_touch_the_template() {
        let (client, _) = client(Body::Pending);
        let headers = option_map([("User-Agent", "once")]);
        let options = option_map([("headers", OptionValue::Map(headers))]);

        let request = client.prepare("http://example.com/", Some(options), None).unwrap();
        assert_eq!(request.headers["User-Agent"], "once");
        assert_eq!(client.options().header("User-Agent").as_deref(), Some("http-fetch"));
    }

    #[test]
    fn data_is_serialized_into_body() {
        let (client, _) = client(Body::Pending);
        let data = option_map([("recordId", 2)]);
        let request = client.prepare("http://example.com/cross.asp", None, Some(&data)).unwrap();
        assert_eq!(request.body.as_deref(), Some("recordId=2"));

        let without = client.prepare("http://example.com/", None, None).unwrap();
        assert_eq!(without.body, None);
    }

    #[tokio::test]
    async fn fetch_returns_decoded_text() {
        let (client, recorded) = client(Body::Chunks(vec![b"<html>", b"ok</html>"]));

        let text = client.fetch("http://example.com/page", None, None).await.unwrap();
        assert_eq!(text, "<html>ok</html>");

        let requests = recorded.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/page");
        assert_eq!(requests[0].headers["Accept-Encoding"], "gzip,default");
    }

    #[tokio::test]
    async fn unsupported_scheme_never_reaches_transport() {
        let (client, recorded) = client(Body::Chunks(vec![b"x"]));

        let err = client.fetch("ftp://example.com/file", None, None).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedProtocol(ref s) if s == "ftp:"));

        let err = client.fetch("https://example.com/", None, None).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedProtocol(ref s) if s == "https:"));

        assert!(recorded.requests().is_empty());
    }

    #[tokio::test]
    async fn invalid_url_fails_before_sending() {
        let (client, recorded) = client(Body::Chunks(vec![b"x"]));
        let err = client.fetch("not a url", None, None).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert!(recorded.requests().is_empty());
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let (client, _) = client(Body::Refused);
        let err = client.fetch("http://example.com/", None, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn stream_error_discards_partial_text() {
        let (client, _) = client(Body::Reset);
        let err = client.fetch("http://example.com/", None, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(ref s) if s == "connection reset"));
    }

    #[tokio::test]
    async fn callback_runs_exactly_once() {
        let (client, _) = client(Body::Chunks(vec![b"body"]));
        let mut calls = Vec::new();

        client
            .fetch_with("http://example.com/", None, None, |result| calls.push(result))
            .await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].as_deref().unwrap(), "body");

        let mut failures = Vec::new();
        client
            .fetch_with("ftp://example.com/", None, None, |result| failures.push(result))
            .await;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_fetch_reports_cancelled() {
        let (client, _) = client(Body::Pending);
        let mut calls = Vec::new();

        let fetch = client.fetch_with("http://example.com/", None, None, |result| calls.push(result));
        assert!(tokio::time::timeout(Duration::from_millis(10), fetch).await.is_err());

        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Err(FetchError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_body_times_out() {
        let config = FetchConfig::default().timeout(Duration::from_secs(5));
        let (client, _) = client_with(config, Body::Pending);

        let err = client.fetch("http://example.com/", None, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn cancelled_token_stops_fetch() {
        let (client, _) = client(Body::Pending);
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .fetch_cancellable("http://example.com/", None, None, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_stream() {
        let (client, _) = client(Body::Pending);
        let token = CancellationToken::new();

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(
            client.fetch_cancellable("http://example.com/", None, None, &token),
            cancel
        );
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn concurrent_fetches_use_own_snapshots() {
        let (client, recorded) = client(Body::Chunks(vec![b"same"]));
        let first = option_map([("method", "POST")]);

        let (a, b) = tokio::join!(
            client.fetch("http://example.com/a", Some(first), None),
            client.fetch("http://example.com/b", None, None)
        );
        assert_eq!(a.unwrap(), "same");
        assert_eq!(b.unwrap(), "same");

        let mut requests = recorded.requests();
        requests.sort_by(|x, y| x.path.cmp(&y.path));
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[1].method, "GET");
        assert_eq!(client.options().method(), "GET");
    }
}
