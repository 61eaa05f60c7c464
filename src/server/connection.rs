use crate::{
    errors::ErrorKind,
    http::{
        request::{Parser, Request},
        response::Response,
        types::{StatusCode, Version},
    },
    limits::{ConnLimits, Http09Limits, ReqLimits, RespLimits, ServerLimits},
    server::server_impl::{AllLimits, Handler},
    Handled, Method,
};
use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Instant};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    time::{sleep, timeout},
};

/// Where a connection sits in the request/response cycle.
///
/// Mirrors the life of a single request: `Idle` between requests, `Request`
/// while headers are still arriving, `Handler` while the handler runs,
/// `Response` once it has committed to streaming a reply, and `Failed` once
/// a mid-stream error has made the connection unrecoverable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Stage {
    Idle,
    Request,
    Handler,
    Response,
    Failed,
}

/// Tracks which response-framing strategy [`Engine::send`] has committed to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ResponseFunc {
    /// No `send` call has happened yet; framing is still undecided.
    Start,
    /// Streaming with a handler-declared `content-length`; `response_bytes_left`
    /// tracks how many more bytes are owed.
    FixedLength,
    /// Streaming with `transfer-encoding: chunked`; more chunks may follow.
    Chunked,
    /// A `HEAD` response being streamed: headers went out, body bytes are discarded.
    HeadIgnored,
    /// A fixed-length response fully built in the buffer, not yet written.
    BufferedDone,
    /// A streamed response whose bytes already went straight to the socket.
    StreamedDone,
}

/// The per-request driver passed to [`Handler::handle`] in place of raw
/// request/response halves.
///
/// Owns the socket for the life of the request: [`read`](Self::read) pulls
/// the body in, [`send`](Self::send) writes the response. A handler that
/// never calls `read` never pays for body I/O; a handler that calls `send`
/// with `end_stream: false` commits the response to streaming straight to
/// the socket from then on - `transfer-encoding: chunked`, unless the
/// handler already set its own `content-length` header, in which case the
/// bytes sent are tracked against it instead.
pub struct Engine<'a, H: Handler<S>, S: ConnectionData> {
    conn: &'a mut HttpConnection<H, S>,
    stream: &'a mut TcpStream,
}

impl<'a, H: Handler<S>, S: ConnectionData> Engine<'a, H, S> {
    /// The request being answered.
    #[inline(always)]
    pub fn request(&self) -> &Request {
        &self.conn.request
    }

    /// The response builder: call `status()`/`header()` etc. before the
    /// first [`send`](Self::send).
    #[inline(always)]
    pub fn response(&mut self) -> &mut Response {
        &mut self.conn.response
    }

    /// The connection-scoped user state.
    #[inline(always)]
    pub fn data(&mut self) -> &mut S {
        &mut self.conn.connection_data
    }

    /// Reads the next piece of the request body.
    ///
    /// Returns `Ok(None)` once the whole body has been handed out: all
    /// `content-length` bytes, or a chunked body's terminal chunk. A body
    /// that already arrived alongside the headers - the common case - comes
    /// back on the very first call with no socket I/O.
    ///
    /// A pending `Expect: 100-continue` is flushed on the first call,
    /// unconditionally: reading the body is itself the continuation the
    /// client is waiting on.
    pub async fn read(&mut self) -> Result<Option<&'static [u8]>, ErrorKind> {
        if self.conn.expecting_continue {
            self.conn.expecting_continue = false;
            self.conn
                .conn_limits
                .write_bytes(self.stream, b"HTTP/1.1 100 Continue\r\n\r\n")
                .await?;
        }

        self.conn.read_body_step(&mut *self.stream).await
    }

    /// Writes a piece of the response.
    ///
    /// The *first* call decides the framing: `end_stream: true` commits to a
    /// fixed `content-length` body built in memory (the common case, and
    /// byte-for-byte what [`Response::body`] would produce); `end_stream:
    /// false` streams straight to the socket from then on, either against a
    /// `content-length` the handler already set via
    /// [`header()`](Response::header) - raising [`ErrorKind::ServerError`] if
    /// the bytes sent over- or under-run it - or, absent that, as
    /// `transfer-encoding: chunked`.
    ///
    /// If the handler never called [`read`](Self::read) and the eventual
    /// response status isn't 417, a pending `Expect: 100-continue` is
    /// flushed immediately before this first call's bytes.
    pub async fn send(&mut self, data: &[u8], end_stream: bool) -> Result<(), ErrorKind> {
        self.conn.engine_send(&mut *self.stream, data, end_stream).await
    }
}

pub(crate) struct HttpConnection<H: Handler<S>, S: ConnectionData> {
    handler: Arc<H>,
    connection_data: S,

    connection: Connection,
    pub(crate) parser: Parser,
    pub(crate) request: Request,
    pub(crate) response: Response,

    pub(crate) stage: Stage,
    response_func: ResponseFunc,
    response_bytes_left: i64,
    pub(crate) expecting_continue: bool,

    pub(crate) request_served: usize,
    pub(crate) body_exhausted: bool,
    pub(crate) chunk_started: bool,
    pub(crate) chunk_scan_cursor: usize,
    pub(crate) chunk_write_cursor: usize,
    streamed_bytes: usize,

    pub(crate) server_limits: ServerLimits,
    pub(crate) conn_limits: ConnLimits,
    pub(crate) http_09_limits: Option<Http09Limits>,
    pub(crate) req_limits: ReqLimits,
    pub(crate) resp_limits: RespLimits,
}

impl<H: Handler<S>, S: ConnectionData> HttpConnection<H, S> {
    #[inline]
    pub(crate) fn new(handler: Arc<H>, limits: AllLimits) -> Self {
        Self {
            handler,
            connection_data: S::new(),

            connection: Connection::new(),
            parser: Parser::new(&limits.3),
            request: Request::new(&limits.3),
            response: Response::new(&limits.4),

            stage: Stage::Idle,
            response_func: ResponseFunc::Start,
            response_bytes_left: 0,
            expecting_continue: false,

            request_served: 0,
            body_exhausted: false,
            chunk_started: false,
            chunk_scan_cursor: 0,
            chunk_write_cursor: 0,
            streamed_bytes: 0,

            server_limits: limits.0,
            conn_limits: limits.1,
            http_09_limits: limits.2,
            req_limits: limits.3,
            resp_limits: limits.4,
        }
    }

    #[inline]
    fn reset_request_response(&mut self) {
        self.parser.reset();
        self.request.reset();
        self.response.reset(&self.resp_limits);

        self.stage = Stage::Idle;
        self.response_func = ResponseFunc::Start;
        self.response_bytes_left = 0;
        self.expecting_continue = false;

        self.request_served = 0;
        self.body_exhausted = false;
        self.chunk_started = false;
        self.chunk_scan_cursor = 0;
        self.chunk_write_cursor = 0;
        self.streamed_bytes = 0;
    }

    /// Implements the response-framing half of [`Engine::send`].
    async fn engine_send(
        &mut self,
        stream: &mut TcpStream,
        data: &[u8],
        end_stream: bool,
    ) -> Result<(), ErrorKind> {
        if !matches!(self.stage, Stage::Handler | Stage::Response) {
            return Ok(());
        }

        if self.expecting_continue {
            self.expecting_continue = false;
            if self.response.status_code() != StatusCode::ExpectationFailed {
                self.conn_limits
                    .write_bytes(stream, b"HTTP/1.1 100 Continue\r\n\r\n")
                    .await?;
            }
        }

        match self.response_func {
            ResponseFunc::Start if end_stream => {
                self.response.body(data);
                self.response_func = ResponseFunc::BufferedDone;
                self.stage = Stage::Idle;
            }
            ResponseFunc::Start => {
                let head_only = self.request.method() == Method::Head;

                if let Some(total) = self.response.preset_content_length() {
                    self.response.start_fixed_length();
                    self.conn_limits
                        .write_bytes(stream, self.response.buffer())
                        .await?;
                    self.streamed_bytes += self.response.buffer().len();

                    if head_only {
                        self.response_func = ResponseFunc::HeadIgnored;
                        self.stage = Stage::Response;
                    } else {
                        self.response_bytes_left = total as i64;
                        self.response_func = ResponseFunc::FixedLength;
                        self.stage = Stage::Response;
                        self.write_fixed_length(stream, data, end_stream).await?;
                    }
                } else {
                    self.response.start_chunked();
                    self.conn_limits
                        .write_bytes(stream, self.response.buffer())
                        .await?;
                    self.streamed_bytes += self.response.buffer().len();

                    if !head_only {
                        self.streamed_bytes +=
                            write_chunk(&self.conn_limits, stream, data).await?;
                    }

                    self.response_func = if head_only {
                        ResponseFunc::HeadIgnored
                    } else {
                        ResponseFunc::Chunked
                    };
                    self.stage = Stage::Response;
                }
            }
            ResponseFunc::FixedLength => {
                self.write_fixed_length(stream, data, end_stream).await?;
            }
            ResponseFunc::Chunked => {
                self.streamed_bytes += write_chunk(&self.conn_limits, stream, data).await?;

                if end_stream {
                    self.conn_limits.write_bytes(stream, b"0\r\n\r\n").await?;
                    self.streamed_bytes += 5;
                    self.response_func = ResponseFunc::StreamedDone;
                    self.stage = Stage::Idle;
                }
            }
            ResponseFunc::HeadIgnored => {
                if end_stream {
                    self.response_func = ResponseFunc::StreamedDone;
                    self.stage = Stage::Idle;
                }
            }
            ResponseFunc::BufferedDone | ResponseFunc::StreamedDone => {}
        }

        Ok(())
    }

    /// Implements `http1_response_normal`'s bookkeeping for a fixed-length
    /// chunk: the overrun check happens against `response_bytes_left` before
    /// `data` ever reaches the socket, so a chunk that would overrun
    /// `content-length` raises [`ErrorKind::ServerError`] without writing a
    /// single byte of it - matching the original, where the same check gates
    /// the value returned to the caller that performs the write. Finishes the
    /// response once exactly that many bytes have gone out, and raises the
    /// same error if the stream ends with bytes still owed.
    #[inline]
    async fn write_fixed_length(
        &mut self,
        stream: &mut TcpStream,
        data: &[u8],
        end_stream: bool,
    ) -> Result<(), ErrorKind> {
        self.response_bytes_left -= data.len() as i64;

        if self.response_bytes_left < 0 {
            self.stage = Stage::Failed;
            return Err(ErrorKind::ServerError);
        }

        self.conn_limits.write_bytes(stream, data).await?;
        self.streamed_bytes += data.len();

        if self.response_bytes_left == 0 {
            self.response_func = ResponseFunc::StreamedDone;
            self.stage = Stage::Idle;
        } else if end_stream {
            self.stage = Stage::Failed;
            return Err(ErrorKind::ServerError);
        }

        Ok(())
    }
}

/// Writes one chunk frame (`<hex-size>\r\n<data>\r\n`) directly to the
/// socket. A zero-length `data` is a no-op: the empty final chunk is written
/// separately once `send`'s caller sets `end_stream`.
#[inline]
async fn write_chunk(
    conn_limits: &ConnLimits,
    stream: &mut TcpStream,
    data: &[u8],
) -> Result<usize, ErrorKind> {
    if data.is_empty() {
        return Ok(0);
    }

    let mut header = [0u8; 18];
    let header_len = hex_chunk_header(data.len(), &mut header);

    conn_limits.write_bytes(stream, &header[..header_len]).await?;
    conn_limits.write_bytes(stream, data).await?;
    conn_limits.write_bytes(stream, b"\r\n").await?;

    Ok(header_len + data.len() + 2)
}

/// Formats `n` as a chunk-size line (`<hex><CRLF>`), returning the length written.
#[inline]
fn hex_chunk_header(mut n: usize, buf: &mut [u8; 18]) -> usize {
    let mut digits = [0u8; 16];
    let mut i = 16;

    if n == 0 {
        i = 15;
        digits[15] = b'0';
    }
    while n > 0 {
        i -= 1;
        let d = (n & 0xf) as u8;
        digits[i] = if d < 10 { b'0' + d } else { b'a' + (d - 10) };
        n >>= 4;
    }

    let len = 16 - i;
    buf[..len].copy_from_slice(&digits[i..]);
    buf[len] = b'\r';
    buf[len + 1] = b'\n';
    len + 2
}

impl<H: Handler<S>, S: ConnectionData> HttpConnection<H, S> {
    #[inline]
    pub(crate) async fn run(
        &mut self,
        stream: &mut TcpStream,
        client_addr: SocketAddr,
        server_addr: SocketAddr,
    ) -> Result<(), io::Error> {
        self.request.client_addr = client_addr;
        self.request.server_addr = server_addr;

        match self.impl_run(stream).await {
            Ok(()) => Ok(()),
            Err(ErrorKind::Io(e)) => Err(e.0),
            Err(error) => {
                self.conn_limits
                    .send_error(
                        stream,
                        error,
                        self.request.version(),
                        self.server_limits.json_errors,
                    )
                    .await
            }
        }
    }

    #[inline]
    pub(crate) async fn impl_run(&mut self, stream: &mut TcpStream) -> Result<(), ErrorKind> {
        self.connection.reset();
        self.connection_data.reset();

        while !self.is_expired()? {
            self.reset_request_response();

            // Idle stage: wait for the next request's first byte. A silent
            // expiry here (no response) is what distinguishes it from the
            // request-phase timeout below.
            if self
                .parser
                .fill_buffer(stream, self.conn_limits.keep_alive_timeout)
                .await?
                == 0
            {
                break;
            }

            self.stage = Stage::Request;

            // Request stage: keep reading until the full header block has
            // arrived. The scan resumes where the last call left off, so a
            // header block split across arbitrarily many reads (even one
            // byte at a time) is still found exactly once.
            while !self.parser.headers_complete() {
                if self.parser.remaining_capacity() == 0 {
                    return Err(ErrorKind::TooManyHeaders);
                }
                if self
                    .parser
                    .fill_more_req(stream, self.conn_limits.request_timeout)
                    .await?
                    == 0
                {
                    return Ok(());
                }
            }

            let version = self.parse_head()?;
            self.response.version = version;

            // A body that already arrived alongside the headers - the
            // overwhelming common case - is made available with no I/O.
            // Anything still missing (a split content-length body, or any
            // chunked body at all) is left for the handler to pull via
            // `Engine::read`.
            if version != Version::Http09 {
                self.expecting_continue = self.expects_continue();
            }
            self.check_body()?;

            self.stage = Stage::Handler;
            self.response_func = ResponseFunc::Start;

            // Handler stage: a handler that never returns (or a response
            // that never completes) mustn't pin a worker forever.
            let response_timeout = self.conn_limits.response_timeout;
            let handler = Arc::clone(&self.handler);
            let timed_out = {
                let mut engine = Engine {
                    conn: self,
                    stream,
                };
                timeout(response_timeout, handler.handle(&mut engine))
                    .await
                    .is_err()
            };

            if timed_out {
                self.response.keep_alive = false;

                if self.response_func == ResponseFunc::Start {
                    self.conn_limits
                        .send_error(
                            stream,
                            ErrorKind::ServiceUnavailable,
                            self.request.version(),
                            self.server_limits.json_errors,
                        )
                        .await?;
                } else {
                    self.stage = Stage::Failed;
                }
            } else {
                match self.response_func {
                    ResponseFunc::BufferedDone => {
                        // `HEAD` reports the body length the handler would
                        // have sent, but no body bytes go over the wire.
                        let out = match self.request.method() {
                            Method::Head => self.response.header_bytes(),
                            _ => self.response.buffer(),
                        };

                        if self.server_limits.access_log {
                            self.log_access(out.len());
                        }

                        self.conn_limits.write_bytes(stream, out).await?;
                    }
                    ResponseFunc::StreamedDone => {
                        if self.server_limits.access_log {
                            self.log_access(self.streamed_bytes);
                        }
                    }
                    ResponseFunc::Start => {
                        // §4.1.6: the handler returned without ever calling
                        // `send`. Nothing has reached the wire yet, so a
                        // clean error response can still go out.
                        log::error!("handler completed without producing a response");
                        self.response.keep_alive = false;
                        self.conn_limits
                            .send_error(
                                stream,
                                ErrorKind::ServerError,
                                self.request.version(),
                                self.server_limits.json_errors,
                            )
                            .await?;
                    }
                    ResponseFunc::FixedLength
                    | ResponseFunc::Chunked
                    | ResponseFunc::HeadIgnored => {
                        // Headers (and maybe some chunks) already hit the
                        // wire; there's no way to still send a clean error
                        // response, so the connection just closes.
                        log::error!("handler left a streamed response unfinished");
                        self.stage = Stage::Failed;
                        self.response.keep_alive = false;
                    }
                }
            }

            // A body the handler never fully read would otherwise be
            // mistaken for the start of the next request.
            if !self.body_exhausted {
                self.response.keep_alive = false;
            }

            if self.stage == Stage::Failed || !self.response.keep_alive {
                break;
            }

            self.stage = Stage::Idle;
            self.connection.request_count += 1;
        }

        Ok(())
    }

    /// Emits the access-log record described by the crate's configuration
    /// surface: response status, bytes written, peer address, and request
    /// line - one [`log::info!`] call per completed response.
    #[inline]
    fn log_access(&self, bytes: usize) {
        log::info!(
            "{} {} {} \"{:?} {}\"",
            self.request.client_addr(),
            self.response.status_code().as_u16(),
            bytes,
            self.request.method(),
            String::from_utf8_lossy(self.request.url().target()),
        );
    }
}

impl ConnLimits {
    #[inline]
    pub(crate) async fn send_error(
        &self,
        stream: &mut TcpStream,
        error: ErrorKind,
        version: Version,
        json_errors: bool,
    ) -> Result<(), io::Error> {
        self.write_bytes(stream, error.as_http(version, json_errors))
            .await
    }

    #[inline]
    pub(crate) async fn write_bytes(
        &self,
        stream: &mut TcpStream,
        response: &[u8],
    ) -> Result<(), io::Error> {
        tokio::select! {
            biased;

            result = stream.write_all(response) => result,
            _ = sleep(self.socket_write_timeout) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "write timeout"))
            },
        }
    }
}

macro_rules! is_expired {
    ($self:expr, $limits:expr) => {
        Ok(!$self.response.keep_alive
            || $self.connection.request_count >= $limits.max_requests_per_connection
            || $self.connection.created.elapsed() > $limits.connection_lifetime)
    };
}

impl<H: Handler<S>, S: ConnectionData> HttpConnection<H, S> {
    #[inline]
    fn is_expired(&self) -> Result<bool, ErrorKind> {
        match (self.response.version, &self.http_09_limits) {
            (Version::Http09, Some(limits)) => is_expired!(self, limits),
            (Version::Http09, None) => Err(ErrorKind::UnsupportedVersion),
            _ => is_expired!(self, self.conn_limits),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Connection {
    created: Instant,
    request_count: usize,
}

impl Connection {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            created: Instant::now(),
            request_count: 0,
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.created = Instant::now();
        self.request_count = 0;
    }
}

//

/// Managing user session data stored between requests within a single HTTP connection.
///
/// This trait allows you to store arbitrary state (e.g., authentication data,
/// multistep form status, cache, etc.). The state is available across all requests
/// within a single HTTP keep-alive connection.
///
/// # Examples
/// ```no_run
/// use tachi_web::ConnectionData;
/// use std::collections::HashMap;
///
/// struct MyConnectionData {
///     user_id: Option<i32>,
///     request_count: usize,
///     cache: HashMap<usize, [u8; 4]>,
/// }
///
/// impl ConnectionData for MyConnectionData {
///     fn new() -> Self {
///         Self {
///             user_id: None,
///             request_count: 0,
///             cache: HashMap::new(),
///         }
///     }
///
///     fn reset(&mut self) {
///         self.user_id = None;
///         self.request_count = 0;
///         self.cache.clear(); // Saving the allocated memory
///     }
/// }
/// ```
///
/// Check out a [real-world example
/// ](https://github.com/tachi-web/tachi_web/blob/main/examples/request_counter.rs)
/// (well, almost)
pub trait ConnectionData: Sync + Send + 'static {
    /// Creates a new instance of user data.
    ///
    /// It is called once at server startup, which avoids runtime allocations.
    fn new() -> Self;

    /// Resets the internal state of the instance to its initial values.
    ///
    /// It is called after the connection is closed. Allows repeated
    /// use of the instance for the following connections. If implemented
    /// correctly, avoids any allocations.
    fn reset(&mut self);
}

impl ConnectionData for () {
    #[inline(always)]
    fn new() -> Self {}

    #[inline(always)]
    fn reset(&mut self) {}
}

/// A trait for filtering TCP connections before HTTP processing.
///
/// # Examples
///
/// Simple IP Blacklist:
/// ```
/// use std::{collections::HashSet, net::{SocketAddr, IpAddr}};
/// use tachi_web::{Server, ConnectionFilter, Response, Handled, StatusCode};
///
/// struct MyConnFilter {
///     blacklist: HashSet<IpAddr>
/// }
///
/// impl ConnectionFilter for MyConnFilter {
///     fn filter(
///         &self, client_addr: SocketAddr, _: SocketAddr, err_resp: &mut Response
///     ) -> Result<(), Handled> {
///         if self.blacklist.contains(&client_addr.ip()) {
///             Err(err_resp
///                 .status(StatusCode::Forbidden)
///                 .body("Your IP is permanently banned"))
///         } else {
///             Ok(())
///         }
///     }
/// }
/// ```
/// File-based IP blacklist:
/// ```
/// use std::net::SocketAddr;
/// use tachi_web::{Server, ConnectionFilter, Response, Handled, StatusCode};
///
/// # struct DatabaseClient;
/// #
/// # impl DatabaseClient {
/// #     async fn execute(&self, _: &str) -> Option<Vec<&str>> {
/// #         Some(vec!["true"])
/// #     }
/// # }
/// #
/// #
/// struct MyConnFilter {
///     db: DatabaseClient
/// }
///
/// impl ConnectionFilter for MyConnFilter {
///     fn filter(&self, _: SocketAddr, _: SocketAddr, _: &mut Response) -> Result<(), Handled> {
///         Ok(())
///     }
///
///     async fn filter_async(
///         &self,
///         client_addr: SocketAddr,
///         _: SocketAddr,
///         err_resp: &mut Response,
///     ) -> Result<(), Handled> {
///         let request = format!(
///             "SELECT EXISTS (SELECT 1 FROM ip_blacklist WHERE ip_address = '{}')",
///             client_addr.ip()
///         );
///
///         if self.db.execute(&request).await == Some(vec!["false"]) {
///             Ok(()) // IP not found in blacklist
///         } else {
///             Err(err_resp
///                 .status(StatusCode::Forbidden)
///                 .body("IP found in blacklist file"))
///         }
///     }
/// }
/// ```
/// Two-stage filtering with cache:
/// ```
/// use std::{collections::HashSet, sync::RwLock, net::{SocketAddr, IpAddr}};
/// use tachi_web::{Server, ConnectionFilter, Response, Handled, StatusCode};
///
/// # struct DatabaseClient;
/// #
/// # impl DatabaseClient {
/// #     async fn execute(&self, _: &str) -> Option<Vec<&str>> {
/// #         Some(vec!["true"])
/// #     }
/// # }
/// #
/// #
/// struct MyConnFilter {
///     cache: RwLock<HashSet<IpAddr>>,
///     db: DatabaseClient,
/// }
///
/// impl ConnectionFilter for MyConnFilter {
///     fn filter(
///         &self, client_addr: SocketAddr, _: SocketAddr, err_resp: &mut Response
///     ) -> Result<(), Handled> {
///         let Ok(guard) = self.cache.read() else {
///             return Err(err_resp.status(StatusCode::InternalServerError)
///                 .body("Internal server error"));
///         };
///
///         if guard.contains(&client_addr.ip()) {
///             Err(err_resp
///                 .status(StatusCode::Forbidden)
///                 .body("Your IP is permanently banned"))
///         } else {
///             Ok(())
///         }
///     }
///
///     async fn filter_async(
///         &self,
///         client_addr: SocketAddr,
///         _: SocketAddr,
///         err_resp: &mut Response,
///     ) -> Result<(), Handled> {
///         let request = format!(
///             "SELECT EXISTS (SELECT 1 FROM ip_blacklist WHERE ip_address = '{}')",
///             client_addr.ip()
///         );
///
///         if self.db.execute(&request).await == Some(vec!["false"]) {
///             Ok(()) // IP not found in blacklist
///         } else {
///             let Ok(mut guard) = self.cache.write() else {
///                 return Err(err_resp.status(StatusCode::InternalServerError)
///                     .body("Internal server error"));
///             };
///             guard.insert(client_addr.ip());
///
///             Err(err_resp
///                 .status(StatusCode::Forbidden)
///                 .body("IP found in blacklist file"))
///         }
///     }
/// }
/// ```
/// # Connection Filter Architecture
/// ```text
///                     [ QUEUE TCP_STREAM ]
///                              ||
/// /----------------------------||----------------------------------\
/// |                            || TCP_STREAM            Tokio Task |
/// |       /=====================/                                  |
/// |       \/                                                       |
/// |   [--------]   Err(Handled)   [----------------------]         |
/// |   [ filter ] ===============> [ Send `error_response`]         |
/// |   [--------]                  [----------------------]         |
/// |       ||                                 /\                    |
/// |       || Ok(())                          ||                    |
/// |       \/                Err(Handled)     ||                    |
/// |   [--------------] ========================/                   |
/// |   [ filter_async ]                             [-----------]   |
/// |   [--------------] ==========================> [  Handler  ]   |
/// |                             Ok(())             [-----------]   |
/// |                                                                |
/// \----------------------------------------------------------------/
/// ```
pub trait ConnectionFilter: Sync + Send + 'static {
    /// Synchronous connection validation.
    ///
    /// Perform fast, in-memory checks here. Expensive operations should be deferred
    /// to [`filter_async`](Self::filter_async).
    ///
    /// Use for:
    /// - IP blacklist/whitelist (in-memory cache)
    /// - Geographic IP restrictions
    /// - Rate limiting counters
    fn filter(
        &self,
        client_addr: SocketAddr,
        server_addr: SocketAddr,
        error_response: &mut Response,
    ) -> Result<(), Handled>;

    /// Asynchronous connection inspection.
    ///
    /// Called after [`filter`](Self::filter) succeeds.Executes asynchronously within
    /// the Tokio runtime.
    ///
    /// Use for:
    /// - Database lookups
    /// - External API calls
    /// - File system operations
    /// - Complex business logic
    /// - Machine learning inference
    fn filter_async(
        &self,
        #[allow(unused_variables)] client_addr: SocketAddr,
        #[allow(unused_variables)] server_addr: SocketAddr,
        #[allow(unused_variables)] error_response: &mut Response,
    ) -> impl Future<Output = Result<(), Handled>> + Send {
        async { Ok(()) }
    }
}

impl ConnectionFilter for () {
    fn filter(&self, _: SocketAddr, _: SocketAddr, _: &mut Response) -> Result<(), Handled> {
        Ok(())
    }
}

//
