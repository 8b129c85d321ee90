//! Twitch chat client over IRC.
//!
//! Speaks just enough IRC to authenticate, join one channel, keep the
//! connection alive and post messages:
//!
//! ```text
//! PASS oauth:<token>
//! NICK <username>
//!                      <- :tmi.twitch.tv 001 <username> :Welcome, GLHF!
//! JOIN #<channel>
//! PRIVMSG #<channel> :<message>
//! ```
//!
//! `connect` returns only once the server has accepted the login. After that
//! a background task reads server lines, answers `PING` with `PONG`, and
//! opens a fresh session (with exponential backoff) whenever the server
//! closes the connection or asks for a `RECONNECT`. While reconnecting,
//! `say` fails with [`ChatError::NotConnected`].

use std::io;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::ports::{ChatError, ChatSender};

/// Connection settings for [`IrcChatClient`].
#[derive(Debug)]
pub struct IrcConnectionConfig {
    /// `host:port` of the chat server.
    pub server: String,
    /// Bot account login.
    pub username: String,
    /// Chat OAuth token, with or without the `oauth:` prefix.
    pub oauth_token: SecretString,
    /// Channel to join, `#`-prefixed.
    pub channel: String,
}

/// Timeouts and reconnect backoff.
#[derive(Debug, Clone, Copy)]
pub struct IrcTimings {
    /// Limit for opening the socket and for receiving the welcome.
    pub login_timeout: Duration,
    /// Limit for writing one line.
    pub write_timeout: Duration,
    /// First delay before reconnecting; doubles after each failure.
    pub reconnect_initial: Duration,
    /// Upper bound for the reconnect delay.
    pub reconnect_max: Duration,
}

impl Default for IrcTimings {
    fn default() -> Self {
        Self {
            login_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(60),
        }
    }
}

type ServerLines = Lines<BufReader<OwnedReadHalf>>;
type SharedWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// Chat client holding one IRC connection.
pub struct IrcChatClient {
    config: Arc<IrcConnectionConfig>,
    timings: IrcTimings,
    writer: SharedWriter,
}

impl IrcChatClient {
    pub fn new(config: IrcConnectionConfig) -> Self {
        Self::with_timings(config, IrcTimings::default())
    }

    pub fn with_timings(config: IrcConnectionConfig, timings: IrcTimings) -> Self {
        Self {
            config: Arc::new(config),
            timings,
            writer: Arc::new(Mutex::new(None)),
        }
    }

    /// Opens the connection, waits for the login to be accepted and joins the
    /// channel.
    ///
    /// Fails with [`ChatError::AuthenticationFailed`] when the server rejects
    /// the token, and with [`ChatError::Timeout`] when it never answers.
    /// Must be called from within a tokio runtime; it spawns the session task.
    pub async fn connect(&self) -> Result<(), ChatError> {
        let (lines, writer) = open_session(&self.config, &self.timings).await?;
        *self.writer.lock().await = Some(writer);

        tracing::info!(
            server = %self.config.server,
            channel = %self.config.channel,
            "Chat client is connected"
        );

        tokio::spawn(maintain_session(
            Arc::clone(&self.config),
            self.timings,
            Arc::downgrade(&self.writer),
            lines,
        ));
        Ok(())
    }
}

#[async_trait]
impl ChatSender for IrcChatClient {
    async fn say(&self, channel: &str, message: &str) -> Result<(), ChatError> {
        let line = privmsg_line(channel, message)?;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ChatError::NotConnected)?;
        write_line(writer, &line, self.timings.write_timeout).await
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Session lifecycle
// ════════════════════════════════════════════════════════════════════════════════

/// Why a session stopped reading.
enum SessionEnd {
    Closed,
    ReconnectRequested,
    Failed(ChatError),
    ClientDropped,
}

/// Connects, logs in and joins; returns the reader positioned after the welcome.
async fn open_session(
    config: &IrcConnectionConfig,
    timings: &IrcTimings,
) -> Result<(ServerLines, OwnedWriteHalf), ChatError> {
    let stream = tokio::time::timeout(timings.login_timeout, TcpStream::connect(&config.server))
        .await
        .map_err(|_| ChatError::Timeout)??;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let pass = pass_command(config.oauth_token.expose_secret());
    write_line(&mut writer, &pass, timings.write_timeout).await?;
    let nick = format!("NICK {}\r\n", config.username.to_lowercase());
    write_line(&mut writer, &nick, timings.write_timeout).await?;

    tokio::time::timeout(
        timings.login_timeout,
        await_welcome(&mut lines, &mut writer, timings.write_timeout),
    )
    .await
    .map_err(|_| ChatError::Timeout)??;

    let join = format!("JOIN {}\r\n", config.channel);
    write_line(&mut writer, &join, timings.write_timeout).await?;

    Ok((lines, writer))
}

async fn await_welcome(
    lines: &mut ServerLines,
    writer: &mut OwnedWriteHalf,
    write_timeout: Duration,
) -> Result<(), ChatError> {
    loop {
        let line = lines.next_line().await?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed during login")
        })?;

        match parse_server_line(&line) {
            ServerEvent::Welcome => return Ok(()),
            ServerEvent::Notice(text) if is_login_failure(text) => {
                return Err(ChatError::AuthenticationFailed(text.to_string()));
            }
            ServerEvent::Ping(pong) => write_line(writer, &pong, write_timeout).await?,
            _ => tracing::trace!(line = %line, "Chat server line during login"),
        }
    }
}

/// Reads the current session and reconnects whenever it ends.
///
/// Exits once the owning client has been dropped.
async fn maintain_session(
    config: Arc<IrcConnectionConfig>,
    timings: IrcTimings,
    writer: Weak<Mutex<Option<OwnedWriteHalf>>>,
    mut lines: ServerLines,
) {
    loop {
        let ended = read_session(&mut lines, &writer, timings.write_timeout).await;

        let Some(shared) = writer.upgrade() else {
            return;
        };
        *shared.lock().await = None;
        drop(shared);

        match ended {
            SessionEnd::Closed => tracing::warn!("Chat connection closed by server"),
            SessionEnd::ReconnectRequested => tracing::info!("Chat server requested reconnect"),
            SessionEnd::Failed(e) => tracing::warn!(error = %e, "Chat connection failed"),
            SessionEnd::ClientDropped => return,
        }

        match reconnect(&config, &timings, &writer).await {
            Some(next) => lines = next,
            None => return,
        }
    }
}

async fn read_session(
    lines: &mut ServerLines,
    writer: &Weak<Mutex<Option<OwnedWriteHalf>>>,
    write_timeout: Duration,
) -> SessionEnd {
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return SessionEnd::Closed,
            Err(e) => return SessionEnd::Failed(e.into()),
        };

        match parse_server_line(&line) {
            ServerEvent::Ping(pong) => {
                let Some(shared) = writer.upgrade() else {
                    return SessionEnd::ClientDropped;
                };
                let mut guard = shared.lock().await;
                if let Some(w) = guard.as_mut() {
                    if let Err(e) = write_line(w, &pong, write_timeout).await {
                        return SessionEnd::Failed(e);
                    }
                }
            }
            ServerEvent::Reconnect => return SessionEnd::ReconnectRequested,
            _ => tracing::trace!(line = %line, "Chat server line"),
        }
    }
}

/// Retries `open_session` with exponential backoff until it succeeds.
///
/// Returns `None` if the client is dropped while waiting.
async fn reconnect(
    config: &IrcConnectionConfig,
    timings: &IrcTimings,
    writer: &Weak<Mutex<Option<OwnedWriteHalf>>>,
) -> Option<ServerLines> {
    let mut delay = timings.reconnect_initial;

    loop {
        tokio::time::sleep(delay).await;

        let result = open_session(config, timings).await;
        let shared = writer.upgrade()?;

        match result {
            Ok((lines, w)) => {
                *shared.lock().await = Some(w);
                tracing::info!(channel = %config.channel, "Chat client reconnected");
                return Some(lines);
            }
            Err(e) => {
                delay = (delay * 2).min(timings.reconnect_max);
                tracing::warn!(error = %e, retry_in = ?delay, "Chat reconnect failed");
            }
        }
    }
}

async fn write_line(
    writer: &mut OwnedWriteHalf,
    line: &str,
    limit: Duration,
) -> Result<(), ChatError> {
    tokio::time::timeout(limit, async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| ChatError::Timeout)??;
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════════
// Protocol lines
// ════════════════════════════════════════════════════════════════════════════════

/// Server lines the client reacts to.
#[derive(Debug, PartialEq, Eq)]
enum ServerEvent<'a> {
    Welcome,
    /// Carries the ready-to-send `PONG` line.
    Ping(String),
    Reconnect,
    /// Notice text after the trailing `:`.
    Notice(&'a str),
    Other,
}

fn parse_server_line(line: &str) -> ServerEvent<'_> {
    let mut rest = line.trim_end();
    // Skip message tags and source prefix
    if rest.starts_with('@') {
        rest = rest.split_once(' ').map_or("", |(_, r)| r);
    }
    if rest.starts_with(':') {
        rest = rest.split_once(' ').map_or("", |(_, r)| r);
    }
    let (command, params) = rest.split_once(' ').unwrap_or((rest, ""));

    match command {
        "001" => ServerEvent::Welcome,
        "PING" if params.is_empty() => ServerEvent::Ping("PONG\r\n".to_string()),
        "PING" => ServerEvent::Ping(format!("PONG {}\r\n", params)),
        "RECONNECT" => ServerEvent::Reconnect,
        "NOTICE" => ServerEvent::Notice(params.split_once(" :").map_or(params, |(_, text)| text)),
        _ => ServerEvent::Other,
    }
}

fn is_login_failure(notice: &str) -> bool {
    notice.contains("Login authentication failed") || notice.contains("Improperly formatted auth")
}

/// Builds the `PASS` command, adding the `oauth:` prefix when absent.
fn pass_command(token: &str) -> String {
    if token.starts_with("oauth:") {
        format!("PASS {}\r\n", token)
    } else {
        format!("PASS oauth:{}\r\n", token)
    }
}

/// Builds a `PRIVMSG` line; line breaks in the message become spaces.
fn privmsg_line(channel: &str, message: &str) -> Result<String, ChatError> {
    if channel.len() < 2 || !channel.starts_with('#') || channel.contains(char::is_whitespace) {
        return Err(ChatError::InvalidChannel(channel.to_string()));
    }

    let message: String = message
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();

    Ok(format!("PRIVMSG {} :{}\r\n", channel, message))
}
