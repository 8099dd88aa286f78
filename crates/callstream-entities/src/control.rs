//! Control API
//!
//! Request/reply surface for external clients: list calls, start/stop
//! interception, start/stop playback. The wire framing is one request per
//! line, whitespace-separated parts; replies are one line of parts, the
//! first being OK or NOK for the commands that can fail. Requests are
//! served strictly one at a time and handed to the media manager thread
//! over a channel.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;

use callstream_core::CallId;

/// Sentinel that makes every component loop exit
pub const TERM_SENTINEL: &str = "$TERM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    Ping(String),
    GetActiveCalls,
    StartCallInterception { call_id: CallId, format: String },
    StopCallInterception { call_id: CallId },
    StartPlayCall(PlayCallRequest),
    StopPlayCall(PlayCallRequest),
    Term,
}

/// Parameters shared by the two playback commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayCallRequest {
    pub db_id: u32,
    pub call_id: CallId,
    pub call_type: String,
    pub format: String,
    pub session: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ControlParseErr {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    BadNumber(&'static str, String),
}

impl std::fmt::Display for ControlParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty request"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command '{}'", cmd),
            Self::MissingArgument(name) => write!(f, "missing argument <{}>", name),
            Self::BadNumber(name, value) => write!(f, "argument <{}> is not a number: '{}'", name, value),
        }
    }
}

impl ControlRequest {
    /// Parse one request line into a command
    pub fn parse_line(line: &str) -> Result<Self, ControlParseErr> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or(ControlParseErr::Empty)?;

        fn arg<'a>(parts: &mut impl Iterator<Item = &'a str>, name: &'static str) -> Result<&'a str, ControlParseErr> {
            parts.next().ok_or(ControlParseErr::MissingArgument(name))
        }

        fn num<'a>(
            parts: &mut impl Iterator<Item = &'a str>,
            name: &'static str,
        ) -> Result<u32, ControlParseErr> {
            let raw = arg(parts, name)?;
            raw.parse().map_err(|_| ControlParseErr::BadNumber(name, raw.to_string()))
        }

        fn play_args<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<PlayCallRequest, ControlParseErr> {
            Ok(PlayCallRequest {
                db_id: num(parts, "db_id")?,
                call_id: num(parts, "call_id")?,
                call_type: arg(parts, "call_type")?.to_string(),
                format: arg(parts, "format")?.to_string(),
                session: arg(parts, "session")?.to_string(),
            })
        }

        match command {
            TERM_SENTINEL => Ok(Self::Term),
            "PING" => Ok(Self::Ping(arg(&mut parts, "echo")?.to_string())),
            "GET_ACTIVE_CALLS" => Ok(Self::GetActiveCalls),
            "START_CALL_INTERCEPTION" => Ok(Self::StartCallInterception {
                call_id: num(&mut parts, "call_id")?,
                format: arg(&mut parts, "format")?.to_string(),
            }),
            "STOP_CALL_INTERCEPTION" => Ok(Self::StopCallInterception {
                call_id: num(&mut parts, "call_id")?,
            }),
            "START_PLAY_CALL" => Ok(Self::StartPlayCall(play_args(&mut parts)?)),
            "STOP_PLAY_CALL" => Ok(Self::StopPlayCall(play_args(&mut parts)?)),
            other => Err(ControlParseErr::UnknownCommand(other.to_string())),
        }
    }
}

/// Reply as a sequence of parts, serialized space-separated on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlReply {
    pub parts: Vec<String>,
}

impl ControlReply {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self {
            parts: vec!["OK".to_string(), payload.into()],
        }
    }

    pub fn nok(reason: impl Into<String>) -> Self {
        Self {
            parts: vec!["NOK".to_string(), reason.into()],
        }
    }

    pub fn from_parts(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn is_ok(&self) -> bool {
        self.parts.first().map(|p| p == "OK").unwrap_or(false)
    }

    pub fn to_line(&self) -> String {
        self.parts.join(" ")
    }
}

/// A request paired with the channel its reply goes back on
pub type ControlHandover = (ControlRequest, Sender<ControlReply>);

/// TCP front-end of the control API. Owns nothing of the call state; every
/// parsed request is handed to the media manager and the reply relayed.
pub struct ControlListener {
    listener: TcpListener,
    request_sender: Sender<ControlHandover>,
}

impl ControlListener {
    /// Bind the listener endpoint. A failing bind is a startup error.
    pub fn bind(endpoint: SocketAddr, request_sender: Sender<ControlHandover>) -> io::Result<Self> {
        let listener = TcpListener::bind(endpoint)?;
        listener.set_nonblocking(true)?;
        tracing::info!("control API listening on tcp://{}", endpoint);
        Ok(Self {
            listener,
            request_sender,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept clients until `running` goes false, serving one request at a
    /// time. A client connection carries any number of request lines.
    pub fn run(&self, running: Arc<AtomicBool>) -> io::Result<()> {
        while running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!("control client connected: {}", peer);
                    if let Err(e) = self.serve_client(stream) {
                        tracing::warn!("control client {} failed: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    tracing::error!("accept failed: {}", e);
                }
            }
        }

        tracing::info!("control listener stopped");
        Ok(())
    }

    fn serve_client(&self, stream: std::net::TcpStream) -> io::Result<()> {
        // The accepted stream may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_secs(30)))?;
        let mut writer = stream.try_clone()?;
        let reader = BufReader::new(stream);

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!("control request: {}", line);

            let reply = match ControlRequest::parse_line(&line) {
                Ok(request) => self.dispatch(request),
                Err(e) => ControlReply::nok(format!("Invalid message: {}", e)),
            };

            writer.write_all(reply.to_line().as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Hand one request to the media manager and wait for its reply
    fn dispatch(&self, request: ControlRequest) -> ControlReply {
        let (reply_sender, reply_receiver) = crossbeam_channel::bounded(1);
        if self.request_sender.send((request, reply_sender)).is_err() {
            return ControlReply::nok("Server shutting down");
        }
        match reply_receiver.recv_timeout(Duration::from_secs(10)) {
            Ok(reply) => reply,
            Err(_) => ControlReply::nok("Request timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        assert_eq!(
            ControlRequest::parse_line("PING hello"),
            Ok(ControlRequest::Ping("hello".to_string()))
        );
    }

    #[test]
    fn test_parse_get_active_calls() {
        assert_eq!(
            ControlRequest::parse_line("GET_ACTIVE_CALLS"),
            Ok(ControlRequest::GetActiveCalls)
        );
    }

    #[test]
    fn test_parse_start_interception() {
        assert_eq!(
            ControlRequest::parse_line("START_CALL_INTERCEPTION 4242 mp3"),
            Ok(ControlRequest::StartCallInterception {
                call_id: 4242,
                format: "mp3".to_string()
            })
        );
    }

    #[test]
    fn test_parse_start_play_call() {
        assert_eq!(
            ControlRequest::parse_line("START_PLAY_CALL 17 4242 G wav f00dcafe"),
            Ok(ControlRequest::StartPlayCall(PlayCallRequest {
                db_id: 17,
                call_id: 4242,
                call_type: "G".to_string(),
                format: "wav".to_string(),
                session: "f00dcafe".to_string(),
            }))
        );
    }

    #[test]
    fn test_parse_term() {
        assert_eq!(ControlRequest::parse_line("$TERM"), Ok(ControlRequest::Term));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ControlRequest::parse_line("FROBNICATE"),
            Err(ControlParseErr::UnknownCommand(_))
        ));
        assert_eq!(
            ControlRequest::parse_line("STOP_CALL_INTERCEPTION"),
            Err(ControlParseErr::MissingArgument("call_id"))
        );
        assert!(matches!(
            ControlRequest::parse_line("START_CALL_INTERCEPTION twelve mp3"),
            Err(ControlParseErr::BadNumber("call_id", _))
        ));
    }

    #[test]
    fn test_reply_lines() {
        assert_eq!(ControlReply::ok("http://x/y.mp3").to_line(), "OK http://x/y.mp3");
        assert_eq!(
            ControlReply::nok("Feeder not available").to_line(),
            "NOK Feeder not available"
        );
        assert_eq!(
            ControlReply::from_parts(vec!["2".into(), "7".into(), "9".into()]).to_line(),
            "2 7 9"
        );
    }
}
