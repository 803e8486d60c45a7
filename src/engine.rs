//! The pass_persist protocol engine.
//!
//! A line-oriented request/response state machine: the master agent writes
//! commands on our stdin and reads frames from our stdout. The engine is
//! generic over the reader/writer pair so tests can drive it over in-memory
//! buffers; the daemon wires it to stdin/stdout.
//!
//! Inbound grammar:
//!
//! ```text
//! PING                         -> PONG
//! get\n<oid>                   -> <oid>\n<TYPE>\n<value>   | error code
//! getnext\n<oid>               -> <oid>\n<TYPE>\n<value>   | no-such-name
//! set\n<oid>\n<TYPE> <value>   -> <oid>\n<TYPE>\n<value>   | error code
//! (empty line or EOF)          -> daemon exits
//! ```
//!
//! Output is flushed after every response; the master agent deadlocks
//! otherwise.

use crate::error::Result;
use crate::mib::AccessMode;
use crate::oid::Oid;
use crate::scheduler::EventMode;
use crate::state::SharedState;
use crate::value::TypeTag;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The single-line reply codes. Case is exact; these five tokens are the
/// whole error vocabulary the master agent ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    NoSuchName,
    NoAccess,
    ReadOnly,
    WrongType,
    CommitFailed,
}

impl ReplyCode {
    /// The wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyCode::NoSuchName => "no-such-name",
            ReplyCode::NoAccess => "no-access",
            ReplyCode::ReadOnly => "read-only",
            ReplyCode::WrongType => "wrong-type",
            ReplyCode::CommitFailed => "commit-failed",
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one request: either a three-line frame or a single-line code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Frame {
        oid: String,
        tag: TypeTag,
        value: String,
    },
    Code(ReplyCode),
}

impl Response {
    fn frame(oid: &Oid, tag: TypeTag, value: String) -> Self {
        Response::Frame {
            oid: oid.to_string(),
            tag,
            value,
        }
    }

    /// Render the response as wire lines, each `\n`-terminated.
    pub fn render(&self) -> String {
        match self {
            Response::Frame { oid, tag, value } => format!("{oid}\n{tag}\n{value}\n"),
            Response::Code(code) => format!("{code}\n"),
        }
    }
}

/// The protocol engine.
///
/// Holds the shared state mutex across each complete
/// lookup-mutate-event sequence, so the scheduler task never observes a
/// half-applied request.
pub struct Engine {
    state: Arc<Mutex<SharedState>>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(state: Arc<Mutex<SharedState>>, cancel: CancellationToken) -> Self {
        Self { state, cancel }
    }

    /// Drive the request/response loop until EOF or an empty command line.
    ///
    /// Cancels the shutdown token on exit so the scheduler task stops too.
    pub async fn run<R, W>(&self, mut input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let Some(command) = read_frame_line(&mut input).await? else {
                break;
            };
            if command.is_empty() {
                break;
            }

            match command.as_str() {
                "PING" => {
                    output.write_all(b"PONG\n").await?;
                    output.flush().await?;
                }
                "get" | "getnext" => {
                    let Some(requested) = read_frame_line(&mut input).await? else {
                        break;
                    };
                    tracing::info!(target: "mibward::engine",
                        { oid = %requested, command = %command }, "request received");
                    let response = if command == "get" {
                        self.get(&requested).await
                    } else {
                        self.get_next(&requested).await
                    };
                    output.write_all(response.render().as_bytes()).await?;
                    output.flush().await?;
                }
                "set" => {
                    let Some(requested) = read_frame_line(&mut input).await? else {
                        break;
                    };
                    let Some(params) = read_frame_line(&mut input).await? else {
                        break;
                    };
                    let Some((datatype, value)) = split_set_params(&params) else {
                        tracing::error!(target: "mibward::engine",
                            { oid = %requested }, "invalid SET parameters");
                        continue;
                    };
                    tracing::info!(target: "mibward::engine",
                        { oid = %requested, datatype = %datatype, value = %value },
                        "SET received");
                    let response = self.set(&requested, datatype, value).await;
                    output.write_all(response.render().as_bytes()).await?;
                    output.flush().await?;
                }
                other => {
                    tracing::debug!(target: "mibward::engine",
                        { command = %other }, "ignoring unknown command");
                }
            }
        }

        self.cancel.cancel();
        Ok(())
    }

    /// GET: exact lookup, access check, GET event, frame.
    pub async fn get(&self, requested: &str) -> Response {
        let Ok(oid) = Oid::parse(requested) else {
            tracing::warn!(target: "mibward::engine",
                { oid = %requested }, "malformed OID in GET");
            return Response::Code(ReplyCode::NoSuchName);
        };

        let st = self.state.lock().await;
        let Some(entry) = st.mib.get(&oid) else {
            tracing::warn!(target: "mibward::engine",
                { oid = %oid }, "OID does not exist");
            return Response::Code(ReplyCode::NoSuchName);
        };
        if entry.access() == AccessMode::NotAccessible {
            tracing::warn!(target: "mibward::engine",
                { oid = %oid }, "OID is NOT-ACCESSIBLE");
            return Response::Code(ReplyCode::NoAccess);
        }

        // the hook observes the value that is about to be returned
        let value = entry.printable();
        let tag = entry.tag();
        st.scheduler
            .fetch_and_exec(&oid, EventMode::Get, Some(&value))
            .await;

        Response::frame(&oid, tag, value)
    }

    /// GETNEXT: walk the lexicographic successors, skipping NOT_ACCESSIBLE
    /// entries, and answer with the first visible one.
    ///
    /// The GET event fires for the OID actually being returned, not the
    /// requested starting point.
    pub async fn get_next(&self, requested: &str) -> Response {
        let Ok(start) = Oid::parse(requested) else {
            tracing::warn!(target: "mibward::engine",
                { oid = %requested }, "malformed OID in GETNEXT");
            return Response::Code(ReplyCode::NoSuchName);
        };

        let st = self.state.lock().await;
        let mut cursor = start;
        loop {
            let Some(next) = st.mib.next_after(&cursor) else {
                return Response::Code(ReplyCode::NoSuchName);
            };
            let next = next.clone();
            let Some(entry) = st.mib.get(&next) else {
                return Response::Code(ReplyCode::NoSuchName);
            };
            if entry.access() == AccessMode::NotAccessible {
                cursor = next;
                continue;
            }

            let value = entry.printable();
            let tag = entry.tag();
            st.scheduler
                .fetch_and_exec(&next, EventMode::Get, Some(&value))
                .await;

            return Response::frame(&next, tag, value);
        }
    }

    /// SET: update an existing READ_WRITE entry, or provision a table row
    /// under a SEQUENCE parent when the OID does not exist yet.
    pub async fn set(&self, requested: &str, datatype: &str, value: &str) -> Response {
        let Ok(oid) = Oid::parse(requested) else {
            tracing::warn!(target: "mibward::engine",
                { oid = %requested }, "malformed OID in SET");
            return Response::Code(ReplyCode::NoSuchName);
        };
        let datatype = datatype.to_ascii_uppercase();

        let mut st = self.state.lock().await;
        let state = &mut *st;

        if state.mib.get(&oid).is_none() {
            return Self::set_create_row(state, &oid, &datatype, value).await;
        }

        // regular flow: the OID exists
        let entry = match state.mib.get_mut(&oid) {
            Some(entry) => entry,
            None => return Response::Code(ReplyCode::NoSuchName),
        };
        if entry.access() != AccessMode::ReadWrite {
            tracing::warn!(target: "mibward::engine",
                { oid = %oid }, "OID is not READWRITE");
            return Response::Code(ReplyCode::ReadOnly);
        }
        let expected = entry.tag();
        match TypeTag::parse(&datatype) {
            Ok(tag) if tag == expected => {}
            _ => {
                tracing::warn!(target: "mibward::engine",
                    { oid = %oid, expected = %expected, got = %datatype },
                    "wrong type in SET");
                return Response::Code(ReplyCode::WrongType);
            }
        }

        if let Err(e) = entry.set_value(&state.store, value) {
            tracing::error!(target: "mibward::engine",
                { oid = %oid, error = %e }, "unable to set value");
            return Response::Code(ReplyCode::CommitFailed);
        }
        let response = Response::frame(&oid, expected, entry.printable());

        state
            .scheduler
            .fetch_and_exec(&oid, EventMode::Set, Some(value))
            .await;

        response
    }

    /// The table-row provisioning half of SET.
    ///
    /// The SET event fires on the parent OID: the row template is what the
    /// operator scheduled commands against, the child did not exist until
    /// this very request.
    async fn set_create_row(
        state: &mut SharedState,
        oid: &Oid,
        datatype: &str,
        value: &str,
    ) -> Response {
        let parent = match oid.parent() {
            Some(parent) if !parent.is_empty() => parent,
            _ => {
                tracing::warn!(target: "mibward::engine",
                    { oid = %oid }, "OID does not exist");
                return Response::Code(ReplyCode::NoSuchName);
            }
        };
        if !state.mib.is_table_child(&parent) {
            tracing::warn!(target: "mibward::engine",
                { oid = %oid }, "OID does not exist and parent is not a table");
            return Response::Code(ReplyCode::NoSuchName);
        }

        // is_table_child just proved the parent exists
        let access = match state.mib.get(&parent) {
            Some(parent_entry) => parent_entry.access(),
            None => return Response::Code(ReplyCode::NoSuchName),
        };
        if access != AccessMode::ReadCreate && access != AccessMode::ReadWrite {
            tracing::warn!(target: "mibward::engine",
                { oid = %parent }, "table is not at least READCREATE");
            return Response::Code(ReplyCode::ReadOnly);
        }

        let Ok(tag) = TypeTag::parse(datatype) else {
            tracing::warn!(target: "mibward::engine",
                { oid = %oid, got = %datatype }, "unknown type in row creation");
            return Response::Code(ReplyCode::WrongType);
        };

        if let Err(e) = state.mib.create_child(&state.store, &parent, oid, tag, value) {
            tracing::error!(target: "mibward::engine",
                { oid = %oid, error = %e }, "unable to create table row");
            return Response::Code(ReplyCode::CommitFailed);
        }
        let response = match state.mib.get(oid) {
            Some(child) => Response::frame(oid, child.tag(), child.printable()),
            None => return Response::Code(ReplyCode::CommitFailed),
        };

        state
            .scheduler
            .fetch_and_exec(&parent, EventMode::Set, Some(value))
            .await;

        response
    }
}

/// Split the SET parameter line into datatype and value.
///
/// The line is `TYPE VALUE`, space-separated, but two tags carry an embedded
/// space themselves; those are matched first so `OCTET STRING foo` parses as
/// (`OCTET STRING`, `foo`) and not (`OCTET`, `STRING foo`).
fn split_set_params(params: &str) -> Option<(&str, &str)> {
    for tag in ["OCTET STRING", "OBJECT IDENTIFIER"] {
        if params.len() > tag.len()
            && params.as_bytes()[tag.len()] == b' '
            && params[..tag.len()].eq_ignore_ascii_case(tag)
        {
            return Some((&params[..tag.len()], &params[tag.len() + 1..]));
        }
    }
    params.split_once(' ')
}

/// Read one protocol line, without its terminator. `None` means EOF.
async fn read_frame_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_code_tokens() {
        assert_eq!(ReplyCode::NoSuchName.to_string(), "no-such-name");
        assert_eq!(ReplyCode::NoAccess.to_string(), "no-access");
        assert_eq!(ReplyCode::ReadOnly.to_string(), "read-only");
        assert_eq!(ReplyCode::WrongType.to_string(), "wrong-type");
        assert_eq!(ReplyCode::CommitFailed.to_string(), "commit-failed");
    }

    #[test]
    fn test_split_set_params() {
        assert_eq!(split_set_params("INTEGER 42"), Some(("INTEGER", "42")));
        assert_eq!(
            split_set_params("OCTET STRING hello world"),
            Some(("OCTET STRING", "hello world"))
        );
        assert_eq!(
            split_set_params("octet string lower"),
            Some(("octet string", "lower"))
        );
        assert_eq!(
            split_set_params("OBJECT IDENTIFIER 1.3.6.1"),
            Some(("OBJECT IDENTIFIER", "1.3.6.1"))
        );
        // an empty value after a known tag still splits
        assert_eq!(split_set_params("OCTET STRING "), Some(("OCTET STRING", "")));
        assert_eq!(split_set_params("INTEGER"), None);
    }

    #[test]
    fn test_response_render() {
        let frame = Response::Frame {
            oid: "1.3.6.1".to_string(),
            tag: TypeTag::Integer,
            value: "5".to_string(),
        };
        assert_eq!(frame.render(), "1.3.6.1\nINTEGER\n5\n");

        let code = Response::Code(ReplyCode::NoSuchName);
        assert_eq!(code.render(), "no-such-name\n");
    }
}
