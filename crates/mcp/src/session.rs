use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use crate::io::Lines;
use crate::proto::{
    CallToolResult, Incoming, InitializeResult, ListToolsResult, METHOD_NOT_FOUND,
    Notification, PROTOCOL_VERSION, Reply, Request, RpcError, ToolInfo,
};
use crate::{Error, ServerHandle};

const CLIENT_NAME: &str = "mcpdock";

/// How long a provider may take to exit by itself once its input is closed.
const CLOSE_GRACE: Duration = Duration::from_millis(200);

/// A live session with one tool-provider process.
///
/// The session owns the child process and, on unix, the process group it
/// leads, so launchers that run the real provider as a grandchild are
/// covered too. Dropping the session kills the group; [`Session::close`]
/// additionally gives the provider a chance to exit on its own and reaps it.
///
/// Requests are issued one at a time, so every method takes `&mut self`.
pub struct Session {
    label: String,
    child: Child,
    group: Option<u32>,
    stdin: Option<ChildStdin>,
    stdout: Lines<ChildStdout>,
    next_id: u64,
    server: Option<InitializeResult>,
}

impl Session {
    /// Starts the provider described by `handle`.
    ///
    /// No message is exchanged yet; call [`Session::initialize`] next.
    pub fn spawn(handle: &ServerHandle, label: &str) -> Result<Self, Error> {
        let mut command = Command::new(&handle.command);
        command
            .args(&handle.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if let Some(env) = &handle.env {
            command.envs(env);
        }

        let mut child = command.spawn().map_err(|err| {
            Error::spawn()
                .with_reason(format!("cannot start `{}`: {err}", handle.cmdline()))
        })?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take())
        else {
            return Err(
                Error::spawn().with_reason("standard streams are not available")
            );
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(label.to_owned(), stderr));
        }
        debug!("spawned `{}` (pid {:?})", handle.cmdline(), child.id());

        // The child leads a fresh group whose id is its own pid.
        let group = if cfg!(unix) { child.id() } else { None };
        Ok(Self {
            label: label.to_owned(),
            child,
            group,
            stdin: Some(stdin),
            stdout: Lines::new(stdout),
            next_id: 1,
            server: None,
        })
    }

    /// Returns the label given at spawn time.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the OS process id, if the process has not been reaped yet.
    #[inline]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Returns the provider's answer to `initialize`, once the handshake
    /// has completed.
    #[inline]
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Performs the session handshake.
    pub async fn initialize(&mut self) -> Result<&InitializeResult, Error> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = self.request("initialize", Some(params)).await?;
        let result: InitializeResult = decode("initialize", result)?;
        if result.protocol_version != PROTOCOL_VERSION {
            debug!("provider negotiated protocol {}", result.protocol_version);
        }
        self.send(&Notification::new("notifications/initialized"))
            .await?;
        Ok(&*self.server.insert(result))
    }

    /// Lists every tool the provider exposes, following pagination.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, Error> {
        let mut tools = vec![];
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|cursor| json!({ "cursor": cursor }));
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = decode("tools/list", result)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if next.is_empty() => break,
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(Error::protocol()
                        .with_reason("tools/list returned the same cursor twice"));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        trace!("provider exposes {} tools", tools.len());
        Ok(tools)
    }

    /// Calls a tool by name.
    ///
    /// A result flagged with `is_error` is returned as `Ok`; it is the tool's
    /// own answer, not a session failure.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, Error> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        decode("tools/call", result)
    }

    /// Shuts the provider down and reaps it.
    ///
    /// Whatever is left of the provider's process group afterwards is
    /// killed as well.
    pub async fn close(mut self) {
        // Closing stdin is the polite way to ask a provider to exit.
        drop(self.stdin.take());
        match timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("provider `{}` exited with {status}", self.label);
                self.kill_group();
                return;
            }
            Ok(Err(err)) => {
                warn!("failed to wait for provider `{}`: {err}", self.label);
            }
            Err(_) => {
                trace!("provider `{}` is still running, killing it", self.label);
            }
        }
        self.kill_group();
        if let Err(err) = self.child.kill().await {
            warn!("failed to kill provider `{}`: {err}", self.label);
        }
    }

    fn kill_group(&mut self) {
        if let Some(group) = self.group.take() {
            kill_group(group);
        }
    }

    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, Error> {
        let id = self.next_id;
        self.next_id += 1;
        trace!("request {id}: {method}");
        self.send(&Request::new(id, method, params)).await?;

        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(Error::closed().with_reason(format!(
                    "provider closed its output while waiting for `{method}`"
                )));
            };
            match Incoming::parse(&line)? {
                Incoming::Response {
                    id: resp_id,
                    outcome,
                } => {
                    if resp_id.as_u64() != Some(id) {
                        debug!("discarding response with unexpected id {resp_id}");
                        continue;
                    }
                    return outcome.map_err(|err| {
                        Error::rpc().with_reason(format!(
                            "`{method}` failed ({}): {}",
                            err.code, err.message
                        ))
                    });
                }
                Incoming::Request {
                    id: req_id,
                    method: req_method,
                } => {
                    self.answer(req_id, &req_method).await?;
                }
                Incoming::Notification { method, params } => {
                    trace!("notification {method}: {params:?}");
                }
            }
        }
    }

    async fn answer(&mut self, id: Value, method: &str) -> Result<(), Error> {
        let reply = if method == "ping" {
            Reply::result(id, json!({}))
        } else {
            debug!("rejecting provider request `{method}`");
            Reply::error(
                id,
                RpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("method not supported: {method}"),
                    data: None,
                },
            )
        };
        self.send(&reply).await
    }

    async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), Error> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(Error::closed().with_reason("input is already closed"));
        };
        let mut payload = serde_json::to_vec(message)
            .map_err(|err| Error::protocol().with_reason(format!("{err}")))?;
        payload.push(b'\n');

        let io_err = |err: std::io::Error| Error::io().with_reason(format!("{err}"));
        stdin.write_all(&payload).await.map_err(io_err)?;
        stdin.flush().await.map_err(io_err)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // `kill_on_drop` only reaches the direct child.
        self.kill_group();
    }
}

#[cfg(unix)]
fn kill_group(group: u32) {
    let Ok(group) = libc::pid_t::try_from(group) else {
        return;
    };
    // SAFETY: `kill` has no memory-safety preconditions. A negative pid
    // addresses every process in the group.
    if unsafe { libc::kill(-group, libc::SIGKILL) } == 0 {
        trace!("killed process group {group}");
    }
}

#[cfg(not(unix))]
fn kill_group(_group: u32) {}

#[inline]
fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|err| {
        Error::protocol().with_reason(format!("unexpected `{method}` result: {err}"))
    })
}

/// Logs the provider's diagnostics until the pipe closes.
///
/// Stderr is free-form, so bytes are decoded lossily. Stopping early would
/// close the pipe and kill the provider on its next write.
async fn drain_stderr(label: String, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim();
                if !line.is_empty() {
                    debug!("[{label}] {line}");
                }
            }
            Err(err) => {
                trace!("stopped reading stderr of `{label}`: {err}");
                break;
            }
        }
    }
}
