// mcpsh-client/src/client.rs
//
// Protocol client. Spawns the MCP server program and speaks JSON-RPC 2.0
// to it over its stdio pipes, one JSON object per line. A reader task owns
// the child's stdout: frames carrying an id are routed to the matching
// in-flight request, frames without one are server notifications and are
// forwarded on a channel so they can be shown the moment they arrive, even
// while a request is still pending.
use mcpsh_common::{
    CallToolParams, CallToolResult, ClientCapabilities, CompleteRequestParams, CompleteResult,
    EmptyResult, GetPromptParams, GetPromptResult, Implementation, InitializeParams,
    InitializeResult, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
    ListToolsResult, MCPError, MCPNotification, MCPRequest, MCPResponse, PaginatedParams,
    ReadResourceParams, ReadResourceResult, ServerCapabilities, ServerMessage, SetLevelParams,
    LATEST_MCP_VERSION,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CLIENT_NAME: &str = "mcpsh";
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// --- Errors ---

#[derive(Debug)]
pub enum ClientError {
    /// The channel itself failed: bad program path, spawn failure, broken
    /// pipes, handshake timeout, or the peer closing/corrupting the stream.
    /// Fatal when it happens during `connect`; afterwards it is reported
    /// per operation like any other failure.
    Connection(String),
    /// The peer reported a protocol-level error for one request. Never
    /// fatal; the session continues.
    Remote(MCPError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ClientError::Remote(err) => write!(f, "Server error {}: {}", err.code, err.message),
        }
    }
}

impl Error for ClientError {}

// --- Pending request map ---

type PendingMap = Arc<StdMutex<HashMap<u64, oneshot::Sender<MCPResponse>>>>;

// --- McpClient ---

pub struct McpClient {
    child: Child,
    stdin: Arc<Mutex<ChildStdin>>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    init: InitializeResult,
}

impl McpClient {
    /// Spawn the server program, wire its stdio pipes, and run the MCP
    /// `initialize` handshake. Returns the connected client and the channel
    /// on which unsolicited server notifications arrive.
    pub async fn connect(
        program: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MCPNotification>), ClientError> {
        let (command, args) = infer_server_command(program)?;

        let mut cmd = tokio::process::Command::new(&command);
        cmd.args(&args);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ClientError::Connection(format!("failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Connection("server stdin not available".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Connection("server stdout not available".to_string()))?;

        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(stdout, pending.clone(), notify_tx));

        let mut client = Self {
            child,
            stdin: Arc::new(Mutex::new(stdin)),
            pending,
            next_id: AtomicU64::new(1),
            reader,
            init: placeholder_init(),
        };

        client.initialize().await?;

        Ok((client, notify_rx))
    }

    // --- Handshake ---

    async fn initialize(&mut self) -> Result<(), ClientError> {
        let params = InitializeParams {
            protocol_version: LATEST_MCP_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let params = serde_json::to_value(params)
            .map_err(|e| ClientError::Connection(format!("serialize initialize params: {}", e)))?;

        let result = tokio::time::timeout(HANDSHAKE_TIMEOUT, self.request("initialize", Some(params)))
            .await
            .map_err(|_| ClientError::Connection("initialize handshake timed out".to_string()))?
            .map_err(|e| ClientError::Connection(format!("initialize failed: {}", e)))?;

        self.init = serde_json::from_value(result)
            .map_err(|e| ClientError::Connection(format!("invalid initialize result: {}", e)))?;
        debug!(
            server = %self.init.server_info.name,
            protocol = %self.init.protocol_version,
            "server initialized"
        );

        // Completes the handshake; the server may start pushing
        // notifications after this.
        self.notify("notifications/initialized", None).await?;

        Ok(())
    }

    // --- Wire primitives ---

    async fn write_line(&self, frame: &impl Serialize) -> Result<(), ClientError> {
        let mut line = serde_json::to_string(frame)
            .map_err(|e| ClientError::Connection(format!("serialize request: {}", e)))?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ClientError::Connection(format!("write to server stdin: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| ClientError::Connection(format!("flush server stdin: {}", e)))?;
        Ok(())
    }

    /// Send one request and wait for its response. There is deliberately no
    /// timeout here; see `notifications` handling in the repl for the
    /// operator's escape hatch.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let frame = MCPRequest {
            jsonrpc: mcpsh_common::default_jsonrpc(),
            id: json!(id),
            method: method.to_string(),
            params,
        };
        if let Err(e) = self.write_line(&frame).await {
            self.pending.lock().unwrap().remove(&id);
            return Err(e);
        }

        let response = rx
            .await
            .map_err(|_| ClientError::Connection("server closed the connection".to_string()))?;

        if let Some(error) = response.error {
            return Err(ClientError::Remote(error));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Fire-and-forget notification; no id, no response.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let frame = MCPNotification {
            jsonrpc: mcpsh_common::default_jsonrpc(),
            method: method.to_string(),
            params,
        };
        self.write_line(&frame).await
    }

    async fn typed_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let result = self.request(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::Connection(format!("invalid {} result: {}", method, e)))
    }

    fn some_params(params: &impl Serialize) -> Result<Option<Value>, ClientError> {
        let value = serde_json::to_value(params)
            .map_err(|e| ClientError::Connection(format!("serialize params: {}", e)))?;
        Ok(Some(value))
    }

    // --- Typed operations ---

    pub async fn ping(&self) -> Result<EmptyResult, ClientError> {
        self.typed_request("ping", None).await
    }

    pub async fn list_prompts(
        &self,
        params: PaginatedParams,
    ) -> Result<ListPromptsResult, ClientError> {
        self.typed_request("prompts/list", Self::some_params(&params)?).await
    }

    pub async fn get_prompt(&self, params: GetPromptParams) -> Result<GetPromptResult, ClientError> {
        self.typed_request("prompts/get", Self::some_params(&params)?).await
    }

    pub async fn list_resources(
        &self,
        params: PaginatedParams,
    ) -> Result<ListResourcesResult, ClientError> {
        self.typed_request("resources/list", Self::some_params(&params)?).await
    }

    pub async fn read_resource(
        &self,
        params: ReadResourceParams,
    ) -> Result<ReadResourceResult, ClientError> {
        self.typed_request("resources/read", Self::some_params(&params)?).await
    }

    pub async fn list_resource_templates(
        &self,
        params: PaginatedParams,
    ) -> Result<ListResourceTemplatesResult, ClientError> {
        self.typed_request("resources/templates/list", Self::some_params(&params)?)
            .await
    }

    pub async fn list_tools(&self, params: PaginatedParams) -> Result<ListToolsResult, ClientError> {
        self.typed_request("tools/list", Self::some_params(&params)?).await
    }

    pub async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, ClientError> {
        self.typed_request("tools/call", Self::some_params(&params)?).await
    }

    pub async fn complete(
        &self,
        params: CompleteRequestParams,
    ) -> Result<CompleteResult, ClientError> {
        self.typed_request("completion/complete", Self::some_params(&params)?)
            .await
    }

    pub async fn set_logging_level(&self, params: SetLevelParams) -> Result<EmptyResult, ClientError> {
        self.typed_request("logging/setLevel", Self::some_params(&params)?).await
    }

    // --- Accessors ---

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.init.capabilities
    }

    pub fn server_info(&self) -> &Implementation {
        &self.init.server_info
    }

    pub fn instructions(&self) -> Option<&str> {
        self.init.instructions.as_deref()
    }

    /// Tear the session down: stop the reader, close the child's stdin and
    /// kill the process. Callers must await this before exiting so the
    /// child is reaped.
    pub async fn shutdown(mut self) {
        self.reader.abort();
        drop(self.stdin);
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill server process: {}", e);
        }
    }
}

// --- Reader task ---

async fn read_loop(
    stdout: ChildStdout,
    pending: PendingMap,
    notify_tx: mpsc::UnboundedSender<MCPNotification>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF, server exited
            Err(e) => {
                warn!("read from server stdout: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ServerMessage>(&line) {
            Ok(ServerMessage::Response(response)) => route_response(&pending, response),
            Ok(ServerMessage::Notification(notification)) => {
                // Receiver gone means the repl already shut down.
                let _ = notify_tx.send(notification);
            }
            Err(e) => warn!("undecodable frame from server: {} ({})", line.trim(), e),
        }
    }

    // Dropping the senders fails every in-flight request with a
    // connection error instead of hanging it.
    pending.lock().unwrap().clear();
}

fn route_response(pending: &PendingMap, response: MCPResponse) {
    let id = match response.id.as_u64() {
        Some(id) => id,
        None => {
            warn!("response with non-numeric id {:?} dropped", response.id);
            return;
        }
    };
    match pending.lock().unwrap().remove(&id) {
        // Send fails when the requester was abandoned (operator interrupt);
        // the late response is discarded on purpose.
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => warn!("response for unknown request id {} dropped", id),
    }
}

// --- Helpers ---

// The server program is a script path; pick its interpreter the way the
// operator would: node for .js, python for .py.
fn infer_server_command(program: &str) -> Result<(String, Vec<String>), ClientError> {
    let command = if program.ends_with(".js") {
        "node"
    } else if program.ends_with(".py") {
        if cfg!(windows) { "python" } else { "python3" }
    } else {
        return Err(ClientError::Connection(
            "server program must be a .js or .py file".to_string(),
        ));
    };
    Ok((command.to_string(), vec![program.to_string()]))
}

fn placeholder_init() -> InitializeResult {
    InitializeResult {
        protocol_version: String::new(),
        capabilities: ServerCapabilities::default(),
        server_info: Implementation {
            name: String::new(),
            version: String::new(),
        },
        instructions: None,
        _meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_server_command() {
        let (command, args) = infer_server_command("server.js").unwrap();
        assert_eq!(command, "node");
        assert_eq!(args, vec!["server.js"]);

        let (command, args) = infer_server_command("weather/server.py").unwrap();
        assert_eq!(command, if cfg!(windows) { "python" } else { "python3" });
        assert_eq!(args, vec!["weather/server.py"]);

        assert!(infer_server_command("server.sh").is_err());
        assert!(infer_server_command("server").is_err());
    }

    #[test]
    fn test_route_response_discards_unknown_ids() {
        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();
        pending.lock().unwrap().insert(3, tx);

        // Unknown id: dropped without disturbing the pending entry.
        route_response(
            &pending,
            MCPResponse {
                jsonrpc: "2.0".to_string(),
                id: json!(99),
                result: Some(json!({})),
                error: None,
            },
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(pending.lock().unwrap().len(), 1);

        // Matching id: delivered and removed.
        route_response(
            &pending,
            MCPResponse {
                jsonrpc: "2.0".to_string(),
                id: json!(3),
                result: Some(json!({"ok": true})),
                error: None,
            },
        );
        let delivered = rx.try_recv().unwrap();
        assert_eq!(delivered.result, Some(json!({"ok": true})));
        assert!(pending.lock().unwrap().is_empty());
    }
}
