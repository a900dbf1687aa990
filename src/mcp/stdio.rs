//! MCP stdio server
//!
//! Reads newline-delimited JSON-RPC from a reader and writes responses to a
//! writer. The stdio connection is the session, so one `McpServer` serves every
//! line until EOF.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mcp::rpc::{json_rpc_error, PARSE_ERROR};
use crate::mcp::server::McpServer;
use crate::mcp::session::SessionObserver;

pub async fn serve<R, W>(
    reader: R,
    mut writer: W,
    observer: Arc<dyn SessionObserver>,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let exchange_id = Uuid::new_v4();
    observer.session_opened(exchange_id);
    let server = McpServer::new(exchange_id, observer.clone());

    let outcome = pump(&server, reader, &mut writer).await;

    observer.transport_closed(exchange_id);
    server.close();
    outcome
}

async fn pump<R, W>(server: &McpServer, reader: R, writer: &mut W) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| AppError::internal(format!("failed to read stdin: {err}")))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(payload) => server.handle_payload(payload),
            Err(err) => {
                debug!(error = %err, "unparseable stdio line");
                Some(json_rpc_error(None, PARSE_ERROR, "Parse error"))
            }
        };

        if let Some(response) = response {
            write_line(writer, &response).await?;
        }
    }

    Ok(())
}

async fn write_line<W>(writer: &mut W, response: &Value) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = response.to_string();
    encoded.push('\n');

    writer
        .write_all(encoded.as_bytes())
        .await
        .map_err(|err| AppError::internal(format!("failed to write stdout: {err}")))?;
    writer
        .flush()
        .await
        .map_err(|err| AppError::internal(format!("failed to flush stdout: {err}")))
}
