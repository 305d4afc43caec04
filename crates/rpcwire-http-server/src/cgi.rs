//! CGI entry point.
//!
//! A non-empty stdin is the request body, percent-decoded before dispatch.
//! An empty stdin means the call is named by `QUERY_STRING`, following the
//! same rules as HTTP GET.

use std::env;
use std::io::{self, Read, Write};

use tracing::debug;

use rpcwire_json_rpc::{JsonRpcDispatcher, JsonRpcResponse, ResponseMessage, RpcError};

use crate::query::dispatch_query;

const CGI_HEADERS: &str = "Content-Type: application/json\nCache-Control: no-cache\nPragma: no-cache\n\n";

/// Serve one request from the CGI environment to stdout
pub fn handle_cgi_request(dispatcher: &JsonRpcDispatcher) -> io::Result<()> {
    let query = env::var("QUERY_STRING").ok();
    let stdin = io::stdin();
    let stdout = io::stdout();
    handle_cgi(dispatcher, stdin.lock(), query.as_deref(), stdout.lock())
}

/// Serve one request read from `input`, writing headers and body to `output`
pub fn handle_cgi<R, W>(
    dispatcher: &JsonRpcDispatcher,
    mut input: R,
    query: Option<&str>,
    mut output: W,
) -> io::Result<()>
where
    R: Read,
    W: Write,
{
    let mut body = Vec::new();
    input.read_to_end(&mut body)?;

    let reply = if body.is_empty() {
        match dispatch_query(dispatcher, query.unwrap_or("")) {
            Ok(reply) => reply,
            Err(err) => Some(error_reply(RpcError::invalid_request(err))),
        }
    } else {
        match String::from_utf8(body) {
            Ok(raw) => {
                let text = match urlencoding::decode(&raw) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => raw.clone(),
                };
                debug!("CGI request body: {}", text);
                dispatcher.dispatch(&text)
            }
            Err(_) => Some(error_reply(RpcError::parse_error(
                "request body is not valid UTF-8",
            ))),
        }
    };

    output.write_all(CGI_HEADERS.as_bytes())?;
    if let Some(reply) = reply {
        output.write_all(reply.as_bytes())?;
        output.write_all(b"\n")?;
    }
    output.flush()
}

fn error_reply(error: RpcError) -> String {
    ResponseMessage::from(JsonRpcResponse::error(None, error)).to_json_string()
}
