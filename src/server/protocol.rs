//! HTTP/1.1 framing and JSON payloads for the lookup endpoint
//!
//! Only what a devtool `fetch` needs: one request per connection, a
//! `Content-Length` body, and a JSON reply with permissive CORS headers.

use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_HEAD_BYTES: u64 = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed request: {0}")]
    Malformed(String),
    #[error("Request body exceeds {} bytes", MAX_BODY_BYTES)]
    BodyTooLarge,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// JSON reply body, tagged by `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResponseBody {
    Success { path: String },
    NotFound,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Option<ResponseBody>,
}

impl HttpResponse {
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn json(status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            ResponseBody::Error {
                message: message.into(),
            },
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body = match &self.body {
            // Serializing a string-only enum cannot fail
            Some(body) => serde_json::to_vec(body).unwrap_or_default(),
            None => Vec::new(),
        };

        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n",
            self.status,
            reason_phrase(self.status)
        );
        if self.body.is_some() {
            head.push_str("Content-Type: application/json\r\n");
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        ));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&body);
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// Read one request: request line, headers, then exactly `Content-Length` bytes.
pub async fn read_request<R>(reader: &mut R) -> Result<HttpRequest, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = (&mut *reader).take(MAX_HEAD_BYTES);

    let mut request_line = String::new();
    if head.read_line(&mut request_line).await? == 0 {
        return Err(ProtocolError::Malformed("empty request".to_string()));
    }
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version)) if version.starts_with("HTTP/") => {
            (method.to_ascii_uppercase(), target)
        }
        _ => {
            return Err(ProtocolError::Malformed(format!(
                "bad request line {:?}",
                request_line.trim_end()
            )))
        }
    };
    let path = target.split('?').next().unwrap_or("/").to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if head.read_line(&mut line).await? == 0 {
            return Err(ProtocolError::Malformed("truncated headers".to_string()));
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::Malformed(format!("bad header {:?}", line)))?;
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|_| ProtocolError::Malformed(format!("bad Content-Length {:?}", value)))?;
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && !value.eq_ignore_ascii_case("identity")
        {
            return Err(ProtocolError::Malformed(format!(
                "unsupported Transfer-Encoding {:?}",
                value
            )));
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Err(ProtocolError::BodyTooLarge);
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(HttpRequest { method, path, body })
}
