//! RTSP/1.0 message model, grounded on `ParsedMessage.cpp`: header folding,
//! lowercased keys, a synthetic `"_"` key for the request/status line, and
//! semicolon-delimited attribute scanning within one header value.
use std::collections::BTreeMap;

use super::rtsp_error::RtspError;

/// One parsed RTSP request or response. Header keys are stored lowercased;
/// the request/status line is stored under the synthetic key `"_"`, exactly
/// as `ParsedMessage::mDict` does, so `find_string("_", ...)` round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Insertion-ordered would match the original more closely, but no
    /// caller depends on header order surviving a round trip (equality here
    /// is defined modulo header order and case), so a `BTreeMap` is used for
    /// O(log n) lookup and cheap iteration.
    headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Message {
    #[must_use]
    pub fn request(method: &str, uri: &str) -> Self {
        let mut m = Self {
            headers: BTreeMap::new(),
            body: Vec::new(),
        };
        m.headers
            .insert("_".to_string(), format!("{method} {uri} RTSP/1.0"));
        m
    }

    #[must_use]
    pub fn response(status_code: u32, reason: &str) -> Self {
        let mut m = Self {
            headers: BTreeMap::new(),
            body: Vec::new(),
        };
        m.headers
            .insert("_".to_string(), format!("RTSP/1.0 {status_code} {reason}"));
        m
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        let body = body.into();
        self.set_header("content-length", body.len().to_string());
        self.body = body;
        self
    }

    #[must_use]
    pub fn find_string(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn find_i32(&self, name: &str) -> Option<i32> {
        self.find_string(name)?.trim().parse().ok()
    }

    /// `ParsedMessage::getRequestField`: splits the `"_"` line on spaces and
    /// returns the `index`-th whitespace-delimited token.
    #[must_use]
    pub fn get_request_field(&self, index: usize) -> Option<&str> {
        self.find_string("_")?.split(' ').nth(index)
    }

    /// `ParsedMessage::getStatusCode`: token 1 of the status line, required
    /// to be in `100..=999`.
    #[must_use]
    pub fn get_status_code(&self) -> Option<u32> {
        let code: u32 = self.get_request_field(1)?.parse().ok()?;
        (100..=999).contains(&code).then_some(code)
    }

    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.get_request_field(0)
    }

    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.get_request_field(1)
    }

    /// `ParsedMessage::GetAttribute`: scans a semicolon-delimited header
    /// value for a `key=value` pair, trimming leading whitespace on each
    /// segment.
    #[must_use]
    pub fn get_attribute<'a>(value: &'a str, key: &str) -> Option<&'a str> {
        for segment in value.split(';') {
            let segment = segment.trim_start();
            if let Some(rest) = segment.strip_prefix(key) {
                if let Some(v) = rest.strip_prefix('=') {
                    return Some(v);
                }
            }
        }
        None
    }

    #[must_use]
    pub fn get_attribute_i32(value: &str, key: &str) -> Option<i32> {
        Self::get_attribute(value, key)?.trim().parse().ok()
    }

    /// Parses one complete message from `data`, returning the message and
    /// the number of bytes consumed. `RtspError::Incomplete` means more
    /// bytes must arrive before retrying -- mirrors
    /// `ParsedMessage::Parse`'s `noMoreData`-free contract.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), RtspError> {
        if data.is_empty() {
            return Err(RtspError::Incomplete);
        }

        let mut headers = BTreeMap::new();
        let mut offset = 0usize;
        let mut last_key: Option<String> = None;
        let mut first_line = true;

        loop {
            let Some(line_end) = find_crlf(data, offset) else {
                return Err(RtspError::Incomplete);
            };
            let line = &data[offset..line_end];

            if first_line {
                if line.is_empty() {
                    return Err(RtspError::BadStartLine);
                }
                headers.insert(
                    "_".to_string(),
                    String::from_utf8_lossy(line).into_owned(),
                );
                offset = line_end + 2;
                first_line = false;
                continue;
            }

            if line.is_empty() {
                offset = line_end + 2;
                break;
            }

            if line[0] == b' ' || line[0] == b'\t' {
                let Some(key) = &last_key else {
                    return Err(RtspError::MalformedHeader);
                };
                let cont = String::from_utf8_lossy(line);
                if let Some(existing) = headers.get_mut(key) {
                    existing.push_str(&cont);
                }
                offset = line_end + 2;
                continue;
            }

            let text = String::from_utf8_lossy(line);
            let Some(colon) = text.find(':') else {
                return Err(RtspError::MalformedHeader);
            };
            let key = text[..colon].trim().to_lowercase();
            let value = text[colon + 1..].trim().to_string();
            headers.insert(key.clone(), value);
            last_key = Some(key);
            offset = line_end + 2;
        }

        let content_length = headers
            .get("content-length")
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .map_err(|_| RtspError::BadContentLength)?
            .unwrap_or(0);

        let total_length = offset + content_length;
        if data.len() < total_length {
            return Err(RtspError::Incomplete);
        }

        let body = data[offset..total_length].to_vec();
        Ok((Self { headers, body }, total_length))
    }

    /// Serializes back to wire bytes: start line, headers (lowercased,
    /// `Title-Case` rendered for well-known names where the peer cares), an
    /// empty line, then the body.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(start) = self.headers.get("_") {
            out.extend_from_slice(start.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        for (key, value) in &self.headers {
            if key == "_" {
                continue;
            }
            out.extend_from_slice(render_header_name(key).as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

fn find_crlf(data: &[u8], from: usize) -> Option<usize> {
    data[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| from + p)
}

/// Renders a lowercased header key back to the conventional wire casing
/// (`content-length` -> `Content-Length`) for readability; peers are
/// required to treat header names case-insensitively, so this is cosmetic.
fn render_header_name(key: &str) -> String {
    key.split('-')
        .map(|part| {
            let mut c = part.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
