//! Blocking HTTP/1.1 byte source (minimal, built on std::net)

use super::source::{ByteSource, FetchError};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use url::Url;

/// Fetches paths relative to a base URL with blocking GET/HEAD requests.
/// Only status 200 counts as success.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    timeout: Duration,
}

/// Parsed response
struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpSource {
    /// Create a source resolving paths against `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidPath(format!("{}: {}", base_url, e)))?;
        if base.scheme() != "http" {
            return Err(FetchError::InvalidPath(format!(
                "{}: only http is supported",
                base_url
            )));
        }
        Ok(Self { base, timeout })
    }

    /// Base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::InvalidPath(format!("{}: {}", path, e)))
    }

    fn request(&self, method: &str, url: &Url) -> Result<HttpResponse, FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidPath(url.to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| FetchError::InvalidPath(format!("cannot resolve {}", host)))?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut request = format!("{} {} HTTP/1.1\r\n", method, target);
        request.push_str(&format!("Host: {}\r\n", host));
        request.push_str("Connection: close\r\n");
        request.push_str("\r\n");

        stream.write_all(request.as_bytes())?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);

        // Status line
        let mut status_line = String::new();
        reader.read_line(&mut status_line)?;
        let status = parse_status_line(&status_line)?;

        // Headers
        let mut content_length: Option<usize> = None;
        let mut chunked = false;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some(idx) = trimmed.find(':') {
                let key = trimmed[..idx].trim().to_lowercase();
                let val = trimmed[idx + 1..].trim();
                if key == "content-length" {
                    content_length = val.parse().ok();
                }
                if key == "transfer-encoding" && val.to_lowercase().contains("chunked") {
                    chunked = true;
                }
            }
        }

        // Body
        let body = if method == "HEAD" {
            Vec::new()
        } else if chunked {
            read_chunked_body(&mut reader)?
        } else if let Some(len) = content_length {
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            buf
        } else {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            buf
        };

        Ok(HttpResponse { status, body })
    }
}

impl ByteSource for HttpSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.resolve(path)?;
        log::debug!("GET {}", url);
        let response = self.request("GET", &url)?;
        if response.status != 200 {
            return Err(FetchError::Status {
                status: response.status,
                path: path.to_string(),
            });
        }
        Ok(response.body)
    }

    fn exists(&self, path: &str) -> bool {
        let Ok(url) = self.resolve(path) else {
            return false;
        };
        log::debug!("HEAD {}", url);
        match self.request("HEAD", &url) {
            Ok(response) => response.status == 200,
            Err(e) => {
                log::debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}

fn parse_status_line(line: &str) -> Result<u16, FetchError> {
    // HTTP/1.1 200 OK
    let parts: Vec<&str> = line.trim().splitn(3, ' ').collect();
    if parts.len() < 2 || !parts[0].starts_with("HTTP/") {
        return Err(FetchError::Protocol(format!(
            "invalid status line {:?}",
            line.trim()
        )));
    }
    parts[1]
        .parse()
        .map_err(|_| FetchError::Protocol(format!("invalid status code {:?}", parts[1])))
}

fn read_chunked_body<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size_str = size_line.trim().split(';').next().unwrap_or("");
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| FetchError::Protocol(format!("invalid chunk size {:?}", size_str)))?;
        if size == 0 {
            break;
        }
        let mut chunk = vec![0u8; size];
        reader.read_exact(&mut chunk)?;
        body.extend_from_slice(&chunk);
        // Trailing CRLF
        let mut crlf = String::new();
        reader.read_line(&mut crlf)?;
    }
    Ok(body)
}
