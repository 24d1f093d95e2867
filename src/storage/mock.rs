//! Recording photo store for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::{PhotoHandle, PhotoStore};
use super::StoreError;

/// Scripted outcome for the next call of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Transient outage: retried by the workflow.
    Unavailable,
    /// Permanent rejection: not retried.
    Rejected,
}

impl MockFailure {
    fn into_error(self, op: &str) -> StoreError {
        match self {
            MockFailure::Unavailable => StoreError::Unavailable(format!("{op} unavailable")),
            MockFailure::Rejected => StoreError::Status {
                status: 403,
                body: format!("{op} rejected"),
            },
        }
    }
}

#[derive(Default)]
struct MockState {
    uploads: Vec<(String, usize)>,
    made_public: Vec<String>,
    upload_failures: VecDeque<MockFailure>,
    public_failures: VecDeque<MockFailure>,
}

/// Keeps every upload in memory and hands out `mock://` URLs.
#[derive(Default)]
pub struct MockPhotoStore {
    state: Mutex<MockState>,
}

impl MockPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue failures for the next uploads, consumed in order.
    pub fn fail_uploads(self, failures: impl IntoIterator<Item = MockFailure>) -> Self {
        self.with_state(|s| s.upload_failures.extend(failures));
        self
    }

    /// Queue failures for the next permission grants, consumed in order.
    pub fn fail_make_public(self, failures: impl IntoIterator<Item = MockFailure>) -> Self {
        self.with_state(|s| s.public_failures.extend(failures));
        self
    }

    /// `(file name, byte count)` of every successful upload.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.with_state(|s| s.uploads.clone())
    }

    /// File ids that were made public.
    pub fn made_public(&self) -> Vec<String> {
        self.with_state(|s| s.made_public.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl PhotoStore for MockPhotoStore {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<PhotoHandle, StoreError> {
        self.with_state(|s| {
            if let Some(failure) = s.upload_failures.pop_front() {
                return Err(failure.into_error("upload"));
            }
            s.uploads.push((file_name.to_string(), bytes.len()));
            Ok(PhotoHandle {
                file_id: format!("mock-{}", s.uploads.len()),
                name: file_name.to_string(),
            })
        })
    }

    fn make_public(&self, handle: &PhotoHandle) -> Result<String, StoreError> {
        self.with_state(|s| {
            if let Some(failure) = s.public_failures.pop_front() {
                return Err(failure.into_error("permission"));
            }
            s.made_public.push(handle.file_id.clone());
            Ok(format!("mock://photos/{}", handle.file_id))
        })
    }
}

/// Minimal HTTP/1.1 server answering a fixed sequence of requests, used to
/// exercise the blocking HTTP clients without network access.
#[cfg(test)]
pub(crate) mod http_stub {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;

    #[derive(Debug, Clone)]
    pub(crate) struct RecordedRequest {
        pub method: String,
        pub path: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RecordedRequest {
        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    pub(crate) struct StubServer {
        pub base_url: String,
        handle: JoinHandle<Vec<RecordedRequest>>,
    }

    impl StubServer {
        /// Wait for every scripted response to be served.
        pub(crate) fn finish(self) -> Vec<RecordedRequest> {
            self.handle.join().unwrap()
        }
    }

    pub(crate) fn serve(responses: Vec<(u16, String)>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut recorded = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                recorded.push(read_request(&mut stream));
                let reply = format!(
                    "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            recorded
        });
        StubServer { base_url, handle }
    }

    fn read_request(stream: &mut TcpStream) -> RecordedRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next().unwrap_or_default().to_string();
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let content_length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        RecordedRequest {
            method,
            path,
            headers,
            body: buf[header_end..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_uploads_and_hands_out_ids() {
        let store = MockPhotoStore::new();
        let handle = store.upload(b"jpeg", "eggs_20250101_000000.jpg").unwrap();
        assert_eq!(handle.file_id, "mock-1");
        assert_eq!(store.make_public(&handle).unwrap(), "mock://photos/mock-1");
        assert_eq!(store.uploads(), vec![("eggs_20250101_000000.jpg".to_string(), 4)]);
        assert_eq!(store.made_public(), vec!["mock-1".to_string()]);
    }

    #[test]
    fn scripted_failures_are_consumed_in_order() {
        let store = MockPhotoStore::new().fail_uploads([MockFailure::Unavailable, MockFailure::Rejected]);
        assert!(store.upload(b"a", "a.jpg").unwrap_err().is_transient());
        assert!(!store.upload(b"a", "a.jpg").unwrap_err().is_transient());
        assert!(store.upload(b"a", "a.jpg").is_ok());
        assert_eq!(store.uploads().len(), 1);
    }
}
