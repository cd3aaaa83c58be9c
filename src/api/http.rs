use log::{debug, warn};
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};

use crate::errors::DashboardError;
use crate::vehicle_data::VehicleDataPage;

use super::{
    ChunkUpload, FINALIZE_UPLOAD_ENDPOINT, FinalizeUpload, LIST_ENDPOINT, ListQuery,
    UPLOAD_CHUNK_ENDPOINT, VehicleDataApi,
};

/// reqwest implementation of [`VehicleDataApi`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, DashboardError> {
        let client = Client::builder()
            .build()
            .map_err(|e| DashboardError::HttpClientError { source: e })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn check_status(endpoint: &str, response: Response) -> Result<Response, DashboardError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            warn!("{} responded with {}", endpoint, status);
            Err(DashboardError::BackendStatusError {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

impl VehicleDataApi for HttpBackend {
    async fn list(&self, query: &ListQuery) -> Result<VehicleDataPage, DashboardError> {
        let url = self.endpoint(LIST_ENDPOINT);
        debug!("GET {} {:?}", url, query.params());
        let response = self
            .client
            .get(&url)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| DashboardError::RequestError {
                endpoint: url.clone(),
                source: e,
            })?;
        Self::check_status(&url, response)?
            .json::<VehicleDataPage>()
            .await
            .map_err(|e| DashboardError::ResponseDecodeError {
                endpoint: url,
                source: e,
            })
    }

    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<(), DashboardError> {
        let url = self.endpoint(UPLOAD_CHUNK_ENDPOINT);
        debug!(
            "POST {} chunk {}/{} ({} bytes)",
            url,
            chunk.chunk_index + 1,
            chunk.total_chunks,
            chunk.data.len()
        );
        let form = Form::new()
            .part(
                "chunk",
                Part::bytes(chunk.data).file_name(chunk.file_name.clone()),
            )
            .text("file_name", chunk.file_name)
            .text("chunk_index", chunk.chunk_index.to_string())
            .text("total_chunks", chunk.total_chunks.to_string())
            .text("vehicle_id", chunk.vehicle_id);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DashboardError::RequestError {
                endpoint: url.clone(),
                source: e,
            })?;
        Self::check_status(&url, response)?;
        Ok(())
    }

    async fn finalize_upload(&self, request: &FinalizeUpload) -> Result<(), DashboardError> {
        let url = self.endpoint(FINALIZE_UPLOAD_ENDPOINT);
        debug!("POST {} {:?}", url, request);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| DashboardError::RequestError {
                endpoint: url.clone(),
                source: e,
            })?;
        Self::check_status(&url, response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Raw HTTP request as received by the socket.
    struct CapturedRequest {
        request_line: String,
        headers: String,
        body: Vec<u8>,
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    /// Accepts one connection, reads a full request and answers `200 OK`.
    async fn capture_one_request(listener: TcpListener) -> CapturedRequest {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 64 * 1024];
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = find(&raw, b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let (request_line, headers) = head.split_once("\r\n").unwrap();
        let headers = headers.to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse::<usize>().unwrap());

        match content_length {
            Some(len) => {
                while raw.len() < header_end + len {
                    let n = socket.read(&mut buf).await.unwrap();
                    assert!(n > 0, "connection closed before the body was complete");
                    raw.extend_from_slice(&buf[..n]);
                }
            }
            // chunked transfer encoding ends with an empty chunk
            None => {
                while !raw.ends_with(b"0\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    assert!(n > 0, "connection closed before the body was complete");
                    raw.extend_from_slice(&buf[..n]);
                }
            }
        }

        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        socket.flush().await.unwrap();

        CapturedRequest {
            request_line: request_line.to_string(),
            headers,
            body: raw[header_end..].to_vec(),
        }
    }

    async fn local_backend() -> (HttpBackend, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let backend = HttpBackend::new(&format!("http://{}/", addr)).unwrap();
        (backend, listener)
    }

    #[tokio::test]
    async fn test_chunk_is_sent_as_multipart_form() {
        let (backend, listener) = local_backend().await;
        let server = tokio::spawn(capture_one_request(listener));

        // not valid UTF-8, so a text part would mangle it
        let mut data = vec![0xffu8, 0x00, 0xfe, b'\n'];
        data.extend_from_slice(b"2024-03-01T10:00:00Z,42.0,1200.5,88,310.0,D\n");
        backend
            .upload_chunk(ChunkUpload {
                file_name: "truck-7.csv".to_string(),
                chunk_index: 2,
                total_chunks: 3,
                vehicle_id: "truck-7".to_string(),
                data: data.clone(),
            })
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert_eq!(request.request_line, "POST /vehicle_data/upload_chunk/ HTTP/1.1");
        assert!(request.headers.contains("content-type: multipart/form-data; boundary="));

        let body = &request.body;
        assert!(find(body, br#"name="chunk"; filename="truck-7.csv""#).is_some());
        assert!(find(body, &data).is_some());
        for (field, value) in [
            ("file_name", "truck-7.csv"),
            ("chunk_index", "2"),
            ("total_chunks", "3"),
            ("vehicle_id", "truck-7"),
        ] {
            let part = format!("name=\"{}\"\r\n\r\n{}\r\n", field, value);
            assert!(
                find(body, part.as_bytes()).is_some(),
                "missing form field {}",
                field
            );
        }
    }

    #[tokio::test]
    async fn test_finalize_is_sent_as_json() {
        let (backend, listener) = local_backend().await;
        let server = tokio::spawn(capture_one_request(listener));

        backend
            .finalize_upload(&FinalizeUpload {
                file_name: "truck-7.csv".to_string(),
                total_chunks: 3,
                vehicle_id: "truck-7".to_string(),
            })
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert_eq!(
            request.request_line,
            "POST /vehicle_data/finalize_upload/ HTTP/1.1"
        );
        assert!(request.headers.contains("content-type: application/json"));
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "file_name": "truck-7.csv",
                "total_chunks": 3,
                "vehicle_id": "truck-7",
            })
        );
    }

    #[test]
    fn test_endpoint_joining() {
        let backend = HttpBackend::new("http://localhost:8000/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(
            backend.endpoint(LIST_ENDPOINT),
            "http://localhost:8000/vehicle_data/"
        );

        let backend = HttpBackend::new("https://fleet.example.com/api").unwrap();
        assert_eq!(
            backend.endpoint(UPLOAD_CHUNK_ENDPOINT),
            "https://fleet.example.com/api/vehicle_data/upload_chunk/"
        );
        assert_eq!(
            backend.endpoint("/vehicle_data/finalize_upload/"),
            "https://fleet.example.com/api/vehicle_data/finalize_upload/"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_rejects() {
        // port 9 (discard) on localhost is not expected to accept connections
        let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
        let result = backend
            .finalize_upload(&FinalizeUpload {
                file_name: "a.csv".to_string(),
                total_chunks: 1,
                vehicle_id: "a".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(DashboardError::RequestError { .. })
        ));
    }
}
