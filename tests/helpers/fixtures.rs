use axum::{
    body::Body,
    http::{Request, header},
};

const BOUNDARY: &str = "----bin-relay-test-boundary";

/// One part of a multipart form.
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content: Vec<u8>,
}

impl Part {
    pub fn file(filename: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: "file".into(),
            filename: Some(filename.into()),
            content: content.into(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content: value.as_bytes().to_vec(),
        }
    }
}

/// Encode `parts` as a `multipart/form-data` body.
pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match &part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Build a `POST /upload` request carrying `parts`.
pub fn upload_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Shorthand for a form holding a single `file` part.
pub fn file_upload(filename: &str, content: impl Into<Vec<u8>>) -> Request<Body> {
    upload_request(&[Part::file(filename, content)])
}

/// Deterministic binary payload of `len` bytes.
pub fn binary_payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
