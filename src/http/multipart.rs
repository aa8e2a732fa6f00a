//! `multipart/byteranges` body framing for multi-range responses

use hyper::body::Bytes;

/// Generate a random boundary token (32 hex characters)
pub fn generate_boundary() -> String {
    format!("{:016x}{:016x}", fastrand::u64(..), fastrand::u64(..))
}

/// `Content-Type` value announcing a multipart body with the given boundary
pub fn content_type(boundary: &str) -> String {
    format!("multipart/byteranges; boundary={boundary}")
}

/// Builds a `multipart/byteranges` body part by part
pub struct ByteRangesWriter {
    boundary: String,
    body: Vec<u8>,
}

impl ByteRangesWriter {
    pub fn new(boundary: String) -> Self {
        Self {
            boundary,
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Append one part with its own `Content-Type` and `Content-Range` headers
    pub fn add_part(&mut self, content_type: &str, content_range: &str, data: &[u8]) {
        if !self.body.is_empty() {
            self.body.extend_from_slice(b"\r\n");
        }
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self.body
            .extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        self.body
            .extend_from_slice(format!("Content-Range: {content_range}\r\n\r\n").as_bytes());
        self.body.extend_from_slice(data);
    }

    /// Write the closing delimiter and return the finished body
    pub fn finish(mut self) -> Bytes {
        if !self.body.is_empty() {
            self.body.extend_from_slice(b"\r\n");
        }
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"--\r\n");
        Bytes::from(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_shape() {
        let boundary = generate_boundary();
        assert_eq!(boundary.len(), 32);
        assert!(boundary.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(boundary, generate_boundary());
    }

    #[test]
    fn test_body_framing() {
        let mut writer = ByteRangesWriter::new("XYZ".to_string());
        writer.add_part("text/plain", "bytes 0-1/10", b"ab");
        writer.add_part("text/plain", "bytes 8-9/10", b"ij");
        let body = writer.finish();

        let expected = "--XYZ\r\n\
            Content-Type: text/plain\r\n\
            Content-Range: bytes 0-1/10\r\n\r\n\
            ab\r\n\
            --XYZ\r\n\
            Content-Type: text/plain\r\n\
            Content-Range: bytes 8-9/10\r\n\r\n\
            ij\r\n\
            --XYZ--\r\n";
        assert_eq!(body, Bytes::from(expected));
    }

    #[test]
    fn test_content_type_value() {
        assert_eq!(
            content_type("abc"),
            "multipart/byteranges; boundary=abc"
        );
    }
}
