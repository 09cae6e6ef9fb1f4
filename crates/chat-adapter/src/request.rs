use std::fmt;

/// Fully described HTTP request produced by a provider adapter.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
    /// Whether the response is read incrementally.
    pub stream: bool,
}

impl RequestDescriptor {
    /// Creates a JSON `POST` request.
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            url: url.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body,
            stream: false,
        }
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Looks up a header value, ignoring ASCII case of the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialized request body.
    pub fn body_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.body).unwrap_or_default()
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.as_str(), "<redacted>")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .field("stream", &self.stream)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_credentials() {
        let request = RequestDescriptor::post_json("https://example.com", serde_json::json!({}))
            .bearer_auth("sk-secret");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(request.header_value("authorization"), Some("Bearer sk-secret"));
    }

    #[test]
    fn post_json_sets_content_type() {
        let request = RequestDescriptor::post_json("https://example.com", serde_json::json!({"a": 1}));
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(request.body_bytes(), br#"{"a":1}"#.to_vec());
        assert!(!request.stream);
    }
}
