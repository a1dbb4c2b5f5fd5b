#![allow(dead_code)]

pub mod fixtures {
    use apiprimed::OpenApiSpec;
    use std::path::PathBuf;
    use std::sync::Arc;

    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    pub fn greet_yaml() -> PathBuf {
        fixture_path("greet_api.yaml")
    }

    pub fn greet_json() -> PathBuf {
        fixture_path("greet_api.json")
    }

    pub fn greet_spec() -> Arc<OpenApiSpec> {
        Arc::new(OpenApiSpec::from_path(greet_yaml()).unwrap())
    }
}

pub mod http_helpers {
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http::{Request, Response};
    use http_body_util::Full;
    use serde_json::Value;

    /// JSON request against the greeting server URL.
    pub fn json_request(method: &str, path_and_query: &str, body: &Value) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(format!("http://127.0.0.1:8080/api/v1{path_and_query}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    pub fn empty_request(method: &str, path_and_query: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(format!("http://127.0.0.1:8080/api/v1{path_and_query}"))
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    pub fn body_json(response: &Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }
}

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary file with the given extension.
    pub fn temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("apiprimed_spec_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
