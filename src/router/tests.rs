use super::PathMatcher;

#[test]
fn test_root_path() {
    let m = PathMatcher::new("", "/").unwrap();
    assert!(m.matches("/").is_some());
    assert!(m.matches("/x").is_none());
    assert!(m.is_literal());
}

#[test]
fn test_parameterized_path() {
    let m = PathMatcher::new("", "/items/{id}").unwrap();
    let params = m.matches("/items/123").unwrap();
    assert_eq!(params["id"], "123");
    assert_eq!(m.param_names(), ["id".to_string()]);
    assert!(!m.is_literal());
    assert!(m.matches("/items/123/extra").is_none());
}

#[test]
fn test_nested_path() {
    let m = PathMatcher::new("", "/a/{b}/c").unwrap();
    assert_eq!(m.matches("/a/1/c").unwrap()["b"], "1");
    assert!(m.matches("/a/1/d").is_none());
}

#[test]
fn test_base_path_is_optional() {
    let m = PathMatcher::new("/api/v1/", "/greet/{lang}").unwrap();
    assert_eq!(m.matches("/api/v1/greet/en").unwrap()["lang"], "en");
    assert_eq!(m.matches("/greet/de").unwrap()["lang"], "de");
    assert!(m.matches("/api/v2/greet/en").is_none());
}

#[test]
fn test_literal_text_is_escaped() {
    let m = PathMatcher::new("", "/files/{name}.json").unwrap();
    assert_eq!(m.matches("/files/report.json").unwrap()["name"], "report");
    assert!(m.matches("/files/reportXjson").is_none());
}

#[test]
fn test_values_are_percent_decoded() {
    let m = PathMatcher::new("", "/users/{name}").unwrap();
    assert_eq!(m.matches("/users/jane%20doe").unwrap()["name"], "jane doe");
}

#[test]
fn test_template_accessor() {
    let m = PathMatcher::new("/v1", "/pets/{id}").unwrap();
    assert_eq!(m.template(), "/pets/{id}");
}

#[test]
fn test_route_miss_is_not_a_warning() {
    use super::OpenApiRouter;
    use crate::spec::{OpenApiSpec, SpecFormat};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let doc = r#"{"openapi": "3.0.3", "info": {"title": "t", "version": "1"},
        "paths": {"/health": {"get": {"responses": {"204": {"description": "ok"}}}}}}"#;
    let router = OpenApiRouter::new(Arc::new(OpenApiSpec::from_str(doc, SpecFormat::Json).unwrap()));

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        assert!(router.route(&http::Method::GET, "/missing").is_none());
    });

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(!output.contains("No route matched"), "{output}");
}
