use metadump::http::headers::{DEFAULT_USER_AGENT, Headers};
use metadump::http::request::{Method, Request};
use metadump::http::url::Url;
use metadump::http::writer::encode_request;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_method_tokens() {
    assert_eq!(Method::Get.as_str(), "GET");
    assert_eq!(Method::Post.as_str(), "POST");
    assert_eq!(Method::Put.as_str(), "PUT");

    assert_eq!(Method::from_token("PUT"), Some(Method::Put));
    assert_eq!(Method::from_token("get"), None);
    assert_eq!(Method::from_token("DELETE"), None);
}

#[test]
fn test_request_defaults() {
    let req = Request::post(url("http://collector:5500/frames"));

    assert_eq!(req.method(), Method::Post);
    assert_eq!(req.url().path(), "/frames");
    assert_eq!(req.header_map().get("user-agent"), Some(DEFAULT_USER_AGENT));
    assert!(req.follows_redirects());
}

#[test]
fn test_request_builder() {
    let req = Request::get(url("http://a/x"))
        .with_url(url("http://b/y"))
        .header("Accept", "application/json")
        .follow_redirects(false);

    assert_eq!(req.url().host(), "b");
    assert_eq!(req.header_map().get("accept"), Some("application/json"));
    assert!(!req.follows_redirects());
}

#[test]
fn test_headers_replace_and_add() {
    let mut custom = Headers::empty();
    custom.set("X-Camera", "front");

    let req = Request::put(url("http://h/")).headers(custom);
    assert_eq!(req.header_map().get("user-agent"), None);

    let req = req.add_headers(&Headers::new());
    assert_eq!(req.header_map().get("x-camera"), Some("front"));
    assert_eq!(req.header_map().get("user-agent"), Some(DEFAULT_USER_AGENT));
}

#[test]
fn test_encode_post_request() {
    let req = Request::post(url("http://collector:5500/api/frames?cam=0"));
    let wire = encode_request(&req);

    let expected = format!(
        "POST /api/frames?cam=0 HTTP/1.1\r\nhost: collector:5500\r\nuser-agent: {DEFAULT_USER_AGENT}\r\n\r\n"
    );
    assert_eq!(&wire[..], expected.as_bytes());
}

#[test]
fn test_encode_root_path() {
    let req = Request::get(url("http://collector")).header("Connection", "Keep-Alive");
    let wire = encode_request(&req);

    let expected = format!(
        "GET / HTTP/1.1\r\nconnection: Keep-Alive\r\nhost: collector\r\nuser-agent: {DEFAULT_USER_AGENT}\r\n\r\n"
    );
    assert_eq!(&wire[..], expected.as_bytes());
}
