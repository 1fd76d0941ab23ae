use std::io::Write;

use http::{Method, StatusCode};

use super::scenario::Scenario;
use crate::Error;

const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

#[test]
fn buffered_body_gets_content_length() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_content_type("text/plain").unwrap();

    let stream = s.request.request_stream().unwrap();
    assert!(stream.is_buffered());
    stream.write_all(b"hel").unwrap();
    stream.write_all(b"lo").unwrap();

    // Nothing goes out before the length is known.
    assert_eq!(s.sent(0), "");

    let res = s.request.get_response().unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(
        s.sent(0),
        "POST /u HTTP/1.1\r\n\
        Host: f.test\r\n\
        User-Agent: test-agent\r\n\
        Content-Type: text/plain\r\n\
        Content-Length: 5\r\n\
        \r\n\
        hello"
    );
}

#[test]
fn put_without_body() {
    let mut s = Scenario::builder().put("http://f.test/u").reply(OK).build();
    s.request.get_response().unwrap();
    assert!(s.sent(0).starts_with("PUT /u HTTP/1.1\r\n"));
    assert!(s.sent(0).ends_with("Content-Length: 0\r\n\r\n"));
}

#[test]
fn declared_length_writes_through() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_content_length(5).unwrap();

    let stream = s.request.request_stream().unwrap();
    assert!(!stream.is_buffered());

    let head = s.sent(0);
    assert!(head.contains("Content-Length: 5\r\n"));
    assert!(head.ends_with("\r\n\r\n"));

    let stream = s.request.request_stream().unwrap();
    stream.write_all(b"hello").unwrap();
    assert!(s.sent(0).ends_with("\r\n\r\nhello"));

    s.request.get_response().unwrap();
    assert_eq!(s.connects().len(), 1);
}

#[test]
fn declared_length_is_a_cap() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_content_length(3).unwrap();

    let stream = s.request.request_stream().unwrap();
    let err = stream.write_all(b"hello").unwrap_err();
    assert!(matches!(Error::from(err), Error::BodyLargerThanContentLength));
}

#[test]
fn declared_length_not_reached() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_content_length(5).unwrap();
    s.request.request_stream().unwrap().write_all(b"hi").unwrap();

    let err = s.request.get_response().unwrap_err();
    assert!(matches!(err, Error::BodySmallerThanContentLength(3)));
}

#[test]
fn short_body_ends_the_request() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_content_length(5).unwrap();
    s.request.request_stream().unwrap().write_all(b"hi").unwrap();

    let err = s.request.get_response().unwrap_err();
    assert!(matches!(err, Error::BodySmallerThanContentLength(3)));

    assert!(matches!(s.request.get_response(), Err(Error::RequestFailed)));
    assert!(matches!(s.request.request_stream(), Err(Error::RequestFailed)));

    assert_eq!(s.connects(), vec!["f.test:80"]);
    assert_eq!(s.sent(0).matches("POST /u HTTP/1.1\r\n").count(), 1);
}

#[test]
fn chunked_body() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_send_chunked(true).unwrap();
    s.request.set_transfer_encoding("gzip").unwrap();

    let stream = s.request.request_stream().unwrap();
    stream.write_all(b"hello").unwrap();
    stream.write_all(b"").unwrap();
    stream.write_all(b", world").unwrap();

    s.request.get_response().unwrap();

    let sent = s.sent(0);
    assert!(sent.contains("Transfer-Encoding: gzip, chunked\r\n"));
    assert!(!sent.contains("Content-Length"));
    assert!(sent.ends_with("\r\n\r\n5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"));
}

#[test]
fn transfer_codings_need_a_chunked_body() {
    let mut s = Scenario::builder().reply(OK).build();
    s.request.set_send_chunked(true).unwrap();
    s.request.set_transfer_encoding("gzip").unwrap();

    s.request.get_response().unwrap();

    let sent = s.sent(0);
    assert!(sent.starts_with("GET / HTTP/1.1\r\n"));
    assert!(!sent.contains("Transfer-Encoding"));
    assert!(sent.ends_with("\r\n\r\n"));
}

#[test]
fn unknown_length_without_buffering() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.set_allow_write_stream_buffering(false).unwrap();

    let err = s.request.request_stream().unwrap_err();
    assert!(matches!(err, Error::ContentLengthRequired));
    assert!(s.connects().is_empty());
}

#[test]
fn get_has_no_request_stream() {
    let mut s = Scenario::builder().reply(OK).build();
    let err = s.request.request_stream().unwrap_err();
    assert!(matches!(err, Error::MethodCannotSendBody(m) if m == Method::GET));
}

#[test]
fn request_stream_opens_once() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.request_stream().unwrap().write_all(b"a").unwrap();
    s.request.request_stream().unwrap().write_all(b"b").unwrap();
    s.request.get_response().unwrap();

    assert_eq!(s.connects().len(), 1);
    assert!(s.sent(0).ends_with("Content-Length: 2\r\n\r\nab"));
}

#[test]
fn no_request_stream_after_response() {
    let mut s = Scenario::builder().post("http://f.test/u").reply(OK).build();
    s.request.get_response().unwrap();

    let err = s.request.request_stream().unwrap_err();
    assert!(matches!(err, Error::ResponseAlreadyTaken));
}
