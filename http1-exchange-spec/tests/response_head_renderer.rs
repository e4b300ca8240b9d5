use std::io;

use http1_exchange_spec::{
    headers::Headers,
    response_head_renderer::{ResponseHead, ResponseHeadRenderer},
};

#[test]
fn simple() -> io::Result<()> {
    let mut headers = Headers::new();
    headers.add("content-length", "5")?;
    headers.add("Set-Cookie", "a=1")?;
    headers.add("set-cookie", "b=2")?;

    let mut buf = vec![];
    ResponseHeadRenderer::new().render(
        ResponseHead {
            status_code: 200,
            reason_phrase: None,
            headers: &headers,
        },
        &mut buf,
    )?;

    assert_eq!(
        buf,
        b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n"
            .to_vec()
    );

    Ok(())
}

#[test]
fn custom_and_unknown_reason() -> io::Result<()> {
    let headers = Headers::new();

    let mut buf = vec![];
    ResponseHeadRenderer::new().render(
        ResponseHead {
            status_code: 404,
            reason_phrase: Some("Nope"),
            headers: &headers,
        },
        &mut buf,
    )?;
    assert_eq!(buf, b"HTTP/1.1 404 Nope\r\n\r\n".to_vec());

    buf.clear();
    ResponseHeadRenderer::new().render(
        ResponseHead {
            status_code: 599,
            reason_phrase: None,
            headers: &headers,
        },
        &mut buf,
    )?;
    assert_eq!(buf, b"HTTP/1.1 599 \r\n\r\n".to_vec());

    Ok(())
}

#[test]
fn status_out_of_range() {
    let headers = Headers::new();

    let mut buf = vec![];
    let err = ResponseHeadRenderer::new()
        .render(
            ResponseHead {
                status_code: 42,
                reason_phrase: None,
                headers: &headers,
            },
            &mut buf,
        )
        .err()
        .unwrap();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert!(buf.is_empty());
}
