use crate::CRLF;

const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

pub fn render_chunk(data: &[u8], buf: &mut Vec<u8>) {
    if data.is_empty() {
        return;
    }
    buf.reserve(data.len() + 20);
    buf.extend_from_slice(format!("{:X}", data.len()).as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

pub fn render_last_chunk(buf: &mut Vec<u8>) {
    buf.extend_from_slice(LAST_CHUNK);
}
