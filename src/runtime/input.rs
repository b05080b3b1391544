use crate::runtime::error::{RuntimeError, RuntimeResult};
use std::io::BufRead;

/// Reads whitespace-separated integers without buffering whole lines.
pub struct IntReader<R> {
    inner: R,
}

impl<R: BufRead> IntReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn next_int(&mut self) -> RuntimeResult<i32> {
        let token = self.next_token()?;
        if token.is_empty() {
            return Err(RuntimeError::Input {
                message: "unexpected end of input".into(),
            });
        }
        let text = String::from_utf8_lossy(&token);
        text.parse::<i32>().map_err(|_| RuntimeError::Input {
            message: format!("`{text}` is not an integer"),
        })
    }

    fn next_token(&mut self) -> RuntimeResult<Vec<u8>> {
        let mut token = Vec::new();
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(token);
            }
            let mut used = 0;
            let mut complete = false;
            for &byte in buf {
                if byte.is_ascii_whitespace() {
                    if !token.is_empty() {
                        complete = true;
                        break;
                    }
                } else {
                    token.push(byte);
                }
                used += 1;
            }
            self.inner.consume(used);
            if complete {
                return Ok(token);
            }
        }
    }
}
