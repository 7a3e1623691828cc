//! The reactor's single reusable read buffer.
//!
//! Every read goes through the same fixed-capacity buffer. It is cleared
//! before each read and only the bytes of the latest read are ever exposed,
//! so nothing from one connection can show up in a delivery for another.

use bytes::BytesMut;
use std::io::{self, Read};

#[derive(Debug)]
pub struct ReadBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ReadBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Clears the buffer and performs one read of at most `capacity` bytes.
    ///
    /// Returns the number of bytes read; `0` means end-of-stream. On error the
    /// buffer is left empty.
    pub fn fill_from<R: Read>(&mut self, source: &mut R) -> io::Result<usize> {
        self.buf.clear();
        self.buf.resize(self.capacity, 0);

        match source.read(&mut self.buf[..]) {
            Ok(n) => {
                self.buf.truncate(n);
                Ok(n)
            }
            Err(e) => {
                self.buf.clear();
                Err(e)
            }
        }
    }

    /// Bytes of the latest read.
    pub fn filled(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }
}
