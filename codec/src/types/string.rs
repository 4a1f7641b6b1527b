//! Codec implementation for strings.
//!
//! A string is a 32-bit length (excluding the terminator) followed by
//! `length + 1` bytes including a trailing NUL.

use crate::codec::{read_count, write_count};
use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;

impl Encode for str {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        buf.append(self.as_bytes());
        buf.append(&[0]);
    }
}

impl Encode for String {
    fn write(&self, buf: &mut BufferList) {
        self.as_str().write(buf);
    }
}

impl Decode for String {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        // The terminator needs one byte past the counted length.
        if len >= reader.remaining() {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = vec![0u8; len + 1];
        reader.copy_to_slice(&mut bytes)?;
        if bytes.pop() != Some(0) {
            return Err(Error::Invalid("String", "missing terminator"));
        }
        String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid utf-8"))
    }
}
