//! Core codec traits.

use crate::{Error, Reader};
use reef_buffer::BufferList;

/// Trait for types that can be encoded into a [`BufferList`].
pub trait Encode {
    /// Appends this value's encoding to `buf`.
    fn write(&self, buf: &mut BufferList);

    /// Encodes this value into a fresh list.
    fn encode(&self) -> BufferList {
        let mut buf = BufferList::new();
        self.write(&mut buf);
        buf
    }
}

/// Trait for types that can be decoded from a [`BufferList`].
pub trait Decode: Sized {
    /// Reads a value at the cursor, advancing it past the encoding.
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error>;

    /// Decodes a value from the whole list.
    ///
    /// Returns [`Error::ExtraData`] if bytes remain after the value.
    fn decode(list: &BufferList) -> Result<Self, Error> {
        let mut reader = Reader::new(list);
        let result = Self::read(&mut reader)?;
        let remaining = reader.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }
        Ok(result)
    }
}

/// Marker for types that both encode and decode.
pub trait Codec: Encode + Decode {}

impl<T: Encode + Decode> Codec for T {}

/// Writes a container count as the 32-bit prefix every collection carries.
///
/// Lengths beyond `u32::MAX` are a programmer error.
pub(crate) fn write_count(len: usize, buf: &mut BufferList) {
    let count = u32::try_from(len).expect("container length exceeds u32");
    count.write(buf);
}

/// Reads a container count prefix.
///
/// Every encoded element occupies at least one byte, so a count exceeding
/// the bytes remaining cannot be satisfied and is rejected before any
/// decode loop runs.
pub(crate) fn read_count(reader: &mut Reader<'_>) -> Result<usize, Error> {
    let count = u32::read(reader)? as usize;
    if count > reader.remaining() {
        return Err(Error::InvalidLength(count));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_buffer() {
        let mut bl = BufferList::new();
        bl.append(&[0x01, 0x02]);
        assert!(matches!(u32::decode(&bl), Err(Error::EndOfBuffer)));
    }

    #[test]
    fn test_extra_data() {
        let mut bl = BufferList::new();
        bl.append(&[0x01, 0x02]);
        assert!(matches!(u8::decode(&bl), Err(Error::ExtraData(1))));
    }

    #[test]
    fn test_read_sequence() {
        let mut bl = BufferList::new();
        1u32.write(&mut bl);
        2u16.write(&mut bl);
        let mut reader = Reader::new(&bl);
        assert_eq!(u32::read(&mut reader).unwrap(), 1);
        assert_eq!(u16::read(&mut reader).unwrap(), 2);
        assert_eq!(reader.remaining(), 0);
        assert!(matches!(u8::read(&mut reader), Err(Error::EndOfBuffer)));
    }
}
