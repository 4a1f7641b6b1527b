//! Codec implementations for nested views and buffer lists.
//!
//! Encoding reference-appends the content after a 32-bit length; decoding
//! takes a zero-copy substring view and advances the cursor.

use crate::codec::{read_count, write_count};
use crate::{Decode, Encode, Error, Reader};
use reef_buffer::{BufferList, View};

impl Encode for View {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        buf.append_view(self.clone());
    }
}

impl Decode for View {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let sub = reader.take_list(len)?;
        // A single covering view comes out as-is; a fragmented region is
        // flattened into one fresh view.
        match sub.views().len() {
            1 => Ok(sub.views()[0].clone()),
            _ => {
                let mut flat = View::with_size(len);
                sub.copy_out(0, len, flat.as_mut_slice());
                Ok(flat)
            }
        }
    }
}

impl Encode for BufferList {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.length(), buf);
        buf.append_list(self);
    }
}

impl Decode for BufferList {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        reader.take_list(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_round_trip() {
        let value = View::copy_from_slice(b"payload bytes");
        let encoded = value.encode();
        assert_eq!(encoded.length(), 4 + value.len());
        let decoded = View::decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_view_encode_is_reference() {
        let value = View::copy_from_slice(b"shared");
        let before = value.raw_refcount();
        let encoded = value.encode();
        assert_eq!(value.raw_refcount(), before + 1);
        drop(encoded);
        assert_eq!(value.raw_refcount(), before);
    }

    #[test]
    fn test_view_decode_fragmented() {
        // Build an encoding whose payload spans two views.
        let mut encoded = BufferList::new();
        6u32.write(&mut encoded);
        encoded.append_view(View::copy_from_slice(b"abc"));
        encoded.append_view(View::copy_from_slice(b"def"));
        let decoded = View::decode(&encoded).unwrap();
        assert_eq!(decoded.as_slice(), b"abcdef");
    }

    #[test]
    fn test_list_round_trip() {
        let mut value = BufferList::new();
        value.append(b"first ");
        value.append_view(View::copy_from_slice(b"second"));
        let encoded = value.encode();
        let decoded = BufferList::decode(&encoded).unwrap();
        assert_eq!(decoded, value);
        // Decode took views into the encoding, not copies.
        assert!(decoded.views()[0].raw_refcount() > 1);
    }

    #[test]
    fn test_nested_in_struct_order() {
        let mut payload = BufferList::new();
        payload.append(b"xyz");
        let mut encoded = BufferList::new();
        7u8.write(&mut encoded);
        payload.write(&mut encoded);
        9u8.write(&mut encoded);

        let mut reader = Reader::new(&encoded);
        assert_eq!(u8::read(&mut reader).unwrap(), 7);
        let mid = BufferList::read(&mut reader).unwrap();
        assert_eq!(mid.to_vec(), b"xyz");
        assert_eq!(u8::read(&mut reader).unwrap(), 9);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated() {
        let mut bl = BufferList::new();
        100u32.write(&mut bl);
        bl.append(b"short");
        assert!(matches!(
            BufferList::decode(&bl),
            Err(Error::InvalidLength(100))
        ));
    }
}
