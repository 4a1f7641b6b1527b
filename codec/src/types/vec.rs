//! Codec implementations for ordered sequences.
//!
//! For portability and consistency between architectures, the length of a
//! sequence must fit within a `u32`.

use crate::codec::{read_count, write_count};
use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;
use std::collections::VecDeque;

impl<T: Encode> Encode for Vec<T> {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        for item in self {
            item.write(buf);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let mut vec = Vec::new();
        for _ in 0..len {
            vec.push(T::read(reader)?);
        }
        Ok(vec)
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        for item in self {
            item.write(buf);
        }
    }
}

impl<T: Decode> Decode for VecDeque<T> {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let mut deque = VecDeque::new();
        for _ in 0..len {
            deque.push_back(T::read(reader)?);
        }
        Ok(deque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec() {
        let values = [vec![], vec![1u32], vec![1u32, 2, 3]];
        for value in values {
            let encoded = value.encode();
            assert_eq!(encoded.length(), 4 + value.len() * 4);
            assert_eq!(Vec::<u32>::decode(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn test_count_prefix() {
        let value = vec![7u8, 8, 9];
        let encoded = value.encode();
        let mut prefix = [0u8; 4];
        encoded.copy_out(0, 4, &mut prefix);
        assert_eq!(u32::from_ne_bytes(prefix), 3);
    }

    #[test]
    fn test_deque() {
        let value: VecDeque<u16> = VecDeque::from(vec![10, 20, 30]);
        let encoded = value.encode();
        assert_eq!(VecDeque::<u16>::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_truncated() {
        let value = vec![1u64, 2];
        let encoded = value.encode();
        let mut short = BufferList::new();
        short.substr_of(&encoded, 0, encoded.length() - 1);
        assert!(matches!(
            Vec::<u64>::decode(&short),
            Err(Error::EndOfBuffer)
        ));
    }

    #[test]
    fn test_count_exceeds_remaining() {
        // A dishonest count is rejected before the decode loop runs.
        let mut bl = BufferList::new();
        1_000_000u32.write(&mut bl);
        bl.append(&[0, 0]);
        assert!(matches!(
            Vec::<u8>::decode(&bl),
            Err(Error::InvalidLength(1_000_000))
        ));
    }

    #[test]
    fn test_nested() {
        let value = vec![vec![1u8, 2], vec![], vec![3]];
        let encoded = value.encode();
        assert_eq!(Vec::<Vec<u8>>::decode(&encoded).unwrap(), value);
    }
}
