//! Codec implementations for key sets.
//!
//! Encoding order is any stable order (sorted, here); decoding assumes
//! nothing about the order on the wire.

use crate::codec::{read_count, write_count};
use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;
use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

impl<K: Ord + Encode> Encode for BTreeSet<K> {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        // Already sorted.
        for key in self {
            key.write(buf);
        }
    }
}

impl<K: Ord + Decode> Decode for BTreeSet<K> {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let mut set = BTreeSet::new();
        for _ in 0..len {
            set.insert(K::read(reader)?);
        }
        Ok(set)
    }
}

impl<K: Ord + Hash + Encode> Encode for HashSet<K> {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        // Sort for a deterministic encoding.
        let mut keys: Vec<_> = self.iter().collect();
        keys.sort();
        for key in keys {
            key.write(buf);
        }
    }
}

impl<K: Ord + Hash + Decode> Decode for HashSet<K> {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let mut set = HashSet::new();
        for _ in 0..len {
            set.insert(K::read(reader)?);
        }
        Ok(set)
    }
}
