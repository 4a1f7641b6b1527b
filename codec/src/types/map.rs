//! Codec implementations for key-value mappings.
//!
//! Encoding order is any stable order (sorted, here); decoding assumes
//! nothing about the order on the wire and inserts into a fresh target.

use crate::codec::{read_count, write_count};
use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

impl<K: Ord + Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        // Already sorted.
        for (key, value) in self {
            key.write(buf);
            value.write(buf);
        }
    }
}

impl<K: Ord + Decode, V: Decode> Decode for BTreeMap<K, V> {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::read(reader)?;
            let value = V::read(reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<K: Ord + Hash + Encode, V: Encode> Encode for HashMap<K, V> {
    fn write(&self, buf: &mut BufferList) {
        write_count(self.len(), buf);
        // Sort the keys for a deterministic encoding.
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort();
        for key in keys {
            key.write(buf);
            self.get(key).expect("sorted key").write(buf);
        }
    }
}

impl<K: Ord + Hash + Decode, V: Decode> Decode for HashMap<K, V> {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = read_count(reader)?;
        let mut map = HashMap::new();
        for _ in 0..len {
            let key = K::read(reader)?;
            let value = V::read(reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_btree_map() {
        let mut value = BTreeMap::new();
        value.insert(1i32, "one".to_string());
        value.insert(-2, "minus two".to_string());
        let encoded = value.encode();
        assert_eq!(BTreeMap::<i32, String>::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_hash_map_deterministic() {
        let mut value = HashMap::new();
        for i in 0..16u32 {
            value.insert(i, i * i);
        }
        assert_eq!(value.encode().to_vec(), value.encode().to_vec());
        assert_eq!(HashMap::<u32, u32>::decode(&value.encode()).unwrap(), value);
    }

    #[test]
    fn test_count_prefix() {
        let mut value = BTreeMap::new();
        value.insert(7u8, 7u8);
        let encoded = value.encode();
        let mut prefix = [0u8; 4];
        encoded.copy_out(0, 4, &mut prefix);
        assert_eq!(u32::from_ne_bytes(prefix), 1);
    }
}
