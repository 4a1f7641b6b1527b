//! Codec implementations for fixed-width primitives.
//!
//! Multi-byte values are host-native: this is an in-process marshalling
//! layer, and wire compatibility is the caller's concern.

use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;

macro_rules! impl_primitive {
    ($type:ty) => {
        impl Encode for $type {
            #[inline]
            fn write(&self, buf: &mut BufferList) {
                buf.append(&self.to_ne_bytes());
            }
        }

        impl Decode for $type {
            #[inline]
            fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
                Ok(<$type>::from_ne_bytes(reader.read_array()?))
            }
        }
    };
}

impl_primitive!(u8);
impl_primitive!(u16);
impl_primitive!(u32);
impl_primitive!(u64);
impl_primitive!(i8);
impl_primitive!(i16);
impl_primitive!(i32);
impl_primitive!(i64);
impl_primitive!(f32);
impl_primitive!(f64);

impl Encode for bool {
    #[inline]
    fn write(&self, buf: &mut BufferList) {
        (*self as u8).write(buf);
    }
}

impl Decode for bool {
    #[inline]
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::Invalid("bool", "not 0 or 1")),
        }
    }
}
