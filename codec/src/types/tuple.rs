//! Codec implementations for tuples.

use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;

macro_rules! impl_codec_for_tuple {
    ($(($T:ident, $idx:tt)),+) => {
        impl<$($T: Encode),+> Encode for ($($T,)+) {
            fn write(&self, buf: &mut BufferList) {
                $( self.$idx.write(buf); )+
            }
        }

        impl<$($T: Decode),+> Decode for ($($T,)+) {
            fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
                Ok(( $( $T::read(reader)?, )+ ))
            }
        }
    };
}

impl_codec_for_tuple!((T0, 0));
impl_codec_for_tuple!((T0, 0), (T1, 1));
impl_codec_for_tuple!((T0, 0), (T1, 1), (T2, 2));
impl_codec_for_tuple!((T0, 0), (T1, 1), (T2, 2), (T3, 3));
