//! The advancing decode cursor.

use crate::Error;
use bytes::Buf;
use reef_buffer::BufferList;

/// A cursor over a [`BufferList`].
///
/// Decoding advances the cursor; the list itself is never consumed, so
/// several readers may walk the same list. Implements [`bytes::Buf`] so a
/// list composes with anything that reads through that abstraction.
pub struct Reader<'a> {
    list: &'a BufferList,
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a cursor at the start of `list`.
    pub fn new(list: &'a BufferList) -> Self {
        Self { list, offset: 0 }
    }

    /// Current byte offset into the list.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.list.length() - self.offset
    }

    /// Copies `dst.len()` bytes out of the list and advances.
    pub fn copy_to_slice(&mut self, dst: &mut [u8]) -> Result<(), Error> {
        if dst.len() > self.remaining() {
            return Err(Error::EndOfBuffer);
        }
        self.list.copy_out(self.offset, dst.len(), dst);
        self.offset += dst.len();
        Ok(())
    }

    /// Copies a fixed-width array out of the list and advances.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut bytes = [0u8; N];
        self.copy_to_slice(&mut bytes)?;
        Ok(bytes)
    }

    /// Takes the next `len` bytes as a zero-copy substring list and advances.
    pub fn take_list(&mut self, len: usize) -> Result<BufferList, Error> {
        if len > self.remaining() {
            return Err(Error::EndOfBuffer);
        }
        let mut out = BufferList::new();
        out.substr_of(self.list, self.offset, len);
        self.offset += len;
        Ok(out)
    }
}

impl Buf for Reader<'_> {
    #[inline]
    fn remaining(&self) -> usize {
        Reader::remaining(self)
    }

    fn chunk(&self) -> &[u8] {
        let mut off = self.offset;
        for view in self.list.views() {
            if off < view.len() {
                return &view.as_slice()[off..];
            }
            off -= view.len();
        }
        &[]
    }

    #[inline]
    fn advance(&mut self, cnt: usize) {
        assert!(cnt <= Reader::remaining(self), "advance past end of list");
        self.offset += cnt;
    }
}
