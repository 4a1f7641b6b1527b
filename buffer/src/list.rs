use crate::{Raw, View, PAGE_SIZE};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::Index;

/// An ordered sequence of views forming a logical byte string.
///
/// The list caches its total length (always equal to the sum of member-view
/// lengths) and carries an append arena: a page-aligned view whose unused
/// tail absorbs small appends. The arena is not part of the logical content;
/// only the views published from it are.
#[derive(Default)]
pub struct BufferList {
    views: VecDeque<View>,
    len: usize,
    arena: Option<View>,
}

impl BufferList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total length of the logical byte string.
    #[inline]
    pub fn length(&self) -> usize {
        self.len
    }

    /// Whether the list holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The member views, in order.
    #[inline]
    pub fn views(&self) -> &VecDeque<View> {
        &self.views
    }

    /// Drops every view. The arena is kept for future appends.
    pub fn clear(&mut self) {
        self.views.clear();
        self.len = 0;
    }

    /// Appends a view to the front of the list.
    pub fn push_front(&mut self, view: View) {
        self.len += view.len();
        self.views.push_front(view);
    }

    /// Appends a view to the back of the list.
    pub fn push_back(&mut self, view: View) {
        self.len += view.len();
        self.views.push_back(view);
    }

    /// Exchanges contents with `other`, arena included.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Zeroes every byte in the list.
    pub fn zero(&mut self) {
        for view in &mut self.views {
            view.zero();
        }
    }

    /// Whether every view starts on a page boundary.
    pub fn is_page_aligned(&self) -> bool {
        self.views.iter().all(View::is_page_aligned)
    }

    /// Whether the total length is a whole number of pages.
    pub fn is_n_page_sized(&self) -> bool {
        self.len % PAGE_SIZE == 0
    }

    /// Appends bytes, filling the arena's unused tail first.
    ///
    /// When the arena is exhausted, a fresh page-aligned arena of
    /// `ceil(n / PAGE_SIZE)` pages is allocated. Every fill publishes a view
    /// over the newly written region into the list.
    pub fn append(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let gap = self
                .arena
                .as_ref()
                .map(View::unused_tail_length)
                .unwrap_or(0);
            if gap > 0 {
                let take = gap.min(data.len());
                let arena = self.arena.as_mut().expect("arena with gap");
                arena.append(&data[..take]);
                let published = arena.slice(arena.len() - take, take);
                self.push_back(published);
                data = &data[take..];
            }
            if data.is_empty() {
                break;
            }

            // New arena, rounded up to whole pages.
            let alen = PAGE_SIZE * ((data.len() - 1) / PAGE_SIZE + 1);
            let mut arena = View::from_raw(Raw::create_page_aligned(alen));
            arena.set_length(0); // unused, so far
            self.arena = Some(arena);
        }
    }

    /// Pushes a reference to a foreign view. No copy.
    pub fn append_view(&mut self, view: View) {
        self.push_back(view);
    }

    /// Pushes a reference to `[off, off + len)` of a foreign view. No copy.
    pub fn append_view_range(&mut self, view: &View, off: usize, len: usize) {
        assert!(off + len <= view.len(), "append range out of bounds");
        self.push_back(view.slice(off, len));
    }

    /// Pushes references to every view of another list. No copy.
    pub fn append_list(&mut self, other: &BufferList) {
        for view in &other.views {
            self.views.push_back(view.clone());
        }
        self.len += other.len;
    }

    /// Transfers ownership of another list's views to this list.
    ///
    /// The source is left empty. O(1) amortized per view.
    pub fn claim_append(&mut self, other: &mut BufferList) {
        self.len += other.len;
        self.views.append(&mut other.views);
        other.len = 0;
    }

    /// Replaces this list's contents with another's, leaving it empty.
    pub fn claim(&mut self, other: &mut BufferList) {
        self.clear();
        self.claim_append(other);
    }

    /// Byte at position `n`, located by linear scan over views.
    pub fn byte_at(&self, mut n: usize) -> u8 {
        assert!(n < self.len, "index out of bounds");
        for view in &self.views {
            if n >= view.len() {
                n -= view.len();
                continue;
            }
            return view[n];
        }
        unreachable!("cached length disagrees with views");
    }

    /// Gathers `len` bytes starting at `off` into `dst`.
    pub fn copy_out(&self, mut off: usize, mut len: usize, dst: &mut [u8]) {
        assert!(off + len <= self.len, "copy_out out of bounds");
        assert!(dst.len() >= len, "destination too small");

        // Skip to off.
        let mut idx = 0;
        while off > 0 && off >= self.views[idx].len() {
            off -= self.views[idx].len();
            idx += 1;
        }

        let mut pos = 0;
        while len > 0 {
            let cur = &self.views[idx];
            // Is the rest all in this view?
            if off + len <= cur.len() {
                cur.copy_out(off, len, &mut dst[pos..]);
                break;
            }
            let howmuch = cur.len() - off;
            cur.copy_out(off, howmuch, &mut dst[pos..]);
            pos += howmuch;
            len -= howmuch;
            off = 0;
            idx += 1;
        }
    }

    /// Scatters `src` over the bytes starting at `off`.
    pub fn copy_in(&mut self, mut off: usize, src: &[u8]) {
        assert!(off + src.len() <= self.len, "copy_in out of bounds");

        // Skip to off.
        let mut idx = 0;
        while off > 0 && off >= self.views[idx].len() {
            off -= self.views[idx].len();
            idx += 1;
        }

        let mut pos = 0;
        let mut len = src.len();
        while len > 0 {
            let cur_len = self.views[idx].len();
            if off + len <= cur_len {
                self.views[idx].copy_in(off, &src[pos..pos + len]);
                break;
            }
            let howmuch = cur_len - off;
            self.views[idx].copy_in(off, &src[pos..pos + howmuch]);
            pos += howmuch;
            len -= howmuch;
            off = 0;
            idx += 1;
        }
    }

    /// Scatters the first `len` bytes of another list over `[off, off + len)`.
    pub fn copy_in_list(&mut self, mut off: usize, len: usize, other: &BufferList) {
        let mut left = len;
        for view in &other.views {
            let l = view.len().min(left);
            self.copy_in(off, &view.as_slice()[..l]);
            left -= l;
            if left == 0 {
                break;
            }
            off += l;
        }
    }

    /// Rebuilds `self` as the view sequence for `[off, off + len)` of `other`.
    ///
    /// No byte copies: a truncated head view, whole middle views, then a
    /// truncated tail view. `len == 0` yields an empty list.
    pub fn substr_of(&mut self, other: &BufferList, mut off: usize, mut len: usize) {
        assert!(off + len <= other.len, "substr_of out of bounds");
        self.clear();

        // Skip to off.
        let mut idx = 0;
        while off > 0 && off >= other.views[idx].len() {
            off -= other.views[idx].len();
            idx += 1;
        }

        while len > 0 {
            let cur = &other.views[idx];
            // Partial?
            if off + len < cur.len() {
                self.views.push_back(cur.slice(off, len));
                self.len += len;
                break;
            }
            // Through the end.
            let howmuch = cur.len() - off;
            self.views.push_back(cur.slice(off, howmuch));
            self.len += howmuch;
            len -= howmuch;
            off = 0;
            idx += 1;
        }
    }

    /// Removes `[off, off + len)` from `self`.
    ///
    /// If `claim_by` is provided, the removed views are appended to it. A
    /// split mid-view inserts a shortened head view over the same raw; fully
    /// covered views are erased; a partially covered tail view is shrunk in
    /// place. The cached length drops by exactly `len`.
    pub fn splice(&mut self, mut off: usize, mut len: usize, mut claim_by: Option<&mut BufferList>) {
        assert!(off + len <= self.len, "splice out of bounds");
        if len == 0 {
            return;
        }

        // Skip to off.
        let mut idx = 0;
        while off > 0 && off >= self.views[idx].len() {
            off -= self.views[idx].len();
            idx += 1;
        }

        if off > 0 {
            // Keep a reference to the front fragment of the view we are about
            // to consume, inserted just before it.
            let head = self.views[idx].slice(0, off);
            self.views.insert(idx, head);
            self.len += off;
            idx += 1;
        }

        while len > 0 {
            let cur_len = self.views[idx].len();
            // Partially covered tail view: shrink in place.
            if off + len < cur_len {
                if let Some(c) = claim_by.as_deref_mut() {
                    c.append_view(self.views[idx].slice(off, len));
                }
                let view = &mut self.views[idx];
                let new_off = view.offset() + off + len;
                let new_len = cur_len - (off + len);
                view.set_offset(new_off);
                view.set_length(new_len);
                self.len -= off + len;
                break;
            }
            // Fully covered (past off): erase.
            let howmuch = cur_len - off;
            if let Some(c) = claim_by.as_deref_mut() {
                c.append_view(self.views[idx].slice(off, howmuch));
            }
            self.len -= cur_len;
            self.views.remove(idx);
            len -= howmuch;
            off = 0;
        }
    }

    /// Returns the whole list as one contiguous byte slice.
    ///
    /// Zero views yield an empty slice; one view is returned as-is;
    /// otherwise the list is flattened into a single fresh view first, so a
    /// subsequent call is O(1).
    pub fn contiguous(&mut self) -> &[u8] {
        match self.views.len() {
            0 => &[],
            1 => self.views[0].as_slice(),
            _ => {
                let mut flat = View::with_size(self.len);
                self.copy_out(0, self.len, flat.as_mut_slice());
                self.clear();
                self.push_back(flat);
                self.views[0].as_slice()
            }
        }
    }

    /// Collects the bytes into an owned vector (diagnostics and tests).
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len];
        self.copy_out(0, self.len, &mut out);
        out
    }

    fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.views.iter().flat_map(|v| v.as_slice().iter().copied())
    }
}

impl Index<usize> for BufferList {
    type Output = u8;

    fn index(&self, mut n: usize) -> &u8 {
        assert!(n < self.len, "index out of bounds");
        for view in &self.views {
            if n >= view.len() {
                n -= view.len();
                continue;
            }
            return &view.as_slice()[n];
        }
        unreachable!("cached length disagrees with views");
    }
}

impl PartialEq for BufferList {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bytes().eq(other.bytes())
    }
}

impl Eq for BufferList {}

impl PartialEq<[u8]> for BufferList {
    fn eq(&self, other: &[u8]) -> bool {
        self.len == other.len() && self.bytes().eq(other.iter().copied())
    }
}

impl PartialOrd for BufferList {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BufferList {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes().cmp(other.bytes())
    }
}

impl std::fmt::Debug for BufferList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BufferList(len={}", self.len)?;
        for view in &self.views {
            write!(f, ", {:?}", view)?;
        }
        write!(f, ")")
    }
}

impl Clone for BufferList {
    /// Clones the view sequence (sharing raws). The arena stays behind: the
    /// clone gets its own on first append.
    fn clone(&self) -> Self {
        Self {
            views: self.views.clone(),
            len: self.len,
            arena: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn check_len(bl: &BufferList) {
        let total: usize = bl.views().iter().map(View::len).sum();
        assert_eq!(bl.length(), total);
    }

    fn sample(n: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen()).collect()
    }

    #[test]
    fn test_append_arena_fill() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append(b"abc");
        bl.append(b"def");
        assert_eq!(bl.length(), 6);
        // Both appends landed in the same page arena.
        assert_eq!(bl.views().len(), 2);
        assert_eq!(bl.to_vec(), b"abcdef");
        check_len(&bl);
    }

    #[test]
    fn test_append_arena_page_sizing() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        let data = sample(PAGE_SIZE + 1, 7);
        bl.append(&data);
        // A two-page arena absorbs the whole append; every arena is page
        // aligned and a whole number of pages.
        for view in bl.views() {
            assert!(view.is_page_aligned());
            assert_eq!(view.raw_len() % PAGE_SIZE, 0);
        }
        assert!(bl.is_page_aligned());
        assert!(!bl.is_n_page_sized()); // one byte past a page
        assert_eq!(bl.to_vec(), data);
    }

    #[test]
    fn test_append_spans_arenas() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append(&sample(PAGE_SIZE - 3, 1));
        bl.append(b"0123456789"); // 3 bytes fit, 7 spill into a new arena
        assert_eq!(bl.length(), PAGE_SIZE + 7);
        check_len(&bl);
        let v = bl.to_vec();
        assert_eq!(&v[PAGE_SIZE - 3..], b"0123456789");
    }

    #[test]
    fn test_append_list_and_claim() {
        let _gate = crate::test_util::alloc_gate();
        let mut a = BufferList::new();
        a.append(b"first");
        let mut b = BufferList::new();
        b.append(b"second");

        let mut joined = BufferList::new();
        joined.append_list(&a);
        joined.append_list(&b);
        assert_eq!(joined.to_vec(), b"firstsecond");
        assert_eq!(a.length(), 5); // sources untouched

        let mut claimed = BufferList::new();
        claimed.claim_append(&mut a);
        claimed.claim_append(&mut b);
        assert_eq!(claimed.to_vec(), b"firstsecond");
        assert_eq!(a.length(), 0);
        assert!(a.views().is_empty());
        assert_eq!(b.length(), 0);
        check_len(&claimed);

        // claim replaces instead of appending.
        joined.claim(&mut claimed);
        assert_eq!(joined.to_vec(), b"firstsecond");
        assert_eq!(claimed.length(), 0);
    }

    #[test]
    fn test_substr_round_trip() {
        let _gate = crate::test_util::alloc_gate();
        let data = sample(3000, 42);
        let mut bl = BufferList::new();
        // Uneven view boundaries.
        bl.append(&data[..100]);
        bl.append_view(View::copy_from_slice(&data[100..1000]));
        bl.append_view(View::copy_from_slice(&data[1000..2999]));
        bl.append(&data[2999..]);

        for (off, len) in [(0, 0), (0, 3000), (0, 50), (99, 2), (100, 900), (1500, 1400)] {
            let mut sub = BufferList::new();
            sub.substr_of(&bl, off, len);
            assert_eq!(sub.length(), len);
            assert_eq!(sub.to_vec(), &data[off..off + len]);
            check_len(&sub);
        }
    }

    #[test]
    fn test_substr_zero_copy() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append_view(View::copy_from_slice(b"0123456789"));
        let before = crate::allocated();
        let mut sub = BufferList::new();
        sub.substr_of(&bl, 2, 6);
        assert_eq!(crate::allocated(), before);
        assert_eq!(sub.views()[0].raw_refcount(), bl.views()[0].raw_refcount());
    }

    #[test]
    fn test_splice_equals_substr_plus_complement() {
        let _gate = crate::test_util::alloc_gate();
        let data = sample(2048, 9);
        for (off, len) in [(0, 2048), (0, 100), (700, 700), (2000, 48), (5, 1)] {
            let mut bl = BufferList::new();
            bl.append(&data[..512]);
            bl.append_view(View::copy_from_slice(&data[512..1024]));
            bl.append_view(View::copy_from_slice(&data[1024..]));

            let mut claimed = BufferList::new();
            bl.splice(off, len, Some(&mut claimed));

            assert_eq!(claimed.length() + bl.length(), data.len());
            assert_eq!(claimed.to_vec(), &data[off..off + len]);
            let mut rest = data[..off].to_vec();
            rest.extend_from_slice(&data[off + len..]);
            assert_eq!(bl.to_vec(), rest);
            check_len(&bl);
            check_len(&claimed);
        }
    }

    #[test]
    fn test_splice_mid_view() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append_view(View::copy_from_slice(b"abcdefghij"));
        bl.splice(3, 4, None);
        assert_eq!(bl.length(), 6);
        assert_eq!(bl.to_vec(), b"abchij");
        // Head fragment and shrunk tail share the original raw.
        assert_eq!(bl.views().len(), 2);
        check_len(&bl);
    }

    #[test]
    fn test_splice_everything() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append(b"gone");
        bl.splice(0, 4, None);
        assert_eq!(bl.length(), 0);
        assert!(bl.views().is_empty());
    }

    #[test]
    fn test_copy_in_across_views() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append_view(View::copy_from_slice(b"aaaa"));
        bl.append_view(View::copy_from_slice(b"bbbb"));
        bl.copy_in(2, b"XXXX");
        assert_eq!(bl.to_vec(), b"aaXXXXbb");

        let mut src = BufferList::new();
        src.append(b"YY");
        bl.copy_in_list(0, 2, &src);
        assert_eq!(bl.to_vec(), b"YYXXXXbb");
    }

    #[test]
    fn test_contiguous_idempotent() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        assert_eq!(bl.contiguous(), b"");

        bl.append_view(View::copy_from_slice(b"split "));
        bl.append_view(View::copy_from_slice(b"buffers"));
        assert_eq!(bl.views().len(), 2);
        assert_eq!(bl.contiguous(), b"split buffers");
        assert_eq!(bl.views().len(), 1);
        let first = bl.contiguous().as_ptr();
        assert_eq!(bl.contiguous().as_ptr(), first);
        assert_eq!(bl.views().len(), 1);
        check_len(&bl);
    }

    #[test]
    fn test_byte_access_and_ordering() {
        let _gate = crate::test_util::alloc_gate();
        let mut bl = BufferList::new();
        bl.append_view(View::copy_from_slice(b"ab"));
        bl.append_view(View::copy_from_slice(b"cd"));
        assert_eq!(bl.byte_at(0), b'a');
        assert_eq!(bl.byte_at(3), b'd');
        assert_eq!(bl[2], b'c');

        let mut other = BufferList::new();
        other.append(b"abce");
        assert!(bl < other);
        let mut same = BufferList::new();
        same.append(b"abcd");
        assert_eq!(bl, same);
    }

    #[test]
    fn test_swap_carries_arena() {
        let _gate = crate::test_util::alloc_gate();
        let mut a = BufferList::new();
        a.append(b"abc"); // a now owns an arena with spare tail
        let mut b = BufferList::new();
        a.swap(&mut b);
        assert_eq!(a.length(), 0);
        b.append(b"def");
        // Second append continued in the transferred arena.
        assert_eq!(b.views().len(), 2);
        assert_eq!(b.views()[1].offset(), 3);
        assert_eq!(b.to_vec(), b"abcdef");
    }

    #[test]
    fn test_random_op_sequences_hold_length_invariant() {
        let _gate = crate::test_util::alloc_gate();
        let mut rng = StdRng::seed_from_u64(0xb1ff);
        for _ in 0..50 {
            let mut bl = BufferList::new();
            let mut shadow: Vec<u8> = Vec::new();
            for _ in 0..40 {
                match rng.gen_range(0..6) {
                    0 => {
                        let n = rng.gen_range(0..200);
                        let data = sample(n, rng.gen());
                        bl.append(&data);
                        shadow.extend_from_slice(&data);
                    }
                    1 => {
                        let n = rng.gen_range(1..100);
                        let data = sample(n, rng.gen());
                        bl.append_view(View::copy_from_slice(&data));
                        shadow.extend_from_slice(&data);
                    }
                    2 => {
                        let mut other = BufferList::new();
                        let data = sample(rng.gen_range(0..100), rng.gen());
                        other.append(&data);
                        bl.claim_append(&mut other);
                        shadow.extend_from_slice(&data);
                        assert_eq!(other.length(), 0);
                    }
                    3 if !bl.is_empty() => {
                        let off = rng.gen_range(0..bl.length());
                        let len = rng.gen_range(0..=bl.length() - off);
                        bl.splice(off, len, None);
                        shadow.drain(off..off + len);
                    }
                    4 if !bl.is_empty() => {
                        let off = rng.gen_range(0..bl.length());
                        let len = rng.gen_range(0..=bl.length() - off);
                        let mut sub = BufferList::new();
                        sub.substr_of(&bl, off, len);
                        assert_eq!(sub.to_vec(), &shadow[off..off + len]);
                    }
                    5 => {
                        bl.clear();
                        shadow.clear();
                    }
                    _ => {}
                }
                check_len(&bl);
                assert_eq!(bl.length(), shadow.len());
            }
            assert_eq!(bl.to_vec(), shadow);
        }
    }

    #[test]
    fn test_refcounts_return_to_baseline() {
        let _gate = crate::test_util::alloc_gate();
        let before = crate::allocated();
        {
            let mut bl = BufferList::new();
            bl.append(&sample(10_000, 3));
            let mut sub = BufferList::new();
            sub.substr_of(&bl, 100, 5_000);
            let mut claimed = BufferList::new();
            bl.splice(0, 2_000, Some(&mut claimed));
            drop(bl);
            // Views in sub and claimed keep the raws alive.
            assert!(crate::allocated() > before);
        }
        // All handles (arena included) released.
        assert_eq!(crate::allocated(), before);
    }

    #[test]
    fn test_concurrent_clone_drop() {
        let _gate = crate::test_util::alloc_gate();
        let before = crate::allocated();
        let view = View::with_size(4096);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let v = view.clone();
                std::thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(i);
                    let mut clones = Vec::new();
                    for _ in 0..1000 {
                        if rng.gen_bool(0.5) {
                            clones.push(v.clone());
                        } else {
                            clones.pop();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(view.raw_refcount(), 1);
        drop(view);
        assert_eq!(crate::allocated(), before);
    }
}
