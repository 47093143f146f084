// Copyright (c) 2018 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! A bump arena for per-parse match records. Matches are many, short-lived relative to the
//! parse, and never freed individually: allocation appends to fixed-capacity blocks (so
//! existing records never move and indices stay stable), and the whole arena is freed in one
//! sweep when the memo table is dropped.

use std::cmp;
use std::mem;

const BLOCK_BYTES: usize = 64 * 1024;

pub(crate) struct Arena<T> {
    blocks: Vec<Vec<T>>,
    block_cap: usize
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Arena<T> {
        let block_cap = cmp::max(1, BLOCK_BYTES / cmp::max(1, mem::size_of::<T>()));
        Arena::with_block_cap(block_cap)
    }

    fn with_block_cap(block_cap: usize) -> Arena<T> {
        Arena {
            blocks: Vec::new(),
            block_cap
        }
    }

    /// Store `v`, returning an index that stays valid for the arena's lifetime.
    pub(crate) fn alloc(&mut self, v: T) -> usize {
        let full = match self.blocks.last() {
            Some(b) => b.len() == self.block_cap,
            None => true
        };
        if full {
            let cap = self.block_cap;
            self.blocks.push(Vec::with_capacity(cap));
        }
        let bi = self.blocks.len() - 1;
        let b = &mut self.blocks[bi];
        b.push(v);
        bi * self.block_cap + b.len() - 1
    }

    pub(crate) fn get(&self, i: usize) -> &T {
        &self.blocks[i / self.block_cap][i % self.block_cap]
    }

    pub(crate) fn len(&self) -> usize {
        match self.blocks.last() {
            Some(b) => (self.blocks.len() - 1) * self.block_cap + b.len(),
            None => 0
        }
    }
}

#[cfg(test)]
mod test {
    use super::Arena;

    #[test]
    fn test_alloc_across_blocks() {
        let mut arena = Arena::with_block_cap(4);
        for i in 0..11usize {
            let idx = arena.alloc(i * 10);
            assert_eq!(idx, i);
        }
        assert_eq!(arena.len(), 11);
        for i in 0..11usize {
            assert_eq!(*arena.get(i), i * 10);
        }
        assert_eq!(arena.blocks.len(), 3);
    }

    #[test]
    fn test_indices_stable_as_blocks_grow() {
        let mut arena = Arena::with_block_cap(2);
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        let first = arena.get(a) as *const &str;
        for _ in 0..100 {
            arena.alloc("x");
        }
        assert_eq!(arena.get(a) as *const &str, first);
        assert_eq!(*arena.get(b), "b");
    }
}
