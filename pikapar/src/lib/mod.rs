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

//! A pika parser: a packrat PEG parser which runs in a single right-to-left
//! dynamic-programming pass with bounded fixpoint iteration, supporting direct and indirect
//! left recursion without any grammar rewriting on the user's part. A parse takes a compiled
//! [`peggram::Grammar`](../peggram/grammar/struct.Grammar.html) and an input string and fills a
//! [`MemoTable`](struct.MemoTable.html): a flat `(input_len + 1) × clause_count` table of
//! best-match handles, from which non-overlapping top-level matches, labeled parse trees and
//! syntax-error spans can then be read.
//!
//! Grammars can be written textually in the PEG surface syntax and turned into a `Grammar` with
//! [`grammar_from_str`](fn.grammar_from_str.html):
//!
//! ```ignore
//!   let grm = grammar_from_str("E <- E '+' '1' / '1';").unwrap();
//!   let memo = parse(&grm, "1+1+1");
//!   assert_eq!(memo.non_overlapping_matches_for_rule("E").unwrap()[0].len(), 5);
//! ```
//!
//! The grammar is read-only after construction and safe to share across threads; every `parse`
//! call owns its memo table and the arena behind it, and never fails: an input the top rule does
//! not match simply yields no top-level matches and a non-empty syntax-error list.

extern crate peggram;

#[macro_use]
extern crate lazy_static;

mod arena;
mod astree;
mod memotable;
mod metagram;
mod parser;

pub use astree::AstNode;
pub use memotable::{Match, MatchIdx, MemoTable, SyntaxError};
pub use metagram::{grammar_from_str, meta_grammar, GrammarTextError};
pub use parser::{parse, parse_with_options, ParseOptions};
