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

//! A library for building and compiling Parsing Expression Grammars (PEG). A grammar is declared
//! either programmatically, through the builder functions in this crate (`seq`, `first`,
//! `one_or_more`, and friends), or textually, through the meta-grammar in the companion `pikapar`
//! crate. Either way the input to compilation is a list of [`Rule`](struct.Rule.html)s, and the
//! output is an immutable [`Grammar`](grammar/struct.Grammar.html).
//!
//! PEG terminology is used as follows:
//!
//!   * A *clause* is one node of a grammar's parsing graph: a literal, a character set, a
//!     sequence, a prioritized choice, a repetition, or a lookahead.
//!   * A *rule* maps a name to a clause, optionally with a precedence and associativity.
//!   * A *labeled subclause* is an edge from a clause to one of its children, optionally
//!     carrying an AST label. Labels belong to the edge, not to the child.
//!
//! Compilation deduplicates structurally identical clauses, resolves all rule references to
//! direct edges, orders the resulting graph topologically (terminals first), and precomputes the
//! `can_match_zero` and seed-parent metadata that the pika parser in `pikapar` relies on.
//! `Grammar` makes the following guarantees:
//!
//!   * Clauses are numbered from `0` to `clauses_len() - 1` (inclusive), and every subclause of
//!     a clause has an index no greater than its parent's, except across the back-edge of a
//!     recursive cycle.
//!   * `RuleRef` and `AstLabel` never appear in a compiled graph: references are resolved to
//!     edges and labels have been transferred onto them.
//!   * A `Grammar` is immutable and may be shared freely between concurrent parses.

extern crate fnv;
extern crate indexmap;
#[macro_use]
extern crate lazy_static;
extern crate regex;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;
extern crate vob;

mod ast;
mod charset;
pub mod grammar;
mod idxnewtype;

pub use ast::{
    ast_label, ch, charset, first, followed_by, lit, lit_ignore_case, not_followed_by, nothing,
    one_or_more, optional, rule_ref, seq, start, zero_or_more, Assoc, ClauseAST, LabeledClauseAST,
    Rule
};
pub use charset::{unescape_char, unescape_string, CharSet, CharSetError};
pub use grammar::{Clause, ClauseKind, Grammar, GrammarError, GrammarWarning};
pub use idxnewtype::{ClauseIdx, RuleIdx};
