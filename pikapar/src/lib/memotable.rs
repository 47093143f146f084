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

//! The memoization table filled by one parse: a flat `(input_len + 1) × clause_count` array of
//! best-match handles, plus the arena that owns every match record. Between two candidates for
//! the same cell, a match beats absence and a strictly longer match beats a shorter one;
//! equal-length candidates never displace the incumbent, which is what makes `First` realize
//! PEG prioritized choice under the right-to-left pass.
//!
//! A lookup of a cell with no stored match is not necessarily a failure: a `NotFollowedBy` is
//! evaluated on demand (its success depends on the absence of its subclause's match), and any
//! clause that can match zero characters is taken to match zero-length. Parents may therefore
//! assume that a nullable child absent from the table matches the empty string.

use std::cmp;
use std::fmt;

use peggram::{ClauseIdx, ClauseKind, Grammar};

use arena::Arena;

/// An index identifying one arena-allocated match record of one parse.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MatchIdx(u32);

impl From<MatchIdx> for usize {
    fn from(i: MatchIdx) -> usize {
        i.0 as usize
    }
}

impl From<usize> for MatchIdx {
    fn from(i: usize) -> MatchIdx {
        debug_assert!(i <= u32::max_value() as usize);
        MatchIdx(i as u32)
    }
}

/// The arena-resident record of one successful parse of one clause at one position.
struct MatchData {
    clause: ClauseIdx,
    start: u32,
    len: u32,
    /// Only meaningful for `First`: the index of the subclause that matched.
    first_sub: u32,
    subs: Vec<MatchIdx>
}

/// A view of one match. Positions and lengths count characters of the input. A `Match` stays
/// valid for as long as the memo table it came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Match {
    clause: ClauseIdx,
    start: usize,
    len: usize,
    idx: Option<MatchIdx>
}

impl Match {
    pub fn clause(&self) -> ClauseIdx {
        self.clause
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// An uncovered span of the input, as reported by `MemoTable::syntax_errors`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxError {
    pub start: usize,
    pub end: usize,
    pub text: String
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..{}: \"{}\"", self.start, self.end, self.text)
    }
}

/// A match candidate computed by the parser driver, before it is compared against the memo
/// table. Submatches are recorded as `(clause, position)` pairs and only turned into handles if
/// the candidate wins its cell.
pub(crate) struct Candidate {
    pub(crate) len: usize,
    pub(crate) first_sub: u32,
    pub(crate) subs: Vec<(ClauseIdx, usize)>
}

impl Candidate {
    pub(crate) fn terminal(len: usize) -> Candidate {
        Candidate {
            len,
            first_sub: 0,
            subs: Vec::new()
        }
    }
}

/// The durable artefact of one parse. Owns the decoded input, the flat best-match table and the
/// arena holding every match record; all accessors read it.
pub struct MemoTable<'a> {
    grm: &'a Grammar,
    input: Vec<char>,
    table: Vec<Option<MatchIdx>>,
    arena: Arena<MatchData>,
    store_submatches: bool
}

impl<'a> MemoTable<'a> {
    pub(crate) fn new(grm: &'a Grammar, input: &str, store_submatches: bool) -> MemoTable<'a> {
        let input = input.chars().collect::<Vec<_>>();
        let table = vec![None; (input.len() + 1) * grm.clauses_len()];
        MemoTable {
            grm,
            input,
            table,
            arena: Arena::new(),
            store_submatches
        }
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grm
    }

    /// The length of the input in characters.
    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// The substring of the input covering `len` characters from `start`.
    pub fn text(&self, start: usize, len: usize) -> String {
        self.input[start..start + len].iter().cloned().collect()
    }

    pub fn match_text(&self, m: Match) -> String {
        self.text(m.start(), m.len())
    }

    fn cell(&self, cidx: ClauseIdx, pos: usize) -> usize {
        pos * self.grm.clauses_len() + usize::from(cidx)
    }

    fn stored(&self, cidx: ClauseIdx, pos: usize) -> Option<MatchIdx> {
        self.table[self.cell(cidx, pos)]
    }

    fn view(&self, mi: MatchIdx) -> Match {
        let md = self.arena.get(usize::from(mi));
        Match {
            clause: md.clause,
            start: md.start as usize,
            len: md.len as usize,
            idx: Some(mi)
        }
    }

    pub(crate) fn input_char(&self, pos: usize) -> Option<char> {
        self.input.get(pos).cloned()
    }

    pub(crate) fn input_matches_at(&self, pos: usize, chars: &[char], ignore_case: bool) -> bool {
        if pos + chars.len() > self.input.len() {
            return false;
        }
        let window = &self.input[pos..pos + chars.len()];
        if ignore_case {
            window
                .iter()
                .zip(chars)
                .all(|(a, b)| a == b || a.to_lowercase().eq(b.to_lowercase()))
        } else {
            window == chars
        }
    }

    /// The length of the best match of `cidx` at `pos`, applying the implicit-match rule for
    /// cells with no stored entry.
    pub(crate) fn lookup_len(&self, cidx: ClauseIdx, pos: usize) -> Option<usize> {
        if let Some(mi) = self.stored(cidx, pos) {
            return Some(self.arena.get(usize::from(mi)).len as usize);
        }
        let c = self.grm.clause(cidx);
        match *c.kind() {
            ClauseKind::NotFollowedBy => {
                if self.lookup_len(c.subclauses()[0].1, pos).is_none() {
                    Some(0)
                } else {
                    None
                }
            }
            _ if c.can_match_zero() => Some(0),
            _ => None
        }
    }

    pub(crate) fn store_submatches(&self) -> bool {
        self.store_submatches
    }

    /// Write `cand` into its cell if it is strictly better than the stored match (a match beats
    /// absence; longer beats shorter; ties keep the incumbent). Returns whether the cell was
    /// updated.
    pub(crate) fn add_match(&mut self, cidx: ClauseIdx, pos: usize, cand: Candidate) -> bool {
        let better = match self.stored(cidx, pos) {
            Some(mi) => (self.arena.get(usize::from(mi)).len as usize) < cand.len,
            None => true
        };
        if !better {
            return false;
        }
        let mut subs = Vec::with_capacity(cand.subs.len());
        for &(scidx, spos) in &cand.subs {
            let smi = match self.stored(scidx, spos) {
                Some(smi) => smi,
                // The subclause matched through the implicit zero-length rule; give the parent
                // a real record to point at.
                None => MatchIdx::from(self.arena.alloc(MatchData {
                    clause: scidx,
                    start: spos as u32,
                    len: 0,
                    first_sub: 0,
                    subs: Vec::new()
                }))
            };
            subs.push(smi);
        }
        let mi = MatchIdx::from(self.arena.alloc(MatchData {
            clause: cidx,
            start: pos as u32,
            len: cand.len as u32,
            first_sub: cand.first_sub,
            subs
        }));
        let cell = self.cell(cidx, pos);
        self.table[cell] = Some(mi);
        true
    }

    /// The best known match of `cidx` at `pos`: the stored match, an on-demand evaluation for
    /// `NotFollowedBy`, or a zero-length match for any clause that can match zero characters.
    pub fn best_match(&self, cidx: ClauseIdx, pos: usize) -> Option<Match> {
        if pos > self.input_len() {
            return None;
        }
        if let Some(mi) = self.stored(cidx, pos) {
            return Some(self.view(mi));
        }
        if self.lookup_len(cidx, pos).is_some() {
            Some(Match {
                clause: cidx,
                start: pos,
                len: 0,
                idx: None
            })
        } else {
            None
        }
    }

    /// Every stored match of `cidx`, in position order.
    pub fn all_matches(&self, cidx: ClauseIdx) -> Vec<Match> {
        let mut out = Vec::new();
        for pos in 0..self.input_len() + 1 {
            if let Some(mi) = self.stored(cidx, pos) {
                out.push(self.view(mi));
            }
        }
        out
    }

    /// The maximal set of non-overlapping matches of `cidx`, preferring leftmost matches: a
    /// match is kept if it starts at or after the end of the previously kept one. Cells with no
    /// stored match fall back to the implicit-match rule, so a nullable clause yields a
    /// zero-length match at an uncovered position.
    pub fn non_overlapping_matches(&self, cidx: ClauseIdx) -> Vec<Match> {
        let mut out = Vec::new();
        let limit = cmp::max(self.input_len(), 1);
        let mut pos = 0;
        while pos < limit && pos <= self.input_len() {
            match self.best_match(cidx, pos) {
                Some(m) => {
                    let end = m.end();
                    out.push(m);
                    pos = cmp::max(pos + 1, end);
                }
                None => pos += 1
            }
        }
        out
    }

    pub fn all_matches_for_rule(&self, name: &str) -> Option<Vec<Match>> {
        self.grm.rule_clause(name).map(|c| self.all_matches(c))
    }

    pub fn non_overlapping_matches_for_rule(&self, name: &str) -> Option<Vec<Match>> {
        self.grm.rule_clause(name).map(|c| self.non_overlapping_matches(c))
    }

    /// Compute the spans of the input not covered by any non-overlapping match of the coverage
    /// rules: the complement, within `[0, input_len)`, of the union of their match intervals.
    /// Unknown rule names are ignored.
    pub fn syntax_errors(&self, coverage: &[&str]) -> Vec<SyntaxError> {
        let mut intervals = Vec::new();
        for name in coverage {
            if let Some(cidx) = self.grm.rule_clause(name) {
                for m in self.non_overlapping_matches(cidx) {
                    if m.len() > 0 {
                        intervals.push((m.start(), m.end()));
                    }
                }
            }
        }
        intervals.sort();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (s, e) in intervals {
            if let Some(last) = merged.last_mut() {
                if s <= last.1 {
                    last.1 = cmp::max(last.1, e);
                    continue;
                }
            }
            merged.push((s, e));
        }
        let mut out = Vec::new();
        let mut prev = 0;
        for (s, e) in merged {
            if s > prev {
                out.push(SyntaxError {
                    start: prev,
                    end: s,
                    text: self.text(prev, s - prev)
                });
            }
            prev = cmp::max(prev, e);
        }
        if prev < self.input_len() {
            out.push(SyntaxError {
                start: prev,
                end: self.input_len(),
                text: self.text(prev, self.input_len() - prev)
            });
        }
        out
    }

    /// The labeled submatches of `m`: one per subclause for `Seq`, the single matching branch
    /// for `First`, and the flattened element list for `OneOrMore` (the right-recursive chain
    /// through which a repetition is built is invisible here). Matches synthesized through the
    /// implicit zero-length rule, and matches from a parse with `store_submatches` disabled,
    /// have no submatches.
    pub fn submatches(&self, m: Match) -> Vec<(Option<&'a str>, Match)> {
        let mi = match m.idx {
            Some(mi) => mi,
            None => return Vec::new()
        };
        let md = self.arena.get(usize::from(mi));
        let clause = self.grm.clause(md.clause);
        match *clause.kind() {
            ClauseKind::Seq => clause
                .subclauses()
                .iter()
                .zip(&md.subs)
                .map(|(&(ref l, _), &smi)| (label_str(l), self.view(smi)))
                .collect(),
            ClauseKind::First => {
                if md.subs.is_empty() {
                    return Vec::new();
                }
                let (ref l, _) = clause.subclauses()[md.first_sub as usize];
                vec![(label_str(l), self.view(md.subs[0]))]
            }
            ClauseKind::OneOrMore => {
                let label = label_str(&clause.subclauses()[0].0);
                let mut out = Vec::new();
                let mut cur = md;
                loop {
                    if cur.subs.is_empty() {
                        break;
                    }
                    out.push((label, self.view(cur.subs[0])));
                    if cur.subs.len() == 2 {
                        cur = self.arena.get(usize::from(cur.subs[1]));
                    } else {
                        break;
                    }
                }
                out
            }
            _ => Vec::new()
        }
    }

    /// Render `m` as `"<rules> <- <clause> : <start>+<len>"`.
    pub fn pp_match(&self, m: Match) -> String {
        format!(
            "{} : {}+{}",
            self.grm.clause_string_with_rule_names(m.clause()),
            m.start(),
            m.len()
        )
    }

    /// Dump every stored match, one line per match, highest clause first. For debugging.
    pub fn pp(&self) -> String {
        let mut out = String::new();
        for i in (0..self.grm.clauses_len()).rev() {
            let cidx = ClauseIdx::from(i);
            for m in self.all_matches(cidx) {
                out.push_str(&self.pp_match(m));
                out.push('\n');
            }
        }
        out
    }
}

fn label_str<'b>(l: &'b Option<String>) -> Option<&'b str> {
    l.as_ref().map(|s| s.as_str())
}
