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

//! The parser driver. Positions are processed strictly right-to-left; at each position every
//! terminal (bar `Nothing`, which the implicit-match rule covers) seeds a priority queue keyed
//! on topological clause index, and clauses are popped smallest-index first, so that when a
//! clause is evaluated everything it depends on at this position has already settled. A clause
//! whose best match improves wakes its seed parents; because every cell update strictly
//! increases the stored length, the inner fixpoint is bounded.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use peggram::{ClauseIdx, ClauseKind, Grammar};

use memotable::{Candidate, MemoTable};

/// Options for a parse.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Record submatch handles on every match (the default). Disabling this makes matches
    /// cheaper but leaves the submatch and AST accessors with nothing to walk.
    pub store_submatches: bool
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            store_submatches: true
        }
    }
}

/// Parse `input` with default options. Parsing never fails: the absence of a match for the top
/// rule is visible through the memo table's accessors.
pub fn parse<'a>(grm: &'a Grammar, input: &str) -> MemoTable<'a> {
    parse_with_options(grm, input, &ParseOptions::default())
}

pub fn parse_with_options<'a>(
    grm: &'a Grammar,
    input: &str,
    opts: &ParseOptions
) -> MemoTable<'a> {
    let mut memo = MemoTable::new(grm, input, opts.store_submatches);
    let terminals = grm
        .clauses()
        .iter()
        .enumerate()
        .filter(|&(_, c)| {
            c.is_terminal()
                && match *c.kind() {
                    ClauseKind::Nothing => false,
                    _ => true
                }
        })
        .map(|(i, _)| ClauseIdx::from(i))
        .collect::<Vec<_>>();

    let mut queue = BinaryHeap::new();
    let len = memo.input_len();
    for pos in (0..len).rev() {
        for &t in &terminals {
            queue.push(Reverse(t));
        }
        while let Some(Reverse(cidx)) = queue.pop() {
            if let Some(cand) = try_match(&memo, cidx, pos) {
                let updated = memo.add_match(cidx, pos, cand);
                for &p in grm.clause(cidx).seed_parents() {
                    if updated || grm.clause(p).can_match_zero() {
                        queue.push(Reverse(p));
                    }
                }
            }
        }
    }
    memo
}

/// Compute the candidate match of `cidx` at `pos`. Only reads the memo table: child lookups go
/// through the implicit-match rule, so a nullable child absent from the table counts as a
/// zero-length match.
fn try_match(memo: &MemoTable, cidx: ClauseIdx, pos: usize) -> Option<Candidate> {
    let store = memo.store_submatches();
    let clause = memo.grammar().clause(cidx);
    match *clause.kind() {
        ClauseKind::CharSeq { ref chars, ignore_case } => {
            if memo.input_matches_at(pos, chars, ignore_case) {
                Some(Candidate::terminal(chars.len()))
            } else {
                None
            }
        }
        ClauseKind::CharSet(ref cs) => match memo.input_char(pos) {
            Some(c) if cs.matches(c) => Some(Candidate::terminal(1)),
            _ => None
        },
        ClauseKind::Start => {
            if pos == 0 {
                Some(Candidate::terminal(0))
            } else {
                None
            }
        }
        ClauseKind::Nothing => Some(Candidate::terminal(0)),
        ClauseKind::Seq => {
            let mut subs = Vec::with_capacity(if store { clause.subclauses().len() } else { 0 });
            let mut cur = pos;
            for &(_, s) in clause.subclauses() {
                let l = match memo.lookup_len(s, cur) {
                    Some(l) => l,
                    None => return None
                };
                if store {
                    subs.push((s, cur));
                }
                cur += l;
            }
            Some(Candidate {
                len: cur - pos,
                first_sub: 0,
                subs
            })
        }
        ClauseKind::First => {
            for (i, &(_, s)) in clause.subclauses().iter().enumerate() {
                if let Some(l) = memo.lookup_len(s, pos) {
                    return Some(Candidate {
                        len: l,
                        first_sub: i as u32,
                        subs: if store { vec![(s, pos)] } else { Vec::new() }
                    });
                }
            }
            None
        }
        ClauseKind::OneOrMore => {
            let s = clause.subclauses()[0].1;
            let l = match memo.lookup_len(s, pos) {
                Some(l) => l,
                None => return None
            };
            if l > 0 {
                if let Some(tl) = memo.lookup_len(cidx, pos + l) {
                    return Some(Candidate {
                        len: l + tl,
                        first_sub: 0,
                        subs: if store {
                            vec![(s, pos), (cidx, pos + l)]
                        } else {
                            Vec::new()
                        }
                    });
                }
            }
            Some(Candidate {
                len: l,
                first_sub: 0,
                subs: if store { vec![(s, pos)] } else { Vec::new() }
            })
        }
        ClauseKind::FollowedBy => {
            let s = clause.subclauses()[0].1;
            memo.lookup_len(s, pos).map(|_| Candidate::terminal(0))
        }
        ClauseKind::NotFollowedBy => {
            let s = clause.subclauses()[0].1;
            if memo.lookup_len(s, pos).is_none() {
                Some(Candidate::terminal(0))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use peggram::{
        charset, first, followed_by, lit, not_followed_by, one_or_more, rule_ref, seq,
        zero_or_more, CharSet, Grammar, Rule
    };

    use super::parse;

    fn grm(rules: Vec<Rule>) -> Grammar {
        Grammar::from_rules(rules).unwrap()
    }

    #[test]
    fn test_left_recursion() {
        // E <- E '+' '1' / '1';
        let grm = grm(vec![Rule::new(
            "E",
            first(vec![
                seq(vec![rule_ref("E"), lit("+"), lit("1")]),
                lit("1"),
            ])
        )]);
        let memo = parse(&grm, "1+1+1");
        let nom = memo.non_overlapping_matches_for_rule("E").unwrap();
        assert_eq!(nom.len(), 1);
        assert_eq!((nom[0].start(), nom[0].len()), (0, 5));
        // The match tree leans left: the leftmost leaf is the '1' at position 0.
        let mut m = nom[0];
        loop {
            let subs = memo.submatches(m);
            if subs.is_empty() {
                break;
            }
            m = subs[0].1;
        }
        assert_eq!((m.start(), m.len()), (0, 1));
        assert_eq!(memo.match_text(m), "1");
    }

    #[test]
    fn test_indirect_left_recursion() {
        // A <- B 'a' / 'a'; B <- A 'b';
        let grm = grm(vec![
            Rule::new(
                "A",
                first(vec![seq(vec![rule_ref("B"), lit("a")]), lit("a")])
            ),
            Rule::new("B", seq(vec![rule_ref("A"), lit("b")])),
        ]);
        let memo = parse(&grm, "ababa");
        let nom = memo.non_overlapping_matches_for_rule("A").unwrap();
        assert_eq!(nom.len(), 1);
        assert_eq!((nom[0].start(), nom[0].len()), (0, 5));
    }

    #[test]
    fn test_first_prefers_earlier_branch_with_longer_match() {
        // A <- 'a' 'b' / 'a'; on "ab" the first branch matches two characters.
        let grm = grm(vec![Rule::new(
            "A",
            first(vec![seq(vec![lit("a"), lit("b")]), lit("a")])
        )]);
        let memo = parse(&grm, "ab");
        let a = grm.rule_clause("A").unwrap();
        let m = memo.best_match(a, 0).unwrap();
        assert_eq!(m.len(), 2);
        let subs = memo.submatches(m);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].1.len(), 2);
    }

    #[test]
    fn test_first_branch_order_is_peg_choice() {
        // A <- 'a' / 'ab'; the earlier branch wins even though the later one is longer.
        let grm = grm(vec![Rule::new("A", first(vec![lit("a"), lit("ab")]))]);
        let memo = parse(&grm, "ab");
        let a = grm.rule_clause("A").unwrap();
        let m = memo.best_match(a, 0).unwrap();
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_lookaheads() {
        // A <- &'a' [a-z]; B <- ![0-9] [a-z0-9];
        let grm = grm(vec![
            Rule::new(
                "A",
                seq(vec![
                    followed_by(lit("a")),
                    charset(CharSet::from_range('a', 'z')),
                ])
            ),
            Rule::new(
                "B",
                seq(vec![
                    not_followed_by(charset(CharSet::from_range('0', '9'))),
                    charset(CharSet::from_range('0', '9').union(&CharSet::from_range('a', 'z'))),
                ])
            ),
        ]);
        let memo = parse(&grm, "a");
        let a = grm.rule_clause("A").unwrap();
        assert_eq!(memo.best_match(a, 0).unwrap().len(), 1);
        let b = grm.rule_clause("B").unwrap();
        assert_eq!(memo.best_match(b, 0).unwrap().len(), 1);

        let memo = parse(&grm, "b");
        let a = grm.rule_clause("A").unwrap();
        assert!(memo.best_match(a, 0).is_none());

        let memo = parse(&grm, "7");
        let b = grm.rule_clause("B").unwrap();
        assert!(memo.best_match(b, 0).is_none());
    }

    #[test]
    fn test_repetition_is_greedy() {
        let grm = grm(vec![Rule::new(
            "R",
            seq(vec![one_or_more(lit("a")), zero_or_more(lit("b"))])
        )]);
        let memo = parse(&grm, "aaabb");
        let r = grm.rule_clause("R").unwrap();
        assert_eq!(memo.best_match(r, 0).unwrap().len(), 5);
    }

    #[test]
    fn test_start_stored_only_at_zero() {
        use peggram::{start, ClauseIdx, ClauseKind};
        let grm = grm(vec![Rule::new("S", seq(vec![start(), one_or_more(lit("a"))]))]);
        let memo = parse(&grm, "aaa");
        let nom = memo.non_overlapping_matches_for_rule("S").unwrap();
        assert_eq!((nom[0].start(), nom[0].len()), (0, 3));
        // Start is seeded at every position but only ever matches (and is only ever stored) at
        // position 0.
        let start_idx = grm
            .clauses()
            .iter()
            .position(|c| match *c.kind() {
                ClauseKind::Start => true,
                _ => false
            })
            .unwrap();
        let stored = memo.all_matches(ClauseIdx::from(start_idx));
        assert_eq!(stored.len(), 1);
        assert_eq!((stored[0].start(), stored[0].len()), (0, 0));
    }

    #[test]
    fn test_determinism() {
        let grm = grm(vec![
            Rule::new(
                "E",
                first(vec![
                    seq(vec![rule_ref("E"), lit("+"), lit("1")]),
                    lit("1"),
                ])
            ),
        ]);
        let a = parse(&grm, "1+1+1+1").pp();
        let b = parse(&grm, "1+1+1+1").pp();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_stored_lengths_only_grow() {
        // The cell for E at position 0 ends at the full input length even though shorter
        // matches are proposed first while the fixpoint iterates.
        let grm = grm(vec![Rule::new(
            "E",
            first(vec![
                seq(vec![rule_ref("E"), lit("+"), lit("1")]),
                lit("1"),
            ])
        )]);
        let memo = parse(&grm, "1+1");
        let e = grm.rule_clause("E").unwrap();
        assert_eq!(memo.best_match(e, 0).unwrap().len(), 3);
        assert_eq!(memo.best_match(e, 2).unwrap().len(), 1);
    }

    #[test]
    fn test_no_match_reported_through_accessors() {
        let grm = grm(vec![Rule::new("A", lit("abc"))]);
        let memo = parse(&grm, "xyz");
        assert!(memo.non_overlapping_matches_for_rule("A").unwrap().is_empty());
        let errs = memo.syntax_errors(&["A"]);
        assert_eq!(errs.len(), 1);
        assert_eq!((errs[0].start, errs[0].end), (0, 3));
    }
}
