// Copyright (c) 2017 King's College London
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

//! The builder-side representation of a grammar: an owned tree of `ClauseAST` nodes, constructed
//! through the functions at the bottom of this file and consumed by `Grammar::from_rules`. The
//! builders perform the trivial rewrites (e.g. `optional(c)` is `first(c, nothing())`) and
//! transfer `AstLabel` wrappers onto the enclosing subclause edge, so an `AstLabel` node only
//! ever survives at the root of a rule.

use std::fmt;

use charset::CharSet;

/// One node of a grammar under construction. `RuleRef` and `AstLabel` are transient: the former
/// is resolved away during compilation, the latter is consumed by whichever builder (or `Rule`)
/// receives it.
#[derive(Clone, Debug, PartialEq)]
pub enum ClauseAST {
    CharSeq { s: String, ignore_case: bool },
    CharSet(CharSet),
    Start,
    Nothing,
    Seq(Vec<LabeledClauseAST>),
    First(Vec<LabeledClauseAST>),
    OneOrMore(Box<LabeledClauseAST>),
    FollowedBy(Box<LabeledClauseAST>),
    NotFollowedBy(Box<LabeledClauseAST>),
    RuleRef(String),
    AstLabel { label: String, clause: Box<ClauseAST> }
}

/// An edge to a subclause, optionally carrying an AST label. The label is owned by the edge, not
/// by the child clause.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledClauseAST {
    pub label: Option<String>,
    pub clause: ClauseAST
}

/// Rule associativity, used by the precedence-climbing rewrite to decide which self-reference of
/// a rule stays at the current precedence level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Assoc {
    Left,
    Right
}

/// A named top-level clause. Rules sharing a base name but declaring distinct precedences form a
/// precedence group and are rewritten into a climbing chain during compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub name: String,
    pub precedence: Option<u32>,
    pub assoc: Option<Assoc>,
    pub labeled_clause: LabeledClauseAST
}

impl Rule {
    pub fn new(name: &str, clause: ClauseAST) -> Rule {
        Rule {
            name: name.to_string(),
            precedence: None,
            assoc: None,
            labeled_clause: labeled(clause)
        }
    }

    pub fn new_prec(name: &str, precedence: u32, assoc: Option<Assoc>, clause: ClauseAST) -> Rule {
        Rule {
            name: name.to_string(),
            precedence: Some(precedence),
            assoc,
            labeled_clause: labeled(clause)
        }
    }
}

/// Turn a clause into a subclause edge, consuming an `AstLabel` wrapper into the edge's label.
fn labeled(clause: ClauseAST) -> LabeledClauseAST {
    match clause {
        ClauseAST::AstLabel { label, clause } => LabeledClauseAST {
            label: Some(label),
            clause: *clause
        },
        clause => LabeledClauseAST {
            label: None,
            clause
        }
    }
}

/// All children must match in order.
pub fn seq(subs: Vec<ClauseAST>) -> ClauseAST {
    ClauseAST::Seq(subs.into_iter().map(labeled).collect())
}

/// Prioritized choice: the first child that matches wins.
pub fn first(subs: Vec<ClauseAST>) -> ClauseAST {
    ClauseAST::First(subs.into_iter().map(labeled).collect())
}

/// Greedy one-or-more repetition. Repetition of a repetition, of `nothing`, of a lookahead, or
/// of `start` would change nothing, so those arguments are returned unchanged.
pub fn one_or_more(sub: ClauseAST) -> ClauseAST {
    let collapse = {
        let inner = match sub {
            ClauseAST::AstLabel { ref clause, .. } => &**clause,
            ref c => c
        };
        match *inner {
            ClauseAST::OneOrMore(_)
            | ClauseAST::Nothing
            | ClauseAST::FollowedBy(_)
            | ClauseAST::NotFollowedBy(_)
            | ClauseAST::Start => true,
            _ => false
        }
    };
    if collapse {
        sub
    } else {
        ClauseAST::OneOrMore(Box::new(labeled(sub)))
    }
}

/// `optional(c)` is `first(c, nothing())`.
pub fn optional(sub: ClauseAST) -> ClauseAST {
    first(vec![sub, nothing()])
}

/// `zero_or_more(c)` is `optional(one_or_more(c))`.
pub fn zero_or_more(sub: ClauseAST) -> ClauseAST {
    optional(one_or_more(sub))
}

/// Zero-length positive lookahead. `followed_by(nothing())` collapses to `nothing()`. Applying
/// it to another lookahead or to `start` is a contract violation, reported by
/// `Grammar::from_rules`.
pub fn followed_by(sub: ClauseAST) -> ClauseAST {
    match sub {
        ClauseAST::Nothing => ClauseAST::Nothing,
        sub => ClauseAST::FollowedBy(Box::new(labeled(sub)))
    }
}

/// Zero-length negative lookahead. A double negation collapses to `followed_by`.
pub fn not_followed_by(sub: ClauseAST) -> ClauseAST {
    match sub {
        ClauseAST::NotFollowedBy(inner) => ClauseAST::FollowedBy(inner),
        sub => ClauseAST::NotFollowedBy(Box::new(labeled(sub)))
    }
}

/// Matches with zero length at position 0 only.
pub fn start() -> ClauseAST {
    ClauseAST::Start
}

/// Matches with zero length everywhere.
pub fn nothing() -> ClauseAST {
    ClauseAST::Nothing
}

/// A literal string.
pub fn lit(s: &str) -> ClauseAST {
    ClauseAST::CharSeq {
        s: s.to_string(),
        ignore_case: false
    }
}

/// A literal string, matched case-insensitively.
pub fn lit_ignore_case(s: &str) -> ClauseAST {
    ClauseAST::CharSeq {
        s: s.to_string(),
        ignore_case: true
    }
}

/// A single character.
pub fn ch(c: char) -> ClauseAST {
    ClauseAST::CharSet(CharSet::from_char(c))
}

/// A character set.
pub fn charset(cs: CharSet) -> ClauseAST {
    ClauseAST::CharSet(cs)
}

/// A named reference to another rule, resolved during compilation.
pub fn rule_ref(name: &str) -> ClauseAST {
    ClauseAST::RuleRef(name.to_string())
}

/// Wrap a clause with an AST label. The label is transferred onto the subclause edge by
/// whichever builder or `Rule` consumes the wrapper.
pub fn ast_label(label: &str, sub: ClauseAST) -> ClauseAST {
    ClauseAST::AstLabel {
        label: label.to_string(),
        clause: Box::new(sub)
    }
}

impl fmt::Display for ClauseAST {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn sub_string(lc: &LabeledClauseAST, parent_prec: u8) -> String {
            let mut s = String::new();
            if let Some(ref l) = lc.label {
                s.push_str(l);
                s.push(':');
            }
            let child_prec = prec(&lc.clause);
            if child_prec < parent_prec || (lc.label.is_some() && child_prec < 7) {
                s.push('(');
                s.push_str(&lc.clause.to_string());
                s.push(')');
            } else {
                s.push_str(&lc.clause.to_string());
            }
            s
        }

        fn prec(c: &ClauseAST) -> u8 {
            match *c {
                ClauseAST::First(_) => 1,
                ClauseAST::Seq(_) => 2,
                ClauseAST::AstLabel { .. } => 3,
                ClauseAST::FollowedBy(_) | ClauseAST::NotFollowedBy(_) => 5,
                ClauseAST::OneOrMore(_) => 6,
                _ => 7
            }
        }

        match *self {
            ClauseAST::CharSeq { ref s, ignore_case } => {
                let esc = s
                    .chars()
                    .map(|c| match c {
                        '"' => "\\\"".to_string(),
                        '\\' => "\\\\".to_string(),
                        '\n' => "\\n".to_string(),
                        '\r' => "\\r".to_string(),
                        '\t' => "\\t".to_string(),
                        c => c.to_string()
                    })
                    .collect::<String>();
                if ignore_case {
                    write!(f, "i\"{}\"", esc)
                } else {
                    write!(f, "\"{}\"", esc)
                }
            }
            ClauseAST::CharSet(ref cs) => write!(f, "{}", cs),
            ClauseAST::Start => write!(f, "^"),
            ClauseAST::Nothing => write!(f, "()"),
            ClauseAST::Seq(ref subs) => {
                let strs = subs.iter().map(|x| sub_string(x, 2)).collect::<Vec<_>>();
                write!(f, "{}", strs.join(" "))
            }
            ClauseAST::First(ref subs) => {
                let strs = subs.iter().map(|x| sub_string(x, 1)).collect::<Vec<_>>();
                write!(f, "{}", strs.join(" / "))
            }
            ClauseAST::OneOrMore(ref sub) => write!(f, "{}+", sub_string(sub, 7)),
            ClauseAST::FollowedBy(ref sub) => write!(f, "&{}", sub_string(sub, 7)),
            ClauseAST::NotFollowedBy(ref sub) => write!(f, "!{}", sub_string(sub, 7)),
            ClauseAST::RuleRef(ref name) => write!(f, "{}", name),
            ClauseAST::AstLabel { ref label, ref clause } => write!(f, "{}:({})", label, clause)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_optional_is_first_of_nothing() {
        let c = optional(lit("a"));
        match c {
            ClauseAST::First(ref subs) => {
                assert_eq!(subs.len(), 2);
                assert_eq!(subs[0].clause, lit("a"));
                assert_eq!(subs[1].clause, ClauseAST::Nothing);
            }
            _ => panic!("{:?}", c)
        }
    }

    #[test]
    fn test_zero_or_more_shape() {
        let c = zero_or_more(lit("a"));
        match c {
            ClauseAST::First(ref subs) => {
                assert_eq!(subs.len(), 2);
                match subs[0].clause {
                    ClauseAST::OneOrMore(_) => (),
                    ref x => panic!("{:?}", x)
                }
                assert_eq!(subs[1].clause, ClauseAST::Nothing);
            }
            _ => panic!("{:?}", c)
        }
    }

    #[test]
    fn test_double_negation_is_positive_lookahead() {
        let c = not_followed_by(not_followed_by(lit("a")));
        match c {
            ClauseAST::FollowedBy(ref sub) => assert_eq!(sub.clause, lit("a")),
            _ => panic!("{:?}", c)
        }
    }

    #[test]
    fn test_followed_by_nothing_collapses() {
        assert_eq!(followed_by(nothing()), ClauseAST::Nothing);
    }

    #[test]
    fn test_one_or_more_collapses() {
        let inner = one_or_more(lit("a"));
        assert_eq!(one_or_more(inner.clone()), inner);
        assert_eq!(one_or_more(nothing()), ClauseAST::Nothing);
        let fb = followed_by(lit("a"));
        assert_eq!(one_or_more(fb.clone()), fb);
        assert_eq!(one_or_more(start()), ClauseAST::Start);
    }

    #[test]
    fn test_label_transfer() {
        let c = seq(vec![ast_label("lhs", lit("a")), lit("b")]);
        match c {
            ClauseAST::Seq(ref subs) => {
                assert_eq!(subs[0].label.as_ref().unwrap(), "lhs");
                assert_eq!(subs[0].clause, lit("a"));
                assert!(subs[1].label.is_none());
            }
            _ => panic!("{:?}", c)
        }
    }

    #[test]
    fn test_rule_keeps_root_label() {
        let r = Rule::new("R", ast_label("top", lit("a")));
        assert_eq!(r.labeled_clause.label.as_ref().unwrap(), "top");
        assert_eq!(r.labeled_clause.clause, lit("a"));
    }

    #[test]
    fn test_display() {
        let c = seq(vec![
            first(vec![lit("a"), lit("b")]),
            one_or_more(ch('c')),
            ast_label("x", lit("d")),
        ]);
        assert_eq!(c.to_string(), "(\"a\" / \"b\") 'c'+ x:\"d\"");
    }
}
