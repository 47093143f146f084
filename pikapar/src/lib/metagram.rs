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

//! The meta-grammar: a pika grammar for the PEG surface syntax itself, built with the public
//! builders and compiled by the same pipeline as any user grammar. [`grammar_from_str`] parses
//! grammar text with it, checks that the text is fully covered, and maps the resulting AST
//! node-for-node onto builder calls. On failure it returns a structured error carrying the
//! position-annotated unmatched spans; no partial grammar is ever returned.

use std::error::Error;
use std::fmt;

use peggram::{
    ast_label, charset, first, followed_by, lit, not_followed_by, nothing, one_or_more, optional,
    rule_ref, seq, start, unescape_char, unescape_string, zero_or_more, Assoc, CharSet,
    CharSetError, ClauseAST, Grammar, GrammarError, Rule
};

use astree::AstNode;
use memotable::{MemoTable, SyntaxError};
use parser::parse;

const RULE_AST: &'static str = "RULE";
const IDENT_AST: &'static str = "IDENT";
const PREC_AST: &'static str = "PREC";
const L_ASSOC_AST: &'static str = "LASSOC";
const R_ASSOC_AST: &'static str = "RASSOC";
const SEQ_AST: &'static str = "SEQ";
const FIRST_AST: &'static str = "FIRST";
const ONE_OR_MORE_AST: &'static str = "ONEORMORE";
const ZERO_OR_MORE_AST: &'static str = "ZEROORMORE";
const OPTIONAL_AST: &'static str = "OPTIONAL";
const FOLLOWED_BY_AST: &'static str = "FOLLOWEDBY";
const NOT_FOLLOWED_BY_AST: &'static str = "NOTFOLLOWEDBY";
const LABEL_AST: &'static str = "LABEL";
const LABEL_NAME_AST: &'static str = "LABELNAME";
const LABEL_CLAUSE_AST: &'static str = "LABELCLAUSE";
const SINGLE_QUOTED_CHAR_AST: &'static str = "SQCHAR";
const CHAR_SET_AST: &'static str = "CHARSET";
const QUOTED_STRING_AST: &'static str = "QSTRING";
const NOTHING_AST: &'static str = "NOTHING";
const START_AST: &'static str = "START";

/// The rules whose non-overlapping matches must jointly cover the whole grammar text.
/// `CLAUSE[1]` is the lowest precedence level of `CLAUSE` after rewriting; the other levels are
/// covered through it.
const COVERAGE: [&'static str; 3] = ["GRAMMAR", "RULE", "CLAUSE[1]"];

lazy_static! {
    static ref META_GRAMMAR: Grammar =
        Grammar::from_rules(meta_rules()).expect("meta-grammar must compile");
}

/// The compiled meta-grammar. Shared, immutable, and built on first use.
pub fn meta_grammar() -> &'static Grammar {
    &META_GRAMMAR
}

fn meta_rules() -> Vec<Rule> {
    let ws = || charset(CharSet::from_chars(&[' ', '\n', '\r', '\t']));
    let name_start = || {
        charset(
            CharSet::from_range('a', 'z')
                .union(&CharSet::from_range('A', 'Z'))
                .union(&CharSet::from_chars(&['_', '-']))
        )
    };
    let name_cont = || {
        charset(
            CharSet::from_range('a', 'z')
                .union(&CharSet::from_range('A', 'Z'))
                .union(&CharSet::from_range('0', '9'))
                .union(&CharSet::from_chars(&['_', '-']))
        )
    };
    let w = || rule_ref("WSC");

    vec![
        Rule::new(
            "GRAMMAR",
            seq(vec![start(), w(), one_or_more(rule_ref("RULE"))])
        ),
        Rule::new(
            "RULE",
            ast_label(
                RULE_AST,
                seq(vec![
                    rule_ref("IDENT"),
                    w(),
                    optional(rule_ref("PREC")),
                    lit("<-"),
                    w(),
                    rule_ref("CLAUSE"),
                    w(),
                    lit(";"),
                    w(),
                ])
            )
        ),
        // The clause levels, lowest precedence first. A body whose entirety is one labeled
        // clause is wrapped in a single-subclause Seq so that the label stays on an inner edge
        // rather than being hoisted onto the rule header, where it would leak onto the
        // precedence chain's fallback alternative.
        Rule::new_prec(
            "CLAUSE",
            1,
            None,
            seq(vec![ast_label(
                FIRST_AST,
                seq(vec![
                    rule_ref("CLAUSE"),
                    w(),
                    one_or_more(seq(vec![lit("/"), w(), rule_ref("CLAUSE"), w()])),
                ])
            )])
        ),
        Rule::new_prec(
            "CLAUSE",
            2,
            None,
            seq(vec![ast_label(
                SEQ_AST,
                seq(vec![
                    rule_ref("CLAUSE"),
                    w(),
                    one_or_more(seq(vec![rule_ref("CLAUSE"), w()])),
                ])
            )])
        ),
        Rule::new_prec(
            "CLAUSE",
            3,
            None,
            seq(vec![ast_label(
                LABEL_AST,
                seq(vec![
                    ast_label(LABEL_NAME_AST, rule_ref("IDENT")),
                    w(),
                    lit(":"),
                    w(),
                    ast_label(LABEL_CLAUSE_AST, rule_ref("CLAUSE")),
                ])
            )])
        ),
        Rule::new_prec(
            "CLAUSE",
            4,
            None,
            seq(vec![
                ast_label(OPTIONAL_AST, rule_ref("CLAUSE")),
                w(),
                lit("?"),
            ])
        ),
        Rule::new_prec(
            "CLAUSE",
            5,
            None,
            first(vec![
                seq(vec![lit("&"), ast_label(FOLLOWED_BY_AST, rule_ref("CLAUSE"))]),
                seq(vec![lit("!"), ast_label(NOT_FOLLOWED_BY_AST, rule_ref("CLAUSE"))]),
            ])
        ),
        Rule::new_prec(
            "CLAUSE",
            6,
            None,
            first(vec![
                seq(vec![
                    ast_label(ONE_OR_MORE_AST, rule_ref("CLAUSE")),
                    w(),
                    lit("+"),
                ]),
                seq(vec![
                    ast_label(ZERO_OR_MORE_AST, rule_ref("CLAUSE")),
                    w(),
                    lit("*"),
                ]),
            ])
        ),
        Rule::new_prec(
            "CLAUSE",
            7,
            None,
            first(vec![
                rule_ref("IDENT"),
                rule_ref("QUOTEDSTRING"),
                rule_ref("CHARSET"),
                rule_ref("NOTHING"),
                rule_ref("START"),
            ])
        ),
        Rule::new_prec(
            "CLAUSE",
            8,
            None,
            seq(vec![lit("("), w(), rule_ref("CLAUSE"), w(), lit(")")])
        ),
        Rule::new(
            "WSC",
            zero_or_more(first(vec![ws(), rule_ref("COMMENT")]))
        ),
        Rule::new(
            "COMMENT",
            seq(vec![
                lit("#"),
                zero_or_more(charset(CharSet::from_chars(&['\n']).invert())),
            ])
        ),
        Rule::new(
            "IDENT",
            ast_label(
                IDENT_AST,
                seq(vec![name_start(), zero_or_more(name_cont())])
            )
        ),
        Rule::new("NUM", one_or_more(charset(CharSet::from_range('0', '9')))),
        Rule::new(
            "PREC",
            seq(vec![
                lit("["),
                w(),
                ast_label(PREC_AST, rule_ref("NUM")),
                w(),
                optional(seq(vec![
                    lit(","),
                    w(),
                    first(vec![
                        ast_label(R_ASSOC_AST, first(vec![lit("r"), lit("R")])),
                        ast_label(L_ASSOC_AST, first(vec![lit("l"), lit("L")])),
                    ]),
                    w(),
                ])),
                lit("]"),
                w(),
            ])
        ),
        Rule::new(
            "CHARSET",
            first(vec![
                seq(vec![
                    lit("'"),
                    ast_label(SINGLE_QUOTED_CHAR_AST, rule_ref("SINGLEQUOTEDCHAR")),
                    lit("'"),
                ]),
                seq(vec![
                    lit("["),
                    ast_label(
                        CHAR_SET_AST,
                        seq(vec![
                            optional(lit("^")),
                            one_or_more(first(vec![
                                rule_ref("CHARRANGE"),
                                rule_ref("CHARRANGECHAR"),
                            ])),
                        ])
                    ),
                    lit("]"),
                ]),
            ])
        ),
        Rule::new(
            "SINGLEQUOTEDCHAR",
            first(vec![
                rule_ref("ESCAPEDCTRLCHAR"),
                charset(CharSet::from_chars(&['\'']).invert()),
            ])
        ),
        Rule::new(
            "CHARRANGE",
            seq(vec![
                rule_ref("CHARRANGECHAR"),
                lit("-"),
                rule_ref("CHARRANGECHAR"),
            ])
        ),
        Rule::new(
            "CHARRANGECHAR",
            first(vec![
                charset(CharSet::from_chars(&['\\', ']']).invert()),
                rule_ref("ESCAPEDCTRLCHAR"),
                lit("\\-"),
                lit("\\\\"),
                lit("\\]"),
                lit("\\^"),
            ])
        ),
        Rule::new(
            "QUOTEDSTRING",
            seq(vec![
                lit("\""),
                ast_label(
                    QUOTED_STRING_AST,
                    zero_or_more(rule_ref("STRQUOTEDCHAR"))
                ),
                lit("\""),
            ])
        ),
        Rule::new(
            "STRQUOTEDCHAR",
            first(vec![
                rule_ref("ESCAPEDCTRLCHAR"),
                charset(CharSet::from_chars(&['"', '\\']).invert()),
            ])
        ),
        Rule::new(
            "ESCAPEDCTRLCHAR",
            first(vec![
                lit("\\t"),
                lit("\\b"),
                lit("\\n"),
                lit("\\r"),
                lit("\\f"),
                lit("\\'"),
                lit("\\\""),
                lit("\\\\"),
                seq(vec![
                    lit("\\u"),
                    rule_ref("HEX"),
                    rule_ref("HEX"),
                    rule_ref("HEX"),
                    rule_ref("HEX"),
                ]),
            ])
        ),
        Rule::new(
            "HEX",
            charset(
                CharSet::from_range('0', '9')
                    .union(&CharSet::from_range('a', 'f'))
                    .union(&CharSet::from_range('A', 'F'))
            )
        ),
        Rule::new(
            "NOTHING",
            ast_label(NOTHING_AST, seq(vec![lit("("), w(), lit(")")]))
        ),
        Rule::new("START", ast_label(START_AST, lit("^"))),
    ]
}

/// Errors from parsing textual grammar input.
#[derive(Debug, Eq, PartialEq)]
pub enum GrammarTextError {
    /// The text was not fully covered by the meta-grammar; the spans name the unmatched input.
    Unmatched(Vec<SyntaxError>),
    /// The text parsed, but the rules it declares do not compile.
    Build(GrammarError),
    /// A malformed character class or escape sequence.
    CharSet(CharSetError),
    /// A precedence too large to represent.
    BadPrecedence(String),
    /// The meta-grammar AST had an unexpected shape.
    Malformed(String)
}

impl From<GrammarError> for GrammarTextError {
    fn from(e: GrammarError) -> GrammarTextError {
        GrammarTextError::Build(e)
    }
}

impl From<CharSetError> for GrammarTextError {
    fn from(e: CharSetError) -> GrammarTextError {
        GrammarTextError::CharSet(e)
    }
}

impl fmt::Display for GrammarTextError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GrammarTextError::Unmatched(ref spans) => {
                write!(f, "Grammar text failed to parse; unmatched input at: ")?;
                let strs = spans.iter().map(|s| s.to_string()).collect::<Vec<_>>();
                write!(f, "{}", strs.join("; "))
            }
            GrammarTextError::Build(ref e) => e.fmt(f),
            GrammarTextError::CharSet(ref e) => e.fmt(f),
            GrammarTextError::BadPrecedence(ref s) => {
                write!(f, "Precedence '{}' out of range", s)
            }
            GrammarTextError::Malformed(ref s) => {
                write!(f, "Malformed grammar AST node: {}", s)
            }
        }
    }
}

impl Error for GrammarTextError {}

/// Parse the textual PEG `text` into a compiled grammar. The whole input must be covered by the
/// meta-grammar's coverage rules; uncovered spans fail the parse with their positions and text.
pub fn grammar_from_str(text: &str) -> Result<Grammar, GrammarTextError> {
    let meta = meta_grammar();
    let memo = parse(meta, text);
    let errs = memo.syntax_errors(&COVERAGE);
    if !errs.is_empty() {
        return Err(GrammarTextError::Unmatched(errs));
    }
    let gclause = meta.rule_clause("GRAMMAR").unwrap();
    let top = match memo.best_match(gclause, 0) {
        Some(m) => m,
        None => {
            return Err(GrammarTextError::Unmatched(vec![SyntaxError {
                start: 0,
                end: memo.input_len(),
                text: text.to_string()
            }]))
        }
    };
    let ast = AstNode::from_match("GRAMMAR", top, &memo);
    let mut rules = Vec::with_capacity(ast.children().len());
    for rnode in ast.children() {
        if rnode.label() != RULE_AST {
            return Err(GrammarTextError::Malformed(rnode.label().to_string()));
        }
        rules.push(rule_from_ast(rnode, &memo)?);
    }
    Grammar::from_rules(rules).map_err(GrammarTextError::Build)
}

fn rule_from_ast(node: &AstNode, memo: &MemoTable) -> Result<Rule, GrammarTextError> {
    let children = node.children();
    if children.len() < 2 || children[0].label() != IDENT_AST {
        return Err(GrammarTextError::Malformed(format!(
            "rule node with {} children",
            children.len()
        )));
    }
    let name = children[0].text(memo);
    let mut precedence = None;
    let mut assoc = None;
    for c in &children[1..children.len() - 1] {
        match c.label() {
            l if l == PREC_AST => {
                let t = c.text(memo);
                precedence =
                    Some(t.parse::<u32>().map_err(|_| GrammarTextError::BadPrecedence(t.clone()))?);
            }
            l if l == L_ASSOC_AST => assoc = Some(Assoc::Left),
            l if l == R_ASSOC_AST => assoc = Some(Assoc::Right),
            l => return Err(GrammarTextError::Malformed(l.to_string()))
        }
    }
    let body = clause_from_ast(&children[children.len() - 1], memo)?;
    Ok(match precedence {
        Some(p) => Rule::new_prec(&name, p, assoc, body),
        None => Rule::new(&name, body)
    })
}

/// Map one meta-grammar AST node onto the builder call it denotes.
fn clause_from_ast(node: &AstNode, memo: &MemoTable) -> Result<ClauseAST, GrammarTextError> {
    let children = node.children();
    match node.label() {
        l if l == SEQ_AST => {
            let mut subs = Vec::with_capacity(children.len());
            for c in children {
                subs.push(clause_from_ast(c, memo)?);
            }
            Ok(seq(subs))
        }
        l if l == FIRST_AST => {
            let mut subs = Vec::with_capacity(children.len());
            for c in children {
                subs.push(clause_from_ast(c, memo)?);
            }
            Ok(first(subs))
        }
        l if l == ONE_OR_MORE_AST => Ok(one_or_more(only_child(node, memo)?)),
        l if l == ZERO_OR_MORE_AST => Ok(zero_or_more(only_child(node, memo)?)),
        l if l == OPTIONAL_AST => Ok(optional(only_child(node, memo)?)),
        l if l == FOLLOWED_BY_AST => Ok(followed_by(only_child(node, memo)?)),
        l if l == NOT_FOLLOWED_BY_AST => Ok(not_followed_by(only_child(node, memo)?)),
        l if l == LABEL_AST => {
            if children.len() != 2
                || children[0].label() != LABEL_NAME_AST
                || children[1].label() != LABEL_CLAUSE_AST
                || children[1].children().len() != 1
            {
                return Err(GrammarTextError::Malformed("label node".to_string()));
            }
            let name = children[0].text(memo);
            let inner = clause_from_ast(&children[1].children()[0], memo)?;
            Ok(ast_label(&name, inner))
        }
        l if l == IDENT_AST => Ok(rule_ref(&node.text(memo))),
        l if l == QUOTED_STRING_AST => Ok(lit(&unescape_string(&node.text(memo))?)),
        l if l == SINGLE_QUOTED_CHAR_AST => {
            Ok(charset(CharSet::from_char(unescape_char(&node.text(memo))?)))
        }
        l if l == CHAR_SET_AST => Ok(charset(CharSet::from_pattern(&node.text(memo))?)),
        l if l == NOTHING_AST => Ok(nothing()),
        l if l == START_AST => Ok(start()),
        l => Err(GrammarTextError::Malformed(format!("unexpected node '{}'", l)))
    }
}

fn only_child(node: &AstNode, memo: &MemoTable) -> Result<ClauseAST, GrammarTextError> {
    if node.children().len() != 1 {
        return Err(GrammarTextError::Malformed(format!(
            "'{}' node with {} children",
            node.label(),
            node.children().len()
        )));
    }
    clause_from_ast(&node.children()[0], memo)
}

#[cfg(test)]
mod test {
    use super::{grammar_from_str, meta_grammar, GrammarTextError};
    use astree::AstNode;
    use parser::parse;

    #[test]
    fn test_meta_grammar_compiles_cleanly() {
        let meta = meta_grammar();
        assert!(meta.rules_len() >= 20);
        assert_eq!(meta.top_rule_name(), "GRAMMAR");
        assert!(meta.warnings().is_empty());
        // The precedence group was rewritten and the base name resolves to its lowest level.
        assert_eq!(meta.rule_clause("CLAUSE"), meta.rule_clause("CLAUSE[1]"));
    }

    #[test]
    fn test_arithmetic_with_precedence_climbing() {
        let grm = grammar_from_str(
            r#"
            Program <- Statement+;
            Statement <- var:[a-z]+ '=' E ';';
            E[4] <- '(' E ')';
            E[3] <- num:[0-9]+ / sym:[a-z]+;
            E[2] <- arith:(op:'-' E);
            E[1,L] <- arith:(E op:('*' / '/') E);
            E[0,L] <- arith:(E op:('+' / '-') E);
            "#
        )
        .unwrap();
        let input = "discriminant=b*b-4*a*c;";
        let memo = parse(&grm, input);
        let noms = memo.non_overlapping_matches_for_rule("Program").unwrap();
        assert_eq!(noms.len(), 1);
        assert_eq!((noms[0].start(), noms[0].len()), (0, 23));
        assert!(memo
            .pp_match(noms[0])
            .starts_with("Program <- Statement+ : 0+"));
        assert!(memo.syntax_errors(&["Program", "Statement", "E"]).is_empty());

        // The labeled tree has the shape the labels describe. Statement carries no label of its
        // own, so its labeled children surface directly under Program: the variable name and
        // the top-level arithmetic expression (the E reference inherits E[0]'s header label).
        let ast = AstNode::from_match("Program", noms[0], &memo);
        assert_eq!(ast.children().len(), 2);
        assert_eq!(ast.children()[0].label(), "var");
        assert_eq!(ast.children()[0].text(&memo), "discriminant");
        assert_eq!(ast.children()[1].label(), "arith");
        assert_eq!(ast.children()[1].text(&memo), "b*b-4*a*c");
    }

    #[test]
    fn test_comment_with_inverted_charset() {
        let grm = grammar_from_str(r#"P <- C+; C <- "//" [^\r\n]* [\r\n]?;"#).unwrap();
        let memo = parse(&grm, "// xyz\n//");
        assert!(memo.syntax_errors(&["P", "C"]).is_empty());
    }

    #[test]
    fn test_left_recursion_from_text() {
        let grm = grammar_from_str("E <- E '+' '1' / '1';").unwrap();
        let memo = parse(&grm, "1+1+1");
        let noms = memo.non_overlapping_matches_for_rule("E").unwrap();
        assert_eq!(noms.len(), 1);
        assert_eq!((noms[0].start(), noms[0].len()), (0, 5));
    }

    #[test]
    fn test_empty_input_zero_length() {
        let grm = grammar_from_str("S <- 'a'*;").unwrap();
        let memo = parse(&grm, "");
        let noms = memo.non_overlapping_matches_for_rule("S").unwrap();
        assert_eq!(noms.len(), 1);
        assert_eq!((noms[0].start(), noms[0].len()), (0, 0));
        assert!(memo.syntax_errors(&["S"]).is_empty());
    }

    #[test]
    fn test_longer_first_branch_wins() {
        let grm = grammar_from_str("A <- 'a' 'b' / 'a';").unwrap();
        let memo = parse(&grm, "ab");
        let a = grm.rule_clause("A").unwrap();
        assert_eq!(memo.best_match(a, 0).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_rule_body_is_an_error() {
        match grammar_from_str("X <- ;") {
            Err(GrammarTextError::Unmatched(ref errs)) => {
                // The span around the dangling semicolon is reported with its text.
                assert!(errs
                    .iter()
                    .any(|e| e.start <= 5 && 5 < e.end && e.text.contains(';')));
                let msg = GrammarTextError::Unmatched(errs.clone()).to_string();
                assert!(msg.contains(";"));
            }
            r => panic!("{:?}", r)
        }
    }

    #[test]
    fn test_quoted_string_escapes() {
        let grm = grammar_from_str(r#"S <- "a\nbA";"#).unwrap();
        let memo = parse(&grm, "a\nbA");
        let s = grm.rule_clause("S").unwrap();
        assert_eq!(memo.best_match(s, 0).unwrap().len(), 4);
    }

    #[test]
    fn test_charset_escapes() {
        let grm = grammar_from_str(r#"S <- [\]\-x]+;"#).unwrap();
        let memo = parse(&grm, "]x-");
        let s = grm.rule_clause("S").unwrap();
        assert_eq!(memo.best_match(s, 0).unwrap().len(), 3);
    }

    #[test]
    fn test_comments_and_whitespace() {
        let grm = grammar_from_str(
            "# a grammar of one rule\nS <- 'a'; # trailing comment\n# done\n"
        )
        .unwrap();
        let memo = parse(&grm, "a");
        assert!(memo.syntax_errors(&["S"]).is_empty());
    }

    #[test]
    fn test_lookahead_syntax() {
        let grm = grammar_from_str("S <- &'a' [a-z] / !'a' [0-9];").unwrap();
        let s = grm.rule_clause("S").unwrap();
        let memo = parse(&grm, "b");
        assert!(memo.best_match(s, 0).is_none());
        let memo = parse(&grm, "a");
        assert_eq!(memo.best_match(s, 0).unwrap().len(), 1);
        let memo = parse(&grm, "7");
        assert_eq!(memo.best_match(s, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_precedence_and_assoc_surface_syntax() {
        let grm = grammar_from_str("E[0,L] <- E '+' E; E[1] <- [0-9]+;").unwrap();
        assert_eq!(
            grm.clause_string(grm.rule_clause("E[0]").unwrap()),
            "E[0] '+' E[1] / E[1]"
        );
        let memo = parse(&grm, "1+2+3");
        let noms = memo.non_overlapping_matches_for_rule("E").unwrap();
        assert_eq!((noms[0].start(), noms[0].len()), (0, 5));
    }

    #[test]
    fn test_nothing_and_start_syntax() {
        let grm = grammar_from_str("S <- ^ 'a' () 'b';").unwrap();
        let memo = parse(&grm, "ab");
        let s = grm.rule_clause("S").unwrap();
        assert_eq!(memo.best_match(s, 0).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_rule_reported_as_build_error() {
        match grammar_from_str("S <- T;") {
            Err(GrammarTextError::Build(_)) => (),
            r => panic!("{:?}", r)
        }
    }
}
