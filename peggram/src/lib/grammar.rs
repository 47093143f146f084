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

//! Compilation of rules into an immutable [`Grammar`](struct.Grammar.html). The pipeline, in
//! order: precedence grouping and the climbing rewrite; the self-reference check; lookahead
//! validation; bottom-up interning of structurally identical clauses; rule-reference resolution;
//! topological ordering (terminals first, with the heads of recursive cycles as extra roots);
//! the `can_match_zero` fixpoint; and seed-parent wiring. The result is a flat list of clauses
//! whose edges are `ClauseIdx` handles into that list, so cyclic graphs are owned without a
//! cycle collector and freeing the grammar frees every clause in one sweep.

use std::error::Error;
use std::fmt;
use std::mem;

use fnv::{FnvHashMap, FnvHashSet};
use indexmap::IndexMap;
use regex::Regex;

use ast::{first, rule_ref, Assoc, ClauseAST, LabeledClauseAST, Rule};
use charset::CharSet;
use idxnewtype::ClauseIdx;

lazy_static! {
    static ref RE_RULE_NAME: Regex = Regex::new(r"^[A-Za-z_-][A-Za-z_0-9-]*$").unwrap();
}

/// The kind of a compiled clause. `RuleRef` and `AstLabel` never appear here: references are
/// resolved to direct edges during compilation and labels are transferred onto those edges.
#[derive(Clone, Debug)]
pub enum ClauseKind {
    CharSeq { chars: Vec<char>, ignore_case: bool },
    CharSet(CharSet),
    Start,
    Nothing,
    Seq,
    First,
    OneOrMore,
    FollowedBy,
    NotFollowedBy
}

/// One immutable node of a compiled grammar's parsing graph.
#[derive(Debug)]
pub struct Clause {
    kind: ClauseKind,
    subs: Vec<(Option<String>, ClauseIdx)>,
    can_match_zero: bool,
    seed_parents: Vec<ClauseIdx>,
    rule_names: Vec<String>
}

impl Clause {
    pub fn kind(&self) -> &ClauseKind {
        &self.kind
    }

    /// The ordered labeled subclause edges of this clause.
    pub fn subclauses(&self) -> &[(Option<String>, ClauseIdx)] {
        &self.subs
    }

    /// Can this clause match the empty string? Computed to fixpoint during compilation.
    pub fn can_match_zero(&self) -> bool {
        self.can_match_zero
    }

    /// The clauses that must be re-examined whenever this clause's best match at some position
    /// changes.
    pub fn seed_parents(&self) -> &[ClauseIdx] {
        &self.seed_parents
    }

    /// The names of the rules whose root is this clause. Several rules can intern to the same
    /// clause.
    pub fn rule_names(&self) -> &[String] {
        &self.rule_names
    }

    pub fn is_terminal(&self) -> bool {
        match self.kind {
            ClauseKind::CharSeq { .. }
            | ClauseKind::CharSet(_)
            | ClauseKind::Start
            | ClauseKind::Nothing => true,
            _ => false
        }
    }
}

/// Errors from `Grammar::from_rules`. None of these are recoverable: the grammar must be fixed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GrammarError {
    NoRules,
    InvalidRuleName(String),
    /// A rule with several definitions where not every definition declares a precedence.
    MissingPrecedence(String),
    DuplicatePrecedence(String, u32),
    UnknownRuleName(String),
    /// A cycle of rules consisting only of references, with no clause in between.
    RuleRefCycle(String),
    /// A rule whose entire body is a reference to itself.
    SelfReferenceOnly(String),
    /// A lookahead wrapped around another lookahead or around `start`.
    InvalidLookahead(String)
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GrammarError::NoRules => write!(f, "Grammars must contain at least one rule"),
            GrammarError::InvalidRuleName(ref n) => write!(f, "Invalid rule name '{}'", n),
            GrammarError::MissingPrecedence(ref n) => write!(
                f,
                "Rule '{}' has multiple definitions, but not all of them declare a precedence",
                n
            ),
            GrammarError::DuplicatePrecedence(ref n, p) => {
                write!(f, "Rule '{}' declares precedence {} more than once", n, p)
            }
            GrammarError::UnknownRuleName(ref n) => write!(f, "Unknown rule name '{}'", n),
            GrammarError::RuleRefCycle(ref n) => write!(
                f,
                "Rule '{}' is part of a cycle consisting only of rule references",
                n
            ),
            GrammarError::SelfReferenceOnly(ref n) => {
                write!(f, "Rule '{}' refers only to itself", n)
            }
            GrammarError::InvalidLookahead(ref s) => {
                write!(f, "Invalid lookahead nesting: {}", s)
            }
        }
    }
}

impl Error for GrammarError {}

/// Non-fatal structural concerns found during compilation. The grammar still works, but its
/// behavior around the flagged clause may be surprising.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GrammarWarning {
    /// A subclause of a `First` other than the last can match zero characters, so later
    /// alternatives can never be tried at that position.
    FirstSubCanMatchZero(String),
    /// A lookahead whose subclause can match zero characters always succeeds (or, negated,
    /// always fails).
    LookaheadCanMatchZero(String)
}

impl fmt::Display for GrammarWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GrammarWarning::FirstSubCanMatchZero(ref s) => write!(
                f,
                "Non-final subclause of a prioritized choice can match zero characters: {}",
                s
            ),
            GrammarWarning::LookaheadCanMatchZero(ref s) => {
                write!(f, "Lookahead subclause can match zero characters: {}", s)
            }
        }
    }
}

#[derive(Debug)]
struct RuleInfo {
    clause: ClauseIdx,
    label: Option<String>
}

/// An immutable, compiled PEG. The grammar owns every clause as a flat list in topological
/// order; it is pure data and can be shared across concurrent parses.
#[derive(Debug)]
pub struct Grammar {
    clauses: Vec<Clause>,
    rules: IndexMap<String, RuleInfo>,
    lowest_prec: FnvHashMap<String, String>,
    top_rule: String,
    warnings: Vec<GrammarWarning>
}

impl Grammar {
    /// Compile `rules` into a grammar whose top rule is the first rule.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Grammar, GrammarError> {
        Grammar::from_rules_with_top(rules, None)
    }

    /// Compile `rules` into a grammar whose top rule is `top` (defaulting to the first rule).
    pub fn from_rules_with_top(
        mut rules: Vec<Rule>,
        top: Option<&str>
    ) -> Result<Grammar, GrammarError> {
        if rules.is_empty() {
            return Err(GrammarError::NoRules);
        }
        for r in &rules {
            if !RE_RULE_NAME.is_match(&r.name) {
                return Err(GrammarError::InvalidRuleName(r.name.clone()));
            }
        }
        let top_base = match top {
            Some(n) => n.to_string(),
            None => rules[0].name.clone()
        };

        let lowest_prec = rewrite_precedence_groups(&mut rules)?;

        for r in &rules {
            if let ClauseAST::RuleRef(ref n) = r.labeled_clause.clause {
                if *n == r.name {
                    return Err(GrammarError::SelfReferenceOnly(r.name.clone()));
                }
            }
            validate_lookaheads(&r.labeled_clause.clause)?;
        }

        // Intern every clause bottom-up, while the graph still names rules rather than pointing
        // at them: two subtrees differing only in their reference names must not merge.
        let mut intr = Interner::new();
        let mut roots = Vec::with_capacity(rules.len());
        for r in &rules {
            let (label, pre) = intr.intern_edge(&r.labeled_clause);
            roots.push(RuleRoot {
                name: r.name.clone(),
                label,
                pre
            });
        }
        let mut rule_map = FnvHashMap::default();
        for (i, r) in roots.iter().enumerate() {
            rule_map.insert(r.name.clone(), i);
        }
        let mut nodes = intr.nodes;

        // Resolve rule roots that are themselves references.
        for i in 0..roots.len() {
            let name = match nodes[roots[i].pre].kind {
                PreKind::RuleRef(ref n) => n.clone(),
                _ => continue
            };
            let (pre, label) = resolve_name(&name, &lowest_prec, &rule_map, &roots, &nodes)?;
            roots[i].pre = pre;
            if roots[i].label.is_none() {
                roots[i].label = label;
            }
        }

        // Resolve every reference edge to a direct edge, propagating a rule-header label onto
        // the edge if the edge does not carry one of its own.
        for ni in 0..nodes.len() {
            for ei in 0..nodes[ni].subs.len() {
                let t = nodes[ni].subs[ei].1;
                let name = match nodes[t].kind {
                    PreKind::RuleRef(ref n) => n.clone(),
                    _ => continue
                };
                let (pre, label) = resolve_name(&name, &lowest_prec, &rule_map, &roots, &nodes)?;
                nodes[ni].subs[ei].1 = pre;
                if nodes[ni].subs[ei].0.is_none() {
                    nodes[ni].subs[ei].0 = label;
                }
            }
        }

        let order = topo_order(&nodes, &roots);
        let mut idx_of = vec![usize::max_value(); nodes.len()];
        for (i, &p) in order.iter().enumerate() {
            idx_of[p] = i;
        }

        let mut clauses = Vec::with_capacity(order.len());
        for &p in &order {
            let node = &nodes[p];
            let kind = match node.kind {
                PreKind::CharSeq { ref chars, ignore_case } => ClauseKind::CharSeq {
                    chars: chars.clone(),
                    ignore_case
                },
                PreKind::CharSet(ref cs) => ClauseKind::CharSet(cs.clone()),
                PreKind::Start => ClauseKind::Start,
                PreKind::Nothing => ClauseKind::Nothing,
                PreKind::Seq => ClauseKind::Seq,
                PreKind::First => ClauseKind::First,
                PreKind::OneOrMore => ClauseKind::OneOrMore,
                PreKind::FollowedBy => ClauseKind::FollowedBy,
                PreKind::NotFollowedBy => ClauseKind::NotFollowedBy,
                PreKind::RuleRef(_) => unreachable!()
            };
            let subs = node
                .subs
                .iter()
                .map(|&(ref l, s)| (l.clone(), ClauseIdx::from(idx_of[s])))
                .collect();
            clauses.push(Clause {
                kind,
                subs,
                can_match_zero: false,
                seed_parents: Vec::new(),
                rule_names: Vec::new()
            });
        }

        let mut rules_map = IndexMap::new();
        for r in &roots {
            let cidx = ClauseIdx::from(idx_of[r.pre]);
            clauses[usize::from(cidx)].rule_names.push(r.name.clone());
            rules_map.insert(
                r.name.clone(),
                RuleInfo {
                    clause: cidx,
                    label: r.label.clone()
                }
            );
        }

        compute_can_match_zero(&mut clauses);
        let warnings = collect_warnings(&clauses);
        wire_seed_parents(&mut clauses);

        let top_rule = if rules_map.contains_key(&top_base) {
            top_base
        } else if let Some(n) = lowest_prec.get(&top_base) {
            n.clone()
        } else {
            return Err(GrammarError::UnknownRuleName(top_base));
        };

        Ok(Grammar {
            clauses,
            rules: rules_map,
            lowest_prec,
            top_rule,
            warnings
        })
    }

    pub fn clauses_len(&self) -> usize {
        self.clauses.len()
    }

    pub fn clause(&self, cidx: ClauseIdx) -> &Clause {
        &self.clauses[usize::from(cidx)]
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn rules_len(&self) -> usize {
        self.rules.len()
    }

    /// The names of all rules, in declaration order (after precedence rewriting).
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.keys().map(|s| s.as_str()).collect()
    }

    /// The root clause of the named rule. A base name which was rewritten into a precedence
    /// group resolves to its lowest-precedence member.
    pub fn rule_clause(&self, name: &str) -> Option<ClauseIdx> {
        if let Some(ri) = self.rules.get(name) {
            return Some(ri.clause);
        }
        self.lowest_prec
            .get(name)
            .and_then(|n| self.rules.get(n))
            .map(|ri| ri.clause)
    }

    /// The AST label attached to the named rule's header, if any.
    pub fn rule_label(&self, name: &str) -> Option<&str> {
        let ri = match self.rules.get(name) {
            Some(ri) => Some(ri),
            None => self.lowest_prec.get(name).and_then(|n| self.rules.get(n))
        };
        ri.and_then(|ri| ri.label.as_ref()).map(|s| s.as_str())
    }

    pub fn top_rule_name(&self) -> &str {
        &self.top_rule
    }

    pub fn top_clause(&self) -> ClauseIdx {
        self.rules[&self.top_rule].clause
    }

    /// Structural warnings collected during compilation.
    pub fn warnings(&self) -> &[GrammarWarning] {
        &self.warnings
    }

    /// Render a clause body in PEG syntax. Subclauses which are the root of a rule are printed
    /// by that rule's name.
    pub fn clause_string(&self, cidx: ClauseIdx) -> String {
        render_clause(&self.clauses, usize::from(cidx))
    }

    /// As `clause_string`, but prefixed with the names of the rules rooted at the clause, e.g.
    /// `"Program <- Statement+"`.
    pub fn clause_string_with_rule_names(&self, cidx: ClauseIdx) -> String {
        let c = &self.clauses[usize::from(cidx)];
        if c.rule_names.is_empty() {
            render_clause(&self.clauses, usize::from(cidx))
        } else {
            format!(
                "{} <- {}",
                c.rule_names.join(", "),
                render_clause(&self.clauses, usize::from(cidx))
            )
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (name, ri) in &self.rules {
            match ri.label {
                Some(ref l) => writeln!(
                    f,
                    "{} <- {}:({});",
                    name,
                    l,
                    render_clause(&self.clauses, usize::from(ri.clause))
                )?,
                None => writeln!(
                    f,
                    "{} <- {};",
                    name,
                    render_clause(&self.clauses, usize::from(ri.clause))
                )?
            }
        }
        Ok(())
    }
}

/// Group rules by base name and rewrite each multi-member group into a precedence-climbing
/// chain: members are renamed `name[prec]`, self-references are substituted according to the
/// associativity, and every member except the highest falls back to the next-higher level
/// through a trailing `First` alternative. Returns the base-name to lowest-precedence-member
/// mapping used by reference resolution.
fn rewrite_precedence_groups(
    rules: &mut Vec<Rule>
) -> Result<FnvHashMap<String, String>, GrammarError> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (i, r) in rules.iter().enumerate() {
        groups.entry(r.name.clone()).or_insert_with(Vec::new).push(i);
    }
    let mut lowest_prec = FnvHashMap::default();
    for (base, idxs) in &groups {
        if idxs.len() < 2 {
            continue;
        }
        let mut with_prec = Vec::with_capacity(idxs.len());
        for &ri in idxs {
            match rules[ri].precedence {
                Some(p) => with_prec.push((p, ri)),
                None => return Err(GrammarError::MissingPrecedence(base.clone()))
            }
        }
        with_prec.sort();
        for w in with_prec.windows(2) {
            if w[0].0 == w[1].0 {
                return Err(GrammarError::DuplicatePrecedence(base.clone(), w[0].0));
            }
        }
        let n = with_prec.len();
        let renamed = with_prec
            .iter()
            .map(|&(p, _)| format!("{}[{}]", base, p))
            .collect::<Vec<_>>();
        for (k, &(_, ri)) in with_prec.iter().enumerate() {
            rules[ri].name = renamed[k].clone();
        }
        for (k, &(_, ri)) in with_prec.iter().enumerate() {
            let cur = &renamed[k];
            let next = &renamed[(k + 1) % n];
            let is_highest = k == n - 1;
            let total = count_self_refs(&rules[ri].labeled_clause.clause, base);
            if total >= 2 {
                let assoc = rules[ri].assoc;
                let mut seen = 0;
                rewrite_self_refs(
                    &mut rules[ri].labeled_clause.clause,
                    assoc,
                    &mut seen,
                    total,
                    base,
                    cur,
                    next
                );
            } else if total == 1 {
                if is_highest {
                    // The single self-reference of the highest level wraps around to the
                    // lowest.
                    let mut seen = 0;
                    rewrite_self_refs(
                        &mut rules[ri].labeled_clause.clause,
                        None,
                        &mut seen,
                        total,
                        base,
                        cur,
                        next
                    );
                } else {
                    wrap_single_self_ref(&mut rules[ri].labeled_clause.clause, base, cur, next);
                }
            }
            if !is_highest {
                let old = mem::replace(&mut rules[ri].labeled_clause.clause, ClauseAST::Nothing);
                rules[ri].labeled_clause.clause = first(vec![old, rule_ref(next)]);
            }
        }
        lowest_prec.insert(base.clone(), renamed[0].clone());
    }
    Ok(lowest_prec)
}

fn count_self_refs(c: &ClauseAST, base: &str) -> usize {
    match *c {
        ClauseAST::RuleRef(ref n) => (n == base) as usize,
        ClauseAST::Seq(ref subs) | ClauseAST::First(ref subs) => subs
            .iter()
            .map(|x| count_self_refs(&x.clause, base))
            .sum(),
        ClauseAST::OneOrMore(ref s)
        | ClauseAST::FollowedBy(ref s)
        | ClauseAST::NotFollowedBy(ref s) => count_self_refs(&s.clause, base),
        ClauseAST::AstLabel { ref clause, .. } => count_self_refs(clause, base),
        _ => 0
    }
}

/// Rename every self-reference in source order. With two or more self-references the
/// associativity decides which single one stays at the current precedence level: the first for
/// left-associative rules, the last for right-associative ones; every other reference climbs to
/// the next level.
fn rewrite_self_refs(
    c: &mut ClauseAST,
    assoc: Option<Assoc>,
    seen: &mut usize,
    total: usize,
    base: &str,
    cur: &str,
    next: &str
) {
    match *c {
        ClauseAST::RuleRef(ref mut n) => {
            if n.as_str() == base {
                let keep = match assoc {
                    Some(Assoc::Left) => *seen == 0,
                    Some(Assoc::Right) => *seen == total - 1,
                    None => false
                };
                *n = if keep { cur.to_string() } else { next.to_string() };
                *seen += 1;
            }
        }
        ClauseAST::Seq(ref mut subs) | ClauseAST::First(ref mut subs) => {
            for s in subs {
                rewrite_self_refs(&mut s.clause, assoc, seen, total, base, cur, next);
            }
        }
        ClauseAST::OneOrMore(ref mut s)
        | ClauseAST::FollowedBy(ref mut s)
        | ClauseAST::NotFollowedBy(ref mut s) => {
            rewrite_self_refs(&mut s.clause, assoc, seen, total, base, cur, next);
        }
        ClauseAST::AstLabel { ref mut clause, .. } => {
            rewrite_self_refs(clause, assoc, seen, total, base, cur, next);
        }
        _ => ()
    }
}

/// Replace the single self-reference of a non-highest precedence level with a choice that tries
/// the current level and falls back to the next one: `E[i]` becomes `(E[i] / E[i+1])` in place.
fn wrap_single_self_ref(c: &mut ClauseAST, base: &str, cur: &str, next: &str) -> bool {
    let replace = match *c {
        ClauseAST::RuleRef(ref n) => n.as_str() == base,
        _ => false
    };
    if replace {
        *c = first(vec![rule_ref(cur), rule_ref(next)]);
        return true;
    }
    match *c {
        ClauseAST::Seq(ref mut subs) | ClauseAST::First(ref mut subs) => {
            for s in subs {
                if wrap_single_self_ref(&mut s.clause, base, cur, next) {
                    return true;
                }
            }
            false
        }
        ClauseAST::OneOrMore(ref mut s)
        | ClauseAST::FollowedBy(ref mut s)
        | ClauseAST::NotFollowedBy(ref mut s) => {
            wrap_single_self_ref(&mut s.clause, base, cur, next)
        }
        ClauseAST::AstLabel { ref mut clause, .. } => {
            wrap_single_self_ref(clause, base, cur, next)
        }
        _ => false
    }
}

fn validate_lookaheads(c: &ClauseAST) -> Result<(), GrammarError> {
    match *c {
        ClauseAST::FollowedBy(ref s) => {
            match s.clause {
                ClauseAST::FollowedBy(_) | ClauseAST::NotFollowedBy(_) | ClauseAST::Start => {
                    return Err(GrammarError::InvalidLookahead(c.to_string()))
                }
                _ => ()
            }
            validate_lookaheads(&s.clause)
        }
        ClauseAST::NotFollowedBy(ref s) => {
            match s.clause {
                ClauseAST::FollowedBy(_) | ClauseAST::Start | ClauseAST::Nothing => {
                    return Err(GrammarError::InvalidLookahead(c.to_string()))
                }
                _ => ()
            }
            validate_lookaheads(&s.clause)
        }
        ClauseAST::Seq(ref subs) | ClauseAST::First(ref subs) => {
            for s in subs {
                validate_lookaheads(&s.clause)?;
            }
            Ok(())
        }
        ClauseAST::OneOrMore(ref s) => validate_lookaheads(&s.clause),
        ClauseAST::AstLabel { ref clause, .. } => validate_lookaheads(clause),
        _ => Ok(())
    }
}

enum PreKind {
    CharSeq { chars: Vec<char>, ignore_case: bool },
    CharSet(CharSet),
    Start,
    Nothing,
    Seq,
    First,
    OneOrMore,
    FollowedBy,
    NotFollowedBy,
    RuleRef(String)
}

struct PreClause {
    kind: PreKind,
    subs: Vec<(Option<String>, usize)>
}

struct RuleRoot {
    name: String,
    label: Option<String>,
    pre: usize
}

/// Interns structurally identical clauses: any two clauses with the same kind, labels, and
/// subclause list are the same node. Keys are canonical strings built bottom-up, so children
/// are always interned before their parents.
struct Interner {
    keys: IndexMap<String, usize>,
    nodes: Vec<PreClause>
}

impl Interner {
    fn new() -> Interner {
        Interner {
            keys: IndexMap::new(),
            nodes: Vec::new()
        }
    }

    fn intern_edge(&mut self, lc: &LabeledClauseAST) -> (Option<String>, usize) {
        let mut label = lc.label.clone();
        let mut cl = &lc.clause;
        loop {
            let next = match *cl {
                ClauseAST::AstLabel { label: ref l, clause: ref sub } => {
                    if label.is_none() {
                        label = Some(l.clone());
                    }
                    &**sub
                }
                _ => break
            };
            cl = next;
        }
        (label, self.intern_clause(cl))
    }

    fn intern_clause(&mut self, c: &ClauseAST) -> usize {
        match *c {
            ClauseAST::CharSeq { ref s, ignore_case } => {
                let key = format!("Str({:?},{})", s, ignore_case);
                self.get_or_add(key, || {
                    (
                        PreKind::CharSeq {
                            chars: s.chars().collect(),
                            ignore_case
                        },
                        Vec::new()
                    )
                })
            }
            ClauseAST::CharSet(ref cs) => {
                let key = format!("Set({})", cs);
                self.get_or_add(key, || (PreKind::CharSet(cs.clone()), Vec::new()))
            }
            ClauseAST::Start => self.get_or_add("Start".to_string(), || (PreKind::Start, Vec::new())),
            ClauseAST::Nothing => {
                self.get_or_add("Nothing".to_string(), || (PreKind::Nothing, Vec::new()))
            }
            ClauseAST::Seq(ref subs) => self.intern_parent("Seq", PreKind::Seq, subs),
            ClauseAST::First(ref subs) => self.intern_parent("First", PreKind::First, subs),
            ClauseAST::OneOrMore(ref s) => {
                self.intern_parent1("OneOrMore", PreKind::OneOrMore, s)
            }
            ClauseAST::FollowedBy(ref s) => {
                self.intern_parent1("FollowedBy", PreKind::FollowedBy, s)
            }
            ClauseAST::NotFollowedBy(ref s) => {
                self.intern_parent1("NotFollowedBy", PreKind::NotFollowedBy, s)
            }
            ClauseAST::RuleRef(ref n) => {
                let key = format!("Ref({})", n);
                self.get_or_add(key, || (PreKind::RuleRef(n.clone()), Vec::new()))
            }
            ClauseAST::AstLabel { ref clause, .. } => self.intern_clause(clause)
        }
    }

    fn intern_parent(
        &mut self,
        tag: &str,
        kind: PreKind,
        subs: &[LabeledClauseAST]
    ) -> usize {
        let edges = subs
            .iter()
            .map(|x| self.intern_edge(x))
            .collect::<Vec<_>>();
        let key = format!("{}({})", tag, edges_key(&edges));
        match self.keys.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.nodes.len();
                self.nodes.push(PreClause { kind, subs: edges });
                self.keys.insert(key, i);
                i
            }
        }
    }

    fn intern_parent1(&mut self, tag: &str, kind: PreKind, sub: &LabeledClauseAST) -> usize {
        let edge = self.intern_edge(sub);
        let key = format!("{}({})", tag, edges_key(&[edge.clone()]));
        match self.keys.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.nodes.len();
                self.nodes.push(PreClause {
                    kind,
                    subs: vec![edge]
                });
                self.keys.insert(key, i);
                i
            }
        }
    }

    fn get_or_add<F>(&mut self, key: String, mk: F) -> usize
    where
        F: FnOnce() -> (PreKind, Vec<(Option<String>, usize)>)
    {
        match self.keys.get(&key) {
            Some(&i) => i,
            None => {
                let (kind, subs) = mk();
                let i = self.nodes.len();
                self.nodes.push(PreClause { kind, subs });
                self.keys.insert(key, i);
                i
            }
        }
    }
}

fn edges_key(edges: &[(Option<String>, usize)]) -> String {
    edges
        .iter()
        .map(|&(ref l, i)| format!("{:?}@{}", l, i))
        .collect::<Vec<_>>()
        .join(",")
}

/// Follow a rule name through the lowest-precedence map and any chain of reference-only rules
/// until a clause is reached, accumulating the first rule-header label seen along the way. A
/// chain that revisits a rule is a pure reference cycle.
fn resolve_name(
    start: &str,
    lowest_prec: &FnvHashMap<String, String>,
    rule_map: &FnvHashMap<String, usize>,
    roots: &[RuleRoot],
    nodes: &[PreClause]
) -> Result<(usize, Option<String>), GrammarError> {
    let mut label = None;
    let mut name = start.to_string();
    let mut visited = FnvHashSet::default();
    loop {
        let actual = match lowest_prec.get(&name) {
            Some(n) => n.clone(),
            None => name.clone()
        };
        if !visited.insert(actual.clone()) {
            return Err(GrammarError::RuleRefCycle(actual));
        }
        let ri = match rule_map.get(&actual) {
            Some(&ri) => ri,
            None => return Err(GrammarError::UnknownRuleName(actual))
        };
        if label.is_none() {
            label = roots[ri].label.clone();
        }
        match nodes[roots[ri].pre].kind {
            PreKind::RuleRef(ref n) => name = n.clone(),
            _ => return Ok((roots[ri].pre, label))
        }
    }
}

/// Compute a deterministic ordering of all reachable clauses in which terminals come first and
/// every subclause precedes its parent, except across the back-edge of a cycle. The heads of
/// cycles (clauses reached by a DFS back-edge) are ordered as roots of their own subgraphs.
fn topo_order(nodes: &[PreClause], roots: &[RuleRoot]) -> Vec<usize> {
    fn reachable_rec(
        i: usize,
        nodes: &[PreClause],
        visited: &mut FnvHashSet<usize>,
        out: &mut Vec<usize>
    ) {
        if !visited.insert(i) {
            return;
        }
        for &(_, s) in &nodes[i].subs {
            reachable_rec(s, nodes, visited, out);
        }
        out.push(i);
    }

    fn cycle_heads_rec(
        i: usize,
        nodes: &[PreClause],
        discovered: &mut FnvHashSet<usize>,
        finished: &mut FnvHashSet<usize>,
        head_set: &mut FnvHashSet<usize>,
        heads: &mut Vec<usize>
    ) {
        discovered.insert(i);
        for &(_, s) in &nodes[i].subs {
            if discovered.contains(&s) {
                if head_set.insert(s) {
                    heads.push(s);
                }
            } else if !finished.contains(&s) {
                cycle_heads_rec(s, nodes, discovered, finished, head_set, heads);
            }
        }
        discovered.remove(&i);
        finished.insert(i);
    }

    fn terminals_rec(
        i: usize,
        nodes: &[PreClause],
        visited: &mut FnvHashSet<usize>,
        out: &mut Vec<usize>
    ) {
        if !visited.insert(i) {
            return;
        }
        match nodes[i].kind {
            PreKind::CharSeq { .. }
            | PreKind::CharSet(_)
            | PreKind::Start
            | PreKind::Nothing => out.push(i),
            _ => ()
        }
        for &(_, s) in &nodes[i].subs {
            terminals_rec(s, nodes, visited, out);
        }
    }

    let mut reachable = Vec::new();
    let mut visited = FnvHashSet::default();
    for r in roots {
        reachable_rec(r.pre, nodes, &mut visited, &mut reachable);
    }

    let mut has_parent = FnvHashSet::default();
    for &i in &reachable {
        for &(_, s) in &nodes[i].subs {
            has_parent.insert(s);
        }
    }
    let top_level = reachable
        .iter()
        .cloned()
        .filter(|i| !has_parent.contains(i))
        .collect::<Vec<_>>();

    let mut discovered = FnvHashSet::default();
    let mut finished = FnvHashSet::default();
    let mut head_set = FnvHashSet::default();
    let mut heads = Vec::new();
    for &i in top_level.iter().chain(roots.iter().map(|r| &r.pre)) {
        if !finished.contains(&i) {
            cycle_heads_rec(i, nodes, &mut discovered, &mut finished, &mut head_set, &mut heads);
        }
    }

    let mut terminals = Vec::new();
    let mut tvisited = FnvHashSet::default();
    for r in roots {
        terminals_rec(r.pre, nodes, &mut tvisited, &mut terminals);
    }

    let mut order = terminals.clone();
    let mut ovisited = terminals.iter().cloned().collect::<FnvHashSet<_>>();
    for &i in top_level
        .iter()
        .chain(heads.iter())
        .chain(roots.iter().map(|r| &r.pre))
    {
        reachable_rec(i, nodes, &mut ovisited, &mut order);
    }
    order
}

fn compute_can_match_zero(clauses: &mut Vec<Clause>) {
    loop {
        let mut changed = false;
        for i in 0..clauses.len() {
            let v = {
                let c = &clauses[i];
                match c.kind {
                    ClauseKind::CharSeq { ref chars, .. } => chars.is_empty(),
                    ClauseKind::CharSet(_) => false,
                    ClauseKind::Start | ClauseKind::Nothing | ClauseKind::NotFollowedBy => true,
                    ClauseKind::Seq => c
                        .subs
                        .iter()
                        .all(|&(_, s)| clauses[usize::from(s)].can_match_zero),
                    ClauseKind::First => c
                        .subs
                        .iter()
                        .any(|&(_, s)| clauses[usize::from(s)].can_match_zero),
                    ClauseKind::OneOrMore | ClauseKind::FollowedBy => {
                        clauses[usize::from(c.subs[0].1)].can_match_zero
                    }
                }
            };
            if v != clauses[i].can_match_zero {
                clauses[i].can_match_zero = v;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn collect_warnings(clauses: &[Clause]) -> Vec<GrammarWarning> {
    let mut warnings = Vec::new();
    for (i, c) in clauses.iter().enumerate() {
        match c.kind {
            ClauseKind::First => {
                for (j, &(_, s)) in c.subs.iter().enumerate() {
                    if j < c.subs.len() - 1 && clauses[usize::from(s)].can_match_zero {
                        warnings.push(GrammarWarning::FirstSubCanMatchZero(render_clause(
                            clauses, i
                        )));
                        break;
                    }
                }
            }
            ClauseKind::FollowedBy | ClauseKind::NotFollowedBy => {
                if clauses[usize::from(c.subs[0].1)].can_match_zero {
                    warnings.push(GrammarWarning::LookaheadCanMatchZero(render_clause(
                        clauses, i
                    )));
                }
            }
            _ => ()
        }
    }
    warnings
}

/// Record, on every clause, the parents that must be re-examined when that clause's best match
/// at a position changes. A `Seq` only needs waking when its leftmost required prefix changes,
/// so it registers with its children up to and including the first which cannot match zero; all
/// other kinds register with every child.
fn wire_seed_parents(clauses: &mut Vec<Clause>) {
    for i in 0..clauses.len() {
        let is_seq = match clauses[i].kind {
            ClauseKind::Seq => true,
            _ => false
        };
        let subs = mem::replace(&mut clauses[i].subs, Vec::new());
        for &(_, s) in &subs {
            let si = usize::from(s);
            let stop = is_seq && !clauses[si].can_match_zero;
            let ci = ClauseIdx::from(i);
            if !clauses[si].seed_parents.contains(&ci) {
                clauses[si].seed_parents.push(ci);
            }
            if stop {
                break;
            }
        }
        clauses[i].subs = subs;
    }
}

fn render_clause(clauses: &[Clause], i: usize) -> String {
    fn prec(kind: &ClauseKind) -> u8 {
        match *kind {
            ClauseKind::First => 1,
            ClauseKind::Seq => 2,
            ClauseKind::FollowedBy | ClauseKind::NotFollowedBy => 5,
            ClauseKind::OneOrMore => 6,
            _ => 7
        }
    }

    fn sub_str(clauses: &[Clause], edge: &(Option<String>, ClauseIdx), parent_prec: u8) -> String {
        let sc = &clauses[usize::from(edge.1)];
        let mut out = String::new();
        if let Some(ref l) = edge.0 {
            out.push_str(l);
            out.push(':');
        }
        if !sc.rule_names.is_empty() {
            out.push_str(&sc.rule_names[0]);
            return out;
        }
        let child_prec = prec(&sc.kind);
        if child_prec < parent_prec || (edge.0.is_some() && child_prec < 7) {
            out.push('(');
            out.push_str(&render_clause(clauses, usize::from(edge.1)));
            out.push(')');
        } else {
            out.push_str(&render_clause(clauses, usize::from(edge.1)));
        }
        out
    }

    let c = &clauses[i];
    match c.kind {
        ClauseKind::CharSeq { ref chars, ignore_case } => {
            let esc = chars
                .iter()
                .map(|&c| match c {
                    '"' => "\\\"".to_string(),
                    '\\' => "\\\\".to_string(),
                    '\n' => "\\n".to_string(),
                    '\r' => "\\r".to_string(),
                    '\t' => "\\t".to_string(),
                    c => c.to_string()
                })
                .collect::<String>();
            if ignore_case {
                format!("i\"{}\"", esc)
            } else {
                format!("\"{}\"", esc)
            }
        }
        ClauseKind::CharSet(ref cs) => cs.to_string(),
        ClauseKind::Start => "^".to_string(),
        ClauseKind::Nothing => "()".to_string(),
        ClauseKind::Seq => c
            .subs
            .iter()
            .map(|e| sub_str(clauses, e, 2))
            .collect::<Vec<_>>()
            .join(" "),
        ClauseKind::First => c
            .subs
            .iter()
            .map(|e| sub_str(clauses, e, 1))
            .collect::<Vec<_>>()
            .join(" / "),
        ClauseKind::OneOrMore => format!("{}+", sub_str(clauses, &c.subs[0], 7)),
        ClauseKind::FollowedBy => format!("&{}", sub_str(clauses, &c.subs[0], 7)),
        ClauseKind::NotFollowedBy => format!("!{}", sub_str(clauses, &c.subs[0], 7))
    }
}

#[cfg(test)]
mod test {
    use super::{Grammar, GrammarError, GrammarWarning};
    use ast::{
        ast_label, charset, first, followed_by, lit, one_or_more, optional, rule_ref, seq, start,
        Assoc, Rule
    };
    use charset::CharSet;

    fn digits() -> CharSet {
        CharSet::from_range('0', '9')
    }

    #[test]
    fn test_interning_dedups() {
        // Both alternatives contain the same "x" "y" sequence, which must intern to one clause.
        let grm = Grammar::from_rules(vec![Rule::new(
            "A",
            first(vec![
                seq(vec![lit("x"), lit("y")]),
                seq(vec![lit("x"), lit("y")]),
            ])
        )])
        .unwrap();
        // "x", "y", the shared Seq and the First.
        assert_eq!(grm.clauses_len(), 4);
        let top = grm.clause(grm.rule_clause("A").unwrap());
        assert_eq!(top.subclauses().len(), 2);
        assert_eq!(top.subclauses()[0].1, top.subclauses()[1].1);
    }

    #[test]
    fn test_terminals_first_and_topological() {
        let grm = Grammar::from_rules(vec![
            Rule::new("P", one_or_more(rule_ref("C"))),
            Rule::new("C", seq(vec![lit("a"), charset(digits())])),
        ])
        .unwrap();
        let mut seen_nonterminal = false;
        for c in grm.clauses() {
            if c.is_terminal() {
                assert!(!seen_nonterminal, "terminal after non-terminal");
            } else {
                seen_nonterminal = true;
            }
        }
        // Acyclic: every subclause index is strictly smaller than its parent's.
        for (i, c) in grm.clauses().iter().enumerate() {
            for &(_, s) in c.subclauses() {
                assert!(usize::from(s) < i, "subclause {} not before parent {}", s, i);
            }
        }
    }

    #[test]
    fn test_can_match_zero() {
        let grm = Grammar::from_rules(vec![
            Rule::new("A", optional(lit("a"))),
            Rule::new("B", lit("b")),
            Rule::new("N", seq(vec![optional(lit("a")), optional(lit("b"))])),
        ])
        .unwrap();
        assert!(grm.clause(grm.rule_clause("A").unwrap()).can_match_zero());
        assert!(!grm.clause(grm.rule_clause("B").unwrap()).can_match_zero());
        assert!(grm.clause(grm.rule_clause("N").unwrap()).can_match_zero());
    }

    #[test]
    fn test_seed_parents_stop_after_required_prefix() {
        let grm = Grammar::from_rules(vec![Rule::new(
            "R",
            seq(vec![optional(lit("a")), lit("b"), lit("c")])
        )])
        .unwrap();
        let seq_idx = grm.rule_clause("R").unwrap();
        let subs = grm.clause(seq_idx).subclauses().to_vec();
        // The nullable prefix and the first required subclause wake the Seq...
        assert!(grm.clause(subs[0].1).seed_parents().contains(&seq_idx));
        assert!(grm.clause(subs[1].1).seed_parents().contains(&seq_idx));
        // ...but subclauses after the first required one do not.
        assert!(!grm.clause(subs[2].1).seed_parents().contains(&seq_idx));
    }

    #[test]
    fn test_precedence_rewrite() {
        let grm = Grammar::from_rules(vec![
            Rule::new_prec(
                "E",
                0,
                Some(Assoc::Left),
                seq(vec![rule_ref("E"), lit("+"), rule_ref("E")])
            ),
            Rule::new_prec("E", 1, None, one_or_more(charset(digits()))),
            Rule::new_prec("E", 2, None, seq(vec![lit("("), rule_ref("E"), lit(")")])),
        ])
        .unwrap();
        assert_eq!(
            grm.rule_names(),
            vec!["E[0]", "E[1]", "E[2]"]
        );
        // The base name resolves to the lowest precedence level.
        assert_eq!(grm.rule_clause("E"), grm.rule_clause("E[0]"));
        assert_eq!(grm.top_rule_name(), "E[0]");
        // Left-associative: the first self-reference stays at the current level, the second
        // climbs; the whole body falls back to the next level.
        assert_eq!(
            grm.clause_string(grm.rule_clause("E[0]").unwrap()),
            "E[0] \"+\" E[1] / E[1]"
        );
        assert_eq!(
            grm.clause_string(grm.rule_clause("E[1]").unwrap()),
            "[0-9]+ / E[2]"
        );
        // The highest level's single self-reference wraps around to the lowest.
        assert_eq!(
            grm.clause_string(grm.rule_clause("E[2]").unwrap()),
            "\"(\" E[0] \")\""
        );
    }

    #[test]
    fn test_precedence_rewrite_right_assoc() {
        let grm = Grammar::from_rules(vec![
            Rule::new_prec(
                "E",
                0,
                Some(Assoc::Right),
                seq(vec![rule_ref("E"), lit("^"), rule_ref("E")])
            ),
            Rule::new_prec("E", 1, None, lit("n")),
        ])
        .unwrap();
        assert_eq!(
            grm.clause_string(grm.rule_clause("E[0]").unwrap()),
            "E[1] \"^\" E[0] / E[1]"
        );
    }

    #[test]
    fn test_precedence_single_self_ref_not_highest() {
        let grm = Grammar::from_rules(vec![
            Rule::new_prec("E", 0, None, seq(vec![lit("-"), rule_ref("E")])),
            Rule::new_prec("E", 1, None, lit("n")),
        ])
        .unwrap();
        // The self-reference becomes a choice between the current and the next level.
        assert_eq!(
            grm.clause_string(grm.rule_clause("E[0]").unwrap()),
            "\"-\" (E[0] / E[1]) / E[1]"
        );
    }

    #[test]
    fn test_rule_label_propagates_to_unlabeled_edges() {
        let grm = Grammar::from_rules(vec![
            Rule::new("A", seq(vec![rule_ref("B"), lit("y")])),
            Rule::new("B", ast_label("lbl", lit("x"))),
        ])
        .unwrap();
        let a = grm.clause(grm.rule_clause("A").unwrap());
        assert_eq!(a.subclauses()[0].0.as_ref().unwrap(), "lbl");
        assert!(a.subclauses()[1].0.is_none());
    }

    #[test]
    fn test_reference_chain_resolves() {
        let grm = Grammar::from_rules(vec![
            Rule::new("A", rule_ref("B")),
            Rule::new("B", rule_ref("C")),
            Rule::new("C", lit("x")),
        ])
        .unwrap();
        assert_eq!(grm.rule_clause("A"), grm.rule_clause("C"));
        let c = grm.clause(grm.rule_clause("C").unwrap());
        assert_eq!(c.rule_names(), &["A".to_string(), "B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_left_recursion_orders_cycle_head_last() {
        let grm = Grammar::from_rules(vec![Rule::new(
            "E",
            first(vec![
                seq(vec![rule_ref("E"), lit("+"), lit("1")]),
                lit("1"),
            ])
        )])
        .unwrap();
        let e = grm.rule_clause("E").unwrap();
        // The First at the head of the cycle is ordered after the Seq that refers back to it.
        let seq_idx = grm.clause(e).subclauses()[0].1;
        assert!(usize::from(seq_idx) < usize::from(e));
        let back = grm.clause(seq_idx).subclauses()[0].1;
        assert_eq!(back, e);
    }

    #[test]
    fn test_errors() {
        match Grammar::from_rules(vec![]) {
            Err(GrammarError::NoRules) => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![Rule::new("9bad", lit("a"))]) {
            Err(GrammarError::InvalidRuleName(ref n)) if n == "9bad" => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![Rule::new("A", rule_ref("B"))]) {
            Err(GrammarError::UnknownRuleName(ref n)) if n == "B" => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![Rule::new("A", rule_ref("A"))]) {
            Err(GrammarError::SelfReferenceOnly(ref n)) if n == "A" => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![
            Rule::new("A", rule_ref("B")),
            Rule::new("B", rule_ref("A")),
        ]) {
            Err(GrammarError::RuleRefCycle(_)) => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![
            Rule::new_prec("E", 1, None, lit("a")),
            Rule::new_prec("E", 1, None, lit("b")),
        ]) {
            Err(GrammarError::DuplicatePrecedence(ref n, 1)) if n == "E" => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![
            Rule::new("E", lit("a")),
            Rule::new_prec("E", 1, None, lit("b")),
        ]) {
            Err(GrammarError::MissingPrecedence(ref n)) if n == "E" => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![Rule::new("A", followed_by(followed_by(lit("a"))))]) {
            Err(GrammarError::InvalidLookahead(_)) => (),
            r => panic!("{:?}", r)
        }
        match Grammar::from_rules(vec![Rule::new("A", followed_by(start()))]) {
            Err(GrammarError::InvalidLookahead(_)) => (),
            r => panic!("{:?}", r)
        }
    }

    #[test]
    fn test_warnings() {
        let grm = Grammar::from_rules(vec![Rule::new(
            "A",
            first(vec![optional(lit("a")), lit("b")])
        )])
        .unwrap();
        assert_eq!(grm.warnings().len(), 1);
        match grm.warnings()[0] {
            GrammarWarning::FirstSubCanMatchZero(_) => (),
            ref w => panic!("{:?}", w)
        }

        let grm = Grammar::from_rules(vec![Rule::new("A", followed_by(optional(lit("a"))))])
            .unwrap();
        assert!(grm
            .warnings()
            .iter()
            .any(|w| match *w {
                GrammarWarning::LookaheadCanMatchZero(_) => true,
                _ => false
            }));
    }

    #[test]
    fn test_display_with_rule_names() {
        let grm = Grammar::from_rules(vec![
            Rule::new("Program", one_or_more(rule_ref("Statement"))),
            Rule::new("Statement", seq(vec![lit("s"), lit(";")])),
        ])
        .unwrap();
        assert_eq!(
            grm.clause_string_with_rule_names(grm.rule_clause("Program").unwrap()),
            "Program <- Statement+"
        );
    }

    #[test]
    fn test_top_rule_defaults_to_first() {
        let grm = Grammar::from_rules(vec![
            Rule::new("A", lit("a")),
            Rule::new("B", lit("b")),
        ])
        .unwrap();
        assert_eq!(grm.top_rule_name(), "A");
        let grm = Grammar::from_rules_with_top(
            vec![Rule::new("A", lit("a")), Rule::new("B", lit("b"))],
            Some("B")
        )
        .unwrap();
        assert_eq!(grm.top_rule_name(), "B");
    }
}
