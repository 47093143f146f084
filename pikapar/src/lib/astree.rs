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

//! Projection of a match tree onto a labeled AST. Only labeled subclause edges become nodes;
//! unlabeled structure is descended through and collapses away, so the tree a grammar author
//! sees is exactly the tree their labels describe.

use memotable::{Match, MemoTable};

/// One node of a projected AST.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AstNode {
    label: String,
    start: usize,
    len: usize,
    children: Vec<AstNode>
}

impl AstNode {
    /// Build the AST rooted at `m`, labeling the root `label`. Each labeled edge reachable from
    /// `m` through unlabeled structure becomes a child, in source order, recursively.
    pub fn from_match(label: &str, m: Match, memo: &MemoTable) -> AstNode {
        let mut children = Vec::new();
        collect(m, memo, &mut children);
        AstNode {
            label: label.to_string(),
            start: m.start(),
            len: m.len(),
            children
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn children(&self) -> &[AstNode] {
        &self.children
    }

    /// The input text this node covers.
    pub fn text(&self, memo: &MemoTable) -> String {
        memo.text(self.start, self.len)
    }

    /// Render the subtree, one node per line, children indented below their parent. Leaves
    /// additionally show their covered text.
    pub fn pp(&self, memo: &MemoTable) -> String {
        let mut out = String::new();
        self.pp_rec(memo, 0, &mut out);
        out
    }

    fn pp_rec(&self, memo: &MemoTable, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push(' ');
        }
        out.push_str(&self.label);
        out.push_str(&format!(" {}+{}", self.start, self.len));
        if self.children.is_empty() {
            out.push_str(&format!(" \"{}\"", self.text(memo)));
        }
        out.push('\n');
        for c in &self.children {
            c.pp_rec(memo, depth + 1, out);
        }
    }
}

fn collect(m: Match, memo: &MemoTable, out: &mut Vec<AstNode>) {
    for (label, sub) in memo.submatches(m) {
        match label {
            Some(l) => out.push(AstNode::from_match(l, sub, memo)),
            None => collect(sub, memo, out)
        }
    }
}

#[cfg(test)]
mod test {
    use peggram::{ast_label, charset, lit, one_or_more, rule_ref, seq, CharSet, Grammar, Rule};

    use super::AstNode;
    use parser::parse;

    #[test]
    fn test_labeled_edges_become_nodes() {
        // S <- var:[a-z]+ '=' val:[0-9]+;
        let grm = Grammar::from_rules(vec![Rule::new(
            "S",
            seq(vec![
                ast_label("var", one_or_more(charset(CharSet::from_range('a', 'z')))),
                lit("="),
                ast_label("val", one_or_more(charset(CharSet::from_range('0', '9')))),
            ])
        )])
        .unwrap();
        let memo = parse(&grm, "x=42");
        let m = memo.non_overlapping_matches_for_rule("S").unwrap()[0];
        let ast = AstNode::from_match("S", m, &memo);
        assert_eq!(ast.label(), "S");
        assert_eq!(ast.children().len(), 2);
        assert_eq!(ast.children()[0].label(), "var");
        assert_eq!(ast.children()[0].text(&memo), "x");
        assert_eq!(ast.children()[1].label(), "val");
        assert_eq!(ast.children()[1].text(&memo), "42");
    }

    #[test]
    fn test_unlabeled_structure_collapses() {
        // The Seq and OneOrMore between R's root and the labeled digits are invisible.
        let grm = Grammar::from_rules(vec![
            Rule::new("R", one_or_more(rule_ref("Item"))),
            Rule::new(
                "Item",
                seq(vec![ast_label("d", charset(CharSet::from_range('0', '9'))), lit(";")])
            ),
        ])
        .unwrap();
        let memo = parse(&grm, "1;2;3;");
        let m = memo.non_overlapping_matches_for_rule("R").unwrap()[0];
        let ast = AstNode::from_match("R", m, &memo);
        assert_eq!(ast.children().len(), 3);
        let texts = ast
            .children()
            .iter()
            .map(|c| c.text(&memo))
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_pp() {
        let grm = Grammar::from_rules(vec![Rule::new(
            "S",
            seq(vec![ast_label("a", lit("x")), ast_label("b", lit("y"))])
        )])
        .unwrap();
        let memo = parse(&grm, "xy");
        let m = memo.non_overlapping_matches_for_rule("S").unwrap()[0];
        let ast = AstNode::from_match("S", m, &memo);
        assert_eq!(ast.pp(&memo), "S 0+2\n a 0+1 \"x\"\n b 1+1 \"y\"\n");
    }
}
