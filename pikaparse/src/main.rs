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

extern crate getopts;
extern crate pikapar;

use std::{env, fs::File, io::Read, path::Path, process};

use getopts::Options;
use pikapar::{grammar_from_str, parse, AstNode};

fn usage(prog: &str, msg: &str) -> ! {
    let path = Path::new(prog);
    let leaf = match path.file_name().and_then(|x| x.to_str()) {
        Some(m) => m,
        None => "pikaparse"
    };
    if !msg.is_empty() {
        eprintln!("{}", msg);
    }
    eprintln!(
        "Usage: {} [-q] [-r <rule1,rule2,...>] <grammar.peg> <input file>",
        leaf
    );
    process::exit(1);
}

fn read_file(path: &str) -> String {
    let mut f = match File::open(path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Can't open file {}: {}", path, e);
            process::exit(1);
        }
    };
    let mut s = String::new();
    if let Err(e) = f.read_to_string(&mut s) {
        eprintln!("Can't read file {}: {}", path, e);
        process::exit(1);
    }
    s
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let matches = match Options::new()
        .optflag("h", "help", "")
        .optflag("q", "quiet", "Don't print the parse trees")
        .optopt(
            "r",
            "rules",
            "Comma-separated names of the rules expected to cover the input (defaults to the \
             top rule)",
            "RULES"
        )
        .parse(&args[1..])
    {
        Ok(m) => m,
        Err(f) => usage(prog, f.to_string().as_str())
    };
    if matches.opt_present("h") || matches.free.len() != 2 {
        usage(prog, "");
    }

    let grm_text = read_file(&matches.free[0]);
    let input = read_file(&matches.free[1]);
    let grm = match grammar_from_str(&grm_text) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    for w in grm.warnings() {
        eprintln!("Warning: {}", w);
    }

    let memo = parse(&grm, &input);
    let top = grm.top_rule_name().to_string();
    if !matches.opt_present("q") {
        for m in memo.non_overlapping_matches_for_rule(&top).unwrap() {
            let ast = AstNode::from_match(&top, m, &memo);
            print!("{}", ast.pp(&memo));
        }
    }

    let coverage_opt = matches.opt_str("r");
    let coverage = match coverage_opt {
        Some(ref s) => s.split(',').collect::<Vec<_>>(),
        None => vec![top.as_str()]
    };
    let errs = memo.syntax_errors(&coverage);
    if !errs.is_empty() {
        for e in &errs {
            eprintln!("Syntax error at {}", e);
        }
        process::exit(1);
    }
}
