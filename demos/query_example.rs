//! Example demonstrating pattern compilation and tree search
//!
//! Run with: cargo run --example query_example

use treeregex::{Tree, compile, find_all};

fn main() {
    let tree = Tree::from_bracketed(
        "(ROOT (S (NP (DT The) (NN cat)) (VP (VBD sat) (PP (IN on) (NP (DT the) (NN mat)))) (. .)))",
    )
    .expect("Failed to read tree");

    let query = "NP=np < DT=det !$ PP";
    println!("Query: {query}");

    let pattern = compile(query).expect("Failed to compile pattern");
    println!("Normalized: {pattern}");
    println!("Program:\n{}", pattern.program());

    for result in find_all(&pattern, &tree) {
        println!("Match at {}", tree.to_bracketed(result.node()));
        for (var_name, node_id) in result.iter_named() {
            println!("  {} = {}", var_name, tree.label(node_id));
        }
    }
}
