//! Structural trees and declarations for judge I/O formats
//!
//! A [`FormatNode`] describes the layout of one input or output section:
//! which tokens appear, in what order, and under which loops. It says nothing
//! about a target language; lowering lives in [`crate::codegen`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::expr;

/// Canonical structural tree for one I/O section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormatNode {
    /// Ordered run of child nodes
    Sequence { items: Vec<FormatNode> },

    /// Counted loop: `counter` ranges over `0 .. size`
    Loop {
        counter: String,
        size: String,
        body: Box<FormatNode>,
    },

    /// One token bound to a variable, subscripted by `indices`
    Item { name: String, indices: Vec<String> },

    /// End of a physical line
    Newline,
}

impl FormatNode {
    pub fn seq(items: Vec<FormatNode>) -> Self {
        FormatNode::Sequence { items }
    }

    pub fn item(name: impl Into<String>) -> Self {
        FormatNode::Item {
            name: name.into(),
            indices: Vec::new(),
        }
    }

    pub fn indexed(name: impl Into<String>, indices: &[&str]) -> Self {
        FormatNode::Item {
            name: name.into(),
            indices: indices.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn counted(counter: impl Into<String>, size: impl Into<String>, body: FormatNode) -> Self {
        FormatNode::Loop {
            counter: counter.into(),
            size: size.into(),
            body: Box::new(body),
        }
    }
}

/// Scalar type of a variable
///
/// `IndexInt` marks loop-bound and index-role integers; `ValueInt` is general
/// integer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarType {
    IndexInt,
    ValueInt,
    Float,
    String,
    Char,
}

/// A variable's declared shape and inferred scalar type
///
/// `dims` and `bases` have one entry per enclosing loop, in nesting order.
/// `depending` is the set of variable names referenced inside `dims`/`bases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<VarType>,
    pub dims: Vec<String>,
    pub bases: Vec<String>,
    pub depending: BTreeSet<String>,
}

impl VarDecl {
    pub fn scalar(name: impl Into<String>) -> Self {
        VarDecl {
            name: name.into(),
            ty: None,
            dims: Vec::new(),
            bases: Vec::new(),
            depending: BTreeSet::new(),
        }
    }
}

/// A named constant extracted from samples or problem text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDecl {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub ty: VarType,
}

/// A recognized idiomatic output pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputShape {
    /// Exactly one scalar is printed
    Scalar { ty: Option<VarType> },

    /// Exactly two scalars are printed, on one line or two
    Pair {
        name1: String,
        ty1: Option<VarType>,
        name2: String,
        ty2: Option<VarType>,
        newline_between: bool,
    },

    /// A yes/no-like answer with the two observed literal spellings
    YesNo { yes: String, no: String },

    /// A 1-D array, optionally preceded by its own size
    Vector {
        ty: Option<VarType>,
        counter: String,
        print_size: bool,
        newline_after_size: bool,
        newline_after_item: bool,
    },
}

/// One literal sample: an input string and the expected output string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCase {
    pub input: String,
    pub output: String,
}

/// Fixed name used for the variable counting test cases
pub const TESTCASES_NAME: &str = "testcases";

/// Flatten nested sequences and unwrap single-child sequences
pub fn flatten(node: FormatNode) -> FormatNode {
    match node {
        FormatNode::Item { .. } | FormatNode::Newline => node,
        FormatNode::Sequence { items } => {
            let mut flat = Vec::new();
            for item in items {
                match flatten(item) {
                    FormatNode::Sequence { items } => flat.extend(items),
                    other => flat.push(other),
                }
            }
            if flat.len() == 1 {
                flat.pop().unwrap()
            } else {
                FormatNode::Sequence { items: flat }
            }
        }
        FormatNode::Loop { counter, size, body } => FormatNode::Loop {
            counter,
            size,
            body: Box::new(flatten(*body)),
        },
    }
}

fn nice_variable_name(used: &BTreeSet<String>) -> String {
    // skip i..l, which are reserved for counters
    for c in "abcdefgh".chars().chain("mnopqrstuvwxyz".chars()) {
        let s = c.to_string();
        if !used.contains(&s) {
            return s;
        }
    }
    for c1 in 'A'..='Z' {
        for c2 in 'A'..='Z' {
            let s = format!("a{}{}", c1, c2);
            if !used.contains(&s) {
                return s;
            }
        }
    }
    unreachable!("variable name space exhausted")
}

fn nice_counter_name(used: &BTreeSet<String>) -> String {
    for c in "ijkl".chars() {
        let s = c.to_string();
        if !used.contains(&s) {
            return s;
        }
    }
    for c1 in 'A'..='Z' {
        for c2 in 'A'..='Z' {
            let s = format!("i{}{}", c1, c2);
            if !used.contains(&s) {
                return s;
            }
        }
    }
    unreachable!("counter name space exhausted")
}

fn rename_dfs(
    node: &FormatNode,
    replace: &mut std::collections::HashMap<String, String>,
    used: &mut BTreeSet<String>,
) -> FormatNode {
    match node {
        FormatNode::Item { name, indices } => {
            let new_name = if name == TESTCASES_NAME {
                TESTCASES_NAME.to_string()
            } else {
                nice_variable_name(used)
            };
            let indices = indices
                .iter()
                .map(|ix| expr::rename_in_expr(ix, replace))
                .collect();
            replace.insert(name.clone(), new_name.clone());
            used.insert(new_name.clone());
            FormatNode::Item {
                name: new_name,
                indices,
            }
        }
        FormatNode::Newline => FormatNode::Newline,
        FormatNode::Sequence { items } => FormatNode::Sequence {
            items: items.iter().map(|it| rename_dfs(it, replace, used)).collect(),
        },
        FormatNode::Loop { counter, size, body } => {
            let new_counter = nice_counter_name(used);
            let size = expr::rename_in_expr(size, replace);
            replace.insert(counter.clone(), new_counter.clone());
            used.insert(new_counter.clone());
            let body = rename_dfs(body, replace, used);
            used.remove(&new_counter);
            replace.remove(counter);
            FormatNode::Loop {
                counter: new_counter,
                size,
                body: Box::new(body),
            }
        }
    }
}

/// Rename variables to short friendly names (`a, b, …` with counters `i, j, …`)
pub fn rename_variables_nicely(node: &FormatNode, used: &BTreeSet<String>) -> FormatNode {
    let mut used = used.clone();
    rename_dfs(node, &mut std::collections::HashMap::new(), &mut used)
}

/// Build a format tree from a pre-extracted ordered declaration list
///
/// Each variable gets its own line; dimensioned variables are wrapped in one
/// loop per dimension with counters `i, j, …`.
pub fn format_from_declarations(decls: &[VarDecl]) -> FormatNode {
    let mut items = Vec::new();
    for decl in decls {
        let counters: Vec<String> = (0..decl.dims.len())
            .map(|depth| {
                "ijkl"
                    .chars()
                    .nth(depth)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| format!("i{}", depth))
            })
            .collect();
        let mut node = FormatNode::Item {
            name: decl.name.clone(),
            indices: counters.clone(),
        };
        for (counter, dim) in counters.iter().zip(&decl.dims).rev() {
            node = FormatNode::counted(counter.clone(), dim.clone(), node);
        }
        items.push(node);
        items.push(FormatNode::Newline);
    }
    FormatNode::Sequence { items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_unwraps_nested_sequences() {
        let node = FormatNode::seq(vec![
            FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]),
            FormatNode::seq(vec![FormatNode::seq(vec![FormatNode::item("b")])]),
        ]);
        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::item("b"),
        ]);
        assert_eq!(flatten(node), expected);
    }

    #[test]
    fn test_rename_nicely() {
        let node = FormatNode::seq(vec![
            FormatNode::item("X"),
            FormatNode::Newline,
            FormatNode::counted("t", "X", FormatNode::indexed("Y", &["t"])),
            FormatNode::Newline,
        ]);
        let renamed = rename_variables_nicely(&node, &BTreeSet::new());
        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::counted("i", "a", FormatNode::indexed("b", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(renamed, expected);
    }

    #[test]
    fn test_format_from_declarations() {
        let decls = vec![
            VarDecl::scalar("n"),
            VarDecl {
                name: "a".to_string(),
                ty: None,
                dims: vec!["n".to_string()],
                bases: vec!["0".to_string()],
                depending: ["n".to_string()].into_iter().collect(),
            },
        ];
        let expected = FormatNode::seq(vec![
            FormatNode::item("n"),
            FormatNode::Newline,
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(format_from_declarations(&decls), expected);
    }
}
