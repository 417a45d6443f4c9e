//! Format inference from samples alone, using a closed list of shapes
//!
//! When no format description is available, most judge problems still fall
//! into a handful of layouts: a few scalars, a count followed by a row, a
//! count followed by a column of rows. Each candidate tree is verified by
//! matching it against every sample; the first one that matches them all
//! wins. No match is an ordinary outcome, callers fall through to search.

use std::collections::BTreeSet;

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::format::FormatNode;
use crate::matcher::{self, Values};
use crate::variables::collect_declared_variables;

fn fresh_names(used: &BTreeSet<String>, count: usize) -> Vec<String> {
    let mut out = Vec::new();
    for c in "abcdefgh".chars().chain("mnopqrstuvwxyz".chars()) {
        let s = c.to_string();
        if !used.contains(&s) {
            out.push(s);
            if out.len() == count {
                break;
            }
        }
    }
    out
}

fn fresh_counter(used: &BTreeSet<String>) -> String {
    for c in "ijkl".chars() {
        let s = c.to_string();
        if !used.contains(&s) {
            return s;
        }
    }
    "i0".to_string()
}

/// Candidate trees, most specific first
fn candidates(names: &[String], counter: &str, extra_sizes: &[String]) -> Vec<FormatNode> {
    let n = names[0].clone();
    let a = names[1].clone();
    let b = names[2].clone();
    let c = names[3].clone();

    let mut out = vec![
        // a single scalar
        FormatNode::seq(vec![FormatNode::item(&n), FormatNode::Newline]),
    ];

    // loops sized by a variable bound before this section; these outrank the
    // multi-scalar rows so a row of exactly `size` values binds as one vector
    for size in extra_sizes {
        out.push(FormatNode::seq(vec![
            FormatNode::counted(counter, size.clone(), FormatNode::indexed(&n, &[counter])),
            FormatNode::Newline,
        ]));
        out.push(FormatNode::counted(
            counter,
            size.clone(),
            FormatNode::seq(vec![FormatNode::indexed(&n, &[counter]), FormatNode::Newline]),
        ));
    }

    // two or three scalars on one line
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::item(&a),
        FormatNode::Newline,
    ]));
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::item(&a),
        FormatNode::item(&b),
        FormatNode::Newline,
    ]));
    // two scalars on two lines
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::Newline,
        FormatNode::item(&a),
        FormatNode::Newline,
    ]));

    // count followed by its elements, in the common layouts
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::Newline,
        FormatNode::counted(counter, n.clone(), FormatNode::indexed(&a, &[counter])),
        FormatNode::Newline,
    ]));
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::counted(counter, n.clone(), FormatNode::indexed(&a, &[counter])),
        FormatNode::Newline,
    ]));
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::Newline,
        FormatNode::counted(
            counter,
            n.clone(),
            FormatNode::seq(vec![FormatNode::indexed(&a, &[counter]), FormatNode::Newline]),
        ),
    ]));
    out.push(FormatNode::seq(vec![
        FormatNode::item(&n),
        FormatNode::Newline,
        FormatNode::counted(
            counter,
            n.clone(),
            FormatNode::seq(vec![
                FormatNode::indexed(&a, &[counter]),
                FormatNode::indexed(&c, &[counter]),
                FormatNode::Newline,
            ]),
        ),
    ]));

    out
}

/// Infer a format tree by verifying known shapes against every instance
///
/// Each instance pairs sample data with values bound before this section.
/// `extra_sizes` lists variables from an earlier section that may size a
/// loop here (used when inferring an output format from the input's scalars).
pub fn infer_format(
    instances: &[(&str, Values)],
    extra_sizes: &[String],
) -> AnalyzerResult<FormatNode> {
    if instances.is_empty() {
        return Err(AnalyzerError::format_analysis(
            "no samples to match patterns against",
        ));
    }

    let mut used: BTreeSet<String> = extra_sizes.iter().cloned().collect();
    for (_, pre) in instances {
        used.extend(pre.keys().cloned());
    }
    let names = fresh_names(&used, 4);
    let counter = fresh_counter(&used);

    for candidate in candidates(&names, &counter, extra_sizes) {
        let decls = match collect_declared_variables(&candidate) {
            Ok(decls) => decls,
            Err(_) => continue,
        };
        let all_match = instances.iter().all(|(data, pre)| {
            matcher::match_format(&candidate, data, &decls, pre.clone()).is_ok()
        });
        if all_match {
            return Ok(candidate);
        }
    }
    Err(AnalyzerError::format_analysis("no known pattern matched"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_scalar() {
        let instances = [("42\n", Values::new())];
        let node = infer_format(&instances, &[]).unwrap();
        let expected = FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_count_and_row() {
        let instances = [
            ("3\n1 2 3\n", Values::new()),
            ("1\n5\n", Values::new()),
        ];
        let node = infer_format(&instances, &[]).unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::counted("i", "a", FormatNode::indexed("b", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_output_sized_by_input_scalar() {
        let pre: Values = [(
            "n".to_string(),
            [(Vec::new(), Value::Int(3))].into_iter().collect(),
        )]
        .into_iter()
        .collect();
        let instances = [("1 2 3\n", pre)];
        let node = infer_format(&instances, &["n".to_string()]).unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_input_sized_loop_outranks_scalar_row() {
        // three tokens could also bind as three scalars; the loop over the
        // pre-bound size must win
        let pre: Values = [(
            "n".to_string(),
            [(Vec::new(), Value::Int(3))].into_iter().collect(),
        )]
        .into_iter()
        .collect();
        let instances = [("4 5 6\n", pre.clone()), ("7 8 9\n", pre)];
        let node = infer_format(&instances, &["n".to_string()]).unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_single_scalar_still_wins_with_pre_bound_size() {
        let pre: Values = [(
            "n".to_string(),
            [(Vec::new(), Value::Int(3))].into_iter().collect(),
        )]
        .into_iter()
        .collect();
        let instances = [("7\n", pre)];
        let node = infer_format(&instances, &["n".to_string()]).unwrap();
        let expected = FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_inconsistent_samples_do_not_match() {
        let instances = [
            ("1 2\n", Values::new()),
            ("1 2 3 4 5 6 7\n", Values::new()),
        ];
        assert!(infer_format(&instances, &[]).is_err());
    }
}
