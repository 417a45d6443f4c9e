//! Judge I/O Format Analyzer and Boilerplate Generator
//!
//! This library infers the input and output formats of a competitive
//! programming problem, from a textual format description or from the sample
//! cases alone, and renders the C++ boilerplate that reads the input, calls a
//! `solve` function, and prints the result.
//!
//! # Example
//!
//! ```rust
//! use iogen::{analyze, codegen, AnalyzerResources, CodegenConfig, SampleCase};
//!
//! let resources = AnalyzerResources {
//!     samples: vec![SampleCase {
//!         input: "3\n1 2 3\n".to_string(),
//!         output: "6\n".to_string(),
//!     }],
//!     ..AnalyzerResources::default()
//! };
//! let analysis = analyze(&resources);
//! assert!(analysis.input_format.is_some());
//!
//! let config = CodegenConfig::default();
//! let code = codegen::read_input_code(&analysis, &config, 1);
//! assert!(code.contains("std::cin >> a;"));
//! ```

pub mod codegen;
pub mod constants;
pub mod error;
pub mod expr;
pub mod format;
pub mod matcher;
pub mod minimum_tree;
pub mod output_types;
pub mod parser;
pub mod patterns;
pub mod typing;
pub mod variables;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use codegen::{CodegenConfig, LoopStyle, Printer, Scanner};
pub use error::{AnalyzerError, AnalyzerResult};
pub use format::{ConstantDecl, FormatNode, OutputShape, SampleCase, VarDecl, VarType};

use crate::matcher::Values;

/// Everything known about a problem before analysis
///
/// All fields are optional in spirit: an empty value means the information is
/// unavailable and the analyzer falls through to the next strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerResources {
    /// Textual format description of the input section, if one was given
    pub input_format_string: Option<String>,
    /// Textual format description of the output section, if one was given
    pub output_format_string: Option<String>,
    /// Pre-extracted input declarations, e.g. from a function-style problem
    pub input_declarations: Option<Vec<VarDecl>>,
    /// Pre-extracted output declarations
    pub output_declarations: Option<Vec<VarDecl>>,
    pub samples: Vec<SampleCase>,
    /// Whether each input holds `testcases` independent test cases
    pub multiple_test_cases: bool,
    /// Problem statement text, scanned for well-known constants
    pub problem_text: Option<String>,
}

/// The analyzer's complete result
///
/// `None` fields mean the corresponding question could not be answered; the
/// code generator degrades to commented skeletons for those parts.
/// `diagnostics` records every strategy failure in order, for display to the
/// user rather than for control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub input_format: Option<FormatNode>,
    pub input_variables: Option<IndexMap<String, VarDecl>>,
    pub output_format: Option<FormatNode>,
    pub output_variables: Option<IndexMap<String, VarDecl>>,
    pub constants: IndexMap<String, ConstantDecl>,
    pub output_shape: Option<OutputShape>,
    pub diagnostics: Vec<String>,
}

/// Overlay types from pre-extracted declarations onto collected ones
fn overlay_declared_types(decls: &mut IndexMap<String, VarDecl>, provided: &[VarDecl]) {
    for given in provided {
        if let Some(decl) = decls.get_mut(&given.name) {
            if decl.ty.is_none() {
                decl.ty = given.ty;
            }
        }
    }
}

/// Infer the input format tree, most reliable source first
fn infer_input_format(resources: &AnalyzerResources, diagnostics: &mut Vec<String>) -> Option<FormatNode> {
    if let Some(description) = &resources.input_format_string {
        match parser::parse_format(description) {
            Ok(node) => return Some(node),
            Err(err) => diagnostics.push(format!("input format description rejected: {}", err)),
        }
        return None;
    }
    if let Some(decls) = &resources.input_declarations {
        return Some(format::format_from_declarations(decls));
    }
    if resources.samples.is_empty() {
        diagnostics.push("no input format description and no samples".to_string());
        return None;
    }

    let inputs: Vec<&str> = resources.samples.iter().map(|s| s.input.as_str()).collect();
    if !resources.multiple_test_cases {
        let instances: Vec<(&str, Values)> =
            inputs.iter().map(|data| (*data, Values::new())).collect();
        if let Ok(node) = patterns::infer_format(&instances, &[]) {
            return Some(node);
        }
    }
    if let Some(node) = minimum_tree::construct_input_format(&inputs, resources.multiple_test_cases)
    {
        return Some(node);
    }
    diagnostics.push("input search gave up, capturing the first sample verbatim".to_string());
    Some(minimum_tree::raw_capture_format(inputs[0]))
}

/// Bound input values per sample, for matching the output side
///
/// Returns `None` as soon as one sample's input does not match, since a
/// partially bound environment would misread the remaining outputs.
fn matched_input_values(
    samples: &[SampleCase],
    input_format: &FormatNode,
    input_variables: &IndexMap<String, VarDecl>,
) -> Option<Vec<Values>> {
    let mut bound = Vec::new();
    for sample in samples {
        let values =
            matcher::match_format(input_format, &sample.input, input_variables, Values::new())
                .ok()?;
        bound.push(values);
    }
    Some(bound)
}

/// Scalar integer input variables, usable as loop bounds on the output side
fn scalar_int_names(input_variables: &IndexMap<String, VarDecl>) -> Vec<String> {
    input_variables
        .iter()
        .filter(|(_, decl)| {
            decl.dims.is_empty()
                && matches!(decl.ty, Some(VarType::IndexInt) | Some(VarType::ValueInt))
        })
        .map(|(name, _)| name.clone())
        .collect()
}

fn infer_output_format(
    resources: &AnalyzerResources,
    input_format: &Option<FormatNode>,
    input_variables: &Option<IndexMap<String, VarDecl>>,
    diagnostics: &mut Vec<String>,
) -> Option<FormatNode> {
    if let Some(description) = &resources.output_format_string {
        match parser::parse_format(description) {
            Ok(node) => return Some(node),
            Err(err) => diagnostics.push(format!("output format description rejected: {}", err)),
        }
        return None;
    }
    if let Some(decls) = &resources.output_declarations {
        return Some(format::format_from_declarations(decls));
    }
    if resources.samples.is_empty() {
        diagnostics.push("no output format description and no samples".to_string());
        return None;
    }

    let outputs: Vec<&str> = resources.samples.iter().map(|s| s.output.as_str()).collect();

    if let (Some(node), Some(decls)) = (input_format, input_variables) {
        // the input's scalars may size the output, try them as loop bounds
        if !resources.multiple_test_cases {
            if let Some(bound) = matched_input_values(&resources.samples, node, decls) {
                let instances: Vec<(&str, Values)> = outputs
                    .iter()
                    .zip(bound)
                    .map(|(data, pre)| (*data, pre))
                    .collect();
                if let Ok(found) = patterns::infer_format(&instances, &scalar_int_names(decls)) {
                    return Some(found);
                }
            }
        }
        if let Some(found) = minimum_tree::construct_output_format_using_input(
            &resources.samples,
            node,
            decls,
            resources.multiple_test_cases,
        ) {
            return Some(found);
        }
    } else {
        let instances: Vec<(&str, Values)> =
            outputs.iter().map(|data| (*data, Values::new())).collect();
        if let Ok(found) = patterns::infer_format(&instances, &[]) {
            return Some(found);
        }
        if let Some(found) = minimum_tree::construct_output_format(&outputs) {
            return Some(found);
        }
    }
    diagnostics.push("output search gave up, capturing the first sample verbatim".to_string());
    Some(minimum_tree::raw_capture_format(outputs[0]))
}

/// Run the whole analysis pipeline over the given resources
///
/// Strategy order per side: the textual description, then pre-extracted
/// declarations, then pattern matching against the samples, then the minimum
/// tree search, then a verbatim capture of the first sample. Failures never
/// abort the run; they are recorded in `diagnostics` and the next strategy
/// takes over.
pub fn analyze(resources: &AnalyzerResources) -> Analysis {
    let mut diagnostics = Vec::new();

    let input_format = infer_input_format(resources, &mut diagnostics);

    let mut input_variables = None;
    if let Some(node) = &input_format {
        match variables::collect_declared_variables(node) {
            Ok(mut decls) => {
                if let Some(provided) = &resources.input_declarations {
                    overlay_declared_types(&mut decls, provided);
                }
                let instances: Vec<(&str, Values)> = resources
                    .samples
                    .iter()
                    .map(|s| (s.input.as_str(), Values::new()))
                    .collect();
                if let Err(err) = typing::update_types(node, &mut decls, &instances) {
                    diagnostics.push(format!("input samples do not match the format: {}", err));
                }
                input_variables = Some(decls);
            }
            Err(err) => diagnostics.push(format!("input format analysis failed: {}", err)),
        }
    }

    let output_format =
        infer_output_format(resources, &input_format, &input_variables, &mut diagnostics);

    let mut output_variables = None;
    if let Some(node) = &output_format {
        match variables::collect_declared_variables(node) {
            Ok(mut decls) => {
                if let Some(provided) = &resources.output_declarations {
                    overlay_declared_types(&mut decls, provided);
                }
                // output loop bounds may reference input variables, so each
                // sample's matched input values are bound before the match
                let bound = match (&input_format, &input_variables) {
                    (Some(input_node), Some(input_decls)) => {
                        matched_input_values(&resources.samples, input_node, input_decls)
                    }
                    _ => None,
                }
                .unwrap_or_else(|| vec![Values::new(); resources.samples.len()]);
                let instances: Vec<(&str, Values)> = resources
                    .samples
                    .iter()
                    .zip(bound)
                    .map(|(s, pre)| (s.output.as_str(), pre))
                    .collect();
                if let Err(err) = typing::update_types(node, &mut decls, &instances) {
                    diagnostics.push(format!("output samples do not match the format: {}", err));
                }
                output_variables = Some(decls);
            }
            Err(err) => diagnostics.push(format!("output format analysis failed: {}", err)),
        }
    }

    let constants = constants::collect_constants(&resources.samples, resources.problem_text.as_deref());

    let output_shape = match (&output_format, &output_variables) {
        (Some(node), Some(decls)) => output_types::analyze_output_shape(node, decls, &constants),
        _ => None,
    };

    Analysis {
        input_format,
        input_variables,
        output_format,
        output_variables,
        constants,
        output_shape,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(input: &str, output: &str) -> SampleCase {
        SampleCase {
            input: input.to_string(),
            output: output.to_string(),
        }
    }

    #[test]
    fn test_analyze_from_descriptions() {
        let resources = AnalyzerResources {
            input_format_string: Some("N\nA_1 A_2 ... A_N\n".to_string()),
            output_format_string: Some("ans\n".to_string()),
            samples: vec![sample("3\n1 2 3\n", "6\n"), sample("1\n10\n", "10\n")],
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);

        let input_variables = analysis.input_variables.as_ref().unwrap();
        assert_eq!(input_variables["N"].ty, Some(VarType::IndexInt));
        assert_eq!(input_variables["A"].ty, Some(VarType::ValueInt));
        assert_eq!(input_variables["A"].dims, vec!["N".to_string()]);
        assert_eq!(
            analysis.output_shape,
            Some(OutputShape::Scalar {
                ty: Some(VarType::ValueInt)
            })
        );
        assert_eq!(analysis.diagnostics, Vec::<String>::new());
    }

    #[test]
    fn test_analyze_from_samples_alone() {
        let resources = AnalyzerResources {
            samples: vec![sample("3\n1 2 3\n", "6\n"), sample("2\n5 5\n", "10\n")],
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);

        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::counted("i", "a", FormatNode::indexed("b", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(analysis.input_format, Some(expected));
        let input_variables = analysis.input_variables.as_ref().unwrap();
        assert_eq!(input_variables["a"].ty, Some(VarType::IndexInt));
        assert_eq!(input_variables["b"].ty, Some(VarType::ValueInt));
        assert!(matches!(
            analysis.output_shape,
            Some(OutputShape::Scalar { .. })
        ));
    }

    #[test]
    fn test_analyze_yes_no_problem() {
        let resources = AnalyzerResources {
            samples: vec![sample("2\n", "Yes\n"), sample("3\n", "No\n")],
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);

        assert_eq!(analysis.constants["YES"].value, "Yes");
        assert_eq!(analysis.constants["NO"].value, "No");
        assert_eq!(
            analysis.output_shape,
            Some(OutputShape::YesNo {
                yes: "Yes".to_string(),
                no: "No".to_string(),
            })
        );
    }

    #[test]
    fn test_analyze_output_sized_by_input() {
        let resources = AnalyzerResources {
            samples: vec![sample("3\n3 1 2\n", "1 2 3\n"), sample("1\n7\n", "7\n")],
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);

        // the output row is recognized as a vector bound by the input's count
        match analysis.output_shape {
            Some(OutputShape::Vector {
                print_size,
                newline_after_item,
                ..
            }) => {
                assert!(!print_size);
                assert!(!newline_after_item);
            }
            other => panic!("expected vector shape, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_from_declarations() {
        let resources = AnalyzerResources {
            input_declarations: Some(vec![
                VarDecl {
                    name: "n".to_string(),
                    ty: Some(VarType::IndexInt),
                    dims: Vec::new(),
                    bases: Vec::new(),
                    depending: Default::default(),
                },
                VarDecl {
                    name: "a".to_string(),
                    ty: Some(VarType::ValueInt),
                    dims: vec!["n".to_string()],
                    bases: vec!["0".to_string()],
                    depending: ["n".to_string()].into_iter().collect(),
                },
            ]),
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);

        let expected = FormatNode::seq(vec![
            FormatNode::item("n"),
            FormatNode::Newline,
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(analysis.input_format, Some(expected));
        let input_variables = analysis.input_variables.as_ref().unwrap();
        assert_eq!(input_variables["a"].ty, Some(VarType::ValueInt));
    }

    #[test]
    fn test_bad_description_is_diagnosed_not_fatal() {
        let resources = AnalyzerResources {
            input_format_string: Some(r"N \bmod M".to_string()),
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);
        assert_eq!(analysis.input_format, None);
        assert!(analysis
            .diagnostics
            .iter()
            .any(|d| d.contains("input format description rejected")));
    }

    #[test]
    fn test_garbled_samples_still_produce_a_tree() {
        // nothing matches and the search cannot unify these, so the first
        // sample is captured verbatim
        let resources = AnalyzerResources {
            samples: vec![
                sample("x 1 y\n2\n", "a\n"),
                sample("3 4\n5 6 7\n8\n", "b c\n"),
            ],
            ..AnalyzerResources::default()
        };
        let analysis = analyze(&resources);
        assert!(analysis.input_format.is_some());
        assert!(!analysis.diagnostics.is_empty());
    }
}
