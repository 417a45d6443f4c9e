//! Constant extraction from samples and problem text
//!
//! Two sources: yes/no-style answer pairs observed across the sample outputs,
//! and well-known moduli quoted in the problem statement.

use indexmap::IndexMap;

use crate::format::{ConstantDecl, SampleCase, VarType};

/// Answer spellings recognized as a yes/no pair, positive spelling first
const YES_NO_PAIRS: &[(&str, &str)] = &[
    ("Yes", "No"),
    ("YES", "NO"),
    ("yes", "no"),
    ("Possible", "Impossible"),
    ("POSSIBLE", "IMPOSSIBLE"),
    ("First", "Second"),
    ("Alice", "Bob"),
];

const KNOWN_MODULI: &[&str] = &["1000000007", "998244353"];

/// Find the yes/no pair covering every sample output, if one exists
///
/// Every output must be a single token equal to one of the two spellings, and
/// there must be at least one output.
pub fn yes_no_pair(outputs: &[&str]) -> Option<(String, String)> {
    if outputs.is_empty() {
        return None;
    }
    let trimmed: Vec<&str> = outputs.iter().map(|s| s.trim()).collect();
    if trimmed.iter().any(|s| s.split_whitespace().count() != 1) {
        return None;
    }
    for (yes, no) in YES_NO_PAIRS {
        if trimmed.iter().all(|s| s == yes || s == no) {
            return Some((yes.to_string(), no.to_string()));
        }
    }
    None
}

fn modulus_from_text(text: &str) -> Option<&'static str> {
    for modulus in KNOWN_MODULI {
        if text.contains(modulus) {
            return Some(modulus);
        }
    }
    // the usual typeset spellings of 10^9 + 7
    let squashed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if squashed.contains("10^9+7") || squashed.contains("10^{9}+7") {
        return Some("1000000007");
    }
    None
}

/// Collect constants worth declaring in generated code
pub fn collect_constants(
    samples: &[SampleCase],
    problem_text: Option<&str>,
) -> IndexMap<String, ConstantDecl> {
    let mut constants = IndexMap::new();

    let outputs: Vec<&str> = samples.iter().map(|s| s.output.as_str()).collect();
    if let Some((yes, no)) = yes_no_pair(&outputs) {
        constants.insert(
            "YES".to_string(),
            ConstantDecl {
                name: "YES".to_string(),
                value: yes,
                ty: VarType::String,
            },
        );
        constants.insert(
            "NO".to_string(),
            ConstantDecl {
                name: "NO".to_string(),
                value: no,
                ty: VarType::String,
            },
        );
    }

    if let Some(text) = problem_text {
        if let Some(modulus) = modulus_from_text(text) {
            constants.insert(
                "MOD".to_string(),
                ConstantDecl {
                    name: "MOD".to_string(),
                    value: modulus.to_string(),
                    ty: VarType::ValueInt,
                },
            );
        }
    }

    constants
}
