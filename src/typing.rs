//! Type inference for declared variables
//!
//! Variables used as loop bounds or in other declarations' dimensions are
//! integers by role, before any sample is looked at. Everything else is typed
//! by matching the tree against the samples and widening over the observed
//! literals.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::error::AnalyzerResult;
use crate::expr;
use crate::format::{FormatNode, VarDecl, VarType};
use crate::matcher::{self, Value, Values};

fn collect_size_symbols(node: &FormatNode, out: &mut BTreeSet<String>) {
    match node {
        FormatNode::Item { .. } | FormatNode::Newline => {}
        FormatNode::Sequence { items } => {
            for item in items {
                collect_size_symbols(item, out);
            }
        }
        FormatNode::Loop { size, body, .. } => {
            for symbol in expr::symbols(size) {
                out.insert(expr::split_subscript(&symbol).0);
            }
            collect_size_symbols(body, out);
        }
    }
}

/// Mark variables that bound loops or size other declarations as `IndexInt`
pub fn mark_index_roles(node: &FormatNode, decls: &mut IndexMap<String, VarDecl>) {
    let mut roles = BTreeSet::new();
    collect_size_symbols(node, &mut roles);
    let depending: Vec<String> = decls
        .values()
        .flat_map(|decl| decl.depending.iter().cloned())
        .collect();
    roles.extend(depending);
    for (name, decl) in decls.iter_mut() {
        if roles.contains(name) {
            decl.ty = Some(VarType::IndexInt);
        }
    }
}

fn widen(observed: &[Value]) -> VarType {
    if observed.iter().all(|v| matches!(v, Value::Int(_))) {
        return VarType::ValueInt;
    }
    if observed
        .iter()
        .all(|v| matches!(v, Value::Int(_) | Value::Float(_)))
    {
        return VarType::Float;
    }
    // a one-character digit token classifies as Int but still reads as a char
    if observed.iter().all(|v| v.literal().chars().count() == 1) {
        return VarType::Char;
    }
    VarType::String
}

/// Infer types by matching each sample instance and widening over literals
///
/// Each instance pairs sample data with values already bound before the match
/// (empty on the input side, the matched input values on the output side).
/// Index-role variables keep `IndexInt` regardless of observations; variables
/// with no observations keep `None`. A failed match is returned as an error
/// so callers can record it and fall through.
pub fn update_types(
    node: &FormatNode,
    decls: &mut IndexMap<String, VarDecl>,
    instances: &[(&str, Values)],
) -> AnalyzerResult<()> {
    mark_index_roles(node, decls);

    let mut observed: IndexMap<String, Vec<Value>> = IndexMap::new();
    for (data, pre) in instances {
        let values = matcher::match_format(node, data, decls, pre.clone())?;
        for name in decls.keys() {
            if let Some(bound) = values.get(name) {
                observed
                    .entry(name.clone())
                    .or_default()
                    .extend(bound.values().cloned());
            }
        }
    }

    for (name, decl) in decls.iter_mut() {
        if decl.ty.is_some() {
            continue;
        }
        if let Some(values) = observed.get(name) {
            if !values.is_empty() {
                decl.ty = Some(widen(values));
            }
        }
    }
    Ok(())
}
