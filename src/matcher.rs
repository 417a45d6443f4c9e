//! Matches a format tree against one literal sample string
//!
//! Given the tree for `N` + newline + loop of `A_i` and the sample
//! `"6\n1 3 8 7 10 2\n"`, matching yields `N = 6` and `A = [1, 3, 8, 7, 10, 2]`.
//! The result drives pattern verification and type inference. A failed match
//! is an ordinary outcome, not a fatal error; callers fall through.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::expr::{self, Env};
use crate::format::{FormatNode, VarDecl};

/// One literal value bound during a match
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// The literal rendering, as it appeared in the sample
    pub fn literal(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

/// Per-variable values keyed by (zero-based) index tuple
pub type Values = HashMap<String, HashMap<Vec<i64>, Value>>;

fn classify_token(token: &str) -> Value {
    let no_leading_zero = token == "0" || !token.starts_with('0');
    if no_leading_zero {
        if let Ok(n) = token.parse::<i64>() {
            return Value::Int(n);
        }
    }
    if token.contains('.') {
        if let Ok(x) = token.parse::<f64>() {
            return Value::Float(x);
        }
    }
    Value::Str(token.to_string())
}

/// Build an integer environment from currently-bound values
fn build_env(values: &Values) -> Env {
    let mut env = Env::default();
    'names: for (name, bound) in values {
        if let Some(Value::Int(n)) = bound.get(&Vec::new()) {
            env.scalars.insert(name.clone(), *n);
        } else if bound.keys().any(|k| k.len() == 1) {
            let max = bound.keys().filter(|k| k.len() == 1).map(|k| k[0]).max();
            let Some(max) = max else { continue };
            let mut vec = Vec::new();
            for i in 0..=max {
                match bound.get(&vec![i]) {
                    Some(Value::Int(n)) => vec.push(*n),
                    _ => continue 'names,
                }
            }
            env.vectors.insert(name.clone(), vec);
        } else if bound.keys().any(|k| k.len() == 2) {
            let max_i = bound.keys().filter(|k| k.len() == 2).map(|k| k[0]).max();
            let Some(max_i) = max_i else { continue };
            let mut rows = Vec::new();
            for i in 0..=max_i {
                let max_j = bound
                    .keys()
                    .filter(|k| k.len() == 2 && k[0] == i)
                    .map(|k| k[1])
                    .max();
                let Some(max_j) = max_j else { continue 'names };
                let mut row = Vec::new();
                for j in 0..=max_j {
                    match bound.get(&vec![i, j]) {
                        Some(Value::Int(n)) => row.push(*n),
                        _ => continue 'names,
                    }
                }
                rows.push(row);
            }
            env.matrices.insert(name.clone(), rows);
        }
    }
    env
}

fn match_dfs(
    node: &FormatNode,
    tokens: &[String],
    pos: &mut usize,
    decls: &IndexMap<String, VarDecl>,
    values: &mut Values,
) -> AnalyzerResult<()> {
    match node {
        FormatNode::Item { name, indices } => {
            let token = tokens.get(*pos).ok_or_else(|| {
                AnalyzerError::format_analysis("unexpected end of sample tokens")
            })?;
            if token == "\n" {
                return Err(AnalyzerError::format_analysis("unexpected newline in sample"));
            }
            let value = classify_token(token);
            *pos += 1;

            let decl = decls.get(name).ok_or_else(|| {
                AnalyzerError::format_analysis(format!("undeclared variable: {}", name))
            })?;
            let env = build_env(values);
            let mut ix = Vec::new();
            for (index, (dim, base)) in indices.iter().zip(decl.dims.iter().zip(&decl.bases)) {
                let i = expr::evaluate(&format!("({}) - ({})", index, base), &env)
                    .ok_or_else(|| {
                        AnalyzerError::format_analysis(format!(
                            "failed to evaluate index: {} - ({})",
                            index, base
                        ))
                    })?;
                let dim = expr::evaluate(dim, &env).ok_or_else(|| {
                    AnalyzerError::format_analysis(format!("failed to evaluate size: {}", dim))
                })?;
                if i < 0 || i >= dim {
                    return Err(AnalyzerError::format_analysis(format!(
                        "index out of bounds: index is {} but size is {}",
                        i, dim
                    )));
                }
                ix.push(i);
            }
            values.entry(name.clone()).or_default().insert(ix, value);
            Ok(())
        }
        FormatNode::Newline => {
            let token = tokens.get(*pos).ok_or_else(|| {
                AnalyzerError::format_analysis("unexpected end of sample tokens")
            })?;
            if token != "\n" {
                return Err(AnalyzerError::format_analysis(format!(
                    "expected newline, got {:?}",
                    token
                )));
            }
            *pos += 1;
            Ok(())
        }
        FormatNode::Sequence { items } => {
            for item in items {
                match_dfs(item, tokens, pos, decls, values)?;
            }
            Ok(())
        }
        FormatNode::Loop { counter, size, body } => {
            let env = build_env(values);
            let size = expr::evaluate(size, &env).ok_or_else(|| {
                AnalyzerError::format_analysis(format!("failed to evaluate size: {}", size))
            })?;
            for i in 0..size {
                values.insert(counter.clone(), [(Vec::new(), Value::Int(i))].into());
                match_dfs(body, tokens, pos, decls, values)?;
            }
            values.remove(counter);
            Ok(())
        }
    }
}

fn tokenize_sample(data: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in data.lines() {
        tokens.extend(line.split_whitespace().map(|s| s.to_string()));
        tokens.push("\n".to_string());
    }
    tokens
}

/// Match a format tree against one sample, returning all bound values
///
/// `pre` carries values already bound by an earlier match (the input side,
/// when matching an output sample). The whole sample must be consumed.
pub fn match_format(
    node: &FormatNode,
    data: &str,
    decls: &IndexMap<String, VarDecl>,
    pre: Values,
) -> AnalyzerResult<Values> {
    let mut values = pre;
    let tokens = tokenize_sample(data);
    let mut pos = 0;
    match_dfs(node, &tokens, &mut pos, decls, &mut values)?;
    if pos != tokens.len() {
        return Err(AnalyzerError::format_analysis(format!(
            "end of sample expected, but {:?} found",
            tokens[pos]
        )));
    }
    Ok(values)
}
