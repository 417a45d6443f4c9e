//! Declaration collection over a structural tree
//!
//! A depth-first walk produces one [`VarDecl`] per distinct item name, in
//! first-use order, with one dimension per enclosing loop and the dependency
//! set needed to order declarations during lowering.

use indexmap::IndexMap;

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::expr;
use crate::format::{FormatNode, VarDecl};

struct LoopFrame {
    counter: String,
    size: String,
}

fn collect_dfs(
    node: &FormatNode,
    frames: &mut Vec<LoopFrame>,
    decls: &mut IndexMap<String, VarDecl>,
) -> AnalyzerResult<()> {
    match node {
        FormatNode::Item { name, indices } => {
            if frames.iter().any(|f| &f.counter == name) {
                return Err(AnalyzerError::name_conflict(name.clone()));
            }
            if !decls.contains_key(name) {
                decls.insert(name.clone(), VarDecl::scalar(name.clone()));
            }
            let decl = decls.get_mut(name).unwrap();
            for pos in decl.dims.len()..indices.len() {
                let index = &indices[pos];
                let frame = frames
                    .iter()
                    .find(|f| expr::references(index, &f.counter))
                    .ok_or_else(|| {
                        AnalyzerError::format_analysis(format!(
                            "index {:?} of {:?} references no enclosing loop counter",
                            index, name
                        ))
                    })?;
                let base = expr::substitute_zero(index, &frame.counter)?;
                decl.dims.push(frame.size.clone());
                decl.bases.push(base);
            }
            if indices.len() != decl.dims.len() {
                return Err(AnalyzerError::format_analysis(format!(
                    "inconsistent dimensionality for {:?}: {} indices but {} dims",
                    name,
                    indices.len(),
                    decl.dims.len()
                )));
            }
            decl.depending = decl
                .dims
                .iter()
                .chain(&decl.bases)
                .flat_map(|e| expr::plain_symbols(e))
                .collect();
            Ok(())
        }
        FormatNode::Newline => Ok(()),
        FormatNode::Sequence { items } => {
            for item in items {
                collect_dfs(item, frames, decls)?;
            }
            Ok(())
        }
        FormatNode::Loop { counter, size, body } => {
            if decls.contains_key(counter) || frames.iter().any(|f| &f.counter == counter) {
                return Err(AnalyzerError::name_conflict(counter.clone()));
            }
            frames.push(LoopFrame {
                counter: counter.clone(),
                size: size.clone(),
            });
            let result = collect_dfs(body, frames, decls);
            frames.pop();
            result
        }
    }
}

/// Walk a structural tree and list its variable declarations in first-use order
pub fn collect_declared_variables(
    node: &FormatNode,
) -> AnalyzerResult<IndexMap<String, VarDecl>> {
    let mut decls = IndexMap::new();
    collect_dfs(node, &mut Vec::new(), &mut decls)?;
    Ok(decls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_and_array() {
        let node = FormatNode::seq(vec![
            FormatNode::item("n"),
            FormatNode::Newline,
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
        ]);
        let decls = collect_declared_variables(&node).unwrap();

        assert_eq!(decls.len(), 2);
        let keys: Vec<&String> = decls.keys().collect();
        assert_eq!(keys, ["n", "a"]);
        assert!(decls["n"].dims.is_empty());
        assert_eq!(decls["a"].dims, ["n"]);
        assert_eq!(decls["a"].bases, ["0"]);
        assert!(decls["a"].depending.contains("n"));
    }

    #[test]
    fn test_one_based_index_yields_base() {
        let node = FormatNode::counted(
            "i",
            "n",
            FormatNode::Item {
                name: "a".to_string(),
                indices: vec!["i + 1".to_string()],
            },
        );
        let decls = collect_declared_variables(&node).unwrap();
        assert_eq!(decls["a"].bases, ["1"]);
    }

    #[test]
    fn test_counter_shadowing_is_rejected() {
        let node = FormatNode::seq(vec![
            FormatNode::item("i"),
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
        ]);
        assert!(matches!(
            collect_declared_variables(&node),
            Err(AnalyzerError::NameConflict { .. })
        ));
    }

    #[test]
    fn test_jagged_dependency_set() {
        let node = FormatNode::seq(vec![
            FormatNode::item("testcases"),
            FormatNode::Newline,
            FormatNode::counted(
                "i",
                "testcases",
                FormatNode::seq(vec![
                    FormatNode::indexed("a", &["i"]),
                    FormatNode::Newline,
                    FormatNode::counted("j", "a_i", FormatNode::indexed("b", &["i", "j"])),
                    FormatNode::Newline,
                ]),
            ),
        ]);
        let decls = collect_declared_variables(&node).unwrap();
        assert_eq!(decls["b"].dims, ["testcases", "a_i"]);
        let depending: Vec<&String> = decls["b"].depending.iter().collect();
        assert_eq!(depending, ["testcases"]);
    }
}
