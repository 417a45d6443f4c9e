//! Classification of output formats into idiomatic shapes
//!
//! A tree that prints `n` followed by `a_1 ... a_n` is better rendered as a
//! solution returning `std::vector<int>`, recovering `n` from `ans.size()`,
//! than as a pair of results. This module recognizes those shapes so codegen
//! can pick the friendlier surface.

use indexmap::IndexMap;

use crate::format::{ConstantDecl, FormatNode, OutputShape, VarDecl, VarType};

fn match_indices(indices: &[String], counters: &[&str]) -> bool {
    if indices.len() != counters.len() {
        return false;
    }
    indices.iter().zip(counters).all(|(index, counter)| {
        index == counter
            || index == &format!("{} - 1", counter)
            || index == &format!("{} + 1", counter)
    })
}

fn item_type(decls: &IndexMap<String, VarDecl>, name: &str) -> Option<VarType> {
    decls.get(name).and_then(|decl| decl.ty)
}

fn as_scalar_item(node: &FormatNode) -> Option<&str> {
    match node {
        FormatNode::Item { name, indices } if indices.is_empty() => Some(name),
        _ => None,
    }
}

/// A loop whose body is one item indexed by the loop counter
fn as_element_loop<'a>(node: &'a FormatNode) -> Option<(&'a str, &'a str, &'a str, bool)> {
    if let FormatNode::Loop {
        counter,
        size,
        body,
    } = node
    {
        match &**body {
            FormatNode::Item { name, indices } if match_indices(indices, &[counter]) => {
                return Some((counter, size, name, false));
            }
            FormatNode::Sequence { items } if items.len() == 2 => {
                if let (FormatNode::Item { name, indices }, FormatNode::Newline) =
                    (&items[0], &items[1])
                {
                    if match_indices(indices, &[counter]) {
                        return Some((counter, size, name, true));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Recognize the output tree as one of the idiomatic shapes, if possible
pub fn analyze_output_shape(
    output_format: &FormatNode,
    decls: &IndexMap<String, VarDecl>,
    constants: &IndexMap<String, ConstantDecl>,
) -> Option<OutputShape> {
    // a column of items with no leading count flattens to a bare loop
    if let Some((counter, _, name, true)) = as_element_loop(output_format) {
        return Some(OutputShape::Vector {
            ty: item_type(decls, name),
            counter: counter.to_string(),
            print_size: false,
            newline_after_size: false,
            newline_after_item: true,
        });
    }

    let items = match output_format {
        FormatNode::Sequence { items } => items.as_slice(),
        _ => return None,
    };

    match items {
        // ans
        [item, FormatNode::Newline] => {
            if let Some(name) = as_scalar_item(item) {
                let ty = item_type(decls, name);
                if ty == Some(VarType::String) {
                    if let (Some(yes), Some(no)) = (constants.get("YES"), constants.get("NO")) {
                        return Some(OutputShape::YesNo {
                            yes: yes.value.clone(),
                            no: no.value.clone(),
                        });
                    }
                }
                return Some(OutputShape::Scalar { ty });
            }
            // a_1 ... a_n
            if let Some((counter, _, name, false)) = as_element_loop(item) {
                return Some(OutputShape::Vector {
                    ty: item_type(decls, name),
                    counter: counter.to_string(),
                    print_size: false,
                    newline_after_size: false,
                    newline_after_item: false,
                });
            }
            None
        }

        // x y
        [first, second, FormatNode::Newline] => {
            if let (Some(name1), Some(name2)) = (as_scalar_item(first), as_scalar_item(second)) {
                return Some(OutputShape::Pair {
                    name1: name1.to_string(),
                    ty1: item_type(decls, name1),
                    name2: name2.to_string(),
                    ty2: item_type(decls, name2),
                    newline_between: false,
                });
            }
            // n a_1 ... a_n
            if let (Some(size_name), Some((counter, size, name, false))) =
                (as_scalar_item(first), as_element_loop(second))
            {
                if size == size_name {
                    return Some(OutputShape::Vector {
                        ty: item_type(decls, name),
                        counter: counter.to_string(),
                        print_size: true,
                        newline_after_size: false,
                        newline_after_item: false,
                    });
                }
            }
            None
        }

        // n then a column of a_i
        [count, FormatNode::Newline, looped] => {
            let size_name = as_scalar_item(count)?;
            let (counter, size, name, per_line) = as_element_loop(looped)?;
            if !per_line || size != size_name {
                return None;
            }
            Some(OutputShape::Vector {
                ty: item_type(decls, name),
                counter: counter.to_string(),
                print_size: true,
                newline_after_size: true,
                newline_after_item: true,
            })
        }

        [first, FormatNode::Newline, third, FormatNode::Newline] => {
            // x on one line, y on the next
            if let (Some(name1), Some(name2)) = (as_scalar_item(first), as_scalar_item(third)) {
                return Some(OutputShape::Pair {
                    name1: name1.to_string(),
                    ty1: item_type(decls, name1),
                    name2: name2.to_string(),
                    ty2: item_type(decls, name2),
                    newline_between: true,
                });
            }
            // n then a_1 ... a_n
            if let (Some(size_name), Some((counter, size, name, false))) =
                (as_scalar_item(first), as_element_loop(third))
            {
                if size == size_name {
                    return Some(OutputShape::Vector {
                        ty: item_type(decls, name),
                        counter: counter.to_string(),
                        print_size: true,
                        newline_after_size: true,
                        newline_after_item: false,
                    });
                }
            }
            None
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::collect_constants;
    use crate::format::SampleCase;
    use crate::variables::collect_declared_variables;
    use pretty_assertions::assert_eq;

    fn decls_with_type(
        node: &FormatNode,
        name: &str,
        ty: VarType,
    ) -> IndexMap<String, VarDecl> {
        let mut decls = collect_declared_variables(node).unwrap();
        decls.get_mut(name).unwrap().ty = Some(ty);
        decls
    }

    #[test]
    fn test_scalar_shape() {
        let node = FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]);
        let decls = decls_with_type(&node, "a", VarType::ValueInt);
        let shape = analyze_output_shape(&node, &decls, &IndexMap::new());
        assert_eq!(
            shape,
            Some(OutputShape::Scalar {
                ty: Some(VarType::ValueInt)
            })
        );
    }

    #[test]
    fn test_yes_no_shape() {
        let node = FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]);
        let decls = decls_with_type(&node, "a", VarType::String);
        let samples = vec![
            SampleCase {
                input: "1\n".to_string(),
                output: "Yes\n".to_string(),
            },
            SampleCase {
                input: "2\n".to_string(),
                output: "No\n".to_string(),
            },
            SampleCase {
                input: "3\n".to_string(),
                output: "Yes\n".to_string(),
            },
        ];
        let constants = collect_constants(&samples, None);
        let shape = analyze_output_shape(&node, &decls, &constants);
        assert_eq!(
            shape,
            Some(OutputShape::YesNo {
                yes: "Yes".to_string(),
                no: "No".to_string(),
            })
        );
    }

    #[test]
    fn test_pair_shape() {
        let node = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::item("b"),
            FormatNode::Newline,
        ]);
        let decls = collect_declared_variables(&node).unwrap();
        let shape = analyze_output_shape(&node, &decls, &IndexMap::new());
        assert_eq!(
            shape,
            Some(OutputShape::Pair {
                name1: "a".to_string(),
                ty1: None,
                name2: "b".to_string(),
                ty2: None,
                newline_between: false,
            })
        );
    }

    #[test]
    fn test_sized_vector_shape() {
        let node = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::counted("i", "a", FormatNode::indexed("b", &["i"])),
            FormatNode::Newline,
        ]);
        let mut decls = collect_declared_variables(&node).unwrap();
        decls.get_mut("b").unwrap().ty = Some(VarType::ValueInt);
        let shape = analyze_output_shape(&node, &decls, &IndexMap::new());
        assert_eq!(
            shape,
            Some(OutputShape::Vector {
                ty: Some(VarType::ValueInt),
                counter: "i".to_string(),
                print_size: true,
                newline_after_size: true,
                newline_after_item: false,
            })
        );
    }

    #[test]
    fn test_column_vector_shape() {
        let node = FormatNode::counted(
            "i",
            "n",
            FormatNode::seq(vec![FormatNode::indexed("a", &["i"]), FormatNode::Newline]),
        );
        let decls = collect_declared_variables(&node).unwrap();
        let shape = analyze_output_shape(&node, &decls, &IndexMap::new());
        assert_eq!(
            shape,
            Some(OutputShape::Vector {
                ty: None,
                counter: "i".to_string(),
                print_size: false,
                newline_after_size: false,
                newline_after_item: true,
            })
        );
    }

    #[test]
    fn test_unrecognized_shape() {
        let node = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::item("b"),
            FormatNode::item("c"),
            FormatNode::item("d"),
            FormatNode::Newline,
        ]);
        let decls = collect_declared_variables(&node).unwrap();
        assert_eq!(analyze_output_shape(&node, &decls, &IndexMap::new()), None);
    }
}
