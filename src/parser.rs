//! Parser for textual format descriptions
//!
//! Turns a judge-style format description such as
//!
//! ```text
//! N
//! A_1 A_2 ... A_N
//! ```
//!
//! into a [`FormatNode`] tree: read `N`, newline, loop of size `N` reading
//! `A_i`, newline. Subscripted tokens together with an ellipsis marker become
//! loops; everything else is read verbatim.

use std::collections::{HashMap, HashSet};

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::expr;
use crate::format::{flatten, FormatNode};

/// Markers that continue a row: `A_1 A_2 ... A_N`. Alone on a line they
/// continue a column instead.
const HORIZONTAL_DOTS: &[&str] = &["..", "...", r"\dots", r"\ldots", r"\cdots", "…", "⋯"];

/// Markers that continue a column: `A_1`, `⋮`, `A_N`
const VERTICAL_DOTS: &[&str] = &[":", r"\vdots", "⋮"];

#[derive(Debug, Clone, PartialEq)]
enum DescToken {
    Fixed(String),
    Indexed { name: String, index: String },
    Ellipsis,
    VerticalEllipsis,
}

fn strip_typesetting(line: &str) -> String {
    line.replace('$', "")
        .replace(r"\(", "")
        .replace(r"\)", "")
        .replace(r"\ ", " ")
        .replace(r"\quad", " ")
}

fn tokenize(description: &str) -> AnalyzerResult<Vec<Vec<DescToken>>> {
    let mut lines = Vec::new();
    for raw_line in description.lines() {
        let line = strip_typesetting(raw_line);
        let mut tokens = Vec::new();
        for word in line.split_whitespace() {
            if HORIZONTAL_DOTS.contains(&word) {
                tokens.push(DescToken::Ellipsis);
            } else if VERTICAL_DOTS.contains(&word) {
                tokens.push(DescToken::VerticalEllipsis);
            } else if word.contains('\\') {
                return Err(AnalyzerError::format_analysis(format!(
                    "unsupported escape token: {:?}",
                    word
                )));
            } else if word.contains('_') {
                if word.matches('_').count() != 1 {
                    return Err(AnalyzerError::format_analysis(format!(
                        "ambiguous subscript: {:?}",
                        word
                    )));
                }
                let (name, index) = word.split_once('_').unwrap();
                let index = index.trim_start_matches('{').trim_end_matches('}');
                if index.contains(',') {
                    return Err(AnalyzerError::format_analysis(format!(
                        "multi-dimensional subscript is not supported: {:?}",
                        word
                    )));
                }
                tokens.push(DescToken::Indexed {
                    name: name.to_string(),
                    index: index.to_string(),
                });
            } else {
                tokens.push(DescToken::Fixed(word.to_string()));
            }
        }
        if tokens.len() == 1 && tokens[0] == DescToken::Ellipsis {
            tokens[0] = DescToken::VerticalEllipsis;
        }
        lines.push(tokens);
    }
    Ok(lines)
}

/// Order index expressions: integer literals numerically, then symbols textually
fn index_less(a: &str, b: &str) -> bool {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a < b,
        (Ok(_), Err(_)) => true,
        (Err(_), Ok(_)) => false,
        (Err(_), Err(_)) => a < b,
    }
}

/// First pass: trip count per indexed name, from min/max observed indices
fn collect_trip_counts(lines: &[Vec<DescToken>]) -> AnalyzerResult<HashMap<String, String>> {
    let mut ranges: HashMap<String, (String, String)> = HashMap::new();
    for line in lines {
        for token in line {
            if let DescToken::Indexed { name, index } = token {
                // already-bound loop variables carry no range information
                if matches!(index.as_str(), "i" | "j" | "k") {
                    continue;
                }
                let entry = ranges
                    .entry(name.clone())
                    .or_insert_with(|| (index.clone(), index.clone()));
                if index_less(index, &entry.0) {
                    entry.0 = index.clone();
                }
                if index_less(&entry.1, index) {
                    entry.1 = index.clone();
                }
            }
        }
    }
    let mut trips = HashMap::new();
    for (name, (lo, hi)) in ranges {
        let trip = expr::simplify(&format!("({}) - ({}) + 1", hi, lo))?;
        trips.insert(name, trip);
    }
    Ok(trips)
}

fn fresh_counter(used: &HashSet<String>) -> String {
    for c in "ijkl".chars() {
        let s = c.to_string();
        if !used.contains(&s) {
            return s;
        }
    }
    "i0".to_string()
}

/// Parse a format description string into a structural tree
pub fn parse_format(description: &str) -> AnalyzerResult<FormatNode> {
    let lines = tokenize(description)?;
    if lines.iter().all(|line| line.is_empty()) {
        return Err(AnalyzerError::format_analysis("empty format description"));
    }
    let trips = collect_trip_counts(&lines)?;

    let used_names: HashSet<String> = lines
        .iter()
        .flatten()
        .filter_map(|tok| match tok {
            DescToken::Fixed(name) => Some(name.clone()),
            DescToken::Indexed { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    let counter = fresh_counter(&used_names);

    let mut items: Vec<FormatNode> = Vec::new();
    let mut lowered: HashSet<String> = HashSet::new();
    // set while the last emitted node is the newline of an all-indexed line
    let mut pending_indexed_newline = false;

    for (y, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let sole_vertical = line.len() == 1 && line[0] == DescToken::VerticalEllipsis;
        let mut emitted_this_line = false;

        for (x, token) in line.iter().enumerate() {
            match token {
                DescToken::Fixed(name) => {
                    items.push(FormatNode::item(name.clone()));
                    emitted_this_line = true;
                    pending_indexed_newline = false;
                }
                DescToken::Indexed { .. } => {}
                DescToken::Ellipsis => {
                    let prev = if x > 0 { line.get(x - 1) } else { None };
                    let name = match prev {
                        Some(DescToken::Indexed { name, .. }) => name.clone(),
                        _ => {
                            return Err(AnalyzerError::format_analysis(
                                "horizontal ellipsis must follow an indexed token",
                            ))
                        }
                    };
                    if lowered.contains(&name) {
                        continue;
                    }
                    let trip = trips.get(&name).cloned().ok_or_else(|| {
                        AnalyzerError::format_analysis(format!(
                            "no index range observed for {:?}",
                            name
                        ))
                    })?;
                    items.push(FormatNode::counted(
                        counter.clone(),
                        trip,
                        FormatNode::indexed(name.clone(), &[&counter]),
                    ));
                    lowered.insert(name);
                    emitted_this_line = true;
                    pending_indexed_newline = false;
                }
                DescToken::VerticalEllipsis => {
                    if !sole_vertical {
                        return Err(AnalyzerError::format_analysis(
                            "vertical ellipsis must be the sole token on its line",
                        ));
                    }
                    let prev_line = if y > 0 { &lines[y - 1] } else {
                        return Err(AnalyzerError::format_analysis(
                            "vertical ellipsis at start of description",
                        ));
                    };
                    let mut names = Vec::new();
                    for token in prev_line {
                        match token {
                            DescToken::Indexed { name, .. } => {
                                if !lowered.contains(name) {
                                    names.push(name.clone());
                                }
                            }
                            _ => {
                                return Err(AnalyzerError::format_analysis(
                                    "vertical ellipsis must follow a line of indexed tokens",
                                ))
                            }
                        }
                    }
                    if names.is_empty() {
                        continue;
                    }
                    let trip = trips.get(&names[0]).cloned().ok_or_else(|| {
                        AnalyzerError::format_analysis(format!(
                            "no index range observed for {:?}",
                            names[0]
                        ))
                    })?;
                    for name in &names[1..] {
                        if trips.get(name) != Some(&trip) {
                            return Err(AnalyzerError::format_analysis(format!(
                                "inconsistent loop bound across vertical ellipsis: {:?} vs {:?}",
                                trips.get(name),
                                trip
                            )));
                        }
                    }
                    if pending_indexed_newline {
                        items.pop();
                        pending_indexed_newline = false;
                    }
                    let mut body: Vec<FormatNode> = names
                        .iter()
                        .map(|name| FormatNode::indexed(name.clone(), &[&counter]))
                        .collect();
                    body.push(FormatNode::Newline);
                    items.push(FormatNode::counted(
                        counter.clone(),
                        trip,
                        FormatNode::seq(body),
                    ));
                    lowered.extend(names);
                }
            }
        }

        if sole_vertical {
            continue;
        }
        let all_indexed = line
            .iter()
            .all(|tok| matches!(tok, DescToken::Indexed { .. }));
        if all_indexed && !emitted_this_line {
            if line.iter().all(|tok| match tok {
                DescToken::Indexed { name, .. } => lowered.contains(name),
                _ => false,
            }) {
                // trailing `A_N`-style line of an already-closed column
                continue;
            }
            items.push(FormatNode::Newline);
            pending_indexed_newline = true;
        } else {
            items.push(FormatNode::Newline);
            pending_indexed_newline = false;
        }
    }

    Ok(flatten(FormatNode::Sequence { items }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_then_row() {
        let node = parse_format("N\nA_1 A_2 ... A_N\n").unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("N"),
            FormatNode::Newline,
            FormatNode::counted("i", "N", FormatNode::indexed("A", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_trip_count_is_simplified() {
        let node = parse_format("l r\nA_l ... A_r\n").unwrap();
        match &node {
            FormatNode::Sequence { items } => match &items[3] {
                FormatNode::Loop { size, .. } => assert_eq!(size, "r - l + 1"),
                other => panic!("expected loop, got {:?}", other),
            },
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_vertical_column() {
        let node = parse_format("N\nA_1 B_1\n⋮\nA_N B_N\n").unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("N"),
            FormatNode::Newline,
            FormatNode::counted(
                "i",
                "N",
                FormatNode::seq(vec![
                    FormatNode::indexed("A", &["i"]),
                    FormatNode::indexed("B", &["i"]),
                    FormatNode::Newline,
                ]),
            ),
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_dots_alone_on_a_line_continue_a_column() {
        let node = parse_format("N\nA_1\n...\nA_N\n").unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("N"),
            FormatNode::Newline,
            FormatNode::counted(
                "i",
                "N",
                FormatNode::seq(vec![FormatNode::indexed("A", &["i"]), FormatNode::Newline]),
            ),
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_typesetting_is_stripped() {
        let node = parse_format("$N$ $M$\n").unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("N"),
            FormatNode::item("M"),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_comma_subscript_is_rejected() {
        assert!(matches!(
            parse_format("A_{1,1} ... A_{N,N}\n"),
            Err(AnalyzerError::FormatAnalysis { .. })
        ));
    }

    #[test]
    fn test_unknown_escape_is_rejected() {
        assert!(matches!(
            parse_format(r"N \bmod M"),
            Err(AnalyzerError::FormatAnalysis { .. })
        ));
    }

    #[test]
    fn test_inconsistent_vertical_bound_is_rejected() {
        let result = parse_format("A_1 B_2\n⋮\nA_N B_M\n");
        assert!(matches!(result, Err(AnalyzerError::FormatAnalysis { .. })));
    }

    #[test]
    fn test_repeated_ellipsis_is_idempotent() {
        // the second row for A must not produce a second loop
        let node = parse_format("A_1 ... A_N\nA_1 ... A_N\n").unwrap();
        let loops = match &node {
            FormatNode::Sequence { items } => items
                .iter()
                .filter(|it| matches!(it, FormatNode::Loop { .. }))
                .count(),
            _ => panic!("expected sequence"),
        };
        assert_eq!(loops, 1);
    }
}
