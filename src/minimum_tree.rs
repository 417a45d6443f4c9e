//! Format synthesis from sample strings alone, by best-first search
//!
//! When pattern matching fails, the format tree is recovered directly from
//! the samples: search over partial trees (with placeholders for the parts
//! not yet decided), match each candidate against every tokenized sample,
//! and return the smallest complete tree that consumes them all. Loop bounds
//! are expressed as de Bruijn indices into the integers read so far, adjusted
//! by a delta of -1, 0 or 1.
//!
//! From `"3\n1 2 3\n"` the search recovers: read one integer, newline, loop
//! that many times reading one integer, newline.

use indexmap::IndexMap;
use std::collections::{BTreeSet, BinaryHeap};

use crate::format::{
    flatten, rename_variables_nicely, FormatNode, SampleCase, VarDecl, VarType, TESTCASES_NAME,
};
use crate::matcher::{self, Value, Values};

const ITERATION_LIMIT: usize = 10000;
const SIZE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
enum SearchToken {
    Int(i64),
    Str,
    Newline,
}

/// Partial tree under construction
#[derive(Debug, Clone, PartialEq)]
enum SearchNode {
    Placeholder,
    Eof,
    Int(Box<SearchNode>),
    Str(Box<SearchNode>),
    Newline(Box<SearchNode>),
    Loop {
        index: usize,
        delta: i64,
        body: Box<SearchNode>,
        next: Box<SearchNode>,
    },
}

fn tree_size(node: &SearchNode) -> usize {
    match node {
        SearchNode::Placeholder | SearchNode::Eof => 1,
        SearchNode::Int(next) | SearchNode::Str(next) | SearchNode::Newline(next) => {
            1 + tree_size(next)
        }
        SearchNode::Loop {
            delta, body, next, ..
        } => 1 + delta.unsigned_abs() as usize + tree_size(body) + tree_size(next),
    }
}

fn read_count(node: &SearchNode) -> usize {
    match node {
        SearchNode::Placeholder | SearchNode::Eof => 0,
        SearchNode::Int(next) | SearchNode::Str(next) => 1 + read_count(next),
        SearchNode::Newline(next) => read_count(next),
        SearchNode::Loop { body, next, .. } => read_count(body) + read_count(next),
    }
}

fn count_placeholders(node: &SearchNode) -> usize {
    match node {
        SearchNode::Placeholder => 1,
        SearchNode::Eof => 0,
        SearchNode::Int(next) | SearchNode::Str(next) | SearchNode::Newline(next) => {
            count_placeholders(next)
        }
        SearchNode::Loop { body, next, .. } => count_placeholders(body) + count_placeholders(next),
    }
}

fn replace_first_placeholder(node: &SearchNode, subst: &SearchNode) -> Option<SearchNode> {
    match node {
        SearchNode::Placeholder => Some(subst.clone()),
        SearchNode::Eof => None,
        SearchNode::Int(next) => {
            replace_first_placeholder(next, subst).map(|n| SearchNode::Int(Box::new(n)))
        }
        SearchNode::Str(next) => {
            replace_first_placeholder(next, subst).map(|n| SearchNode::Str(Box::new(n)))
        }
        SearchNode::Newline(next) => {
            replace_first_placeholder(next, subst).map(|n| SearchNode::Newline(Box::new(n)))
        }
        SearchNode::Loop {
            index,
            delta,
            body,
            next,
        } => {
            if let Some(body) = replace_first_placeholder(body, subst) {
                return Some(SearchNode::Loop {
                    index: *index,
                    delta: *delta,
                    body: Box::new(body),
                    next: next.clone(),
                });
            }
            replace_first_placeholder(next, subst).map(|n| SearchNode::Loop {
                index: *index,
                delta: *delta,
                body: body.clone(),
                next: Box::new(n),
            })
        }
    }
}

#[derive(Debug, Clone)]
struct MatchState<'a> {
    tokens: &'a [SearchToken],
    offset: usize,
    env: Vec<i64>,
}

impl MatchState<'_> {
    fn at_eof(&self) -> bool {
        self.offset == self.tokens.len()
    }
}

enum MatchOutcome<'a> {
    Fail,
    /// Hit a placeholder; the state at that point seeds candidate generation
    Stop(MatchState<'a>),
    Done(MatchState<'a>),
}

fn run_match<'a>(node: &SearchNode, state: MatchState<'a>) -> MatchOutcome<'a> {
    match node {
        SearchNode::Placeholder => MatchOutcome::Stop(state),
        SearchNode::Eof => MatchOutcome::Done(state),
        SearchNode::Int(next) => match state.tokens.get(state.offset) {
            Some(SearchToken::Int(value)) => {
                let mut env = state.env;
                env.insert(0, *value);
                run_match(
                    next,
                    MatchState {
                        tokens: state.tokens,
                        offset: state.offset + 1,
                        env,
                    },
                )
            }
            _ => MatchOutcome::Fail,
        },
        SearchNode::Str(next) => match state.tokens.get(state.offset) {
            // every int token could also be read as a string
            Some(SearchToken::Int(_)) | Some(SearchToken::Str) => run_match(
                next,
                MatchState {
                    tokens: state.tokens,
                    offset: state.offset + 1,
                    env: state.env,
                },
            ),
            _ => MatchOutcome::Fail,
        },
        SearchNode::Newline(next) => match state.tokens.get(state.offset) {
            Some(SearchToken::Newline) => run_match(
                next,
                MatchState {
                    tokens: state.tokens,
                    offset: state.offset + 1,
                    env: state.env,
                },
            ),
            _ => MatchOutcome::Fail,
        },
        SearchNode::Loop {
            index,
            delta,
            body,
            next,
        } => {
            let count = state.env.get(*index).copied().unwrap_or(0) + delta;
            // zero-trip loops would let placeholders go unvisited
            if count <= 0 {
                return MatchOutcome::Fail;
            }
            let mut state = state;
            for _ in 0..count {
                match run_match(body, state.clone()) {
                    MatchOutcome::Fail => return MatchOutcome::Fail,
                    MatchOutcome::Stop(stopped) => return MatchOutcome::Stop(stopped),
                    MatchOutcome::Done(result) => {
                        // the body's bindings do not outlive the iteration
                        state.offset = result.offset;
                    }
                }
            }
            run_match(next, state)
        }
    }
}

/// Every node that could extend the tree at the common stop point
fn next_candidates(states: &[MatchState<'_>]) -> Vec<SearchNode> {
    let mut out = vec![SearchNode::Eof];
    if states.iter().all(|s| s.at_eof()) {
        return out;
    }
    if states.iter().any(|s| s.at_eof()) {
        return out;
    }
    if states
        .iter()
        .all(|s| matches!(s.tokens[s.offset], SearchToken::Int(_)))
    {
        out.push(SearchNode::Int(Box::new(SearchNode::Placeholder)));
        push_loop_candidates(states, make_int_body, &mut out);
        return out;
    }
    if states.iter().all(|s| {
        matches!(
            s.tokens[s.offset],
            SearchToken::Int(_) | SearchToken::Str
        )
    }) {
        out.push(SearchNode::Str(Box::new(SearchNode::Placeholder)));
        push_loop_candidates(states, make_str_body, &mut out);
        return out;
    }
    if states
        .iter()
        .all(|s| matches!(s.tokens[s.offset], SearchToken::Newline))
    {
        out.push(SearchNode::Newline(Box::new(SearchNode::Placeholder)));
    }
    out
}

fn make_int_body() -> SearchNode {
    SearchNode::Int(Box::new(SearchNode::Placeholder))
}

fn make_str_body() -> SearchNode {
    SearchNode::Str(Box::new(SearchNode::Placeholder))
}

fn push_loop_candidates(
    states: &[MatchState<'_>],
    body: fn() -> SearchNode,
    out: &mut Vec<SearchNode>,
) {
    let env_size = states[0].env.len();
    for index in 0..env_size {
        for delta in [-1, 0, 1] {
            if states.iter().all(|s| s.env[index] + delta >= 0) {
                out.push(SearchNode::Loop {
                    index,
                    delta,
                    body: Box::new(body()),
                    next: Box::new(SearchNode::Placeholder),
                });
            }
        }
    }
}

#[derive(Debug)]
struct QueueEntry {
    size: usize,
    reads: usize,
    seq: u64,
    node: SearchNode,
}

impl QueueEntry {
    fn key(&self) -> (usize, usize, u64) {
        (self.size, self.reads, self.seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // reversed so the max-heap pops the smallest key
        other.key().cmp(&self.key())
    }
}

fn tokenize_search(content: &str) -> Vec<SearchToken> {
    // Only integers small enough to plausibly be a loop size stay ints.
    let int_max = (content.split_whitespace().count() + content.lines().count() + 3) as i64;
    let mut tokens = Vec::new();
    for line in content.split_inclusive('\n') {
        for word in line.split_whitespace() {
            match word.parse::<i64>() {
                Ok(n) if (0..=int_max).contains(&n) => tokens.push(SearchToken::Int(n)),
                _ => tokens.push(SearchToken::Str),
            }
        }
        if line.ends_with('\n') {
            tokens.push(SearchToken::Newline);
        }
    }
    tokens
}

/// Best-first search for the smallest complete tree matching every instance
///
/// The priority key is the tree size; ties are broken toward fewer token
/// reads, so a loop is preferred over an unrolled run of items.
fn search(
    instances: &[Vec<SearchToken>],
    initial_env: Option<&[Vec<i64>]>,
    initial_node: SearchNode,
) -> Option<SearchNode> {
    let mut queue = BinaryHeap::new();
    let mut seq = 0u64;
    queue.push(QueueEntry {
        size: tree_size(&initial_node),
        reads: read_count(&initial_node),
        seq,
        node: initial_node,
    });

    let mut iterations = 0;
    while let Some(entry) = queue.pop() {
        let current = entry.node;

        let mut states = Vec::new();
        for (i, instance) in instances.iter().enumerate() {
            let env = initial_env.map(|envs| envs[i].clone()).unwrap_or_default();
            let state = MatchState {
                tokens: instance,
                offset: 0,
                env,
            };
            match run_match(&current, state) {
                MatchOutcome::Fail => break,
                MatchOutcome::Done(state) => {
                    if !state.at_eof() {
                        break;
                    }
                    states.push(state);
                }
                MatchOutcome::Stop(state) => states.push(state),
            }
        }
        if states.len() != instances.len() {
            continue;
        }
        if states.iter().all(|s| s.at_eof()) && count_placeholders(&current) == 0 {
            return Some(current);
        }

        for candidate in next_candidates(&states) {
            if let Some(next) = replace_first_placeholder(&current, &candidate) {
                let size = tree_size(&next);
                if size <= SIZE_LIMIT {
                    seq += 1;
                    queue.push(QueueEntry {
                        size,
                        reads: read_count(&next),
                        seq,
                        node: next,
                    });
                }
            }
        }

        iterations += 1;
        if iterations > ITERATION_LIMIT {
            break;
        }
    }
    None
}

#[derive(Debug, Clone)]
struct EnvItem {
    name: String,
    is_counter: bool,
}

/// Counters enclosing the binding at `from`, outermost first
fn enclosing_counters(env: &[EnvItem], from: usize) -> Vec<String> {
    env[from..]
        .iter()
        .rev()
        .filter(|item| item.is_counter)
        .map(|item| item.name.clone())
        .collect()
}

/// Position of the `index`-th integer binding, skipping counter entries
///
/// The search environment holds integers only, while the converter's also
/// tracks loop counters; de Bruijn indices count integer bindings.
fn resolve_binding(env: &[EnvItem], index: usize) -> usize {
    let mut remaining = index;
    for (pos, item) in env.iter().enumerate() {
        if !item.is_counter {
            if remaining == 0 {
                return pos;
            }
            remaining -= 1;
        }
    }
    unreachable!("loop index {} outside environment", index)
}

fn subscripted(name: &str, indices: &[String]) -> String {
    match indices.len() {
        0 => name.to_string(),
        1 => format!("{}_{}", name, indices[0]),
        _ => format!("{}_{{{}}}", name, indices.join(",")),
    }
}

fn fresh_name(used: &BTreeSet<String>, fixed: &mut Vec<String>) -> String {
    if let Some(name) = fixed.pop() {
        return name;
    }
    for c in ('a'..='z').chain('A'..='Z') {
        let s = c.to_string();
        if !used.contains(&s) {
            return s;
        }
    }
    format!("v{}", used.len())
}

fn convert(
    node: &SearchNode,
    env: &[EnvItem],
    used: &mut BTreeSet<String>,
    fixed: &mut Vec<String>,
) -> FormatNode {
    match node {
        SearchNode::Placeholder => unreachable!("placeholder survived the search"),
        SearchNode::Eof => FormatNode::Sequence { items: Vec::new() },
        SearchNode::Int(next) | SearchNode::Str(next) => {
            let name = fresh_name(used, fixed);
            let indices = enclosing_counters(env, 0);
            used.insert(name.clone());
            let mut inner_env = Vec::with_capacity(env.len() + 1);
            if matches!(node, SearchNode::Int(_)) {
                inner_env.push(EnvItem {
                    name: name.clone(),
                    is_counter: false,
                });
            }
            inner_env.extend_from_slice(env);
            FormatNode::seq(vec![
                FormatNode::Item { name, indices },
                convert(next, &inner_env, used, fixed),
            ])
        }
        SearchNode::Newline(next) => FormatNode::seq(vec![
            FormatNode::Newline,
            convert(next, env, used, fixed),
        ]),
        SearchNode::Loop {
            index,
            delta,
            body,
            next,
        } => {
            let pos = resolve_binding(env, *index);
            let mut size = subscripted(&env[pos].name, &enclosing_counters(env, pos + 1));
            if *delta > 0 {
                size = format!("{} + {}", size, delta);
            } else if *delta < 0 {
                size = format!("{} - {}", size, -delta);
            }
            let counter = fresh_name(used, fixed);
            used.insert(counter.clone());
            let mut inner_env = Vec::with_capacity(env.len() + 1);
            inner_env.push(EnvItem {
                name: counter.clone(),
                is_counter: true,
            });
            inner_env.extend_from_slice(env);
            let body = convert(body, &inner_env, used, fixed);
            used.remove(&counter);
            FormatNode::seq(vec![
                FormatNode::Loop {
                    counter,
                    size,
                    body: Box::new(body),
                },
                convert(next, env, used, fixed),
            ])
        }
    }
}

/// Infer an input format tree from the samples alone
///
/// With `multiple_test_cases`, the tree is seeded with a leading `testcases`
/// count wrapping the rest in a loop.
pub fn construct_input_format(
    instances: &[&str],
    multiple_test_cases: bool,
) -> Option<FormatNode> {
    let tokenized: Vec<Vec<SearchToken>> =
        instances.iter().map(|s| tokenize_search(s)).collect();
    let initial_node = if multiple_test_cases {
        SearchNode::Int(Box::new(SearchNode::Newline(Box::new(SearchNode::Loop {
            index: 0,
            delta: 0,
            body: Box::new(SearchNode::Placeholder),
            next: Box::new(SearchNode::Eof),
        }))))
    } else {
        SearchNode::Placeholder
    };
    let node = search(&tokenized, None, initial_node)?;

    let mut used = BTreeSet::new();
    let mut fixed = if multiple_test_cases {
        vec![TESTCASES_NAME.to_string()]
    } else {
        Vec::new()
    };
    let format = convert(&node, &[], &mut used, &mut fixed);
    Some(flatten(rename_variables_nicely(&format, &BTreeSet::new())))
}

/// Infer an output format tree from the output samples alone
pub fn construct_output_format(instances: &[&str]) -> Option<FormatNode> {
    construct_input_format(instances, false)
}

/// Infer an output format tree, with the input's scalar integers in scope
///
/// Loop bounds in the result may reference input variables (the usual
/// "print `n` numbers" shape). If the input side fails to match, falls back
/// to the output samples alone.
pub fn construct_output_format_using_input(
    samples: &[SampleCase],
    input_format: &FormatNode,
    input_variables: &IndexMap<String, VarDecl>,
    multiple_test_cases: bool,
) -> Option<FormatNode> {
    let mut minimizer_env: Vec<Vec<i64>> = Vec::new();
    let mut converter_env: Vec<EnvItem> = Vec::new();
    let mut used: BTreeSet<String> = BTreeSet::new();

    let mut sorted_names: Vec<&String> = input_variables.keys().collect();
    sorted_names.sort();

    for (i, sample) in samples.iter().enumerate() {
        let values =
            match matcher::match_format(input_format, &sample.input, input_variables, Values::new())
            {
                Ok(values) => values,
                Err(_) => {
                    let outputs: Vec<&str> = samples.iter().map(|s| s.output.as_str()).collect();
                    return construct_output_format(&outputs);
                }
            };
        minimizer_env.push(Vec::new());
        for name in &sorted_names {
            let decl = &input_variables[name.as_str()];
            let scalar_int = matches!(decl.ty, Some(VarType::IndexInt) | Some(VarType::ValueInt))
                && decl.dims.is_empty();
            if scalar_int {
                match values.get(name.as_str()).and_then(|v| v.get(&Vec::new())) {
                    Some(Value::Int(n)) => minimizer_env[i].push(*n),
                    _ => {
                        let outputs: Vec<&str> =
                            samples.iter().map(|s| s.output.as_str()).collect();
                        return construct_output_format(&outputs);
                    }
                }
                if i == 0 {
                    converter_env.push(EnvItem {
                        name: (*name).clone(),
                        is_counter: false,
                    });
                }
            }
            if i == 0 {
                used.insert((*name).clone());
            }
        }
    }

    let mut initial_node = SearchNode::Placeholder;
    if multiple_test_cases {
        for (index, item) in converter_env.iter().enumerate() {
            if item.name == TESTCASES_NAME {
                initial_node = SearchNode::Loop {
                    index,
                    delta: 0,
                    body: Box::new(SearchNode::Placeholder),
                    next: Box::new(SearchNode::Eof),
                };
                break;
            }
        }
    }

    let tokenized: Vec<Vec<SearchToken>> = samples
        .iter()
        .map(|s| tokenize_search(&s.output))
        .collect();
    let node = search(&tokenized, Some(&minimizer_env), initial_node)?;

    let format = convert(&node, &converter_env, &mut used, &mut Vec::new());
    Some(flatten(rename_variables_nicely(&format, &used)))
}

/// Last-resort tree capturing the first sample verbatim, one item per token
///
/// Only used when the search gives up; every item is a fresh scalar, typed
/// later from the sample values.
pub fn raw_capture_format(instance: &str) -> FormatNode {
    const LETTERS: &str = "abcdefghmnopqrstuvwxyz";
    let mut items = Vec::new();
    let mut next_name = 0usize;
    for line in instance.lines() {
        for _ in line.split_whitespace() {
            let name = LETTERS
                .chars()
                .nth(next_name)
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("a{}", next_name));
            next_name += 1;
            items.push(FormatNode::item(name));
        }
        items.push(FormatNode::Newline);
    }
    FormatNode::Sequence { items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_count_then_row() {
        let node = construct_input_format(&["3\n1 2 3\n"], false).unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::counted("i", "a", FormatNode::indexed("b", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_nested_jagged_groups() {
        let instances = ["3\n1 2\n3 4 1 2\n2 4 1\n", "1\n2 0 8\n"];
        let node = construct_input_format(&instances, false).unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::Newline,
            FormatNode::counted(
                "i",
                "a",
                FormatNode::seq(vec![
                    FormatNode::indexed("b", &["i"]),
                    FormatNode::counted("j", "b_i", FormatNode::indexed("c", &["i", "j"])),
                    FormatNode::Newline,
                ]),
            ),
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_multiple_test_cases_seed() {
        let node = construct_input_format(&["2\n1 2\n3 4\n"], true).unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::item(TESTCASES_NAME),
            FormatNode::Newline,
            FormatNode::counted(
                "i",
                TESTCASES_NAME,
                FormatNode::seq(vec![
                    FormatNode::indexed("a", &["i"]),
                    FormatNode::indexed("b", &["i"]),
                    FormatNode::Newline,
                ]),
            ),
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_output_sized_by_input() {
        let input_format = FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]);
        let mut decl = VarDecl::scalar("a");
        decl.ty = Some(VarType::IndexInt);
        let input_variables: IndexMap<String, VarDecl> =
            [("a".to_string(), decl)].into_iter().collect();
        let samples = [SampleCase {
            input: "3\n".to_string(),
            output: "1 2 3\n".to_string(),
        }];
        let node =
            construct_output_format_using_input(&samples, &input_format, &input_variables, false)
                .unwrap();
        let expected = FormatNode::seq(vec![
            FormatNode::counted("i", "a", FormatNode::indexed("b", &["i"])),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_string_samples() {
        // non-numeric tokens force string items
        let node = construct_input_format(&["hello\n", "world\n"], false).unwrap();
        let expected = FormatNode::seq(vec![FormatNode::item("a"), FormatNode::Newline]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_raw_capture_fallback() {
        let node = raw_capture_format("x y\nz\n");
        let expected = FormatNode::seq(vec![
            FormatNode::item("a"),
            FormatNode::item("b"),
            FormatNode::Newline,
            FormatNode::item("c"),
            FormatNode::Newline,
        ]);
        assert_eq!(node, expected);
    }
}
