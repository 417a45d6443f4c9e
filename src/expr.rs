//! Affine arithmetic over small size/index expressions
//!
//! Expressions are stored as strings throughout the analyzer (`"n - 1"`,
//! `"b_{i}"`, `"2 * n + 1"`). This module parses that tiny grammar of
//! integer literals, `+`, `-`, `*`, parentheses, and subscripted symbols
//! into an affine form. The folded form renders back in a canonical
//! spelling; no general computer-algebra system is needed.

use indexmap::IndexMap;
use logos::Logos;
use std::collections::HashMap;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Token types for the size/index expression language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
pub enum Token {
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // `a`, `a_i`, `a_{i,j}`
    #[regex(r"[A-Za-z][A-Za-z0-9]*(_[A-Za-z0-9]+|_\{[^}]*\})?", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum ExprTree {
    Num(i64),
    Var(String),
    Add(Box<ExprTree>, Box<ExprTree>),
    Sub(Box<ExprTree>, Box<ExprTree>),
    Mul(Box<ExprTree>, Box<ExprTree>),
    Neg(Box<ExprTree>),
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn parse_additive(&mut self) -> AnalyzerResult<ExprTree> {
        let mut left = self.parse_multiplicative()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let right = self.parse_multiplicative()?;
                    left = ExprTree::Add(Box::new(left), Box::new(right));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let right = self.parse_multiplicative()?;
                    left = ExprTree::Sub(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> AnalyzerResult<ExprTree> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = ExprTree::Mul(Box::new(left), Box::new(right));
                }
                Some(Token::Slash) => {
                    return Err(AnalyzerError::expression("division is not supported"));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> AnalyzerResult<ExprTree> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(ExprTree::Neg(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> AnalyzerResult<ExprTree> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(ExprTree::Num(n)),
            Some(Token::Ident(name)) => Ok(ExprTree::Var(name)),
            Some(Token::LParen) => {
                let inner = self.parse_additive()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(AnalyzerError::expression(format!(
                        "expected ')', got {:?}",
                        other
                    ))),
                }
            }
            other => Err(AnalyzerError::expression(format!(
                "unexpected token: {:?}",
                other
            ))),
        }
    }
}

/// Parse an expression string into a tree
pub fn parse(source: &str) -> AnalyzerResult<ExprTree> {
    let mut tokens = Vec::new();
    for tok in Token::lexer(source) {
        match tok {
            Ok(tok) => tokens.push(tok),
            Err(()) => {
                return Err(AnalyzerError::expression(format!(
                    "unrecognized token in expression: {:?}",
                    source
                )))
            }
        }
    }
    if tokens.is_empty() {
        return Err(AnalyzerError::expression("empty expression"));
    }
    let mut parser = ExprParser { tokens, pos: 0 };
    let tree = parser.parse_additive()?;
    if parser.pos != parser.tokens.len() {
        return Err(AnalyzerError::expression(format!(
            "trailing tokens in expression: {:?}",
            source
        )));
    }
    Ok(tree)
}

/// Affine form: a sum of symbol terms plus a constant
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    pub terms: IndexMap<String, i64>,
    pub constant: i64,
}

impl Affine {
    fn constant(value: i64) -> Self {
        Affine {
            terms: IndexMap::new(),
            constant: value,
        }
    }

    fn symbol(name: String) -> Self {
        let mut terms = IndexMap::new();
        terms.insert(name, 1);
        Affine { terms, constant: 0 }
    }

    fn add_scaled(&mut self, other: &Affine, scale: i64) {
        for (name, coeff) in &other.terms {
            *self.terms.entry(name.clone()).or_insert(0) += coeff * scale;
        }
        self.constant += other.constant * scale;
    }

    pub fn is_constant(&self) -> bool {
        self.terms.values().all(|&c| c == 0)
    }

    /// Render in canonical order: symbol terms first, constant last
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, &coeff) in &self.terms {
            if coeff == 0 {
                continue;
            }
            if out.is_empty() {
                if coeff == 1 {
                    out.push_str(name);
                } else if coeff == -1 {
                    out.push_str(&format!("-{}", name));
                } else {
                    out.push_str(&format!("{} * {}", coeff, name));
                }
            } else {
                let sign = if coeff > 0 { " + " } else { " - " };
                out.push_str(sign);
                if coeff.abs() == 1 {
                    out.push_str(name);
                } else {
                    out.push_str(&format!("{} * {}", coeff.abs(), name));
                }
            }
        }
        if out.is_empty() {
            return self.constant.to_string();
        }
        if self.constant > 0 {
            out.push_str(&format!(" + {}", self.constant));
        } else if self.constant < 0 {
            out.push_str(&format!(" - {}", -self.constant));
        }
        out
    }
}

/// Fold a tree into affine form; products of two non-constant factors fail
pub fn fold(tree: &ExprTree) -> AnalyzerResult<Affine> {
    match tree {
        ExprTree::Num(n) => Ok(Affine::constant(*n)),
        ExprTree::Var(name) => Ok(Affine::symbol(name.clone())),
        ExprTree::Add(left, right) => {
            let mut result = fold(left)?;
            result.add_scaled(&fold(right)?, 1);
            Ok(result)
        }
        ExprTree::Sub(left, right) => {
            let mut result = fold(left)?;
            result.add_scaled(&fold(right)?, -1);
            Ok(result)
        }
        ExprTree::Mul(left, right) => {
            let left = fold(left)?;
            let right = fold(right)?;
            if left.is_constant() {
                let mut result = Affine::constant(0);
                result.add_scaled(&right, left.constant);
                Ok(result)
            } else if right.is_constant() {
                let mut result = Affine::constant(0);
                result.add_scaled(&left, right.constant);
                Ok(result)
            } else {
                Err(AnalyzerError::expression(
                    "product of two non-constant expressions is not affine",
                ))
            }
        }
        ExprTree::Neg(inner) => {
            let mut result = Affine::constant(0);
            result.add_scaled(&fold(inner)?, -1);
            Ok(result)
        }
    }
}

/// Combine like terms and fold constants, returning the canonical spelling
pub fn simplify(source: &str) -> AnalyzerResult<String> {
    Ok(fold(&parse(source)?)?.render())
}

/// Split a possibly-subscripted identifier into base name and index names
///
/// `"a"` → `("a", [])`, `"a_i"` → `("a", ["i"])`, `"a_{i,j}"` → `("a", ["i", "j"])`.
pub fn split_subscript(ident: &str) -> (String, Vec<String>) {
    match ident.split_once('_') {
        None => (ident.to_string(), Vec::new()),
        Some((base, sub)) => {
            let sub = sub.trim_start_matches('{').trim_end_matches('}');
            let indices = sub
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            (base.to_string(), indices)
        }
    }
}

fn collect_symbols(tree: &ExprTree, out: &mut Vec<String>) {
    match tree {
        ExprTree::Num(_) => {}
        ExprTree::Var(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        ExprTree::Add(l, r) | ExprTree::Sub(l, r) | ExprTree::Mul(l, r) => {
            collect_symbols(l, out);
            collect_symbols(r, out);
        }
        ExprTree::Neg(inner) => collect_symbols(inner, out),
    }
}

/// All identifiers appearing in the expression, subscripts included
pub fn symbols(source: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(tree) = parse(source) {
        collect_symbols(&tree, &mut out);
    }
    out
}

/// Plain (unsubscripted) identifier base names appearing in the expression
pub fn plain_symbols(source: &str) -> Vec<String> {
    symbols(source)
        .into_iter()
        .filter(|name| !name.contains('_'))
        .collect()
}

/// Whether `name` occurs in the expression as a plain symbol
pub fn references(source: &str, name: &str) -> bool {
    symbols(source).iter().any(|s| s == name)
}

/// Rewrite an index expression for the moment `counter == 0`
///
/// Used to compute a variable's base offset from its observed index.
pub fn substitute_zero(source: &str, counter: &str) -> AnalyzerResult<String> {
    let mut affine = fold(&parse(source)?)?;
    affine.terms.shift_remove(counter);
    Ok(affine.render())
}

fn render_tree(tree: &ExprTree) -> String {
    fn paren_additive(tree: &ExprTree) -> String {
        match tree {
            ExprTree::Add(..) | ExprTree::Sub(..) => format!("({})", render_tree(tree)),
            _ => render_tree(tree),
        }
    }
    match tree {
        ExprTree::Num(n) => n.to_string(),
        ExprTree::Var(name) => name.clone(),
        ExprTree::Add(l, r) => format!("{} + {}", render_tree(l), render_tree(r)),
        ExprTree::Sub(l, r) => format!("{} - {}", render_tree(l), paren_additive(r)),
        ExprTree::Mul(l, r) => format!("{} * {}", paren_additive(l), paren_additive(r)),
        ExprTree::Neg(inner) => format!("-{}", paren_additive(inner)),
    }
}

fn rename_symbol(name: &str, replace: &HashMap<String, String>) -> String {
    let (base, indices) = split_subscript(name);
    let base = replace.get(&base).cloned().unwrap_or(base);
    if indices.is_empty() {
        base
    } else {
        let indices: Vec<String> = indices
            .iter()
            .map(|ix| replace.get(ix).cloned().unwrap_or_else(|| ix.clone()))
            .collect();
        if indices.len() == 1 && !indices[0].contains(',') {
            format!("{}_{}", base, indices[0])
        } else {
            format!("{}_{{{}}}", base, indices.join(","))
        }
    }
}

fn rename_tree(tree: &ExprTree, replace: &HashMap<String, String>) -> ExprTree {
    match tree {
        ExprTree::Num(n) => ExprTree::Num(*n),
        ExprTree::Var(name) => ExprTree::Var(rename_symbol(name, replace)),
        ExprTree::Add(l, r) => ExprTree::Add(
            Box::new(rename_tree(l, replace)),
            Box::new(rename_tree(r, replace)),
        ),
        ExprTree::Sub(l, r) => ExprTree::Sub(
            Box::new(rename_tree(l, replace)),
            Box::new(rename_tree(r, replace)),
        ),
        ExprTree::Mul(l, r) => ExprTree::Mul(
            Box::new(rename_tree(l, replace)),
            Box::new(rename_tree(r, replace)),
        ),
        ExprTree::Neg(inner) => ExprTree::Neg(Box::new(rename_tree(inner, replace))),
    }
}

/// Apply a variable-renaming map to every identifier, subscripts included
///
/// Unparseable expressions are returned unchanged.
pub fn rename_in_expr(source: &str, replace: &HashMap<String, String>) -> String {
    match parse(source) {
        Ok(tree) => render_tree(&rename_tree(&tree, replace)),
        Err(_) => source.to_string(),
    }
}

/// Integer environment for evaluating size and index expressions
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub scalars: HashMap<String, i64>,
    pub vectors: HashMap<String, Vec<i64>>,
    pub matrices: HashMap<String, Vec<Vec<i64>>>,
}

impl Env {
    fn lookup(&self, ident: &str) -> Option<i64> {
        let (base, indices) = split_subscript(ident);
        match indices.len() {
            0 => self.scalars.get(&base).copied(),
            1 => {
                let i = self.eval_index(&indices[0])?;
                self.vectors.get(&base)?.get(usize::try_from(i).ok()?).copied()
            }
            2 => {
                let i = self.eval_index(&indices[0])?;
                let j = self.eval_index(&indices[1])?;
                self.matrices
                    .get(&base)?
                    .get(usize::try_from(i).ok()?)?
                    .get(usize::try_from(j).ok()?)
                    .copied()
            }
            _ => None,
        }
    }

    fn eval_index(&self, index: &str) -> Option<i64> {
        evaluate(index, self)
    }
}

fn eval_tree(tree: &ExprTree, env: &Env) -> Option<i64> {
    match tree {
        ExprTree::Num(n) => Some(*n),
        ExprTree::Var(name) => env.lookup(name),
        ExprTree::Add(l, r) => Some(eval_tree(l, env)? + eval_tree(r, env)?),
        ExprTree::Sub(l, r) => Some(eval_tree(l, env)? - eval_tree(r, env)?),
        ExprTree::Mul(l, r) => Some(eval_tree(l, env)? * eval_tree(r, env)?),
        ExprTree::Neg(inner) => Some(-eval_tree(inner, env)?),
    }
}

/// Evaluate an expression under an integer environment
pub fn evaluate(source: &str, env: &Env) -> Option<i64> {
    eval_tree(&parse(source).ok()?, env)
}

/// Render an expression with subscripts lowered to bracket indexing
///
/// `"b_{i}"` → `"b[i]"`. Strings outside the grammar (for example raw target
/// snippets) are returned unchanged.
pub fn render_subscripted(source: &str) -> String {
    fn render(tree: &ExprTree) -> String {
        match tree {
            ExprTree::Var(name) => {
                let (base, indices) = split_subscript(name);
                let mut out = base;
                for ix in indices {
                    out.push_str(&format!("[{}]", ix));
                }
                out
            }
            other => match other {
                ExprTree::Num(n) => n.to_string(),
                ExprTree::Add(l, r) => format!("{} + {}", render(l), render(r)),
                ExprTree::Sub(l, r) => format!("{} - ({})", render(l), render(r)),
                ExprTree::Mul(l, r) => format!("{} * {}", render(l), render(r)),
                ExprTree::Neg(inner) => format!("-({})", render(inner)),
                ExprTree::Var(_) => unreachable!(),
            },
        }
    }
    match parse(source) {
        Ok(ExprTree::Sub(l, r)) => {
            // keep simple differences readable: `i - 1`, not `i - (1)`
            format!("{} - {}", render(&l), render(&r))
        }
        Ok(tree) => render(&tree),
        Err(_) => source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simplify_trip_count() {
        // r - l + 1 with r = "N", l = "1"
        assert_eq!(simplify("(N) - (1) + 1").unwrap(), "N");
        assert_eq!(simplify("(N) - (0) + 1").unwrap(), "N + 1");
        assert_eq!(simplify("(2 * N) - (N) + 1").unwrap(), "N + 1");
    }

    #[test]
    fn test_simplify_combines_like_terms() {
        assert_eq!(simplify("N + N - 1").unwrap(), "2 * N - 1");
        assert_eq!(simplify("N - N").unwrap(), "0");
        assert_eq!(simplify("3 * (N + 2) - 5").unwrap(), "3 * N + 1");
    }

    #[test]
    fn test_division_is_rejected() {
        assert!(matches!(
            simplify("N / 2"),
            Err(AnalyzerError::Expression { .. })
        ));
    }

    #[test]
    fn test_nonlinear_product_is_rejected() {
        assert!(simplify("N * N").is_err());
    }

    #[test]
    fn test_evaluate_with_subscripts() {
        let mut env = Env::default();
        env.scalars.insert("i".to_string(), 1);
        env.vectors.insert("b".to_string(), vec![5, 7, 9]);
        assert_eq!(evaluate("b_i", &env), Some(7));
        assert_eq!(evaluate("b_{i} + 1", &env), Some(8));
        assert_eq!(evaluate("b_j", &env), None);
    }

    #[test]
    fn test_substitute_zero() {
        assert_eq!(substitute_zero("i + 1", "i").unwrap(), "1");
        assert_eq!(substitute_zero("i", "i").unwrap(), "0");
    }

    #[test]
    fn test_render_subscripted() {
        assert_eq!(render_subscripted("b_{i}"), "b[i]");
        assert_eq!(render_subscripted("i - 1"), "i - 1");
        assert_eq!(render_subscripted("(int)ans.size()"), "(int)ans.size()");
    }

    #[test]
    fn test_rename_in_expr() {
        let replace: HashMap<String, String> = [
            ("X".to_string(), "a".to_string()),
            ("t".to_string(), "i".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(rename_in_expr("X - 1", &replace), "a - 1");
        assert_eq!(rename_in_expr("Y_t", &replace), "Y_i");
    }
}
