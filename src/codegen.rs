//! C++ boilerplate generation from analyzed formats
//!
//! Lowering happens in two steps: a format tree becomes a [`Statement`] tree
//! (declarations, reads, writes, repeats), which a peephole pass then merges
//! into idiomatic runs (`std::cin >> a >> b`). A configurable serializer
//! renders the statements as C++ lines. Every public entry point degrades to
//! a commented skeleton instead of failing, so a template always renders.

use indexmap::IndexMap;

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::expr;
use crate::format::{ConstantDecl, FormatNode, OutputShape, VarDecl, VarType, TESTCASES_NAME};
use crate::Analysis;

/// One typed expression to read, write or generate
pub type TypedExpr = (String, Option<VarType>);

/// Backend statement tree
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Declare variables, grouped by the serializer when types agree
    Decl(Vec<VarDecl>),
    /// Read tokens into the expressions
    Read(Vec<TypedExpr>),
    /// Write tokens, each terminated by a space
    WriteTokens(Vec<TypedExpr>),
    /// Write tokens separated by spaces, then a newline
    WriteNewline(Vec<TypedExpr>),
    /// Assign a random value to the expression
    Generate(TypedExpr),
    Repeat {
        counter: String,
        size: String,
        body: Box<Statement>,
    },
    Sequence(Vec<Statement>),
    /// A literal line emitted verbatim
    Raw(String),
}

/// How tokens are read from standard input
#[derive(Debug, Clone)]
pub enum Scanner {
    /// `std::cin >> a >> b;`
    Stream,
    /// `scanf("%d%lld", &a, &b);`
    Formatted,
    Custom(fn(&[TypedExpr]) -> Vec<String>),
}

/// How tokens are written to standard output
#[derive(Debug, Clone)]
pub enum Printer {
    /// `std::cout << a << ' ' << b << '\n';`
    Stream,
    /// `printf("%d %lld\n", a, b);`
    Formatted,
    /// The flag tells whether the run ends the line
    Custom(fn(&[TypedExpr], bool) -> Vec<String>),
}

/// How counted loops are spelled
#[derive(Debug, Clone)]
pub enum LoopStyle {
    /// `for (int i = 0; i < n; ++i)`
    For,
    /// `REP (i, n)` for a macro named `REP`
    Macro(String),
    Custom(fn(&str, &str) -> String),
}

#[derive(Debug, Clone)]
pub struct CodegenConfig {
    pub scanner: Scanner,
    pub printer: Printer,
    pub loop_style: LoopStyle,
    /// Spelling of the 64-bit integer type
    pub int64_type: String,
    pub indent: String,
    /// Drop the `std::` qualifier, for templates with `using namespace std`
    pub use_unqualified_names: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        CodegenConfig {
            scanner: Scanner::Stream,
            printer: Printer::Stream,
            loop_style: LoopStyle::For,
            int64_type: "long long".to_string(),
            indent: "    ".to_string(),
            use_unqualified_names: false,
        }
    }
}

/// Merge adjacent mergeable statements and flatten nested sequences
///
/// Adjacent `Decl`s, `Read`s and `WriteTokens` runs are concatenated, and a
/// `WriteTokens` directly followed by a `WriteNewline` fuses into one
/// newline-terminated write. The pass is idempotent.
pub fn optimize(statement: Statement) -> Statement {
    match statement {
        Statement::Sequence(items) => {
            let mut queue: std::collections::VecDeque<Statement> =
                items.into_iter().map(optimize).collect();
            let mut out: Vec<Statement> = Vec::new();
            while let Some(statement) = queue.pop_front() {
                if let Statement::Sequence(inner) = statement {
                    for item in inner.into_iter().rev() {
                        queue.push_front(item);
                    }
                    continue;
                }
                match (out.pop(), statement) {
                    (Some(Statement::Decl(mut acc)), Statement::Decl(more)) => {
                        acc.extend(more);
                        out.push(Statement::Decl(acc));
                    }
                    (Some(Statement::Read(mut acc)), Statement::Read(more)) => {
                        acc.extend(more);
                        out.push(Statement::Read(acc));
                    }
                    (Some(Statement::WriteTokens(mut acc)), Statement::WriteTokens(more)) => {
                        acc.extend(more);
                        out.push(Statement::WriteTokens(acc));
                    }
                    (Some(Statement::WriteTokens(mut acc)), Statement::WriteNewline(more)) => {
                        acc.extend(more);
                        out.push(Statement::WriteNewline(acc));
                    }
                    (Some(prev), statement) => {
                        out.push(prev);
                        out.push(statement);
                    }
                    (None, statement) => out.push(statement),
                }
            }
            Statement::Sequence(out)
        }
        Statement::Repeat {
            counter,
            size,
            body,
        } => Statement::Repeat {
            counter,
            size,
            body: Box::new(optimize(*body)),
        },
        other => other,
    }
}

/// Renders statements as C++ lines under one configuration
pub struct CodeGenerator<'a> {
    config: &'a CodegenConfig,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(config: &'a CodegenConfig) -> Self {
        CodeGenerator { config }
    }

    fn std_prefix(&self) -> &'static str {
        if self.config.use_unqualified_names {
            ""
        } else {
            "std::"
        }
    }

    fn base_type(&self, ty: Option<VarType>) -> String {
        match ty {
            Some(VarType::IndexInt) => "int".to_string(),
            Some(VarType::ValueInt) => self.config.int64_type.clone(),
            Some(VarType::Float) => "double".to_string(),
            Some(VarType::String) => format!("{}string", self.std_prefix()),
            Some(VarType::Char) => "char".to_string(),
            None => "auto".to_string(),
        }
    }

    fn scan_specifier(&self, ty: Option<VarType>, name: &str) -> AnalyzerResult<&'static str> {
        match ty {
            Some(VarType::IndexInt) => Ok("%d"),
            Some(VarType::ValueInt) => Ok("%lld"),
            Some(VarType::Float) => Ok("%lf"),
            // skip leading whitespace, as scanf does not for %c
            Some(VarType::Char) => Ok(" %c"),
            Some(VarType::String) => Err(AnalyzerError::generation(format!(
                "scanf()/printf() cannot handle std::string variables: {}",
                name
            ))),
            None => Err(AnalyzerError::generation(format!(
                "type is unknown: {}",
                name
            ))),
        }
    }

    fn print_specifier(&self, ty: Option<VarType>, name: &str) -> AnalyzerResult<&'static str> {
        match ty {
            Some(VarType::Char) => Ok("%c"),
            other => self.scan_specifier(other, name),
        }
    }

    /// The C++ type and constructor arguments for one declaration
    ///
    /// `a` with dims `[n, m]` of `long long` becomes the type
    /// `std::vector<std::vector<long long> >` with ctor `(n, std::vector<long long>(m))`.
    fn type_and_ctor(&self, decl: &VarDecl) -> (String, String) {
        let mut ty = self.base_type(decl.ty);
        let mut ctor = String::new();
        for dim in decl.dims.iter().rev() {
            let dim = expr::render_subscripted(dim);
            let second = if ctor.is_empty() {
                String::new()
            } else {
                format!(", {}{}", ty, ctor)
            };
            ctor = format!("({}{})", dim, second);
            let space = if ty.ends_with('>') { " " } else { "" };
            ty = format!("{}vector<{}{}>", self.std_prefix(), ty, space);
        }
        (ty, ctor)
    }

    /// Declaration lines, grouping consecutive variables of the same type
    fn declare_variables(&self, decls: &[VarDecl]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut last_type: Option<String> = None;
        let mut inits: Vec<String> = Vec::new();
        for decl in decls {
            let (ty, ctor) = self.type_and_ctor(decl);
            if last_type.as_deref() != Some(&ty) {
                if let Some(last) = last_type.take() {
                    lines.push(format!("{} {};", last, inits.join(", ")));
                    inits.clear();
                }
                last_type = Some(ty);
            }
            inits.push(format!("{}{}", decl.name, ctor));
        }
        if let Some(last) = last_type {
            lines.push(format!("{} {};", last, inits.join(", ")));
        }
        lines
    }

    fn read_statement(&self, exprs: &[TypedExpr]) -> AnalyzerResult<Vec<String>> {
        if exprs.is_empty() {
            return Ok(Vec::new());
        }
        match &self.config.scanner {
            Scanner::Stream => {
                let mut items = vec![format!("{}cin", self.std_prefix())];
                items.extend(exprs.iter().map(|(name, _)| name.clone()));
                Ok(vec![format!("{};", items.join(" >> "))])
            }
            Scanner::Formatted => {
                let mut specifiers = String::new();
                let mut arguments = String::new();
                for (name, ty) in exprs {
                    specifiers.push_str(self.scan_specifier(*ty, name)?);
                    arguments.push_str(&format!(", &{}", name));
                }
                Ok(vec![format!("scanf(\"{}\"{});", specifiers, arguments)])
            }
            Scanner::Custom(scan) => Ok(scan(exprs)),
        }
    }

    fn write_statement(&self, exprs: &[TypedExpr], newline: bool) -> AnalyzerResult<Vec<String>> {
        if exprs.is_empty() && !newline {
            return Ok(Vec::new());
        }
        match &self.config.printer {
            Printer::Stream => {
                let mut items = vec![format!("{}cout", self.std_prefix())];
                for (i, (name, _)) in exprs.iter().enumerate() {
                    if i > 0 {
                        items.push("' '".to_string());
                    }
                    items.push(name.clone());
                }
                items.push(if newline { "'\\n'" } else { "' '" }.to_string());
                Ok(vec![format!("{};", items.join(" << "))])
            }
            Printer::Formatted => {
                let mut specifiers = Vec::new();
                let mut arguments = String::new();
                for (name, ty) in exprs {
                    specifiers.push(self.print_specifier(*ty, name)?.to_string());
                    arguments.push_str(&format!(", {}", name));
                }
                let end = if newline { "\\n" } else { " " };
                Ok(vec![format!(
                    "printf(\"{}{}\"{});",
                    specifiers.join(" "),
                    end,
                    arguments
                )])
            }
            Printer::Custom(print) => Ok(print(exprs, newline)),
        }
    }

    fn generate_statement(&self, expr: &TypedExpr) -> AnalyzerResult<Vec<String>> {
        let (name, ty) = expr;
        let ty = ty.unwrap_or(VarType::IndexInt);
        let (lo, hi) = match ty {
            VarType::IndexInt => (0u64, 100000u64),
            VarType::ValueInt => (0, 1000000000),
            other => {
                return Err(AnalyzerError::generation(format!(
                    "cannot generate a variable of type {:?}: {}",
                    other, name
                )))
            }
        };
        Ok(vec![format!(
            "{} = {}uniform_int_distribution<{}>({}, {})(gen);",
            name,
            self.std_prefix(),
            self.base_type(Some(ty)),
            lo,
            hi
        )])
    }

    fn loop_header(&self, counter: &str, size: &str) -> String {
        let size = expr::render_subscripted(size);
        match &self.config.loop_style {
            LoopStyle::For => format!(
                "for (int {c} = 0; {c} < {size}; ++{c})",
                c = counter,
                size = size
            ),
            LoopStyle::Macro(name) => format!("{} ({}, {})", name, counter, size),
            LoopStyle::Custom(make) => make(counter, &size),
        }
    }

    /// Serialize a statement tree into unindented C++ lines
    pub fn serialize(&self, statement: &Statement) -> AnalyzerResult<Vec<String>> {
        match statement {
            Statement::Decl(decls) => Ok(self.declare_variables(decls)),
            Statement::Read(exprs) => self.read_statement(exprs),
            Statement::WriteTokens(exprs) => self.write_statement(exprs, false),
            Statement::WriteNewline(exprs) => self.write_statement(exprs, true),
            Statement::Generate(expr) => self.generate_statement(expr),
            Statement::Sequence(items) => {
                let mut lines = Vec::new();
                for item in items {
                    lines.extend(self.serialize(item)?);
                }
                Ok(lines)
            }
            Statement::Repeat {
                counter,
                size,
                body,
            } => {
                let mut lines = vec![format!("{} {{", self.loop_header(counter, size))];
                lines.extend(self.serialize(body)?);
                lines.push("}".to_string());
                Ok(lines)
            }
            Statement::Raw(line) => Ok(vec![line.clone()]),
        }
    }

    fn declare_constant(&self, decl: &ConstantDecl) -> String {
        let keyword = if decl.ty == VarType::String {
            "const"
        } else {
            "constexpr"
        };
        let value = match decl.ty {
            VarType::String => format!("\"{}\"", decl.value),
            VarType::Char => format!("'{}'", decl.value),
            _ => decl.value.clone(),
        };
        format!(
            "{} {} {} = {};",
            keyword,
            self.base_type(Some(decl.ty)),
            decl.name,
            value
        )
    }

    /// Indent lines, tracking `{`/`}` nesting
    pub fn join_with_indent(&self, lines: &[String], nest: usize) -> String {
        let mut nest = nest as i64;
        let mut buf = Vec::new();
        for line in lines {
            if line.starts_with('}') {
                nest -= 1;
            }
            let depth = usize::try_from(nest).unwrap_or(0);
            buf.push(format!("{}{}", self.config.indent.repeat(depth), line));
            if line.ends_with('{') {
                nest += 1;
            }
        }
        buf.join("\n")
    }
}

fn subscripted_variable(decl: &VarDecl, indices: &[String]) -> AnalyzerResult<String> {
    let mut var = decl.name.clone();
    for (index, base) in indices.iter().zip(&decl.bases) {
        let offset = expr::simplify(&format!("({}) - ({})", index, base))
            .map_err(|err| AnalyzerError::generation(err.to_string()))?;
        var.push_str(&format!("[{}]", expr::render_subscripted(&offset)));
    }
    Ok(var)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ReadMode {
    Read,
    Generate,
}

fn lower_read_dfs(
    node: &FormatNode,
    declared: &mut std::collections::BTreeSet<String>,
    initialized: &mut std::collections::BTreeSet<String>,
    decls: &IndexMap<String, VarDecl>,
    mode: ReadMode,
) -> AnalyzerResult<Statement> {
    // declare every variable whose dimensions are all known by now
    let mut new_decls = Vec::new();
    for (name, decl) in decls {
        if !declared.contains(name) && decl.depending.iter().all(|dep| initialized.contains(dep)) {
            new_decls.push(decl.clone());
            declared.insert(name.clone());
        }
    }
    if !new_decls.is_empty() {
        return Ok(Statement::Sequence(vec![
            Statement::Decl(new_decls),
            lower_read_dfs(node, declared, initialized, decls, mode)?,
        ]));
    }

    match node {
        FormatNode::Item { name, indices } => {
            if !declared.contains(name) {
                return Err(AnalyzerError::generation(format!(
                    "variable {} is not declared yet",
                    name
                )));
            }
            let decl = decls.get(name).ok_or_else(|| {
                AnalyzerError::generation(format!("undeclared variable: {}", name))
            })?;
            initialized.insert(name.clone());
            let var = subscripted_variable(decl, indices)?;
            Ok(match mode {
                ReadMode::Read => Statement::Read(vec![(var, decl.ty)]),
                ReadMode::Generate => Statement::Generate((var, decl.ty)),
            })
        }
        FormatNode::Newline => Ok(Statement::Sequence(Vec::new())),
        FormatNode::Sequence { items } => {
            let mut statements = Vec::new();
            for item in items {
                statements.push(lower_read_dfs(item, declared, initialized, decls, mode)?);
            }
            Ok(Statement::Sequence(statements))
        }
        FormatNode::Loop {
            counter,
            size,
            body,
        } => {
            declared.insert(counter.clone());
            let body = lower_read_dfs(body, declared, initialized, decls, mode)?;
            declared.remove(counter);
            Ok(Statement::Repeat {
                counter: counter.clone(),
                size: size.clone(),
                body: Box::new(body),
            })
        }
    }
}

/// Lower a format tree into reads, declaring variables as late as possible
pub fn lower_input(
    node: &FormatNode,
    decls: &IndexMap<String, VarDecl>,
) -> AnalyzerResult<Statement> {
    let mut declared = std::collections::BTreeSet::new();
    let mut initialized = std::collections::BTreeSet::new();
    lower_read_dfs(node, &mut declared, &mut initialized, decls, ReadMode::Read)
}

/// Lower a format tree into random-value assignments instead of reads
pub fn lower_generate(
    node: &FormatNode,
    decls: &IndexMap<String, VarDecl>,
) -> AnalyzerResult<Statement> {
    let mut declared = std::collections::BTreeSet::new();
    let mut initialized = std::collections::BTreeSet::new();
    lower_read_dfs(
        node,
        &mut declared,
        &mut initialized,
        decls,
        ReadMode::Generate,
    )
}

/// Lower a format tree into writes of already-initialized variables
pub fn lower_write(
    node: &FormatNode,
    decls: &IndexMap<String, VarDecl>,
) -> AnalyzerResult<Statement> {
    match node {
        FormatNode::Item { name, indices } => {
            let decl = decls.get(name).ok_or_else(|| {
                AnalyzerError::generation(format!("undeclared variable: {}", name))
            })?;
            let var = subscripted_variable(decl, indices)?;
            Ok(Statement::WriteTokens(vec![(var, decl.ty)]))
        }
        FormatNode::Newline => Ok(Statement::WriteNewline(Vec::new())),
        FormatNode::Sequence { items } => {
            let mut statements = Vec::new();
            for item in items {
                statements.push(lower_write(item, decls)?);
            }
            Ok(Statement::Sequence(statements))
        }
        FormatNode::Loop {
            counter,
            size,
            body,
        } => Ok(Statement::Repeat {
            counter: counter.clone(),
            size: size.clone(),
            body: Box::new(lower_write(body, decls)?),
        }),
    }
}

/// Lower a recognized output shape into writes over the solver's result
fn lower_shape(shape: &OutputShape) -> Statement {
    match shape {
        OutputShape::Scalar { ty } => Statement::WriteNewline(vec![("ans".to_string(), *ty)]),
        OutputShape::Pair {
            name1,
            ty1,
            name2,
            ty2,
            newline_between,
        } => {
            let mut statements = vec![Statement::WriteTokens(vec![(name1.clone(), *ty1)])];
            if *newline_between {
                statements.push(Statement::WriteNewline(Vec::new()));
            }
            statements.push(Statement::WriteNewline(vec![(name2.clone(), *ty2)]));
            Statement::Sequence(statements)
        }
        OutputShape::YesNo { .. } => Statement::WriteNewline(vec![(
            "(ans ? YES : NO)".to_string(),
            Some(VarType::String),
        )]),
        OutputShape::Vector {
            ty,
            counter,
            print_size,
            newline_after_size,
            newline_after_item,
        } => {
            let size = "(int)ans.size()".to_string();
            let mut statements = Vec::new();
            if *print_size {
                statements.push(Statement::WriteTokens(vec![(
                    size.clone(),
                    Some(VarType::IndexInt),
                )]));
                if *newline_after_size {
                    statements.push(Statement::WriteNewline(Vec::new()));
                }
            }
            let mut body = vec![Statement::WriteTokens(vec![(
                format!("ans[{}]", counter),
                *ty,
            )])];
            if *newline_after_item {
                body.push(Statement::WriteNewline(Vec::new()));
            }
            statements.push(Statement::Repeat {
                counter: counter.clone(),
                size,
                body: Box::new(Statement::Sequence(body)),
            });
            if !*newline_after_item {
                statements.push(Statement::WriteNewline(Vec::new()));
            }
            Statement::Sequence(statements)
        }
    }
}

fn scalar_decl(name: &str, ty: VarType) -> VarDecl {
    VarDecl {
        name: name.to_string(),
        ty: Some(ty),
        dims: Vec::new(),
        bases: Vec::new(),
        depending: Default::default(),
    }
}

fn vector_decl(name: &str, ty: VarType, dim: &str) -> VarDecl {
    VarDecl {
        name: name.to_string(),
        ty: Some(ty),
        dims: vec![dim.to_string()],
        bases: vec!["0".to_string()],
        depending: [dim.to_string()].into_iter().collect(),
    }
}

fn fallback_header(message: &str) -> Vec<Statement> {
    vec![
        Statement::Raw(format!("// {}", message)),
        Statement::Raw("// TODO: edit here".to_string()),
    ]
}

fn render_or_default(
    generator: &CodeGenerator<'_>,
    statement: Statement,
    nest: usize,
    default_lines: &[&str],
) -> String {
    match generator.serialize(&optimize(statement)) {
        Ok(lines) => generator.join_with_indent(&lines, nest),
        Err(_) => {
            let lines: Vec<String> = default_lines.iter().map(|s| s.to_string()).collect();
            generator.join_with_indent(&lines, nest)
        }
    }
}

fn read_input_fallback(generator: &CodeGenerator<'_>, message: &str, nest: usize) -> String {
    let mut statements = fallback_header(message);
    statements.push(Statement::Decl(vec![scalar_decl("n", VarType::IndexInt)]));
    statements.push(Statement::Read(vec![(
        "n".to_string(),
        Some(VarType::IndexInt),
    )]));
    statements.push(Statement::Decl(vec![vector_decl(
        "a",
        VarType::ValueInt,
        "n",
    )]));
    statements.push(Statement::Repeat {
        counter: "i".to_string(),
        size: "n".to_string(),
        body: Box::new(Statement::Read(vec![(
            "a[i]".to_string(),
            Some(VarType::ValueInt),
        )])),
    });
    render_or_default(
        generator,
        Statement::Sequence(statements),
        nest,
        &[
            &format!("// {}", message),
            "// TODO: edit here",
            "int n;",
            "scanf(\"%d\", &n);",
            "std::vector<long long> a(n);",
            "for (int i = 0; i < n; ++i) {",
            "scanf(\"%lld\", &a[i]);",
            "}",
        ],
    )
}

fn generate_input_fallback(generator: &CodeGenerator<'_>, message: &str, nest: usize) -> String {
    let std = if generator.config.use_unqualified_names {
        ""
    } else {
        "std::"
    };
    let mut statements = fallback_header(message);
    statements.push(Statement::Raw(format!("{}random_device device;", std)));
    statements.push(Statement::Raw(format!(
        "{}default_random_engine gen(device());",
        std
    )));
    statements.push(Statement::Decl(vec![scalar_decl("n", VarType::IndexInt)]));
    statements.push(Statement::Generate((
        "n".to_string(),
        Some(VarType::IndexInt),
    )));
    statements.push(Statement::Decl(vec![vector_decl(
        "a",
        VarType::ValueInt,
        "n",
    )]));
    statements.push(Statement::Repeat {
        counter: "i".to_string(),
        size: "n".to_string(),
        body: Box::new(Statement::Generate((
            "a[i]".to_string(),
            Some(VarType::ValueInt),
        ))),
    });
    render_or_default(
        generator,
        Statement::Sequence(statements),
        nest,
        &[&format!("// {}", message), "// TODO: edit here"],
    )
}

fn write_input_fallback(generator: &CodeGenerator<'_>, message: &str, nest: usize) -> String {
    let mut statements = fallback_header(message);
    statements.push(Statement::WriteNewline(vec![(
        "n".to_string(),
        Some(VarType::IndexInt),
    )]));
    statements.push(Statement::Repeat {
        counter: "i".to_string(),
        size: "n".to_string(),
        body: Box::new(Statement::WriteTokens(vec![(
            "a[i]".to_string(),
            Some(VarType::ValueInt),
        )])),
    });
    statements.push(Statement::WriteNewline(Vec::new()));
    render_or_default(
        generator,
        Statement::Sequence(statements),
        nest,
        &[&format!("// {}", message), "// TODO: edit here"],
    )
}

fn write_output_fallback(generator: &CodeGenerator<'_>, message: &str, nest: usize) -> String {
    let mut statements = fallback_header(message);
    statements.push(Statement::WriteNewline(vec![(
        "ans".to_string(),
        Some(VarType::ValueInt),
    )]));
    render_or_default(
        generator,
        Statement::Sequence(statements),
        nest,
        &[
            &format!("// {}", message),
            "// TODO: edit here",
            "printf(\"%lld\\n\", ans);",
        ],
    )
}

/// The main-function section that reads the input into local variables
pub fn read_input_code(analysis: &Analysis, config: &CodegenConfig, nest: usize) -> String {
    let generator = CodeGenerator::new(config);
    let (Some(format), Some(decls)) = (&analysis.input_format, &analysis.input_variables) else {
        return read_input_fallback(&generator, "failed to analyze input format", nest);
    };
    let rendered = lower_input(format, decls)
        .and_then(|statement| generator.serialize(&optimize(statement)));
    match rendered {
        Ok(lines) => generator.join_with_indent(&lines, nest),
        Err(err) => read_input_fallback(
            &generator,
            &format!("failed to generate input part: {}", err),
            nest,
        ),
    }
}

/// The section that fills the input variables with random values
pub fn generate_input_code(analysis: &Analysis, config: &CodegenConfig, nest: usize) -> String {
    let generator = CodeGenerator::new(config);
    let (Some(format), Some(decls)) = (&analysis.input_format, &analysis.input_variables) else {
        return generate_input_fallback(&generator, "failed to analyze input format", nest);
    };
    let rendered = lower_generate(format, decls)
        .and_then(|statement| generator.serialize(&optimize(statement)));
    match rendered {
        Ok(lines) => generator.join_with_indent(&lines, nest),
        Err(err) => generate_input_fallback(
            &generator,
            &format!("failed to generate input part: {}", err),
            nest,
        ),
    }
}

/// The section that prints a generated input back out, for random testing
pub fn write_input_code(analysis: &Analysis, config: &CodegenConfig, nest: usize) -> String {
    let generator = CodeGenerator::new(config);
    let (Some(format), Some(decls)) = (&analysis.input_format, &analysis.input_variables) else {
        return write_input_fallback(&generator, "failed to analyze input format", nest);
    };
    let rendered =
        lower_write(format, decls).and_then(|statement| generator.serialize(&optimize(statement)));
    match rendered {
        Ok(lines) => generator.join_with_indent(&lines, nest),
        Err(err) => write_input_fallback(
            &generator,
            &format!("failed to generate input part: {}", err),
            nest,
        ),
    }
}

/// The main-function section that prints the solver's result
pub fn write_output_code(analysis: &Analysis, config: &CodegenConfig, nest: usize) -> String {
    let generator = CodeGenerator::new(config);

    let statement = if let Some(shape) = &analysis.output_shape {
        lower_shape(shape)
    } else {
        let (Some(format), Some(decls)) = (&analysis.output_format, &analysis.output_variables)
        else {
            return write_output_fallback(&generator, "failed to analyze output format", nest);
        };
        match lower_write(format, decls) {
            Ok(statement) => statement,
            Err(err) => {
                return write_output_fallback(
                    &generator,
                    &format!("failed to generate output part: {}", err),
                    nest,
                )
            }
        }
    };

    match generator.serialize(&optimize(statement)) {
        Ok(lines) => generator.join_with_indent(&lines, nest),
        Err(err) => write_output_fallback(
            &generator,
            &format!("failed to generate output part: {}", err),
            nest,
        ),
    }
}

/// Constant declarations placed above the solver
pub fn declare_constants_code(analysis: &Analysis, config: &CodegenConfig, nest: usize) -> String {
    let generator = CodeGenerator::new(config);
    let lines: Vec<String> = analysis
        .constants
        .values()
        .map(|decl| generator.declare_constant(decl))
        .collect();
    generator.join_with_indent(&lines, nest)
}

/// The parameter list of the `solve` function
///
/// The `testcases` counter is read by `main` and not passed through.
pub fn formal_parameter_list(analysis: &Analysis, config: &CodegenConfig) -> String {
    let generator = CodeGenerator::new(config);
    let Some(decls) = &analysis.input_variables else {
        return format!(
            "int n, const {}vector<{}> & a",
            generator.std_prefix(),
            generator.base_type(Some(VarType::ValueInt))
        );
    };
    let mut parameters = Vec::new();
    for (name, decl) in decls {
        if name == TESTCASES_NAME {
            continue;
        }
        let mut ty = generator.base_type(decl.ty);
        for _ in &decl.dims {
            let space = if ty.ends_with('>') { " " } else { "" };
            ty = format!("{}vector<{}{}>", generator.std_prefix(), ty, space);
        }
        if !decl.dims.is_empty() {
            ty = format!("const {} &", ty);
        }
        parameters.push(format!("{} {}", ty, name));
    }
    parameters.join(", ")
}

/// The argument list matching [`formal_parameter_list`]
pub fn actual_argument_list(analysis: &Analysis) -> String {
    let Some(decls) = &analysis.input_variables else {
        return "n, a".to_string();
    };
    decls
        .keys()
        .filter(|name| name.as_str() != TESTCASES_NAME)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// The return type of the `solve` function
pub fn return_type_code(analysis: &Analysis, config: &CodegenConfig) -> String {
    let generator = CodeGenerator::new(config);
    match &analysis.output_shape {
        Some(OutputShape::Scalar { ty }) => generator.base_type(*ty),
        Some(OutputShape::Pair { ty1, ty2, .. }) => format!(
            "{}pair<{}, {}>",
            generator.std_prefix(),
            generator.base_type(*ty1),
            generator.base_type(*ty2)
        ),
        Some(OutputShape::YesNo { .. }) => "bool".to_string(),
        Some(OutputShape::Vector { ty, .. }) => format!(
            "{}vector<{}>",
            generator.std_prefix(),
            generator.base_type(*ty)
        ),
        None => "auto".to_string(),
    }
}

/// The binding that receives the solver's result in `main`
pub fn return_expression_code(analysis: &Analysis) -> String {
    match &analysis.output_shape {
        Some(OutputShape::Pair { name1, name2, .. }) => format!("[{}, {}]", name1, name2),
        _ => "ans".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::collect_declared_variables;
    use pretty_assertions::assert_eq;

    fn count_and_row() -> (FormatNode, IndexMap<String, VarDecl>) {
        let node = FormatNode::seq(vec![
            FormatNode::item("n"),
            FormatNode::Newline,
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
        ]);
        let mut decls = collect_declared_variables(&node).unwrap();
        decls.get_mut("n").unwrap().ty = Some(VarType::IndexInt);
        decls.get_mut("a").unwrap().ty = Some(VarType::ValueInt);
        (node, decls)
    }

    fn analysis_with_input() -> Analysis {
        let (node, decls) = count_and_row();
        Analysis {
            input_format: Some(node),
            input_variables: Some(decls),
            output_format: None,
            output_variables: None,
            constants: IndexMap::new(),
            output_shape: None,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_read_input_stream() {
        let analysis = analysis_with_input();
        let config = CodegenConfig::default();
        let code = read_input_code(&analysis, &config, 0);
        let expected = "\
int n;
std::cin >> n;
std::vector<long long> a(n);
for (int i = 0; i < n; ++i) {
    std::cin >> a[i];
}";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_read_input_formatted() {
        let analysis = analysis_with_input();
        let config = CodegenConfig {
            scanner: Scanner::Formatted,
            ..CodegenConfig::default()
        };
        let code = read_input_code(&analysis, &config, 0);
        assert!(code.contains("scanf(\"%d\", &n);"));
        assert!(code.contains("scanf(\"%lld\", &a[i]);"));
    }

    #[test]
    fn test_read_input_rep_macro() {
        let analysis = analysis_with_input();
        let config = CodegenConfig {
            loop_style: LoopStyle::Macro("REP".to_string()),
            use_unqualified_names: true,
            ..CodegenConfig::default()
        };
        let code = read_input_code(&analysis, &config, 0);
        assert!(code.contains("REP (i, n) {"));
        assert!(code.contains("cin >> a[i];"));
        assert!(!code.contains("std::"));
    }

    #[test]
    fn test_optimizer_merges_adjacent_reads() {
        let statement = Statement::Sequence(vec![
            Statement::Read(vec![("a".to_string(), Some(VarType::IndexInt))]),
            Statement::Read(vec![("b".to_string(), Some(VarType::IndexInt))]),
            Statement::WriteTokens(vec![("a".to_string(), Some(VarType::IndexInt))]),
            Statement::WriteNewline(vec![("b".to_string(), Some(VarType::IndexInt))]),
        ]);
        let optimized = optimize(statement);
        let expected = Statement::Sequence(vec![
            Statement::Read(vec![
                ("a".to_string(), Some(VarType::IndexInt)),
                ("b".to_string(), Some(VarType::IndexInt)),
            ]),
            Statement::WriteNewline(vec![
                ("a".to_string(), Some(VarType::IndexInt)),
                ("b".to_string(), Some(VarType::IndexInt)),
            ]),
        ]);
        assert_eq!(optimized, expected);
    }

    #[test]
    fn test_optimizer_is_idempotent() {
        let (node, decls) = count_and_row();
        let statement = lower_input(&node, &decls).unwrap();
        let once = optimize(statement);
        let twice = optimize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_formatted_string_write_fails_stream_does_not() {
        let config = CodegenConfig {
            printer: Printer::Formatted,
            ..CodegenConfig::default()
        };
        let generator = CodeGenerator::new(&config);
        let exprs = vec![("s".to_string(), Some(VarType::String))];
        assert!(generator.write_statement(&exprs, true).is_err());

        let config = CodegenConfig::default();
        let generator = CodeGenerator::new(&config);
        for ty in [
            VarType::IndexInt,
            VarType::ValueInt,
            VarType::Float,
            VarType::String,
            VarType::Char,
        ] {
            let exprs = vec![("x".to_string(), Some(ty))];
            assert!(generator.write_statement(&exprs, true).is_ok());
            assert!(generator.read_statement(&exprs).is_ok());
        }
    }

    #[test]
    fn test_write_output_yes_no() {
        let mut analysis = analysis_with_input();
        analysis.output_shape = Some(OutputShape::YesNo {
            yes: "Yes".to_string(),
            no: "No".to_string(),
        });
        let config = CodegenConfig::default();
        let code = write_output_code(&analysis, &config, 0);
        assert_eq!(code, "std::cout << (ans ? YES : NO) << '\\n';");
        assert_eq!(return_type_code(&analysis, &config), "bool");
    }

    #[test]
    fn test_write_output_vector_with_size() {
        let mut analysis = analysis_with_input();
        analysis.output_shape = Some(OutputShape::Vector {
            ty: Some(VarType::ValueInt),
            counter: "i".to_string(),
            print_size: true,
            newline_after_size: true,
            newline_after_item: false,
        });
        let config = CodegenConfig::default();
        let code = write_output_code(&analysis, &config, 0);
        let expected = "\
std::cout << (int)ans.size() << '\\n';
for (int i = 0; i < (int)ans.size(); ++i) {
    std::cout << ans[i] << ' ';
}
std::cout << '\\n';";
        assert_eq!(code, expected);
        assert_eq!(
            return_type_code(&analysis, &config),
            "std::vector<long long>"
        );
    }

    #[test]
    fn test_fallback_on_missing_input_format() {
        let analysis = Analysis {
            input_format: None,
            input_variables: None,
            output_format: None,
            output_variables: None,
            constants: IndexMap::new(),
            output_shape: None,
            diagnostics: Vec::new(),
        };
        let config = CodegenConfig::default();
        let code = read_input_code(&analysis, &config, 0);
        assert!(code.contains("// failed to analyze input format"));
        assert!(code.contains("// TODO: edit here"));
        assert!(code.contains("int n;"));
        assert!(code.contains("std::vector<long long> a(n);"));
    }

    #[test]
    fn test_declare_constants() {
        let mut analysis = analysis_with_input();
        analysis.constants.insert(
            "YES".to_string(),
            ConstantDecl {
                name: "YES".to_string(),
                value: "Yes".to_string(),
                ty: VarType::String,
            },
        );
        analysis.constants.insert(
            "MOD".to_string(),
            ConstantDecl {
                name: "MOD".to_string(),
                value: "1000000007".to_string(),
                ty: VarType::ValueInt,
            },
        );
        let config = CodegenConfig::default();
        let code = declare_constants_code(&analysis, &config, 0);
        let expected = "\
const std::string YES = \"Yes\";
constexpr long long MOD = 1000000007;";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_parameter_lists() {
        let analysis = analysis_with_input();
        let config = CodegenConfig::default();
        assert_eq!(
            formal_parameter_list(&analysis, &config),
            "int n, const std::vector<long long> & a"
        );
        assert_eq!(actual_argument_list(&analysis), "n, a");
    }

    #[test]
    fn test_declaration_gate_rejects_forward_size() {
        // the array is sized by a variable read after it
        let node = FormatNode::seq(vec![
            FormatNode::counted("i", "n", FormatNode::indexed("a", &["i"])),
            FormatNode::Newline,
            FormatNode::item("n"),
            FormatNode::Newline,
        ]);
        let mut decls = IndexMap::new();
        decls.insert(
            "a".to_string(),
            vector_decl("a", VarType::ValueInt, "n"),
        );
        decls.insert("n".to_string(), scalar_decl("n", VarType::IndexInt));
        assert!(lower_input(&node, &decls).is_err());
    }

    #[test]
    fn test_lowering_declares_each_variable_once() {
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
        let lowered = optimize(lower_input(&node, &decls).unwrap());

        fn declared(statement: &Statement) -> usize {
            match statement {
                Statement::Decl(decls) => decls.len(),
                Statement::Sequence(items) => items.iter().map(declared).sum(),
                Statement::Repeat { body, .. } => declared(body),
                _ => 0,
            }
        }
        assert_eq!(declared(&lowered), decls.len());
    }

    #[test]
    fn test_nested_declaration() {
        let config = CodegenConfig::default();
        let generator = CodeGenerator::new(&config);
        let decl = VarDecl {
            name: "a".to_string(),
            ty: Some(VarType::ValueInt),
            dims: vec!["n".to_string(), "m".to_string()],
            bases: vec!["0".to_string(), "0".to_string()],
            depending: ["n".to_string(), "m".to_string()].into_iter().collect(),
        };
        let lines = generator.declare_variables(&[decl]);
        assert_eq!(
            lines,
            vec![
                "std::vector<std::vector<long long> > a(n, std::vector<long long>(m));"
                    .to_string()
            ]
        );
    }
}
