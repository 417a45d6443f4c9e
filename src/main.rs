//! Judge I/O Boilerplate Generator CLI
//!
//! Usage:
//!   iogen --sample in1.txt:out1.txt --sample in2.txt:out2.txt
//!   iogen --input-format input.txt --output-format output.txt --json
//!   iogen --sample in.txt:out.txt --rep-macro REP --using-namespace-std

use clap::Parser as ClapParser;
use colored::Colorize;
use std::fs;

use iogen::{
    analyze, codegen, Analysis, AnalyzerResources, CodegenConfig, LoopStyle, Printer, SampleCase,
    Scanner,
};

#[derive(ClapParser, Debug)]
#[command(name = "iogen")]
#[command(version = "0.1.0")]
#[command(about = "Infers judge I/O formats and generates C++ boilerplate")]
struct Args {
    /// Sample case as a pair of files (e.g., "in1.txt:out1.txt")
    #[arg(short = 's', long = "sample", value_parser = parse_sample)]
    samples: Vec<(String, String)>,

    /// File holding the input format description
    #[arg(long = "input-format")]
    input_format: Option<String>,

    /// File holding the output format description
    #[arg(long = "output-format")]
    output_format: Option<String>,

    /// File holding the problem statement, scanned for constants
    #[arg(long = "statement")]
    statement: Option<String>,

    /// Each input holds multiple independent test cases
    #[arg(short = 't', long = "multiple-test-cases")]
    multiple_test_cases: bool,

    /// Use scanf/printf instead of iostreams
    #[arg(long = "formatted-io")]
    formatted_io: bool,

    /// Repeat-macro name to use for loops (e.g., "REP")
    #[arg(long = "rep-macro")]
    rep_macro: Option<String>,

    /// Spelling of the 64-bit integer type
    #[arg(long = "int64", default_value = "long long")]
    int64_type: String,

    /// Indentation unit
    #[arg(long = "indent", default_value = "    ")]
    indent: String,

    /// Assume "using namespace std;" in the template
    #[arg(long = "using-namespace-std")]
    using_namespace_std: bool,

    /// Dump the analysis as JSON instead of rendering a template
    #[arg(short = 'j', long = "json")]
    json_output: bool,

    /// Print the analysis summary before the template
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn parse_sample(s: &str) -> Result<(String, String), String> {
    let Some((input, output)) = s.split_once(':') else {
        return Err(format!(
            "expected \"input.txt:output.txt\", got {:?}",
            s
        ));
    };
    Ok((input.to_string(), output.to_string()))
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("{}: failed to read file '{}': {}", "Error".red(), path, e);
        std::process::exit(1);
    })
}

fn main() {
    let args = Args::parse();

    let samples: Vec<SampleCase> = args
        .samples
        .iter()
        .map(|(input, output)| SampleCase {
            input: read_file(input),
            output: read_file(output),
        })
        .collect();

    let resources = AnalyzerResources {
        input_format_string: args.input_format.as_deref().map(read_file),
        output_format_string: args.output_format.as_deref().map(read_file),
        input_declarations: None,
        output_declarations: None,
        samples,
        multiple_test_cases: args.multiple_test_cases,
        problem_text: args.statement.as_deref().map(read_file),
    };

    let analysis = analyze(&resources);

    for diagnostic in &analysis.diagnostics {
        eprintln!("{}: {}", "Warning".yellow(), diagnostic);
    }

    if args.json_output {
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}: failed to serialize to JSON: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = CodegenConfig {
        scanner: if args.formatted_io {
            Scanner::Formatted
        } else {
            Scanner::Stream
        },
        printer: if args.formatted_io {
            Printer::Formatted
        } else {
            Printer::Stream
        },
        loop_style: match &args.rep_macro {
            Some(name) => LoopStyle::Macro(name.clone()),
            None => LoopStyle::For,
        },
        int64_type: args.int64_type.clone(),
        indent: args.indent.clone(),
        use_unqualified_names: args.using_namespace_std,
    };

    if args.verbose {
        print_summary(&analysis);
    }

    println!("{}", render_template(&analysis, &config, &args));
}

fn print_summary(analysis: &Analysis) {
    eprintln!("{}", "Analysis Results".bold().green());
    eprintln!("{}", "=".repeat(50));
    eprintln!("{}: {:?}", "Input format".cyan(), analysis.input_format);
    if let Some(decls) = &analysis.input_variables {
        for (name, decl) in decls {
            eprintln!(
                "  {}: type {:?}, dims {:?}",
                name.bold(),
                decl.ty,
                decl.dims
            );
        }
    }
    eprintln!("{}: {:?}", "Output format".cyan(), analysis.output_format);
    eprintln!("{}: {:?}", "Output shape".cyan(), analysis.output_shape);
    for constant in analysis.constants.values() {
        eprintln!(
            "  {}: {} = {}",
            "constant".cyan(),
            constant.name,
            constant.value
        );
    }
    eprintln!();
}

fn render_template(analysis: &Analysis, config: &CodegenConfig, args: &Args) -> String {
    let mut out = String::new();
    out.push_str("#include <bits/stdc++.h>\n");
    if args.using_namespace_std {
        out.push_str("using namespace std;\n");
    }
    if let Some(name) = &args.rep_macro {
        out.push_str(&format!(
            "#define {}(i, n) for (int i = 0; i < (int)(n); ++i)\n",
            name
        ));
    }
    out.push('\n');

    let constants = codegen::declare_constants_code(analysis, config, 0);
    if !constants.is_empty() {
        out.push_str(&constants);
        out.push_str("\n\n");
    }

    out.push_str(&format!(
        "{} solve({}) {{\n{}// TODO: edit here\n}}\n\n",
        codegen::return_type_code(analysis, config),
        codegen::formal_parameter_list(analysis, config),
        config.indent,
    ));

    out.push_str("int main() {\n");
    out.push_str(&codegen::read_input_code(analysis, config, 1));
    out.push('\n');
    out.push_str(&format!(
        "{}auto {} = solve({});\n",
        config.indent,
        codegen::return_expression_code(analysis),
        codegen::actual_argument_list(analysis),
    ));
    out.push_str(&codegen::write_output_code(analysis, config, 1));
    out.push('\n');
    out.push_str(&format!("{}return 0;\n}}\n", config.indent));
    out
}
