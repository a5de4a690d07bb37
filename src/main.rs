//! Dynamic Template CLI
//!
//! Usage:
//!   dynamic-template [OPTIONS] [FILE]
//!
//! Options:
//!   -a, --arg <NAME[:TYPE]=VALUE>  Declare and bind a template argument
//!   -f, --args-file <FILE>         Load arguments from a TOML file
//!   -c, --check                    Compile only, render nothing
//!   -g, --grammar                  Show template syntax reference
//!   -h, --help                     Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;

use dynamic_template::argfile::ArgFile;
use dynamic_template::{compile, ArgumentDescriptor, TypeRef, Value};

#[derive(Parser)]
#[command(name = "dynamic-template")]
#[command(about = "Template compiler for <% code %> / <%= expression %> templates")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Template argument as name[:type]=value (type: string, int, float,
    /// bool; defaults to string). Repeatable; binds in flag order after any
    /// file-loaded arguments.
    #[arg(short, long = "arg")]
    arg: Vec<String>,

    /// Arguments from a TOML file with an [args] table of name = value
    /// pairs (bound in name order)
    #[arg(short = 'f', long)]
    args_file: Option<PathBuf>,

    /// Compile the template and report diagnostics without rendering
    #[arg(short, long)]
    check: bool,

    /// Show template syntax reference
    #[arg(short, long)]
    grammar: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.grammar {
        print_grammar();
        return;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    // Collect arguments: file-loaded first, then --arg flags in order
    let mut args: Vec<ArgumentDescriptor> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(path) = &cli.args_file {
        match ArgFile::from_file(path) {
            Ok(file) => {
                for (descriptor, value) in file.entries {
                    args.push(descriptor);
                    values.push(value);
                }
            }
            Err(e) => {
                eprintln!("Error loading arguments '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    for spec in &cli.arg {
        match parse_arg_spec(spec) {
            Ok((descriptor, value)) => {
                args.push(descriptor);
                values.push(value);
            }
            Err(e) => {
                eprintln!("Error in argument '{}': {}", spec, e);
                std::process::exit(1);
            }
        }
    }

    // Read the template
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let unit = match compile(&source, &args) {
        Ok(unit) => unit,
        Err(diagnostic) => {
            eprint!("{}", diagnostic.format(&source, &filename));
            std::process::exit(1);
        }
    };

    if cli.check {
        eprintln!("{}: template compiles", filename);
        return;
    }

    match unit.invoke(&values) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("Error rendering template: {}", e);
            std::process::exit(1);
        }
    }
}

/// Parse a `name[:type]=value` argument specification
fn parse_arg_spec(spec: &str) -> Result<(ArgumentDescriptor, Value), String> {
    let (lhs, raw) = spec
        .split_once('=')
        .ok_or_else(|| "expected name[:type]=value".to_string())?;
    let (name, ty) = match lhs.split_once(':') {
        Some((name, ty)) => (name, ty.parse::<TypeRef>()?),
        None => (lhs, TypeRef::String),
    };
    let value = match ty {
        TypeRef::String => Value::Str(raw.to_string()),
        TypeRef::Int => Value::Int(
            raw.parse()
                .map_err(|_| format!("'{}' is not an int", raw))?,
        ),
        TypeRef::Float => Value::Float(
            raw.parse()
                .map_err(|_| format!("'{}' is not a float", raw))?,
        ),
        TypeRef::Bool => Value::Bool(
            raw.parse()
                .map_err(|_| format!("'{}' is not a bool", raw))?,
        ),
    };
    Ok((ArgumentDescriptor::new(name, ty), value))
}

fn print_intro() {
    println!(
        r#"Dynamic Template - template compiler

USAGE:
    dynamic-template [OPTIONS] [FILE]
    echo '<template>' | dynamic-template

OPTIONS:
    -a, --arg        Template argument as name[:type]=value (repeatable)
    -f, --args-file  Arguments from a TOML file ([args] table)
    -c, --check      Compile only, report diagnostics
    -g, --grammar    Show template syntax reference
    -h, --help       Print help

QUICK START:
    echo 'Hello <%= name %>!' | dynamic-template -a name=World

This renders "Hello World!". Run --grammar for syntax reference."#
    );
}

fn print_grammar() {
    println!(
        r#"DYNAMIC TEMPLATE GRAMMAR
========================

TEMPLATE SYNTAX
---------------
literal text             Copied to output unchanged
<% statements %>         Code block: runs, emits nothing directly
<%= expression %>        Expression block: result appended to output

A line containing only a code block (plus whitespace) leaves no blank
line in the output; expression lines keep their trailing newline.

STATEMENTS
----------
let x = expr;            Declare a variable (block scoped)
x = expr;                Assign to a declared variable
expr;                    Evaluate for effect, e.g. emit(...)
if (cond) {{ ... }}        Conditional, with optional else / else if
while (cond) {{ ... }}     Loop

EXPRESSIONS
-----------
Literals:    "text"  42  3.14  true  false  null
Operators:   + - * / %   == != < <= > >=   && || !
Strings concatenate with + when either side is a string.

BUILTINS
--------
emit(v)                  Append v to the render output
arg(i)                   Raw value of the i-th argument
as_string / as_int / as_float / as_bool
                         Cast, failing the render on mismatch
html_encode, html_attribute_encode, html_decode
url_encode, url_path_encode, url_decode
len(s), str(v)

ARGUMENTS
---------
Arguments bind positionally and are declared to the compiler by name
and type. Names must start with a letter or underscore; a leading @
lets a reserved word (let, if, else, while, for, true, false, null)
be used as a name: --arg @while=busy binds the variable 'while'.

EXAMPLES
--------
echo 'Hello <%= name %>!' | dynamic-template -a name=World
echo '<% if (n > 0) {{ %>pos<% }} else {{ %>neg<% }} %>' \
    | dynamic-template -a n:int=5"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_spec_default_string() {
        let (descriptor, value) = parse_arg_spec("name=World").unwrap();
        assert_eq!(descriptor.identifier, "name");
        assert_eq!(descriptor.ty, TypeRef::String);
        assert_eq!(value, Value::Str("World".into()));
    }

    #[test]
    fn test_parse_arg_spec_typed() {
        let (descriptor, value) = parse_arg_spec("n:int=-3").unwrap();
        assert_eq!(descriptor.ty, TypeRef::Int);
        assert_eq!(value, Value::Int(-3));

        let (_, value) = parse_arg_spec("x:float=0.5").unwrap();
        assert_eq!(value, Value::Float(0.5));

        let (_, value) = parse_arg_spec("b:bool=true").unwrap();
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn test_parse_arg_spec_value_may_contain_equals() {
        let (_, value) = parse_arg_spec("q=a=b").unwrap();
        assert_eq!(value, Value::Str("a=b".into()));
    }

    #[test]
    fn test_parse_arg_spec_errors() {
        assert!(parse_arg_spec("missing").is_err());
        assert!(parse_arg_spec("n:int=abc").is_err());
        assert!(parse_arg_spec("n:double=1").is_err());
    }
}
