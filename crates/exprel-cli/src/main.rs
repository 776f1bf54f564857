use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use exprel::types::{NativeType, NativeValue};
use exprel::{Ast, Decl, Env, Issues, ProgramOptions, Type, Value};
use std::collections::HashMap;
use std::fs;

#[derive(Parser)]
#[command(name = "exprel")]
#[command(about = "Parse, check and evaluate exprel expressions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Namespace unqualified names are resolved in
    #[arg(long, global = true, default_value = "")]
    container: String,

    /// Declare a variable, e.g. `--var user:map(string, dyn)`
    #[arg(long = "var", global = true, value_name = "NAME:TYPE")]
    vars: Vec<String>,

    /// Leave out the standard operators and functions
    #[arg(long, global = true)]
    no_builtins: bool,

    /// Reject mixed-type list and map literals
    #[arg(long, global = true)]
    no_dynamic_literals: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and print its tree
    Parse {
        /// Expression (use @filename to read from file)
        code: String,
    },
    /// Type-check an expression and print its result type
    Check {
        /// Expression (use @filename to read from file)
        code: String,
    },
    /// Check and evaluate an expression
    Eval {
        /// Expression (use @filename to read from file)
        code: String,

        /// Bind a variable to a JSON value, e.g. `--bind 'user={"age": 3}'`
        #[arg(long = "bind", value_name = "NAME=JSON")]
        bindings: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_module("exprel", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let env = build_env(&cli)?;

    match &cli.command {
        Commands::Parse { code } => {
            let code = read_code(code)?;
            let (ast, issues) = env.parse(&code);
            let ast = require(ast, &issues, cli.json)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(ast.expr())?);
            } else {
                println!("{:#?}", ast.expr());
            }
        }
        Commands::Check { code } => {
            let code = read_code(code)?;
            let (ast, issues) = env.compile(&code);
            let ast = require(ast, &issues, cli.json)?;
            if cli.json {
                let output = serde_json::json!({ "type": ast.result_type().to_string() });
                println!("{output}");
            } else {
                println!("{}", ast.result_type());
            }
        }
        Commands::Eval { code, bindings } => {
            let code = read_code(code)?;
            let (ast, issues) = env.compile(&code);
            let ast = require(ast, &issues, cli.json)?;
            let program = env.program(&ast, ProgramOptions::new())?;
            let activation = parse_bindings(&env, bindings)?;
            let value = program.eval(&activation);
            print_value(&value, cli.json)?;
        }
    }
    Ok(())
}

fn build_env(cli: &Cli) -> Result<Env> {
    let probe = Env::new()?;
    let declarations = cli
        .vars
        .iter()
        .map(|var| {
            let (name, ty) = var
                .split_once(':')
                .ok_or_else(|| anyhow!("expected NAME:TYPE, got '{var}'"))?;
            let ty = parse_type(&probe, ty.trim())
                .with_context(|| format!("invalid type for variable '{name}'"))?;
            Ok(Decl::ident(name.trim(), ty))
        })
        .collect::<Result<Vec<_>>>()?;

    let env = Env::builder()
        .container(cli.container.as_str())
        .declarations(declarations)
        .builtins(!cli.no_builtins)
        .dynamic_aggregate_literals(!cli.no_dynamic_literals)
        .build()?;
    Ok(env)
}

/// Inline code, or the contents of a file when prefixed with `@`.
fn read_code(code: &str) -> Result<String> {
    match code.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {path}")),
        None => Ok(code.to_string()),
    }
}

fn require(ast: Option<Ast>, issues: &Issues, json: bool) -> Result<Ast> {
    if json && !issues.is_empty() {
        eprintln!("{}", serde_json::to_string_pretty(issues.diagnostics())?);
    } else if !issues.is_empty() {
        eprintln!("{}", issues.render());
    }
    match (ast, issues.err()) {
        (Some(ast), None) => Ok(ast),
        (_, Some(error)) => bail!("{} error(s)", error.diagnostics.len()),
        (None, None) => bail!("no expression produced"),
    }
}

fn print_value(value: &Value, json: bool) -> Result<()> {
    match value {
        Value::Error(error) => bail!("evaluation failed: {error}"),
        Value::Unknown(unknown) => {
            println!("{unknown}");
            Ok(())
        }
        _ if json => match value.convert_to_native(&NativeType::Json) {
            Ok(NativeValue::Json(json)) => {
                println!("{json}");
                Ok(())
            }
            Ok(_) => bail!("value has no JSON form"),
            Err(error) => bail!("{error}"),
        },
        _ => {
            println!("{value}");
            Ok(())
        }
    }
}

/// Type names as written in `--var`: builtin or registered names plus
/// `list(T)` and `map(K, V)`.
fn parse_type(env: &Env, text: &str) -> Result<Type> {
    let text = text.trim();
    if text == "dyn" {
        return Ok(Type::Dyn);
    }
    if let Some(inner) = text.strip_prefix("list(").and_then(|rest| rest.strip_suffix(')')) {
        return Ok(Type::list(parse_type(env, inner)?));
    }
    if let Some(inner) = text.strip_prefix("map(").and_then(|rest| rest.strip_suffix(')')) {
        let (key, value) = split_top_level(inner)
            .ok_or_else(|| anyhow!("expected map(KEY, VALUE), got '{text}'"))?;
        return Ok(Type::map(parse_type(env, key)?, parse_type(env, value)?));
    }
    env.type_provider()
        .find_type(text)
        .ok_or_else(|| anyhow!("unknown type '{text}'"))
}

/// Split `a, b` at the comma not nested inside parentheses.
fn split_top_level(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (index, char) in text.char_indices() {
        match char {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&text[..index], &text[index + 1..])),
            _ => {}
        }
    }
    None
}

fn parse_bindings(env: &Env, bindings: &[String]) -> Result<HashMap<String, Value>> {
    let mut values = HashMap::new();
    for binding in bindings {
        let (name, json) = binding
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=JSON, got '{binding}'"))?;
        let json: serde_json::Value =
            serde_json::from_str(json).with_context(|| format!("parsing value of '{name}'"))?;
        log::debug!("binding '{name}' to {json}");
        values.insert(name.trim().to_string(), env.type_adapter().json_to_value(json));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type() {
        let env = Env::new().unwrap();
        assert_eq!(parse_type(&env, "int").unwrap(), Type::Int);
        assert_eq!(
            parse_type(&env, "map(string, list(int))").unwrap(),
            Type::map(Type::String, Type::list(Type::Int))
        );
        assert_eq!(parse_type(&env, "google.protobuf.Duration").unwrap(), Type::Duration);
        assert!(parse_type(&env, "widget").is_err());
        assert!(parse_type(&env, "map(int)").is_err());
    }

    #[test]
    fn test_parse_bindings() {
        let env = Env::new().unwrap();
        let values = parse_bindings(&env, &["n=3".to_string(), "s=\"x\"".to_string()]).unwrap();
        assert_eq!(values["n"], Value::Int(3));
        assert_eq!(values["s"], Value::string("x"));
        assert!(parse_bindings(&env, &["n".to_string()]).is_err());
    }
}
