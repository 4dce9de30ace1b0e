// ABOUTME: CLI entry point: REPL when run bare, file execution when given a path

use clap::Parser as ClapParser;
use saga::error::Diagnostics;
use saga::interpreter::Interpreter;
use saga::lexer::lex;
use saga::parser::Parser;
use saga::repl;
use saga::resolver::Resolver;
use std::path::PathBuf;
use std::process::ExitCode;

/// A small, indentation-structured scripting language.
#[derive(ClapParser, Debug)]
#[command(name = "saga")]
#[command(version)]
#[command(about = "A small, indentation-structured scripting language with a tree-walking interpreter")]
struct CliArgs {
    /// Script file to execute. Omit to start the REPL.
    #[arg(value_name = "FILE")]
    script: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.script.len() > 1 {
        eprintln!("Usage: saga [script]");
        return ExitCode::from(1);
    }

    match args.script.first() {
        Some(path) => ExitCode::from(run_file(path)),
        None => {
            if let Err(e) = repl::run() {
                eprintln!("REPL error: {}", e);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
    }
}

/// Runs one script file start to finish, returning the process exit code
/// spec.md §6 specifies: 0 success, 65 static error, 70 runtime error.
fn run_file(path: &PathBuf) -> u8 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Cannot read file {}: {}", path.display(), e);
            return 1;
        }
    };

    let mut diag = Diagnostics::new();
    let tokens = lex(&source, &mut diag);
    let stmts = Parser::new(tokens).parse(&mut diag);
    if diag.had_error {
        return 65;
    }

    let locals = Resolver::new(&mut diag).resolve(&stmts);
    if diag.had_error {
        return 65;
    }

    let mut interpreter = Interpreter::new();
    interpreter.run(&stmts, locals, &mut diag);
    if diag.had_runtime_error {
        return 70;
    }

    0
}
