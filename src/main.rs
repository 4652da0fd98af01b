use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};

use crate::interpreter::Interpreter;

mod ast;
mod builtins;
mod interpreter;
mod lexer;
mod parser;
mod runtime;
mod token;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut dump = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" | "-d" => dump = true,
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let program = parser::parse(&source)?;

    if dump {
        println!("{program}");
        return Ok(());
    }

    let mut interpreter = Interpreter::new();
    match interpreter.run(&program) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(error) => {
            let output = interpreter.output();
            if !output.is_empty() {
                println!("{output}");
            }
            bail!("{}: {}", error.exception_type(), error)
        }
    }
}
