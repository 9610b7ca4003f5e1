//! Batch driver for the BlackLua compiler and VM: compile a source file,
//! optionally dump the AST or disassembly, run its top-level code, and
//! optionally call a function and print the returned value.

use std::path::PathBuf;
use std::process::ExitCode;

use blacklua_core::api::Context;
use blacklua_core::emitter::Symbol;
use clap::Parser;

#[derive(Parser)]
#[command(name = "blacklua", about = "BlackLua compiler and virtual machine")]
struct Args {
    /// Source file to compile and run.
    file: PathBuf,

    /// Print the parsed AST and exit.
    #[arg(long)]
    dump_ast: bool,

    /// Print the compiled bytecode before running.
    #[arg(long)]
    disassemble: bool,

    /// Call this function after running top-level code and print its
    /// return value.
    #[arg(long)]
    call: Option<String>,

    /// Skip running top-level code.
    #[arg(long)]
    no_run: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    match drive(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn drive(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = Context::new();
    let module = args
        .file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());

    if args.dump_ast {
        let source = std::fs::read_to_string(&args.file)?;
        print!("{}", ctx.dump_ast(&source)?);
        return Ok(());
    }

    let program = ctx.compile_file(&args.file)?;

    if args.disassemble {
        print!("{}", ctx.disassemble(&program));
    }

    if !args.no_run {
        ctx.run(&program, &module)?;
    }

    if let Some(function) = &args.call {
        let return_size = match program.symbol(function) {
            Some(Symbol::Function { return_size, .. }) => *return_size,
            _ => return Err(format!("`{function}` is not a compiled function").into()),
        };

        ctx.call(function, &module)?;
        match return_size {
            0 => {}
            1 => println!("{}", ctx.get_char(-1)?),
            2 => println!("{}", ctx.get_short(-1)?),
            4 => println!("{}", ctx.get_int(-1)?),
            8 => println!("{}", ctx.get_long(-1)?),
            other => println!("<{other}-byte value>"),
        }
    }

    Ok(())
}
