use armjit::{CodeBuffer, CompilerConfig, Extern, Primitives};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
enum Error {
    #[error(transparent)]
    Compile(#[from] armjit::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

impl From<il::Error> for Error {
    fn from(value: il::Error) -> Self {
        Self::Compile(value.into())
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The arithmetic expression to compile
    expression: String,
    /// Binds a variable or function name to a native address, decimal or `0x` hex. May be
    /// repeated; the last binding of a name wins.
    #[arg(short = 'e', long = "extern", value_name = "NAME=ADDRESS", value_parser = parse_extern)]
    externs: Vec<(String, usize)>,
    /// Print the parsed expression tree
    #[arg(long)]
    ast: bool,
    /// Print the generated routine with byte offsets and encoded words
    #[arg(long)]
    listing: bool,
    /// Write the raw machine code to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Size of the code buffer in bytes
    #[arg(long, default_value_t = 4096)]
    capacity: usize,
    /// Entry points for `+`, `-`, `*` and unary minus instead of the ones linked into this binary
    #[arg(long, value_name = "ADD,SUB,MUL,NEG", value_parser = parse_primitives)]
    primitives: Option<Primitives>,
    /// Increase logging verbosity. May be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_address(value: &str) -> Result<usize, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => value.parse::<usize>(),
    };

    parsed.map_err(|e| format!("invalid address `{value}`: {e}"))
}

fn parse_extern(value: &str) -> Result<(String, usize), String> {
    let Some((name, address)) = value.split_once('=') else {
        return Err(format!("expected NAME=ADDRESS, found `{value}`"));
    };

    Ok((name.trim().to_string(), parse_address(address.trim())?))
}

fn parse_primitives(value: &str) -> Result<Primitives, String> {
    let addresses = value
        .split(',')
        .map(|address| parse_address(address.trim()))
        .collect::<Result<Vec<_>, _>>()?;

    let [add, sub, mul, negate] = addresses[..] else {
        return Err(format!("expected four addresses, found {}", addresses.len()));
    };

    Ok(Primitives {
        add,
        sub,
        mul,
        negate,
    })
}

fn initialize_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .chain(std::io::stderr())
        .apply()
}

fn run_logic(args: Args) -> Result<(), Error> {
    let externs = args
        .externs
        .iter()
        .map(|(name, address)| Extern::new(name, *address))
        .collect::<Vec<_>>();
    let config = args.primitives.map(|primitives| CompilerConfig { primitives });
    debug!("{} externs, primitives {:?}", externs.len(), config);

    if args.ast {
        let expr = parser::parse(&args.expression).map_err(armjit::Error::from)?;
        println!("{expr}");
    }

    let instructions = armjit::generate(&args.expression, &externs, config)?;

    let mut bytes = vec![0u8; args.capacity];
    let mut out = CodeBuffer::new(&mut bytes);
    let written = instructions.encode_into(&mut out)?;
    info!("`{}` compiled to {written} bytes", args.expression);

    if args.listing {
        for (index, word) in instructions.iter().enumerate() {
            println!("{:04x}:  {:08x}  {}", index * 4, word.encode()?, word);
        }
    }

    if let Some(path) = args.output {
        std::fs::write(&path, &bytes[..written])?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    initialize_logging(args.verbose)?;

    run_logic(args)?;

    Ok(())
}
