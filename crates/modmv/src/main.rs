use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod module;
mod report;
mod rewrite;

#[derive(Parser)]
#[command(name = "modmv")]
#[command(about = "Rewrite Go import paths across a source tree", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite imports of one package path to another
    #[command(alias = "r")]
    Rewrite(rewrite::RewriteArgs),

    /// Change the module path in go.mod and every import under it
    #[command(alias = "m")]
    Module(module::ModuleArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug; RUST_LOG still wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Rewrite(args) => rewrite::execute(args),
        Commands::Module(args) => module::execute(args),
    }
}
