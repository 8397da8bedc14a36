use clap::{Parser, Subcommand};
use slsa_provenance::{
    cli::{
        self,
        commands::{GenerateCommands, SignArgs},
    },
    error::Result,
};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Enable debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate provenance
    Generate {
        #[command(subcommand)]
        command: GenerateCommands,
    },
    /// Sign a provenance statement into a DSSE envelope
    Sign(SignArgs),
    /// Print version information
    Version {
        /// Print version information as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    slsa_provenance::init_logging(cli.verbose)?;

    let result = match cli.command {
        Commands::Generate { command } => cli::handlers::handle_generate_command(command),
        Commands::Sign(args) => cli::handlers::handle_sign_command(args),
        Commands::Version { json } => cli::handlers::handle_version_command(json),
    };

    // Format and display any errors
    if let Err(ref e) = result {
        eprintln!("{}", cli::format_error(e));
    }

    result
}
