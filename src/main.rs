//! Depwalk - dependency graph walker
//!
//! Thin command-line front end over the depwalk library.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use depwalk::cli::{self, Cli, Commands};
use depwalk::core::DepwalkResult;

#[tokio::main]
async fn main() -> DepwalkResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Set up output mode
    let json_output = cli.json;

    // Execute command
    let result = match cli.command {
        Commands::Walk(args) => cli::commands::walk::execute(args, json_output).await,
        Commands::Analyze(args) => cli::commands::analyze::execute(args, json_output).await,
        Commands::Flatten(args) => cli::commands::flatten::execute(args, json_output).await,
        Commands::Resolve(args) => cli::commands::resolve::execute(args, json_output).await,
    };

    if let Err(ref e) = result {
        if json_output {
            let error_json = serde_json::json!({
                "error": true,
                "message": e.to_string(),
                "code": e.exit_code()
            });
            eprintln!("{}", error_json);
        } else {
            cli::output::error(&e.to_string());
        }
        std::process::exit(e.exit_code());
    }

    Ok(())
}
