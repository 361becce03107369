use clap::Parser;
use log::{error, info};
use softcopy_core::cli::{setup_logging, Cli, OutputFormat};
use softcopy_core::{PresentationStateFactory, PresentationStateSummary, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("Reading presentation state: {}", cli.file.display());

    let summary = match PresentationStateFactory::load_file(&cli.file)
        .and_then(|state| PresentationStateSummary::from_state(&state))
    {
        Ok(summary) => summary,
        Err(e) => {
            error!("Failed to read {}: {}", cli.file.display(), e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match cli.format {
        OutputFormat::Text => println!("{}", TextReport::new(&summary)),
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}
