use clap::Parser;
use log::{error, info, warn};
use softcopy_core::cli::report::CreationReport;
use softcopy_core::cli::{setup_logging, CreateCli, OutputFormat};
use softcopy_core::{PresentationImage, PresentationStateFactory, SerializationReport};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let cli = CreateCli::parse();
    setup_logging(cli.verbose);

    let files = match collect_dicom_files(&cli.inputs) {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to read inputs: {}", e);
            eprintln!("Error: Failed to read inputs: {}", e);
            process::exit(1);
        }
    };
    if files.is_empty() {
        eprintln!("Error: No DICOM files found");
        process::exit(1);
    }
    info!("Found {} DICOM files", files.len());

    let mut images = Vec::new();
    for path in &files {
        match PresentationImage::open(path) {
            Ok(image) if PresentationStateFactory::is_supported(&image) => images.push(image),
            Ok(_) => warn!("Skipping {}: unsupported photometric interpretation", path.display()),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    if images.is_empty() {
        eprintln!("Error: No image could carry a presentation state");
        process::exit(1);
    }

    let created = match PresentationStateFactory::create_batch_with_options(
        &images,
        cli.serialization_options(),
    ) {
        Ok(created) => created,
        Err(e) => {
            error!("Failed to create presentation states: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&cli.output) {
        eprintln!("Error: Cannot create {}: {}", cli.output.display(), e);
        process::exit(1);
    }

    let mut written: Vec<(String, SerializationReport)> = Vec::new();
    for entry in created {
        let name = format!(
            "PS_{}.dcm",
            entry.state.sop_instance_uid().unwrap_or("unnamed")
        );
        let path = cli.output.join(&name);
        if let Err(e) = entry.state.save(&path) {
            error!("Failed to write {}: {}", path.display(), e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        written.push((path.display().to_string(), entry.report));
    }

    match cli.format {
        OutputFormat::Text => print!("{}", CreationReport::new(&written)),
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                let json: Vec<serde_json::Value> = written
                    .iter()
                    .map(|(file, report)| serde_json::json!({ "file": file, "report": report }))
                    .collect();
                match serde_json::to_string_pretty(&json) {
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

/// Expands directories to the DICOM files they contain
fn collect_dicom_files(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(input)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let accepted = match path.extension() {
                Some(ext) => ext.eq_ignore_ascii_case("dcm") || ext.eq_ignore_ascii_case("dicom"),
                None => is_dicom_file(&path),
            };
            if accepted {
                found.push(path);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Checks for the "DICM" magic after the 128-byte preamble
fn is_dicom_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut buffer = [0u8; 132];
    matches!(file.read(&mut buffer), Ok(n) if n >= 132 && &buffer[128..132] == b"DICM")
}
