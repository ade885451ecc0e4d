//! Check command - validate a compiled corpus directory.

use std::path::PathBuf;

use colored::Colorize;
use corpusmill::{CorpusValidator, ValidatorOptions};

use super::load_config;

pub fn run(
    directory: PathBuf,
    config: Option<PathBuf>,
    quick: bool,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_config(&directory, config)?;
    let validator = CorpusValidator::new(ValidatorOptions {
        full_scan: !quick,
        ..ValidatorOptions::default()
    });
    let report = validator.validate(&directory, &schema)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} {}",
            "Checking".cyan().bold(),
            directory.display().to_string().white()
        );
        if verbose {
            println!(
                "  {} files, {} rows{}",
                report.files_checked,
                report.rows_checked,
                if quick { " (headers only)" } else { "" }
            );
        }
        println!();

        for violation in &report.violations {
            println!("  {} {}", format!("[{}]", violation.kind).red(), violation);
        }
        if report.is_valid() {
            println!("{}", "No violations found".green().bold());
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(format!(
            "{} violation(s) in {}",
            report.violations.len(),
            directory.display()
        )
        .into())
    }
}
