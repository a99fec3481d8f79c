//! `timelab validate`: check a profile file for errors.
//!
//! Parses and validates `{config-dir}/{profile}.yaml` as written on disk
//! (environment overrides are not applied), reporting results in either
//! human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::{self, validation};
use crate::error::TimelabError;

pub fn execute(args: &ValidateArgs) -> Result<(), TimelabError> {
    let profile = args.selection.profile.as_str();
    let path = config::profile_path(&args.selection.config_dir, profile);

    if !path.exists() {
        return Err(TimelabError::ProfileNotFound {
            profile: profile.to_string(),
            path,
        });
    }

    let content = std::fs::read_to_string(&path)?;
    let config = config::parse_profile_str(&content, &path.display().to_string())?;

    if let Err(errors) = validation::validate(profile, &config) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "field": e.field,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "profile": profile,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(TimelabError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(profile, &config)
            );
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "profile": profile,
                    "allowedOrigins": config.cors.origins(),
                    "maxAge": config.cors.max_age,
                    "logLevel": config.logging.level,
                })
            );
        }
    }

    Ok(())
}
