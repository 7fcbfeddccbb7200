use oas3_validator::{build_api_validator, load_openapi_spec, ValidatorConfig};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,oas3_validator=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let document_path = args.next().unwrap_or_else(|| "openapi.yaml".to_owned());
    let config = match args.next() {
        Some(config_path) => match std::fs::read_to_string(&config_path)
            .map_err(|e| oas3_validator::Error::Load(format!("failed to read {}: {}", config_path, e)))
            .and_then(|source| ValidatorConfig::from_yaml_str(&source))
        {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => ValidatorConfig::default(),
    };

    let document = match load_openapi_spec(Path::new(&document_path)) {
        Ok(document) => document,
        Err(e) => {
            error!(error = %e, "failed to load OpenAPI document");
            return ExitCode::FAILURE;
        }
    };
    let title = document
        .get("info")
        .and_then(|info| info.get("title"))
        .and_then(|title| title.as_str())
        .unwrap_or("untitled")
        .to_owned();

    match build_api_validator(document, &config) {
        Ok(api_validator) => {
            info!(
                title = %title,
                operations = api_validator.operation_count(),
                fill_by_default = config.fill_by_default,
                validate_response = config.validate_response,
                "API validator ready"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to build validator");
            ExitCode::FAILURE
        }
    }
}
