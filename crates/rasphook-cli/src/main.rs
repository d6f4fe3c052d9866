//! rasphook CLI entry point

use clap::Parser;
use rasphook_cli::{
    cli::{Cli, Commands},
    commands::{request::RequestArgs, RequestCommand, SettingsCommand},
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use rasphook_core::SettingsLoader;
use tracing::debug;

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    debug!("rasphook v{}", env!("CARGO_PKG_VERSION"));
    let settings = SettingsLoader::new().load(cli.settings.as_deref())?;

    match cli.command {
        Commands::Request {
            config_json,
            file,
            data_file,
            wait_ms,
            pretty,
        } => RequestCommand::run(
            &settings,
            RequestArgs {
                config_json,
                file,
                data_file,
                wait_ms,
                pretty,
            },
        ),
        Commands::Settings { format } => SettingsCommand::run(&settings, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasphook_cli::cli::SettingsFormat;

    #[test]
    fn test_request_command_parsing() {
        let cli = Cli::try_parse_from([
            "rasphook",
            "--verbose",
            "request",
            "--config-json",
            r#"{"url": "http://x"}"#,
            "--wait-ms",
            "250",
            "--pretty",
        ])
        .unwrap();

        assert!(cli.verbose);
        if let Commands::Request {
            config_json,
            file,
            wait_ms,
            pretty,
            ..
        } = cli.command
        {
            assert_eq!(config_json, Some(r#"{"url": "http://x"}"#.to_string()));
            assert_eq!(file, None);
            assert_eq!(wait_ms, 250);
            assert!(pretty);
        } else {
            panic!("Expected Request command");
        }
    }

    #[test]
    fn test_config_sources_conflict() {
        let result = Cli::try_parse_from([
            "rasphook",
            "request",
            "--config-json",
            "{}",
            "--file",
            "config.yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_command_parsing() {
        let cli = Cli::try_parse_from([
            "rasphook",
            "--settings",
            "/etc/rasphook.yaml",
            "--no-color",
            "settings",
            "--format",
            "json",
        ])
        .unwrap();

        assert!(cli.no_color);
        assert_eq!(
            cli.settings.as_deref(),
            Some(std::path::Path::new("/etc/rasphook.yaml"))
        );
        assert!(matches!(
            cli.command,
            Commands::Settings {
                format: SettingsFormat::Json
            }
        ));
    }
}
