//! Print the effective runtime settings

use crate::cli::SettingsFormat;
use crate::error::CliResult;
use rasphook_core::RuntimeSettings;

pub struct SettingsCommand;

impl SettingsCommand {
    pub fn run(settings: &RuntimeSettings, format: SettingsFormat) -> CliResult<()> {
        print!("{}", Self::render(settings, format)?);
        Ok(())
    }

    pub fn render(settings: &RuntimeSettings, format: SettingsFormat) -> CliResult<String> {
        let rendered = match format {
            SettingsFormat::Yaml => serde_yaml::to_string(settings)?,
            SettingsFormat::Json => format!("{}\n", serde_json::to_string_pretty(settings)?),
        };
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasphook_core::{FileFormat, SettingsLoader};

    #[test]
    fn test_rendered_settings_parse_back() {
        let mut settings = RuntimeSettings::default();
        settings.request.timeout_ms = 4_321;
        let loader = SettingsLoader::new();

        let yaml = SettingsCommand::render(&settings, SettingsFormat::Yaml).unwrap();
        assert_eq!(loader.parse_content(&yaml, FileFormat::Yaml).unwrap(), settings);

        let json = SettingsCommand::render(&settings, SettingsFormat::Json).unwrap();
        assert!(json.contains("\"timeout_ms\": 4321"));
        assert_eq!(loader.parse_content(&json, FileFormat::Json).unwrap(), settings);
    }
}
