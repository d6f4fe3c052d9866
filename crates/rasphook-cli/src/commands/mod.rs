pub mod request;
pub mod settings;

// Re-export command handlers
pub use request::RequestCommand;
pub use settings::SettingsCommand;
