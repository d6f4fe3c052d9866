pub mod error;
pub mod properties;
pub mod settings;
pub mod value;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use properties::{
    property_keys, register_property_keys, ContextHandle, ContextTable, PropertyKeys,
    PropertyKind, PropertySource, RequestContext,
};
pub use settings::{
    DisposalSettings, FileFormat, RequestDefaults, RuntimeSettings, SettingsLoader,
    WorkerSettings,
};
pub use value::ScriptValue;
