//! Request-context properties backed by the host.
//!
//! The host registers three lists of property names once at startup. Every
//! request context exposed to scripts then carries those names as lazily
//! computed properties: the first read calls back into the host through a
//! [`PropertySource`], later reads hit the cached value.
//!
//! A [`RequestContext`] never owns host memory. It keeps an opaque
//! [`ContextHandle`] and resolves it through the host-owned [`ContextTable`]
//! on every miss, so the host stays the sole owner and can release a context
//! at any time. Getters re-enter host code, which is why `RequestContext` is
//! `!Send`: it cannot be handed to a background worker thread.
//!
//! Key registration is not synchronized beyond a `OnceLock`. Register the keys
//! before any engine instance starts; concurrent initialization is not
//! supported.

use crate::error::{CoreError, CoreResult};
use crate::value::ScriptValue;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::OnceLock;

static PROPERTY_KEYS: OnceLock<PropertyKeys> = OnceLock::new();

static NO_PROPERTY_KEYS: PropertyKeys = PropertyKeys {
    string_keys: Vec::new(),
    object_keys: Vec::new(),
    buffer_keys: Vec::new(),
};

/// How the host encodes a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Plain string
    String,
    /// JSON document, parsed into a structured value
    Object,
    /// Raw bytes, exposed as a buffer
    Buffer,
}

/// Property names grouped by encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyKeys {
    pub string_keys: Vec<String>,
    pub object_keys: Vec<String>,
    pub buffer_keys: Vec<String>,
}

impl PropertyKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_object_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_buffer_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buffer_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Encoding of a registered name. A name listed twice takes the kind
    /// registered last (buffer over object over string).
    pub fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        let listed = |keys: &[String]| keys.iter().any(|k| k == name);
        if listed(&self.buffer_keys) {
            Some(PropertyKind::Buffer)
        } else if listed(&self.object_keys) {
            Some(PropertyKind::Object)
        } else if listed(&self.string_keys) {
            Some(PropertyKind::String)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.string_keys.len() + self.object_keys.len() + self.buffer_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Install the process-wide property keys. Allowed exactly once.
pub fn register_property_keys(keys: PropertyKeys) -> CoreResult<()> {
    let count = keys.len();
    PROPERTY_KEYS
        .set(keys)
        .map_err(|_| CoreError::PropertyKeysRegistered)?;
    tracing::debug!(count, "request-context property keys registered");
    Ok(())
}

/// The registered keys, or an empty set before registration.
pub fn property_keys() -> &'static PropertyKeys {
    PROPERTY_KEYS.get().unwrap_or(&NO_PROPERTY_KEYS)
}

/// Host callbacks behind the lazy properties.
pub trait PropertySource {
    fn get_string(&self, name: &str) -> Option<String>;

    /// JSON-encoded bytes
    fn get_object(&self, name: &str) -> Option<Vec<u8>>;

    fn get_buffer(&self, name: &str) -> Option<Vec<u8>>;
}

/// Opaque key into a [`ContextTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Host-owned table of live request contexts.
#[derive(Debug)]
pub struct ContextTable<S> {
    next_id: u64,
    entries: HashMap<ContextHandle, S>,
}

impl<S> ContextTable<S> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, source: S) -> ContextHandle {
        let handle = ContextHandle(self.next_id);
        self.next_id += 1;
        self.entries.insert(handle, source);
        handle
    }

    /// Release a context. Script objects still holding the handle read
    /// `undefined` from then on.
    pub fn remove(&mut self, handle: ContextHandle) -> Option<S> {
        self.entries.remove(&handle)
    }

    pub fn get(&self, handle: ContextHandle) -> Option<&S> {
        self.entries.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for ContextTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Script-side request context object.
pub struct RequestContext {
    handle: ContextHandle,
    keys: &'static PropertyKeys,
    cache: RefCell<HashMap<String, ScriptValue>>,
    _engine_thread: PhantomData<Rc<()>>,
}

impl RequestContext {
    /// Context exposing the process-wide registered keys.
    pub fn new(handle: ContextHandle) -> Self {
        Self::with_keys(handle, property_keys())
    }

    pub fn with_keys(handle: ContextHandle, keys: &'static PropertyKeys) -> Self {
        Self {
            handle,
            keys,
            cache: RefCell::new(HashMap::new()),
            _engine_thread: PhantomData,
        }
    }

    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Names this context exposes, in registration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.keys
            .string_keys
            .iter()
            .chain(&self.keys.object_keys)
            .chain(&self.keys.buffer_keys)
            .map(String::as_str)
            .collect()
    }

    /// Read a property, computing it through the host on first access.
    pub fn get<S: PropertySource>(&self, table: &ContextTable<S>, name: &str) -> ScriptValue {
        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }
        let Some(kind) = self.keys.kind_of(name) else {
            return ScriptValue::Undefined;
        };
        let Some(source) = table.get(self.handle) else {
            tracing::debug!(handle = self.handle.id(), name, "request context already released");
            return ScriptValue::Undefined;
        };

        let value = match kind {
            PropertyKind::String => source
                .get_string(name)
                .map(ScriptValue::String)
                .unwrap_or_default(),
            PropertyKind::Object => source
                .get_object(name)
                .and_then(|raw| parse_object(name, &raw))
                .unwrap_or_default(),
            PropertyKind::Buffer => source
                .get_buffer(name)
                .filter(|raw| !raw.is_empty())
                .map(ScriptValue::Buffer)
                .unwrap_or_default(),
        };

        self.cache
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        value
    }
}

/// Bytes are one-byte (Latin-1) text holding a JSON document.
fn parse_object(name: &str, raw: &[u8]) -> Option<ScriptValue> {
    let text: String = raw.iter().map(|&b| b as char).collect();
    match serde_json::from_str::<JsonValue>(&text) {
        Ok(json) => Some(ScriptValue::from(json)),
        Err(err) => {
            tracing::debug!(name, error = %err, "host object property is not valid JSON");
            None
        }
    }
}
