//! The serialization pipeline.
//!
//! Every request body and response body passes through a [`Codec`]. It owns
//! three pieces of caller-adjustable state:
//!
//! - **Converters**: hooks run over the JSON tree of every encode and decode,
//!   for the life of the codec.
//! - **Settings override**: a one-shot mutation of [`SerializerSettings`],
//!   active while the [`SettingsGuard`] returned by
//!   [`Codec::custom_settings`] is alive. Only the most recent live override
//!   applies; guards may be dropped in any order.
//! - **Serialization strategy**: factories that wrap the raw byte reader and
//!   writer, used in place of the plain slice/vector adapters.
//!
//! ## Thread Safety
//!
//! The overrides are one stack shared by every call on the codec. Callers
//! issuing customised calls concurrently on one codec must coordinate
//! themselves; the codec does not serialize access to it.

use std::io::{Read, Write};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::{AnyDocument, Document};
use crate::error::Result;
use crate::registry::{TypeRegistry, TYPE_TAG};

/// A hook over the JSON tree of every encode and decode.
pub trait Converter: Send + Sync {
    /// Adjust an encoded value before it is written.
    fn write(&self, value: &mut Value) -> Result<()> {
        let _ = value;
        Ok(())
    }

    /// Adjust a parsed value before it is bound to the target type.
    fn read(&self, value: &mut Value) -> Result<()> {
        let _ = value;
        Ok(())
    }
}

/// Effective settings for one encode or decode.
#[derive(Clone)]
pub struct SerializerSettings {
    /// Embed the qualified type name under `$type` when encoding documents.
    pub type_tagging: bool,
    /// Indent written JSON.
    pub pretty: bool,
    /// Converters applied in order on write, and in the same order on read.
    pub converters: Vec<Arc<dyn Converter>>,
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            type_tagging: true,
            pretty: false,
            converters: Vec::new(),
        }
    }
}

impl std::fmt::Debug for SerializerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerSettings")
            .field("type_tagging", &self.type_tagging)
            .field("pretty", &self.pretty)
            .field("converters", &self.converters.len())
            .finish()
    }
}

type SettingsMutation = Arc<dyn Fn(&mut SerializerSettings) + Send + Sync>;

/// Builds the reader used to parse a response body.
pub type ReaderFactory = Arc<dyn for<'a> Fn(&'a [u8]) -> Box<dyn Read + 'a> + Send + Sync>;

/// Builds the writer used to produce a request body.
pub type WriterFactory = Arc<dyn for<'a> Fn(&'a mut Vec<u8>) -> Box<dyn Write + 'a> + Send + Sync>;

/// Replacement byte reader/writer adapters.
#[derive(Clone)]
pub struct SerializationStrategy {
    reader: ReaderFactory,
    writer: WriterFactory,
}

impl SerializationStrategy {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: for<'a> Fn(&'a [u8]) -> Box<dyn Read + 'a> + Send + Sync + 'static,
        W: for<'a> Fn(&'a mut Vec<u8>) -> Box<dyn Write + 'a> + Send + Sync + 'static,
    {
        Self {
            reader: Arc::new(reader),
            writer: Arc::new(writer),
        }
    }
}

/// Removes its own settings override when dropped.
#[must_use = "the override is removed as soon as the guard is dropped"]
pub struct SettingsGuard<'a> {
    overrides: &'a Mutex<Vec<SettingsMutation>>,
    changes: SettingsMutation,
}

impl Drop for SettingsGuard<'_> {
    fn drop(&mut self) {
        let mut overrides = self.overrides.lock();
        if let Some(position) = overrides
            .iter()
            .rposition(|changes| Arc::ptr_eq(changes, &self.changes))
        {
            overrides.remove(position);
        }
    }
}

/// JSON codec with type tagging and caller customisation.
pub struct Codec {
    converters: RwLock<Vec<Arc<dyn Converter>>>,
    overrides: Mutex<Vec<SettingsMutation>>,
    strategy: Option<SerializationStrategy>,
}

impl Codec {
    pub fn new() -> Self {
        Self {
            converters: RwLock::new(Vec::new()),
            overrides: Mutex::new(Vec::new()),
            strategy: None,
        }
    }

    /// A codec whose byte I/O goes through `strategy`.
    pub fn with_strategy(strategy: SerializationStrategy) -> Self {
        Self {
            strategy: Some(strategy),
            ..Self::new()
        }
    }

    pub fn add_converter(&self, converter: impl Converter + 'static) {
        self.converters.write().push(Arc::new(converter));
    }

    pub fn clear_converters(&self) {
        self.converters.write().clear();
    }

    pub fn converter_count(&self) -> usize {
        self.converters.read().len()
    }

    /// Apply `changes` on top of the defaults until the guard is dropped.
    pub fn custom_settings<F>(&self, changes: F) -> SettingsGuard<'_>
    where
        F: Fn(&mut SerializerSettings) + Send + Sync + 'static,
    {
        let changes: SettingsMutation = Arc::new(changes);
        self.overrides.lock().push(Arc::clone(&changes));

        SettingsGuard {
            overrides: &self.overrides,
            changes,
        }
    }

    /// The settings the next encode or decode will use.
    pub fn settings(&self) -> SerializerSettings {
        let mut settings = SerializerSettings {
            converters: self.converters.read().clone(),
            ..SerializerSettings::default()
        };

        let changes = self.overrides.lock().last().cloned();
        if let Some(changes) = changes {
            changes(&mut settings);
        }
        settings
    }

    /// Encode any serializable value. No type tag is added.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let settings = self.settings();
        let value = serde_json::to_value(value)?;
        self.write(value, &settings)
    }

    /// Encode a document, tagged with its qualified type name unless the
    /// settings turn tagging off.
    pub fn encode_document<T: Document>(&self, document: &T) -> Result<Vec<u8>> {
        let settings = self.settings();
        let value = document_value(document, &settings)?;
        self.write(value, &settings)
    }

    /// Encode a bulk request body: `{"docs": [...]}`.
    pub fn encode_documents<T: Document>(&self, documents: &[T]) -> Result<Vec<u8>> {
        let settings = self.settings();
        let docs = documents
            .iter()
            .map(|document| document_value(document, &settings))
            .collect::<Result<Vec<_>>>()?;

        let mut body = Map::new();
        body.insert("docs".into(), Value::Array(docs));
        self.write(Value::Object(body), &settings)
    }

    /// Decode a response body. A root-level `$type` tag is accepted and ignored.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let settings = self.settings();
        let mut value = self.read(bytes, &settings)?;
        if let Value::Object(map) = &mut value {
            map.remove(TYPE_TAG);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Decode a tagged document into whichever registered type its tag names.
    pub fn decode_any(&self, bytes: &[u8]) -> Result<Box<dyn AnyDocument>> {
        self.decode_any_with(TypeRegistry::global(), bytes)
    }

    pub fn decode_any_with(
        &self,
        registry: &TypeRegistry,
        bytes: &[u8],
    ) -> Result<Box<dyn AnyDocument>> {
        let settings = self.settings();
        let value = self.read(bytes, &settings)?;
        registry.decode(value)
    }

    /// Copy a document through the codec, dropping its id, revision and
    /// attachments. Nested values, including nested documents, are kept.
    pub fn duplicate<T: Document>(&self, document: &T) -> Result<T> {
        let bytes = self.encode_document(document)?;
        let mut copy: T = self.decode(&bytes)?;
        let meta = document.meta().duplicate();
        *copy.meta_mut() = meta;
        Ok(copy)
    }

    fn write(&self, mut value: Value, settings: &SerializerSettings) -> Result<Vec<u8>> {
        for converter in &settings.converters {
            converter.write(&mut value)?;
        }

        let mut buffer = Vec::new();
        {
            let writer: Box<dyn Write + '_> = match &self.strategy {
                Some(strategy) => (strategy.writer)(&mut buffer),
                None => Box::new(&mut buffer),
            };
            if settings.pretty {
                serde_json::to_writer_pretty(writer, &value)?;
            } else {
                serde_json::to_writer(writer, &value)?;
            }
        }
        Ok(buffer)
    }

    fn read(&self, bytes: &[u8], settings: &SerializerSettings) -> Result<Value> {
        let reader: Box<dyn Read + '_> = match &self.strategy {
            Some(strategy) => (strategy.reader)(bytes),
            None => Box::new(bytes),
        };

        let mut value: Value = serde_json::from_reader(reader)?;
        for converter in &settings.converters {
            converter.read(&mut value)?;
        }
        Ok(value)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a document, putting `$type` first when tagging is on.
fn document_value<T: Document>(document: &T, settings: &SerializerSettings) -> Result<Value> {
    let value = serde_json::to_value(document)?;
    if !settings.type_tagging {
        return Ok(value);
    }

    match value {
        Value::Object(fields) => {
            let mut tagged = Map::with_capacity(fields.len() + 1);
            tagged.insert(TYPE_TAG.into(), Value::String(T::qualified_type_name().into()));
            for (key, field) in fields {
                if key != TYPE_TAG {
                    tagged.insert(key, field);
                }
            }
            Ok(Value::Object(tagged))
        }
        other => Ok(other),
    }
}
