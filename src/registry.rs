//! Conversion registry.
//!
//! Maps [`TypeName`]s to a pair of builder prototypes, one per conversion
//! direction. Either side may be [`Converter::Unsupported`], which keeps the
//! type resolvable in member signatures while making any actual conversion
//! in that direction fail loudly.
//!
//! # Access discipline
//!
//! The registry is mutated during a setup phase and read during steady
//! state. The owning context wraps it in an `RwLock`; registering while
//! calls are in flight is unsupported and the caller must synchronize.

use std::sync::Arc;

use metabridge_core::TypeName;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::builders::{ArgBuilder, ObjectBuilder, ValueBuilder, VoidBuilder};
use crate::convert::{Marshal, RawPointer};
use crate::error::{BridgeError, BridgeResult, Direction};

/// One side of a conversion entry.
#[derive(Clone)]
pub enum Converter {
    /// Prototype cloned for every conversion
    Supported(Arc<dyn ArgBuilder>),
    /// Type is known but cannot be converted in this direction
    Unsupported,
}

impl Converter {
    pub fn supported(builder: impl ArgBuilder + 'static) -> Self {
        Converter::Supported(Arc::new(builder))
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Converter::Supported(_))
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Converter::Supported(b) => write!(f, "Supported({})", b.type_name()),
            Converter::Unsupported => write!(f, "Unsupported"),
        }
    }
}

/// Builder prototypes registered for one type name.
#[derive(Debug, Clone)]
pub struct ConversionEntry {
    /// Script value to native slot
    pub to_native: Converter,
    /// Native slot to script value
    pub to_script: Converter,
}

/// Conversion support of one registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSupport {
    pub type_name: TypeName,
    pub native_to_script: bool,
    pub script_to_native: bool,
}

/// Registry of per-type converters.
#[derive(Debug, Default)]
pub struct ConversionRegistry {
    entries: FxHashMap<TypeName, ConversionEntry>,
}

impl ConversionRegistry {
    /// Create an empty registry, without even the structural entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the builtin types.
    ///
    /// | type      | script → native | native → script |
    /// |-----------|-----------------|-----------------|
    /// | `int`     | yes             | yes             |
    /// | `float`   | yes             | yes             |
    /// | `double`  | yes             | yes             |
    /// | `string`  | yes             | yes             |
    /// | `object`  | yes             | yes             |
    /// | `pointer` | yes             | no              |
    /// | `void`    | no              | yes (none)      |
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_value::<i32>(false);
        registry.register_value::<f32>(false);
        registry.register_value::<f64>(false);
        registry.register_value::<String>(false);
        registry.register(
            TypeName::OBJECT,
            Converter::supported(ObjectBuilder::new()),
            Converter::supported(ObjectBuilder::new()),
            false,
        );
        registry.register(
            TypeName::POINTER,
            Converter::supported(ValueBuilder::<RawPointer>::new()),
            Converter::Unsupported,
            false,
        );
        registry.register(
            TypeName::VOID,
            Converter::Unsupported,
            Converter::supported(VoidBuilder),
            false,
        );
        registry
    }

    /// Register converters for `type_name`.
    ///
    /// Returns `false` without touching the existing entry if the name is
    /// already registered and `overwrite` is not set.
    pub fn register(
        &mut self,
        type_name: TypeName,
        to_native: Converter,
        to_script: Converter,
        overwrite: bool,
    ) -> bool {
        if !overwrite && self.entries.contains_key(&type_name) {
            warn!(target: "metabridge::registry", %type_name, "type already registered");
            return false;
        }
        debug!(
            target: "metabridge::registry",
            %type_name,
            to_native = to_native.is_supported(),
            to_script = to_script.is_supported(),
            "registering type"
        );
        self.entries.insert(
            type_name,
            ConversionEntry {
                to_native,
                to_script,
            },
        );
        true
    }

    /// Register both directions for a [`Marshal`] type under its own name.
    pub fn register_value<T: Marshal>(&mut self, overwrite: bool) -> bool {
        self.register(
            T::TYPE_NAME,
            Converter::supported(ValueBuilder::<T>::new()),
            Converter::supported(ValueBuilder::<T>::new()),
            overwrite,
        )
    }

    pub fn lookup(&self, type_name: &str) -> Option<&ConversionEntry> {
        self.entries.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Remove an entry. `void` and `object` are structurally required and
    /// cannot be removed.
    pub fn unregister(&mut self, type_name: &str) -> bool {
        if type_name == TypeName::VOID.as_str() || type_name == TypeName::OBJECT.as_str() {
            warn!(target: "metabridge::registry", type_name, "refusing to remove required type");
            return false;
        }
        let removed = self.entries.remove(type_name).is_some();
        if removed {
            debug!(target: "metabridge::registry", type_name, "unregistered type");
        }
        removed
    }

    /// Conversion support of every registered type, sorted by name.
    pub fn registered_types(&self) -> Vec<TypeSupport> {
        let mut types: Vec<_> = self
            .entries
            .iter()
            .map(|(name, entry)| Self::support(name, entry))
            .collect();
        types.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        types
    }

    pub fn type_support(&self, type_name: &str) -> Option<TypeSupport> {
        self.entries
            .get_key_value(type_name)
            .map(|(name, entry)| Self::support(name, entry))
    }

    /// Fresh builder converting script values into `type_name` slots.
    pub fn native_builder(&self, type_name: &TypeName) -> BridgeResult<Box<dyn ArgBuilder>> {
        self.builder(type_name, Direction::ScriptToNative)
    }

    /// Fresh builder converting `type_name` slots into script values.
    pub fn script_builder(&self, type_name: &TypeName) -> BridgeResult<Box<dyn ArgBuilder>> {
        self.builder(type_name, Direction::NativeToScript)
    }

    fn builder(
        &self,
        type_name: &TypeName,
        direction: Direction,
    ) -> BridgeResult<Box<dyn ArgBuilder>> {
        let converter = self.entries.get(type_name).map(|entry| match direction {
            Direction::ScriptToNative => &entry.to_native,
            Direction::NativeToScript => &entry.to_script,
        });
        match converter {
            Some(Converter::Supported(prototype)) => Ok(prototype.clone_builder()),
            _ => Err(BridgeError::UnknownType {
                type_name: type_name.clone(),
                direction,
            }),
        }
    }

    fn support(name: &TypeName, entry: &ConversionEntry) -> TypeSupport {
        TypeSupport {
            type_name: name.clone(),
            native_to_script: entry.to_script.is_supported(),
            script_to_native: entry.to_native.is_supported(),
        }
    }
}
