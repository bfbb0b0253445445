//! Class definitions

use super::{ClassId, ACC_ABSTRACT, ACC_INTERFACE};
use crate::runtime::Runtime;
use bytelink_sdk::{BridgeResult, ObjRef, Value};
use once_cell::sync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

/// Body of a guest method. Instance methods receive the receiver as `args[0]`.
pub type GuestFn = Arc<dyn Fn(&mut Runtime, &[Value]) -> BridgeResult<Value> + Send + Sync>;

/// Static or instance dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// No receiver
    Static,
    /// Receiver passed first
    Instance,
}

/// A guest method
#[derive(Clone)]
pub struct Method {
    /// Dispatch shape
    pub kind: MethodKind,
    /// Implementation
    pub body: GuestFn,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method").field("kind", &self.kind).finish()
    }
}

/// What an adapter type adapts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Opaque host value behind an interface
    Opaque,
    /// Lambda implementing a functional interface
    Lambda,
}

impl AdapterKind {
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            AdapterKind::Opaque => "Opaque",
            AdapterKind::Lambda => "Lambda",
        }
    }
}

/// How a class came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOrigin {
    /// Registered by the embedder or the guest
    Declared,
    /// Registered by the bridge for an interface
    Adapter(AdapterKind),
}

/// Runtime class descriptor
#[derive(Debug, Clone)]
pub struct RuntimeClass {
    owner: ClassId,
    supported: FxHashSet<ClassId>,
}

impl RuntimeClass {
    pub(crate) fn new(owner: ClassId, supported: FxHashSet<ClassId>) -> Self {
        Self { owner, supported }
    }

    /// Class this descriptor belongs to
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// Exact membership test used by `instanceOf`
    pub fn supports(&self, candidate: ClassId) -> bool {
        self.supported.contains(&candidate)
    }

    /// All supported types, in no particular order
    pub fn supported_types(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.supported.iter().copied()
    }
}

/// A registered guest type
pub struct ClassDef {
    id: ClassId,
    name: String,
    modifiers: u16,
    superclass: Option<ClassId>,
    interfaces: Vec<ClassId>,
    methods: FxHashMap<String, Method>,
    statics: FxHashMap<String, Value>,
    origin: ClassOrigin,
    pub(crate) runtime: OnceCell<RuntimeClass>,
    pub(crate) mirror: OnceCell<ObjRef>,
}

impl ClassDef {
    /// Class ID
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully qualified dotted name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access modifier bits
    pub fn modifiers(&self) -> u16 {
        self.modifiers
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    /// Origin
    pub fn origin(&self) -> ClassOrigin {
        self.origin
    }

    /// Check the interface modifier
    pub fn is_interface(&self) -> bool {
        self.modifiers & ACC_INTERFACE != 0
    }

    /// Check the abstract modifier
    pub fn is_abstract(&self) -> bool {
        self.modifiers & ACC_ABSTRACT != 0
    }

    /// Declared method by signature key
    pub fn method(&self, key: &str) -> Option<&Method> {
        self.methods.get(key)
    }

    /// Declared method keys
    pub fn method_keys(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|k| k.as_str())
    }

    /// Read a static field (null when unset)
    pub fn static_field(&self, name: &str) -> Value {
        self.statics.get(name).copied().unwrap_or(Value::Null)
    }

    /// Write a static field
    pub fn set_static_field(&mut self, name: &str, value: Value) {
        self.statics.insert(name.to_string(), value);
    }

    /// Whether the lazy descriptor has been built yet
    pub fn has_runtime_class(&self) -> bool {
        self.runtime.get().is_some()
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("modifiers", &self.modifiers)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("methods", &self.methods.len())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Builder for [`ClassDef`]
pub struct ClassBuilder {
    name: String,
    modifiers: u16,
    superclass: Option<ClassId>,
    interfaces: Vec<ClassId>,
    methods: FxHashMap<String, Method>,
    statics: FxHashMap<String, Value>,
    origin: ClassOrigin,
}

impl ClassBuilder {
    /// Start a class with the given dotted name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: 0,
            superclass: None,
            interfaces: Vec::new(),
            methods: FxHashMap::default(),
            statics: FxHashMap::default(),
            origin: ClassOrigin::Declared,
        }
    }

    /// Set modifier bits
    pub fn modifiers(mut self, modifiers: u16) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Mark as an interface
    pub fn interface(self) -> Self {
        self.modifiers(ACC_INTERFACE | ACC_ABSTRACT)
    }

    /// Set the superclass (defaults to `java.lang.Object`)
    pub fn extends(mut self, superclass: ClassId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: ClassId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add an instance method
    pub fn method(
        mut self,
        key: impl Into<String>,
        body: impl Fn(&mut Runtime, &[Value]) -> BridgeResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(
            key.into(),
            Method {
                kind: MethodKind::Instance,
                body: Arc::new(body),
            },
        );
        self
    }

    /// Add a static method
    pub fn static_method(
        mut self,
        key: impl Into<String>,
        body: impl Fn(&mut Runtime, &[Value]) -> BridgeResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(
            key.into(),
            Method {
                kind: MethodKind::Static,
                body: Arc::new(body),
            },
        );
        self
    }

    /// Set an initial static field value
    pub fn static_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.statics.insert(name.into(), value);
        self
    }

    pub(crate) fn origin(mut self, origin: ClassOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(self, id: ClassId, default_super: Option<ClassId>) -> ClassDef {
        let superclass = if self.modifiers & ACC_INTERFACE != 0 {
            self.superclass
        } else {
            self.superclass.or(default_super)
        };
        ClassDef {
            id,
            name: self.name,
            modifiers: self.modifiers,
            superclass,
            interfaces: self.interfaces,
            methods: self.methods,
            statics: self.statics,
            origin: self.origin,
            runtime: OnceCell::new(),
            mirror: OnceCell::new(),
        }
    }
}
