//! Class registry for runtime class metadata

use super::class::{AdapterKind, ClassBuilder, ClassDef, ClassOrigin, Method, MethodKind, RuntimeClass};
use super::ClassId;
use bytelink_sdk::{BridgeError, BridgeResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// ID of `java.lang.Object`, always registered first
pub const OBJECT: ClassId = 0;

/// Class registry for the bridge
#[derive(Debug)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<ClassDef>,
    /// Class name to ID mapping
    name_to_id: FxHashMap<String, ClassId>,
    /// Memoized adapter types
    adapters: FxHashMap<(AdapterKind, ClassId), ClassId>,
}

impl ClassRegistry {
    /// Create a registry containing only `java.lang.Object`
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            name_to_id: FxHashMap::default(),
            adapters: FxHashMap::default(),
        };
        let object = ClassBuilder::new("java.lang.Object").build(OBJECT, None);
        registry.name_to_id.insert(object.name().to_string(), OBJECT);
        registry.classes.push(object);
        registry
    }

    /// Register a new class
    pub fn register(&mut self, builder: ClassBuilder) -> BridgeResult<ClassId> {
        if self.name_to_id.contains_key(builder.name()) {
            return Err(BridgeError::ArgumentError(format!(
                "class {} is already registered",
                builder.name()
            )));
        }

        let id = self.classes.len();
        let class = builder.build(id, Some(OBJECT));
        if let Some(sup) = class.superclass() {
            self.class(sup)?;
        }
        for iface in class.interfaces() {
            self.class(*iface)?;
        }

        log::trace!("registered class {} as {}", class.name(), id);
        self.name_to_id.insert(class.name().to_string(), id);
        self.classes.push(class);
        Ok(id)
    }

    /// Get class by ID
    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id)
    }

    /// Get mutable class by ID
    pub fn get_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.classes.get_mut(id)
    }

    /// Get class by ID or fail
    pub fn class(&self, id: ClassId) -> BridgeResult<&ClassDef> {
        self.classes
            .get(id)
            .ok_or_else(|| BridgeError::InvalidReference(format!("class #{}", id)))
    }

    /// Look up a class ID by name
    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.name_to_id.get(name).copied()
    }

    /// Look up a class ID by name or fail
    pub fn lookup(&self, name: &str) -> BridgeResult<ClassId> {
        self.by_name(name)
            .ok_or_else(|| BridgeError::InvalidReference(format!("unknown class {}", name)))
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over all classes with their IDs
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> {
        self.classes.iter().enumerate()
    }

    /// The class, its superclass chain, then every interface reachable from
    /// any of them, without duplicates.
    pub fn ancestry(&self, id: ClassId) -> Vec<ClassId> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();

        let mut current = Some(id);
        while let Some(cid) = current {
            if !seen.insert(cid) {
                break;
            }
            order.push(cid);
            current = self.classes.get(cid).and_then(|c| c.superclass());
        }

        let mut queue: VecDeque<ClassId> = order
            .iter()
            .filter_map(|cid| self.classes.get(*cid))
            .flat_map(|c| c.interfaces().iter().copied())
            .collect();
        while let Some(iface) = queue.pop_front() {
            if !seen.insert(iface) {
                continue;
            }
            order.push(iface);
            if let Some(c) = self.classes.get(iface) {
                queue.extend(c.interfaces().iter().copied());
            }
        }

        order
    }

    /// Get the lazily built descriptor for a class
    pub fn runtime_class(&self, id: ClassId) -> BridgeResult<&RuntimeClass> {
        let class = self.class(id)?;
        Ok(class.runtime.get_or_init(|| {
            let mut supported: FxHashSet<ClassId> = self.ancestry(id).into_iter().collect();
            supported.insert(OBJECT);
            log::trace!("built runtime class for {}", class.name());
            RuntimeClass::new(id, supported)
        }))
    }

    /// Resolve a method by key along the class's ancestry
    pub fn find_method(&self, id: ClassId, key: &str, kind: MethodKind) -> Option<Method> {
        self.ancestry(id)
            .into_iter()
            .filter_map(|cid| self.classes.get(cid))
            .filter_map(|c| c.method(key))
            .find(|m| m.kind == kind)
            .cloned()
    }

    /// Get or register the adapter type for `(kind, target)`.
    ///
    /// The adapter extends `java.lang.Object` and implements `target`, so its
    /// descriptor supports exactly the adapter, `Object` and the target's own
    /// ancestry.
    pub fn adapter_for(&mut self, kind: AdapterKind, target: ClassId) -> BridgeResult<ClassId> {
        if let Some(id) = self.adapters.get(&(kind, target)) {
            return Ok(*id);
        }

        let target_class = self.class(target)?;
        if !target_class.is_interface() {
            return Err(BridgeError::ArgumentError(format!(
                "{} is not an interface",
                target_class.name()
            )));
        }
        let name = format!("{}${}", target_class.name(), kind.suffix());

        let id = self.register(
            ClassBuilder::new(name)
                .extends(OBJECT)
                .implements(target)
                .origin(ClassOrigin::Adapter(kind)),
        )?;
        self.adapters.insert((kind, target), id);
        log::debug!("registered {:?} adapter #{} for class #{}", kind, id, target);
        Ok(id)
    }

    /// Number of adapter types registered so far
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
