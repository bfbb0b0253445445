//! Type bridge and method dispatch on [`Runtime`]

use super::class::{AdapterKind, MethodKind, RuntimeClass};
use super::{ClassId, ENUM_VALUES_FIELD, OBJECT};
use crate::heap::{HeapEntry, HostValue, NativeSlot};
use crate::runtime::Runtime;
use bytelink_sdk::{BridgeError, BridgeResult, Value, DEFAULT_CONSTRUCTOR_KEY};

// ============================================================================
// Reflection
// ============================================================================

impl Runtime {
    /// Class of a host heap value. Arrays report `java.lang.Object`.
    pub fn class_id_of(&self, value: Value) -> BridgeResult<ClassId> {
        match value {
            Value::Ref(r) => match self.heap.get(r) {
                Some(HeapEntry::Object(obj)) => Ok(obj.class),
                Some(HeapEntry::Array(_)) => Ok(OBJECT),
                None => Err(BridgeError::InvalidReference(format!("{:?}", r))),
            },
            Value::Null => Err(BridgeError::InvalidReference("null".to_string())),
            other => Err(BridgeError::type_mismatch("object", other.type_name())),
        }
    }

    /// Lazily built descriptor for a class
    pub fn runtime_class(&self, class: ClassId) -> BridgeResult<&RuntimeClass> {
        self.classes.runtime_class(class)
    }

    /// `getClass`: the memoized `java.lang.Class` mirror of the value's class
    pub fn get_class(&mut self, value: Value) -> BridgeResult<Value> {
        let class = self.class_id_of(value)?;
        self.class_mirror(class)
    }

    /// The memoized `java.lang.Class` mirror of a class
    pub fn class_mirror(&mut self, class: ClassId) -> BridgeResult<Value> {
        if let Some(mirror) = self.classes.class(class)?.mirror.get() {
            return Ok(Value::Ref(*mirror));
        }
        let mirror = self
            .heap
            .alloc_object_with(self.core.class, NativeSlot::Mirror(class));
        let _ = self.classes.class(class)?.mirror.set(mirror);
        Ok(Value::Ref(mirror))
    }

    /// The class a `java.lang.Class` mirror stands for
    pub fn mirrored_class(&self, mirror: Value) -> BridgeResult<ClassId> {
        let r = mirror.expect_object()?;
        match self.heap.object(r)?.native {
            NativeSlot::Mirror(class) => Ok(class),
            NativeSlot::MethodType(class) => Ok(class),
            _ => Err(BridgeError::type_mismatch("java.lang.Class", "object")),
        }
    }

    /// `instanceOf`: exact membership in the value's supported types. Null is
    /// never an instance.
    pub fn instance_of(&self, value: Value, candidate: ClassId) -> bool {
        if value.is_null() {
            return false;
        }
        match self.class_id_of(value) {
            Ok(class) => self
                .classes
                .runtime_class(class)
                .map(|rt| rt.supports(candidate))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Allocate an instance without running any initializer
    pub fn allocate(&mut self, class: ClassId) -> BridgeResult<Value> {
        self.classes.class(class)?;
        Ok(Value::Ref(self.heap.alloc_object(class)))
    }

    /// `newInstance`: allocate and run the zero-argument initializer
    pub fn new_instance(&mut self, class: ClassId) -> BridgeResult<Value> {
        let def = self.classes.class(class)?;
        if def.is_interface() || def.is_abstract() {
            return Err(BridgeError::Instantiation {
                class: def.name().to_string(),
                reason: "type is abstract".to_string(),
            });
        }
        let name = def.name().to_string();
        let init = self
            .classes
            .find_method(class, DEFAULT_CONSTRUCTOR_KEY, MethodKind::Instance)
            .ok_or_else(|| BridgeError::Instantiation {
                class: name,
                reason: "no zero-argument constructor".to_string(),
            })?;

        let instance = self.allocate(class)?;
        (init.body)(self, &[instance])?;
        Ok(instance)
    }

    /// `getEnumConstants`: the class's `$VALUES`, or `None` for non-enums
    pub fn enum_constants(&self, class: ClassId) -> BridgeResult<Option<Vec<Value>>> {
        let values = self.classes.class(class)?.static_field(ENUM_VALUES_FIELD);
        if values.is_null() {
            return Ok(None);
        }
        self.array_values(values).map(Some)
    }

    /// Wrap a host value as an instance of `target`.
    ///
    /// Interfaces get a memoized opaque adapter; concrete types are
    /// allocated directly.
    pub fn wrap(&mut self, target: ClassId, native: HostValue) -> BridgeResult<Value> {
        let class = if self.classes.class(target)?.is_interface() {
            self.classes.adapter_for(AdapterKind::Opaque, target)?
        } else {
            target
        };
        log::trace!("wrapping {} as class #{}", native.kind_name(), class);
        Ok(Value::Ref(
            self.heap.alloc_object_with(class, NativeSlot::Host(native)),
        ))
    }

    /// Host value behind an opaque wrapper
    pub fn host_value(&self, wrapper: Value) -> BridgeResult<&HostValue> {
        match &self.heap.object(wrapper.expect_object()?)?.native {
            NativeSlot::Host(value) => Ok(value),
            _ => Err(BridgeError::type_mismatch("opaque wrapper", "object")),
        }
    }

    /// Mutable host value behind an opaque wrapper
    pub fn host_value_mut(&mut self, wrapper: Value) -> BridgeResult<&mut HostValue> {
        match &mut self.heap.object_mut(wrapper.expect_object()?)?.native {
            NativeSlot::Host(value) => Ok(value),
            _ => Err(BridgeError::type_mismatch("opaque wrapper", "object")),
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

impl Runtime {
    /// Name of the first class in `class`'s ancestry that has a native
    /// import for `key`
    fn native_owner(&self, class: ClassId, key: &str) -> Option<String> {
        self.classes
            .ancestry(class)
            .into_iter()
            .filter_map(|cid| self.classes.get(cid))
            .map(|c| c.name())
            .find(|name| self.imports.contains(name, key))
            .map(|name| name.to_string())
    }

    /// Invoke a static method declared on `owner` (or inherited), falling
    /// back to the import table.
    pub fn invoke_static(&mut self, owner: ClassId, key: &str, args: &[Value]) -> BridgeResult<Value> {
        if let Some(method) = self.classes.find_method(owner, key, MethodKind::Static) {
            return (method.body)(self, args);
        }
        if let Some(native) = self.native_owner(owner, key) {
            return self.invoke_native(&native, key, args);
        }
        Err(BridgeError::MissingMethod {
            owner: self.classes.class(owner)?.name().to_string(),
            key: key.to_string(),
        })
    }

    /// Invoke an instance method resolved on the receiver's class.
    ///
    /// Resolution order is declared methods, native imports, then the
    /// lambda target if the receiver is a linked functional-interface
    /// instance.
    pub fn invoke_virtual(&mut self, receiver: Value, key: &str, args: &[Value]) -> BridgeResult<Value> {
        let class = self.class_id_of(receiver)?;
        self.invoke_on(class, receiver, key, args)
    }

    /// Invoke an instance method resolved starting at `owner` instead of the
    /// receiver's class
    pub fn invoke_special(
        &mut self,
        owner: ClassId,
        receiver: Value,
        key: &str,
        args: &[Value],
    ) -> BridgeResult<Value> {
        self.invoke_on(owner, receiver, key, args)
    }

    fn invoke_on(&mut self, class: ClassId, receiver: Value, key: &str, args: &[Value]) -> BridgeResult<Value> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver);
        full.extend_from_slice(args);

        if let Some(method) = self.classes.find_method(class, key, MethodKind::Instance) {
            return (method.body)(self, &full);
        }
        if let Some(native) = self.native_owner(class, key) {
            return self.invoke_native(&native, key, &full);
        }
        if let Value::Ref(r) = receiver {
            let target = match &self.heap.object(r)?.native {
                NativeSlot::Lambda(target) => Some(target.clone()),
                _ => None,
            };
            if let Some(target) = target {
                return target.invoke(self, args);
            }
        }
        Err(BridgeError::MissingMethod {
            owner: self.classes.class(class)?.name().to_string(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{ClassBuilder, ACC_ABSTRACT};
    use crate::{BridgeConfig, Runtime};
    use bytelink_sdk::{BridgeError, Value};

    fn runtime() -> Runtime {
        Runtime::new(BridgeConfig::default()).unwrap()
    }

    #[test]
    fn test_get_class_is_memoized() {
        let mut rt = runtime();
        let point = rt.define_class(ClassBuilder::new("demo.Point")).unwrap();
        let a = rt.allocate(point).unwrap();
        let b = rt.allocate(point).unwrap();

        let ca = rt.get_class(a).unwrap();
        let cb = rt.get_class(b).unwrap();
        assert_eq!(ca, cb);
        assert_eq!(rt.mirrored_class(ca).unwrap(), point);
    }

    #[test]
    fn test_instance_of_null_is_false() {
        let rt = runtime();
        assert!(!rt.instance_of(Value::Null, crate::types::OBJECT));
    }

    #[test]
    fn test_instance_of_follows_hierarchy() {
        let mut rt = runtime();
        let shape = rt.define_class(ClassBuilder::new("demo.Shape").interface()).unwrap();
        let base = rt.define_class(ClassBuilder::new("demo.Base").implements(shape)).unwrap();
        let circle = rt.define_class(ClassBuilder::new("demo.Circle").extends(base)).unwrap();
        let other = rt.define_class(ClassBuilder::new("demo.Other")).unwrap();

        let c = rt.allocate(circle).unwrap();
        assert!(rt.instance_of(c, circle));
        assert!(rt.instance_of(c, base));
        assert!(rt.instance_of(c, shape));
        assert!(rt.instance_of(c, crate::types::OBJECT));
        assert!(!rt.instance_of(c, other));
    }

    #[test]
    fn test_new_instance_runs_default_constructor() {
        let mut rt = runtime();
        let counter = rt
            .define_class(ClassBuilder::new("demo.Counter").method("V$$init$$$", |rt, args| {
                let this = args[0].expect_object()?;
                rt.heap_mut().set_field(this, "count", Value::Int(10))?;
                Ok(Value::Null)
            }))
            .unwrap();

        let instance = rt.new_instance(counter).unwrap();
        let r = instance.as_object().unwrap();
        assert_eq!(rt.heap().field(r, "count").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_new_instance_without_default_constructor_fails() {
        let mut rt = runtime();
        let needs_args = rt
            .define_class(ClassBuilder::new("demo.NeedsArgs").method("V$$init$$I", |_, _| Ok(Value::Null)))
            .unwrap();
        let abstract_class = rt
            .define_class(ClassBuilder::new("demo.Abstract").modifiers(ACC_ABSTRACT))
            .unwrap();

        assert!(matches!(rt.new_instance(needs_args), Err(BridgeError::Instantiation { .. })));
        assert!(matches!(rt.new_instance(abstract_class), Err(BridgeError::Instantiation { .. })));
    }

    #[test]
    fn test_enum_constants() {
        let mut rt = runtime();
        let plain = rt.define_class(ClassBuilder::new("demo.Plain")).unwrap();
        let color = rt.define_class(ClassBuilder::new("demo.Color")).unwrap();
        let red = rt.allocate(color).unwrap();
        let green = rt.allocate(color).unwrap();
        let values = rt.new_array(vec![red, green]).unwrap();
        rt.classes_mut()
            .get_mut(color)
            .unwrap()
            .set_static_field(crate::types::ENUM_VALUES_FIELD, values);

        assert_eq!(rt.enum_constants(plain).unwrap(), None);
        assert_eq!(rt.enum_constants(color).unwrap(), Some(vec![red, green]));
    }

    #[test]
    fn test_invoke_static_and_virtual() {
        let mut rt = runtime();
        let calc = rt
            .define_class(
                ClassBuilder::new("demo.Calc")
                    .static_method("I$twice$I", |_, args| Ok(Value::Int(args[0].expect_i32()? * 2)))
                    .method("I$offset$I", |rt, args| {
                        let this = args[0].expect_object()?;
                        let base = rt.heap().field(this, "base")?.expect_i32()?;
                        Ok(Value::Int(base + args[1].expect_i32()?))
                    }),
            )
            .unwrap();

        assert_eq!(rt.invoke_static(calc, "I$twice$I", &[Value::Int(4)]).unwrap(), Value::Int(8));

        let c = rt.allocate(calc).unwrap();
        rt.heap_mut().set_field(c.as_object().unwrap(), "base", Value::Int(100)).unwrap();
        assert_eq!(rt.invoke_virtual(c, "I$offset$I", &[Value::Int(5)]).unwrap(), Value::Int(105));

        assert!(matches!(
            rt.invoke_virtual(c, "I$missing$$", &[]),
            Err(BridgeError::MissingMethod { .. })
        ));
    }

    #[test]
    fn test_invoke_virtual_falls_back_to_imports() {
        let mut rt = runtime();
        let s = rt.guest_string("héllo").unwrap();
        assert_eq!(rt.invoke_virtual(s, "I$length$$", &[]).unwrap(), Value::Int(5));
    }
}
