//! Reflection natives: `getClass`, `java.lang.Class` accessors and
//! reflective array creation

use super::{arg, int_arg, ImportTableBuilder};
use crate::runtime::Runtime;
use crate::types::ENUM_VALUES_FIELD;
use bytelink_sdk::{BridgeError, BridgeResult, Value};

/// Register reflection natives
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    builder.register_instance("java.lang.Object", "Ljava$lang$Class$$getClass$$", |rt, args| {
        rt.get_class(arg(args, 0)?)
    });

    let class = "java.lang.Class";
    builder
        .register_instance(class, "Ljava$lang$ClassLoader$$getClassLoader$$", |_, _| Ok(Value::Null))
        .register_instance(class, "Ljava$lang$ClassLoader$$getClassLoader0$$", |_, _| Ok(Value::Null))
        .register_instance(class, "Z$desiredAssertionStatus$$", |_, _| Ok(Value::from_bool(false)))
        .register_instance(class, "Ljava$lang$Object$$newInstance$$", class_new_instance)
        .register_instance(class, "$Ljava$lang$Object$$getEnumConstants$$", class_enum_constants)
        .register_instance(class, "Ljava$lang$String$$getName$$", class_name);
    builder.register_static(
        class,
        "Ljava$lang$Class$$forName$Ljava$lang$String$$Z$Ljava$lang$ClassLoader$",
        class_for_name,
    );

    builder.register_static(
        "java.lang.reflect.Array",
        "Ljava$lang$Object$$newArray$Ljava$lang$Class$$I",
        |rt, args| {
            let length = int_arg(args, 1)?;
            let length = usize::try_from(length)
                .map_err(|_| BridgeError::ArgumentError(format!("negative array length {}", length)))?;
            rt.new_array(vec![Value::Null; length])
        },
    );
}

fn class_new_instance(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let class = rt.mirrored_class(arg(args, 0)?)?;
    rt.new_instance(class).map_err(|e| {
        log::error!("newInstance failed: {}", e);
        e
    })
}

fn class_enum_constants(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let class = rt.mirrored_class(arg(args, 0)?)?;
    Ok(rt.classes().class(class)?.static_field(ENUM_VALUES_FIELD))
}

fn class_name(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let class = rt.mirrored_class(arg(args, 0)?)?;
    let name = rt.classes().class(class)?.name().to_string();
    rt.guest_string(&name)
}

fn class_for_name(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let name = rt.host_string(arg(args, 0)?)?;
    Err(BridgeError::UnsupportedOperation(format!(
        "reflective class loading of {}",
        name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassBuilder, ACC_ENUM};
    use crate::BridgeConfig;
    use bytelink_sdk::DEFAULT_CONSTRUCTOR_KEY;

    fn runtime() -> Runtime {
        Runtime::new(BridgeConfig::default()).unwrap()
    }

    #[test]
    fn test_get_class_and_name() {
        let mut rt = runtime();
        let point = rt.define_class(ClassBuilder::new("demo.Point")).unwrap();
        let instance = rt.allocate(point).unwrap();

        let mirror = rt
            .call_native("java.lang.Object", "Ljava$lang$Class$$getClass$$", &[instance])
            .unwrap();
        assert_eq!(rt.mirrored_class(mirror).unwrap(), point);

        let name = rt
            .call_native("java.lang.Class", "Ljava$lang$String$$getName$$", &[mirror])
            .unwrap();
        assert_eq!(rt.host_string(name).unwrap(), "demo.Point");

        for key in [
            "Ljava$lang$ClassLoader$$getClassLoader$$",
            "Ljava$lang$ClassLoader$$getClassLoader0$$",
        ] {
            assert_eq!(rt.call_native("java.lang.Class", key, &[mirror]).unwrap(), Value::Null);
        }
        assert_eq!(
            rt.call_native("java.lang.Class", "Z$desiredAssertionStatus$$", &[mirror])
                .unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn test_new_instance_through_mirror() {
        let mut rt = runtime();
        let counter = rt
            .define_class(ClassBuilder::new("demo.Counter").method(
                DEFAULT_CONSTRUCTOR_KEY,
                |rt: &mut Runtime, args: &[Value]| {
                    let this = args[0].expect_object()?;
                    rt.heap_mut().set_field(this, "count", Value::Int(10))?;
                    Ok(Value::Null)
                },
            ))
            .unwrap();
        let mirror = rt.class_mirror(counter).unwrap();

        let instance = rt
            .call_native("java.lang.Class", "Ljava$lang$Object$$newInstance$$", &[mirror])
            .unwrap();
        let r = instance.expect_object().unwrap();
        assert_eq!(rt.heap().field(r, "count").unwrap(), Value::Int(10));

        let bare = rt.define_class(ClassBuilder::new("demo.Bare")).unwrap();
        let bare_mirror = rt.class_mirror(bare).unwrap();
        assert!(matches!(
            rt.call_native("java.lang.Class", "Ljava$lang$Object$$newInstance$$", &[bare_mirror]),
            Err(BridgeError::Instantiation { .. })
        ));
    }

    #[test]
    fn test_enum_constants() {
        let mut rt = runtime();
        let values = rt.new_array(vec![Value::Int(1), Value::Int(2)]).unwrap();
        let color = rt
            .define_class(
                ClassBuilder::new("demo.Color")
                    .modifiers(ACC_ENUM)
                    .static_field(ENUM_VALUES_FIELD, values),
            )
            .unwrap();
        let plain = rt.define_class(ClassBuilder::new("demo.Plain")).unwrap();

        let key = "$Ljava$lang$Object$$getEnumConstants$$";
        let mirror = rt.class_mirror(color).unwrap();
        assert_eq!(rt.call_native("java.lang.Class", key, &[mirror]).unwrap(), values);
        let plain_mirror = rt.class_mirror(plain).unwrap();
        assert_eq!(rt.call_native("java.lang.Class", key, &[plain_mirror]).unwrap(), Value::Null);
    }

    #[test]
    fn test_for_name_is_unsupported() {
        let mut rt = runtime();
        let name = rt.guest_string("demo.Anything").unwrap();
        let result = rt.call_native(
            "java.lang.Class",
            "Ljava$lang$Class$$forName$Ljava$lang$String$$Z$Ljava$lang$ClassLoader$",
            &[name, Value::Int(1), Value::Null],
        );
        assert!(matches!(result, Err(BridgeError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_reflective_new_array() {
        let mut rt = runtime();
        let key = "Ljava$lang$Object$$newArray$Ljava$lang$Class$$I";
        let mirror = rt.class_mirror(rt.core().string).unwrap();

        let array = rt
            .call_native("java.lang.reflect.Array", key, &[mirror, Value::Int(3)])
            .unwrap();
        assert_eq!(rt.array_values(array).unwrap(), vec![Value::Null; 3]);
        assert!(matches!(
            rt.call_native("java.lang.reflect.Array", key, &[mirror, Value::Int(-1)]),
            Err(BridgeError::ArgumentError(_))
        ));
    }
}
