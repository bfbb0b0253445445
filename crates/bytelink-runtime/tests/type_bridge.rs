//! Integration tests for the type bridge and native resolution

use bytelink_runtime::heap::HostValue;
use bytelink_runtime::types::OBJECT;
use bytelink_runtime::{BridgeConfig, BridgeError, ClassBuilder, ImportTable, Runtime, Signature, TypeCode, Value};

fn runtime() -> Runtime {
    Runtime::new(BridgeConfig::default()).unwrap()
}

#[test]
fn test_wrap_supports_target_only() {
    let mut rt = runtime();
    let target = rt
        .define_class(ClassBuilder::new("demo.Canvas").interface())
        .unwrap();
    let unrelated = rt
        .define_class(ClassBuilder::new("demo.Audio").interface())
        .unwrap();

    let wrapped = rt.wrap(target, HostValue::IntArray(vec![1, 2, 3])).unwrap();
    assert!(rt.instance_of(wrapped, target));
    assert!(rt.instance_of(wrapped, OBJECT));
    assert!(!rt.instance_of(wrapped, unrelated));
    assert!(!rt.instance_of(Value::Null, target));
    assert_eq!(rt.host_value(wrapped).unwrap(), &HostValue::IntArray(vec![1, 2, 3]));

    let again = rt.wrap(target, HostValue::Window).unwrap();
    assert_ne!(wrapped, again);
    assert_eq!(rt.class_id_of(wrapped).unwrap(), rt.class_id_of(again).unwrap());
}

#[test]
fn test_wrap_concrete_type_directly() {
    let mut rt = runtime();
    let concrete = rt.define_class(ClassBuilder::new("demo.Blob")).unwrap();
    let wrapped = rt.wrap(concrete, HostValue::Document).unwrap();
    assert_eq!(rt.class_id_of(wrapped).unwrap(), concrete);
}

#[test]
fn test_character_digit_scenario() {
    let mut rt = runtime();
    let digit = |rt: &mut Runtime, c: char, radix: i32| {
        rt.call_native(
            "java.lang.Character",
            "I$digit$C$I",
            &[Value::from_char(c), Value::Int(radix)],
        )
        .unwrap()
    };
    assert_eq!(digit(&mut rt, 'F', 16), Value::Int(15));
    assert_eq!(digit(&mut rt, 'G', 16), Value::Int(-1));
}

#[test]
fn test_signature_keys_resolve() {
    let rt = runtime();
    let parse_int = Signature::new(
        "parseInt",
        TypeCode::Int,
        vec![TypeCode::string(), TypeCode::Int],
    );
    assert_eq!(parse_int.key(), "I$parseInt$Ljava$lang$String$$I");
    assert!(rt.imports().contains("java.lang.Integer", &parse_int.key()));

    let to_char_array = Signature::new("toCharArray", TypeCode::array(TypeCode::Char), vec![]);
    assert_eq!(to_char_array.key(), "$C$toCharArray$$");
    assert!(rt.imports().contains("java.lang.String", &to_char_array.key()));
}

#[test]
fn test_unresolved_native_is_fatal() {
    let mut rt = runtime();
    assert_eq!(
        rt.call_native("java.lang.Math", "D$tan$D", &[Value::Double(1.0)]),
        Err(BridgeError::unresolved("java.lang.Math", "D$tan$D"))
    );
    assert!(matches!(
        rt.call_native("java.lang.Thread", "V$yield$$", &[]),
        Err(BridgeError::UnresolvedNativeMethod { .. })
    ));
}

#[test]
fn test_inherited_native_dispatch() {
    let mut rt = runtime();
    let point = rt.define_class(ClassBuilder::new("demo.Point")).unwrap();
    let instance = rt.allocate(point).unwrap();

    // getClass is bound on java.lang.Object and found through the ancestry
    let mirror = rt
        .invoke_virtual(instance, "Ljava$lang$Class$$getClass$$", &[])
        .unwrap();
    assert_eq!(rt.mirrored_class(mirror).unwrap(), point);
    assert_eq!(rt.get_class(instance).unwrap(), mirror);
}

#[test]
fn test_custom_import_table() {
    let mut builder = ImportTable::builder();
    builder.register_static("demo.Clock", "J$now$$", |_, _| Ok(Value::Long(42)));
    let mut rt = Runtime::builder(BridgeConfig::default())
        .imports(std::sync::Arc::new(builder.build()))
        .build()
        .unwrap();

    assert_eq!(rt.call_native("demo.Clock", "J$now$$", &[]).unwrap(), Value::Long(42));
    assert!(rt.call_native("java.lang.Math", "I$max$I$I", &[Value::Int(1), Value::Int(2)]).is_err());
}

#[test]
fn test_abstract_types_cannot_be_instantiated() {
    let mut rt = runtime();
    let shape = rt
        .define_class(ClassBuilder::new("demo.Shape").interface())
        .unwrap();
    assert!(matches!(
        rt.new_instance(shape),
        Err(BridgeError::Instantiation { .. })
    ));
}
