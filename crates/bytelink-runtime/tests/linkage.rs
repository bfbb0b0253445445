//! Integration tests for call-site linkage
//!
//! Covers every invocation kind, per-site memoization and the rejection of
//! unknown kinds.

use bytelink_runtime::linker::SiteState;
use bytelink_runtime::{
    BridgeConfig, BridgeError, ClassBuilder, ClassId, InvocationKind, LinkRequest, MethodHandleDescriptor,
    Runtime, SiteId, Value,
};

fn runtime() -> Runtime {
    Runtime::new(BridgeConfig::default()).unwrap()
}

fn interface(rt: &mut Runtime, name: &str) -> ClassId {
    rt.define_class(ClassBuilder::new(name).interface()).unwrap()
}

fn request(interface: ClassId, owner: ClassId, method: &str, kind: InvocationKind, linking: Vec<Value>) -> LinkRequest {
    LinkRequest {
        interface,
        handle: MethodHandleDescriptor::new(owner, method, kind),
        linking_args: linking,
    }
}

#[test]
fn test_static_add_with_capture() {
    let mut rt = runtime();
    let ops = rt
        .define_class(ClassBuilder::new("demo.Ops").static_method("I$add$I$I", |_, args| {
            Ok(Value::Int(args[0].expect_i32()? + args[1].expect_i32()?))
        }))
        .unwrap();
    let operator = interface(&mut rt, "demo.IntBinaryOperator");

    let site = SiteId(1);
    assert_eq!(rt.linker().state(site), SiteState::Unlinked);
    let call_site = rt
        .link(site, request(operator, ops, "I$add$I$I", InvocationKind::Static, vec![]))
        .unwrap();
    assert_eq!(rt.linker().state(site), SiteState::Linked);

    assert_eq!(call_site.invoke(&mut rt, &[Value::Int(3), Value::Int(4)]).unwrap(), Value::Int(7));
    assert_eq!(call_site.invoke(&mut rt, &[Value::Int(-1), Value::Int(1)]).unwrap(), Value::Int(0));
    assert!(rt.instance_of(call_site.instance(), operator));
}

#[test]
fn test_linking_args_come_first() {
    let mut rt = runtime();
    let ops = rt
        .define_class(ClassBuilder::new("demo.Ops").static_method("I$sub$I$I", |_, args| {
            Ok(Value::Int(args[0].expect_i32()? - args[1].expect_i32()?))
        }))
        .unwrap();
    let unary = interface(&mut rt, "demo.IntUnaryOperator");

    let call_site = rt
        .link(
            SiteId(2),
            request(unary, ops, "I$sub$I$I", InvocationKind::Static, vec![Value::Int(100)]),
        )
        .unwrap();
    assert_eq!(call_site.linking_args(), &[Value::Int(100)]);
    assert_eq!(call_site.invoke(&mut rt, &[Value::Int(1)]).unwrap(), Value::Int(99));
}

#[test]
fn test_virtual_and_interface_dispatch_on_receiver() {
    let mut rt = runtime();
    let shape = interface(&mut rt, "demo.Shape");
    let square = rt
        .define_class(
            ClassBuilder::new("demo.Square")
                .implements(shape)
                .method("I$area$$", |rt, args| {
                    let side = rt.heap().field(args[0].expect_object()?, "side")?;
                    Ok(Value::Int(side.expect_i32()? * side.expect_i32()?))
                }),
        )
        .unwrap();
    let supplier = interface(&mut rt, "demo.IntSupplier");
    let to_int = interface(&mut rt, "demo.ToIntFunction");

    let instance = rt.allocate(square).unwrap();
    rt.heap_mut()
        .set_field(instance.expect_object().unwrap(), "side", Value::Int(6))
        .unwrap();

    // Bound receiver: `sq::area`
    let bound = rt
        .link(
            SiteId(3),
            request(supplier, square, "I$area$$", InvocationKind::Virtual, vec![instance]),
        )
        .unwrap();
    assert_eq!(bound.invoke(&mut rt, &[]).unwrap(), Value::Int(36));

    // Unbound receiver: `Shape::area`
    let unbound = rt
        .link(SiteId(4), request(to_int, shape, "I$area$$", InvocationKind::Interface, vec![]))
        .unwrap();
    assert_eq!(unbound.invoke(&mut rt, &[instance]).unwrap(), Value::Int(36));

    assert!(matches!(
        unbound.invoke(&mut rt, &[]),
        Err(BridgeError::ArgumentError(_))
    ));
}

#[test]
fn test_constructor_sites_return_fresh_instances() {
    let mut rt = runtime();
    let point = rt
        .define_class(ClassBuilder::new("demo.Point").method("V$$init$$I", |rt, args| {
            rt.heap_mut().set_field(args[0].expect_object()?, "x", args[1])?;
            Ok(Value::Null)
        }))
        .unwrap();
    let factory = interface(&mut rt, "demo.IntFunction");

    let call_site = rt
        .link(
            SiteId(5),
            request(factory, point, "V$$init$$I", InvocationKind::Constructor, vec![]),
        )
        .unwrap();
    let a = call_site.invoke(&mut rt, &[Value::Int(1)]).unwrap();
    let b = call_site.invoke(&mut rt, &[Value::Int(2)]).unwrap();

    assert_ne!(a, b);
    assert!(rt.instance_of(a, point));
    assert_eq!(rt.heap().field(a.expect_object().unwrap(), "x").unwrap(), Value::Int(1));
    assert_eq!(rt.heap().field(b.expect_object().unwrap(), "x").unwrap(), Value::Int(2));
}

#[test]
fn test_special_resolves_on_receiver() {
    let mut rt = runtime();
    let greeter = rt
        .define_class(ClassBuilder::new("demo.Greeter").method("I$code$$", |_, _| Ok(Value::Int(11))))
        .unwrap();
    let supplier = interface(&mut rt, "demo.IntSupplier");
    let instance = rt.allocate(greeter).unwrap();

    let call_site = rt
        .link(
            SiteId(6),
            request(supplier, greeter, "I$code$$", InvocationKind::Special, vec![instance]),
        )
        .unwrap();
    assert_eq!(call_site.invoke(&mut rt, &[]).unwrap(), Value::Int(11));
}

#[test]
fn test_sites_link_once() {
    let mut rt = runtime();
    let ops = rt
        .define_class(ClassBuilder::new("demo.Ops").static_method("I$one$$", |_, _| Ok(Value::Int(1))))
        .unwrap();
    let supplier = interface(&mut rt, "demo.IntSupplier");

    let first = rt
        .link(SiteId(7), request(supplier, ops, "I$one$$", InvocationKind::Static, vec![]))
        .unwrap();
    let again = rt
        .link(SiteId(7), request(supplier, ops, "I$one$$", InvocationKind::Static, vec![Value::Int(9)]))
        .unwrap();
    assert_eq!(first.instance(), again.instance());
    assert!(again.linking_args().is_empty());
    assert_eq!(rt.linker().len(), 1);

    // Adapter classes are shared between sites implementing the same interface
    let other = rt
        .link(SiteId(8), request(supplier, ops, "I$one$$", InvocationKind::Static, vec![]))
        .unwrap();
    assert_ne!(first.instance(), other.instance());
    assert_eq!(
        rt.class_id_of(first.instance()).unwrap(),
        rt.class_id_of(other.instance()).unwrap()
    );
}

#[test]
fn test_unknown_invocation_kinds() {
    let mut rt = runtime();
    assert_eq!(
        InvocationKind::try_from(0u8).unwrap_err(),
        BridgeError::UnsupportedInvocationKind(0)
    );
    assert!(InvocationKind::try_from(6u8).is_err());
    for code in 1..=5u8 {
        assert_eq!(InvocationKind::try_from(code).unwrap().code(), code);
    }

    let object = rt.core().object;
    assert_eq!(
        rt.method_handle(object, "I$hashCode$$", 9).unwrap_err(),
        BridgeError::UnsupportedInvocationKind(9)
    );
}
