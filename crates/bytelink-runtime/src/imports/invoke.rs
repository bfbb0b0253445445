//! `java.lang.invoke` natives backing lambda and method-reference linkage
//!
//! `metafactory` bootstraps an anonymous call site and returns a guest
//! `CallSite` carrying the factory. Its target handle instantiates the
//! functional-interface object when invoked with the linking arguments.

use super::{arg, ImportTableBuilder};
use crate::heap::NativeSlot;
use crate::linker::LinkedTarget;
use crate::runtime::Runtime;
use bytelink_sdk::{BridgeError, BridgeResult, Value};

const METAFACTORY_KEY: &str = "Ljava$lang$invoke$CallSite$$metafactory$Ljava$lang$invoke$MethodHandles$Lookup$$Ljava$lang$String$$Ljava$lang$invoke$MethodType$$Ljava$lang$invoke$MethodType$$Ljava$lang$invoke$MethodHandle$$Ljava$lang$invoke$MethodType$";

/// Register linkage natives
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    builder.register_static("java.lang.invoke.LambdaMetafactory", METAFACTORY_KEY, metafactory);
    builder.register_instance(
        "java.lang.invoke.CallSite",
        "Ljava$lang$invoke$MethodHandle$$getTarget$$",
        call_site_target,
    );
    builder.register_instance(
        "java.lang.invoke.MethodHandle",
        "Ljava$lang$Object$$invokeExact$$Ljava$lang$Object$",
        invoke_exact,
    );
}

/// Arguments: lookup, method name, invoked type, erased method type,
/// implementation handle, instantiated method type
fn metafactory(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let interface = rt.mirrored_class(arg(args, 2)?)?;
    let implementation = arg(args, 4)?.expect_object()?;
    let handle = match &rt.heap().object(implementation)?.native {
        NativeSlot::MethodHandle(handle) => handle.clone(),
        _ => return Err(BridgeError::type_mismatch("java.lang.invoke.MethodHandle", "object")),
    };

    let site = rt.linker.anonymous_site();
    let factory = rt.bootstrap_site(site, interface, handle)?;
    let call_site = rt.core().call_site;
    Ok(Value::Ref(
        rt.heap_mut().alloc_object_with(call_site, NativeSlot::Factory(factory)),
    ))
}

fn call_site_target(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let site = arg(args, 0)?.expect_object()?;
    let factory = match &rt.heap().object(site)?.native {
        NativeSlot::Factory(factory) => factory.clone(),
        _ => return Err(BridgeError::type_mismatch("bootstrapped call site", "object")),
    };
    let method_handle = rt.core().method_handle;
    Ok(Value::Ref(
        rt.heap_mut().alloc_object_with(method_handle, NativeSlot::Factory(factory)),
    ))
}

/// Arguments: the handle, then the argument array
fn invoke_exact(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let handle = arg(args, 0)?.expect_object()?;
    let values = match arg(args, 1)? {
        Value::Null => Vec::new(),
        array => rt.array_values(array)?,
    };

    let slot = rt.heap().object(handle)?.native.clone();
    match slot {
        NativeSlot::Factory(factory) => Ok(factory.instantiate(rt, &values)?.instance()),
        NativeSlot::MethodHandle(descriptor) => LinkedTarget::new(descriptor, Vec::new()).invoke(rt, &values),
        _ => Err(BridgeError::type_mismatch("java.lang.invoke.MethodHandle", "object")),
    }
}
