//! Host accessors and opaque typed-array constructors

use super::{index_arg, ImportTableBuilder};
use crate::heap::HostValue;
use crate::runtime::{CoreClasses, Runtime};
use crate::types::ClassId;
use bytelink_sdk::{BridgeResult, Value};

/// Register host accessors and array constructors
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    builder
        .register_static("runtime", "nativeconsole", |rt, _| {
            wrap(rt, |core| core.console, HostValue::Console)
        })
        .register_static("runtime", "nativewindow", |rt, _| {
            wrap(rt, |core| core.window, HostValue::Window)
        })
        .register_static("runtime", "nativedocument", |rt, _| {
            wrap(rt, |core| core.document, HostValue::Document)
        });

    let owner = "bytelink.api.web.OpaqueArrays";
    builder
        .register_static(owner, "Lbytelink$api$web$FloatArray$$createFloatArray$I", |rt, args| {
            let len = index_arg(args, 0)?;
            wrap(rt, |core| core.float_array, HostValue::FloatArray(vec![0.0; len]))
        })
        .register_static(owner, "Lbytelink$api$web$IntArray$$createIntArray$I", |rt, args| {
            let len = index_arg(args, 0)?;
            wrap(rt, |core| core.int_array, HostValue::IntArray(vec![0; len]))
        })
        .register_static(owner, "Lbytelink$api$web$Int16Array$$createInt16Array$I", |rt, args| {
            let len = index_arg(args, 0)?;
            wrap(rt, |core| core.int16_array, HostValue::Int16Array(vec![0; len]))
        })
        .register_static(owner, "Lbytelink$api$web$Int8Array$$createInt8Array$I", |rt, args| {
            let len = index_arg(args, 0)?;
            wrap(rt, |core| core.int8_array, HostValue::Int8Array(vec![0; len]))
        })
        .register_static(
            owner,
            "Lbytelink$api$web$OpaqueReferenceArray$$createObjectArray$$",
            |rt, _| wrap(rt, |core| core.reference_array, HostValue::References(Vec::new())),
        );
}

fn wrap(rt: &mut Runtime, target: fn(&CoreClasses) -> ClassId, value: HostValue) -> BridgeResult<Value> {
    let class = target(rt.core());
    rt.wrap(class, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeConfig;

    #[test]
    fn test_host_accessors() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let console = rt.call_native("runtime", "nativeconsole", &[]).unwrap();
        assert_eq!(rt.host_value(console).unwrap(), &HostValue::Console);
        assert!(rt.instance_of(console, rt.core().console));
        assert!(!rt.instance_of(console, rt.core().window));

        let window = rt.call_native("runtime", "nativewindow", &[]).unwrap();
        assert_eq!(rt.host_value(window).unwrap(), &HostValue::Window);
        let document = rt.call_native("runtime", "nativedocument", &[]).unwrap();
        assert!(rt.instance_of(document, rt.core().document));
    }

    #[test]
    fn test_typed_arrays() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let owner = "bytelink.api.web.OpaqueArrays";

        let floats = rt
            .call_native(owner, "Lbytelink$api$web$FloatArray$$createFloatArray$I", &[Value::Int(3)])
            .unwrap();
        assert_eq!(rt.host_value(floats).unwrap(), &HostValue::FloatArray(vec![0.0; 3]));
        assert!(rt.instance_of(floats, rt.core().float_array));

        let bytes = rt
            .call_native(owner, "Lbytelink$api$web$Int8Array$$createInt8Array$I", &[Value::Int(2)])
            .unwrap();
        if let HostValue::Int8Array(items) = rt.host_value_mut(bytes).unwrap() {
            items[1] = -7;
        }
        assert_eq!(rt.host_value(bytes).unwrap(), &HostValue::Int8Array(vec![0, -7]));

        let refs = rt
            .call_native(owner, "Lbytelink$api$web$OpaqueReferenceArray$$createObjectArray$$", &[])
            .unwrap();
        assert_eq!(rt.host_value(refs).unwrap(), &HostValue::References(Vec::new()));

        assert!(rt
            .call_native(owner, "Lbytelink$api$web$IntArray$$createIntArray$I", &[Value::Int(-1)])
            .is_err());
    }

    #[test]
    fn test_int16_array() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let shorts = rt
            .call_native(
                "bytelink.api.web.OpaqueArrays",
                "Lbytelink$api$web$Int16Array$$createInt16Array$I",
                &[Value::Int(4)],
            )
            .unwrap();
        assert_eq!(rt.host_value(shorts).unwrap(), &HostValue::Int16Array(vec![0; 4]));
        assert!(rt.instance_of(shorts, rt.core().int16_array));
    }
}
