//! Charset transcoding natives. Only UTF-8 is supported.

use super::{arg, ImportTableBuilder};
use crate::runtime::Runtime;
use crate::strings::from_scalars;
use bytelink_sdk::{BridgeError, BridgeResult, Value};

/// Field of `java.nio.charset.Charset` holding its canonical name
pub const CHARSET_NAME_FIELD: &str = "canonicalName";

/// Register charset natives
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    builder.register_instance(
        "bytelink.classlib.CharsetDecoder",
        "$C$decodeFromBytes$Ljava$nio$charset$Charset$$$B",
        decode_from_bytes,
    );
    builder.register_instance(
        "bytelink.classlib.CharsetEncoder",
        "$B$encodeToBytes$Ljava$nio$charset$Charset$$$C",
        encode_to_bytes,
    );
}

fn charset_name(rt: &Runtime, charset: Value) -> BridgeResult<String> {
    if let Value::Ref(r) = charset {
        if let Ok(name) = rt.heap().field(r, CHARSET_NAME_FIELD) {
            if !name.is_null() {
                return rt.host_string(name);
            }
        }
    }
    rt.host_string(charset)
}

fn require_utf8(rt: &Runtime, charset: Value) -> BridgeResult<()> {
    let name = charset_name(rt, charset)?;
    if name.eq_ignore_ascii_case("UTF-8") || name.eq_ignore_ascii_case("UTF8") {
        Ok(())
    } else {
        Err(BridgeError::UnsupportedOperation(format!(
            "charset {:?} (only UTF-8 is supported)",
            name
        )))
    }
}

fn decode_from_bytes(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    require_utf8(rt, arg(args, 1)?)?;
    let bytes = rt
        .array_values(arg(args, 2)?)?
        .iter()
        .map(|v| v.expect_i32().map(|b| b as u8))
        .collect::<BridgeResult<Vec<u8>>>()?;
    let text = String::from_utf8_lossy(&bytes);
    let chars = text.chars().map(Value::from_char).collect();
    rt.new_array(chars)
}

fn encode_to_bytes(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    require_utf8(rt, arg(args, 1)?)?;
    let scalars = rt
        .array_values(arg(args, 2)?)?
        .iter()
        .map(|v| v.expect_i32())
        .collect::<BridgeResult<Vec<i32>>>()?;
    let text = from_scalars(scalars);
    let bytes = text.bytes().map(|b| Value::Int(b as i8 as i32)).collect();
    rt.new_array(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassBuilder;
    use crate::BridgeConfig;

    fn charset(rt: &mut Runtime, name: &str) -> Value {
        let class = match rt.classes().by_name("java.nio.charset.Charset") {
            Some(class) => class,
            None => rt
                .define_class(ClassBuilder::new("java.nio.charset.Charset"))
                .unwrap(),
        };
        let charset = rt.allocate(class).unwrap();
        let name = rt.guest_string(name).unwrap();
        rt.heap_mut()
            .set_field(charset.expect_object().unwrap(), CHARSET_NAME_FIELD, name)
            .unwrap();
        charset
    }

    #[test]
    fn test_decode_utf8() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let utf8 = charset(&mut rt, "UTF-8");
        let bytes: Vec<Value> = "hé€".bytes().map(|b| Value::Int(b as i8 as i32)).collect();
        let array = rt.new_array(bytes).unwrap();

        let chars = rt
            .call_native(
                "bytelink.classlib.CharsetDecoder",
                "$C$decodeFromBytes$Ljava$nio$charset$Charset$$$B",
                &[Value::Null, utf8, array],
            )
            .unwrap();
        let expected: Vec<Value> = "hé€".chars().map(Value::from_char).collect();
        assert_eq!(rt.array_values(chars).unwrap(), expected);
    }

    #[test]
    fn test_encode_utf8() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let utf8 = charset(&mut rt, "utf8");
        let chars: Vec<Value> = "aé".chars().map(Value::from_char).collect();
        let array = rt.new_array(chars).unwrap();

        let bytes = rt
            .call_native(
                "bytelink.classlib.CharsetEncoder",
                "$B$encodeToBytes$Ljava$nio$charset$Charset$$$C",
                &[Value::Null, utf8, array],
            )
            .unwrap();
        assert_eq!(
            rt.array_values(bytes).unwrap(),
            vec![Value::Int(0x61), Value::Int(0xc3u8 as i8 as i32), Value::Int(0xa9u8 as i8 as i32)]
        );
    }

    #[test]
    fn test_other_charsets_unsupported() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let latin1 = charset(&mut rt, "ISO-8859-1");
        let array = rt.new_array(vec![Value::Int(65)]).unwrap();

        let result = rt.call_native(
            "bytelink.classlib.CharsetDecoder",
            "$C$decodeFromBytes$Ljava$nio$charset$Charset$$$B",
            &[Value::Null, latin1, array],
        );
        assert!(matches!(result, Err(BridgeError::UnsupportedOperation(_))));

        let by_name = rt.guest_string("UTF-8").unwrap();
        assert!(require_utf8(&rt, by_name).is_ok());
    }
}
