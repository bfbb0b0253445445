//! Numeric natives: boxing-class helpers, Math and StrictMath
//!
//! Formatting and parsing follow the guest's expectations rather than
//! Rust's: floating-point strings always carry a fractional part, and the
//! integer parsers accept the longest valid prefix instead of failing.

use super::{arg, double_arg, float_arg, int_arg, long_arg, ImportTableBuilder};
use crate::runtime::Runtime;
use bytelink_sdk::{BridgeResult, Value};

/// Register numeric natives
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    register_float(builder);
    register_double(builder);
    register_integers(builder);
    register_math(builder);
}

fn register_float(b: &mut ImportTableBuilder) {
    let owner = "java.lang.Float";
    b.register_static(owner, "I$floatToRawIntBits$F", |_, args| {
        Ok(Value::Int(float_arg(args, 0)?.to_bits() as i32))
    });
    b.register_static(owner, "Z$isNaN$D", is_nan_double);
    b.register_static(owner, "Z$isNaN$F", |_, args| Ok(Value::from_bool(float_arg(args, 0)?.is_nan())));
    b.register_static(owner, "Z$isInfinite$F", |_, args| {
        Ok(Value::from_bool(float_arg(args, 0)?.is_infinite()))
    });
    b.register_static(owner, "Ljava$lang$String$$toString$F", |rt, args| {
        let text = format_float(float_arg(args, 0)?);
        rt.guest_string(&text)
    });
    b.register_static(owner, "F$parseFloat$Ljava$lang$String$", |rt, args| {
        let text = rt.host_string(arg(args, 0)?)?;
        Ok(Value::Float(parse_float_prefix(&text) as f32))
    });
}

fn register_double(b: &mut ImportTableBuilder) {
    let owner = "java.lang.Double";
    b.register_static(owner, "Ljava$lang$String$$toString$D", |rt, args| {
        let text = format_double(double_arg(args, 0)?);
        rt.guest_string(&text)
    });
    b.register_static(owner, "D$parseDouble$Ljava$lang$String$", |rt, args| {
        let text = rt.host_string(arg(args, 0)?)?;
        Ok(Value::Double(parse_float_prefix(&text)))
    });
    b.register_static(owner, "Z$isNaN$D", is_nan_double);
}

fn register_integers(b: &mut ImportTableBuilder) {
    b.register_static("java.lang.Byte", "Ljava$lang$String$$toString$B$I", int_to_string);
    b.register_static("java.lang.Byte", "B$parseByte$Ljava$lang$String$", |rt, args| {
        let parsed = parse_text(rt, args, 10)?;
        Ok(Value::Int(parsed as i8 as i32))
    });

    b.register_static("java.lang.Short", "Ljava$lang$String$$toString$S$I", int_to_string);
    b.register_static("java.lang.Short", "S$parseShort$Ljava$lang$String$$I", |rt, args| {
        let parsed = parse_text(rt, args, int_arg(args, 1)?)?;
        Ok(Value::Int(parsed as i16 as i32))
    });

    let integer = "java.lang.Integer";
    b.register_static(integer, "Ljava$lang$String$$toString$I$I", int_to_string);
    b.register_static(integer, "Ljava$lang$String$$toHexString$I", |rt, args| {
        let text = format!("{:x}", int_arg(args, 0)? as u32);
        rt.guest_string(&text)
    });
    b.register_static(integer, "I$parseInt$Ljava$lang$String$$I", |rt, args| {
        let parsed = parse_text(rt, args, int_arg(args, 1)?)?;
        Ok(Value::Int(parsed as i32))
    });

    b.register_static("java.lang.Long", "Ljava$lang$String$$toString$J$I", |rt, args| {
        let text = to_radix_string(long_arg(args, 0)?, int_arg(args, 1)?);
        rt.guest_string(&text)
    });
    b.register_static("java.lang.Long", "J$parseLong$Ljava$lang$String$$I", |rt, args| {
        Ok(Value::Long(parse_text(rt, args, int_arg(args, 1)?)?))
    });
}

fn register_math(b: &mut ImportTableBuilder) {
    let owner = "java.lang.Math";
    b.register_static(owner, "I$min$I$I", |_, args| Ok(Value::Int(int_arg(args, 0)?.min(int_arg(args, 1)?))));
    b.register_static(owner, "I$max$I$I", |_, args| Ok(Value::Int(int_arg(args, 0)?.max(int_arg(args, 1)?))));
    b.register_static(owner, "F$min$F$F", |_, args| {
        let (a, b) = (float_arg(args, 0)?, float_arg(args, 1)?);
        Ok(Value::Float(if a.is_nan() || b.is_nan() { f32::NAN } else { a.min(b) }))
    });
    b.register_static(owner, "D$floor$D", |_, args| Ok(Value::Double(double_arg(args, 0)?.floor())));
    b.register_static(owner, "F$floor$F", |_, args| Ok(Value::Float(float_arg(args, 0)?.floor())));
    b.register_static(owner, "D$ceil$D", |_, args| Ok(Value::Double(double_arg(args, 0)?.ceil())));
    b.register_static(owner, "F$ceil$F", |_, args| Ok(Value::Float(float_arg(args, 0)?.ceil())));
    b.register_static(owner, "D$toRadians$D", |_, args| {
        Ok(Value::Double(double_arg(args, 0)?.to_radians()))
    });
    b.register_static(owner, "D$cos$D", |_, args| Ok(Value::Double(double_arg(args, 0)?.cos())));
    b.register_static(owner, "D$sin$D", |_, args| Ok(Value::Double(double_arg(args, 0)?.sin())));
    b.register_static(owner, "D$sqrt$D", sqrt);
    b.register_static(owner, "D$cbrt$D", |_, args| Ok(Value::Double(double_arg(args, 0)?.cbrt())));
    b.register_static(owner, "D$log$D", |_, args| Ok(Value::Double(double_arg(args, 0)?.ln())));
    b.register_static(owner, "D$random$$", |_, _| Ok(Value::Double(rand::random::<f64>())));

    b.register_static("java.lang.StrictMath", "D$sqrt$D", sqrt);
}

// ============================================================================
// Handlers
// ============================================================================

fn is_nan_double(_rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    Ok(Value::from_bool(double_arg(args, 0)?.is_nan()))
}

fn sqrt(_rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    Ok(Value::Double(double_arg(args, 0)?.sqrt()))
}

fn int_to_string(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let text = to_radix_string(int_arg(args, 0)? as i64, int_arg(args, 1)?);
    rt.guest_string(&text)
}

fn parse_text(rt: &Runtime, args: &[Value], radix: i32) -> BridgeResult<i64> {
    let text = rt.host_string(arg(args, 0)?)?;
    Ok(parse_int_prefix(&text, radix).unwrap_or_else(|| {
        log::warn!("no digits in {:?} (radix {}), using 0", text, radix);
        0
    }))
}

// ============================================================================
// Formatting and parsing
// ============================================================================

fn effective_radix(radix: i32) -> u32 {
    match u32::try_from(radix) {
        Ok(r @ 2..=36) => r,
        _ => 10,
    }
}

/// Format `value` in `radix` with a leading minus for negatives. Radixes
/// outside `2..=36` fall back to 10.
pub(crate) fn to_radix_string(value: i64, radix: i32) -> String {
    let radix = effective_radix(radix);
    if value == 0 {
        return "0".to_string();
    }
    let mut magnitude = value.unsigned_abs();
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('?'));
        magnitude /= radix as u64;
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Parse the longest integer prefix of `text` (after leading whitespace).
/// Returns `None` when there are no digits. Overflow wraps.
pub(crate) fn parse_int_prefix(text: &str, radix: i32) -> Option<i64> {
    let radix = effective_radix(radix);
    let mut rest = text.trim_start();
    let negative = match rest.chars().next() {
        Some('-') => {
            rest = &rest[1..];
            true
        }
        Some('+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };
    if radix == 16 {
        if let Some(stripped) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = stripped;
        }
    }

    let mut value: i64 = 0;
    let mut any = false;
    for digit in rest.chars().map_while(|c| c.to_digit(radix)) {
        value = value.wrapping_mul(radix as i64).wrapping_add(digit as i64);
        any = true;
    }
    any.then(|| if negative { value.wrapping_neg() } else { value })
}

/// Parse the longest floating-point prefix of `text`; `NaN` when there is
/// none
pub(crate) fn parse_float_prefix(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut end = trimmed.len();
    while end > 0 {
        if trimmed.is_char_boundary(end) {
            if let Ok(value) = trimmed[..end].parse::<f64>() {
                return value;
            }
        }
        end -= 1;
    }
    f64::NAN
}

fn with_fraction(mut text: String) -> String {
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// `Float.toString` rendering
pub(crate) fn format_float(value: f32) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        with_fraction(value.to_string())
    }
}

/// `Double.toString` rendering
pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        with_fraction(value.to_string())
    }
}
