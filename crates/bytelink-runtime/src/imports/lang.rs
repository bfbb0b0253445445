//! java.lang natives: System, CDS, strings, builders and Character

use super::{arg, index_arg, int_arg, ImportTableBuilder};
use crate::runtime::Runtime;
use crate::strings::{from_scalars, scalar_at, scalar_index, scalar_len};
use bytelink_sdk::{BridgeError, BridgeResult, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Register java.lang natives
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    register_system(builder);
    register_string(builder);
    register_string_builder(builder);
    register_string_buffer(builder);
    register_character(builder);
}

fn register_system(b: &mut ImportTableBuilder) {
    b.register_static("java.lang.System", "J$currentTimeMillis$$", current_time_millis);
    b.register_static("jdk.internal.misc.ScopedMemoryAccess", "V$registerNatives$$", |_, _| Ok(Value::Null));

    let cds = "jdk.internal.misc.CDS";
    b.register_static(cds, "Z$isDumpingClassList0$$", |_, _| Ok(Value::from_bool(false)));
    b.register_static(cds, "Z$isDumpingArchive0$$", |_, _| Ok(Value::from_bool(false)));
    b.register_static(cds, "Z$isSharingEnabled0$$", |_, _| Ok(Value::from_bool(false)));
    b.register_static(cds, "V$initializeFromArchive$Ljava$lang$Class$", |_, _| Ok(Value::Null));
    b.register_static(cds, "J$getRandomSeedForDumping$$", |_, _| Ok(Value::Long(0)));
}

fn register_string(b: &mut ImportTableBuilder) {
    let owner = "java.lang.String";
    b.register_instance(owner, "C$charAt$I", string_char_at);
    b.register_instance(owner, "I$length$$", text_length);
    b.register_instance(owner, "V$getChars$I$I$$C$I", string_get_chars);
    b.register_instance(owner, "I$indexOf$I", string_index_of);
    b.register_instance(owner, "I$lastIndexOf$Ljava$lang$String$", string_last_index_of);
    b.register_instance(owner, "Ljava$lang$String$$trim$$", string_trim);
    b.register_instance(owner, "Ljava$lang$String$$repeat$I", string_repeat);
    b.register_instance(owner, "Z$equals0$Ljava$lang$String$", string_equals);
    b.register_instance(owner, "Z$equalsIgnoreCase$Ljava$lang$String$", string_equals_ignore_case);
    b.register_instance(owner, "V$initializeWith$$C$I$I", string_init_from_chars);
    b.register_instance(owner, "$C$toCharArray$$", string_to_char_array);
    b.register_instance(owner, "V$initializeWith$Ljava$lang$String$", string_init_from_string);
}

fn register_string_builder(b: &mut ImportTableBuilder) {
    let owner = "java.lang.StringBuilder";
    b.register_instance(owner, "V$initializeWith$I", text_clear);
    b.register_instance(owner, "Ljava$lang$StringBuilder$$append$Ljava$lang$String$", text_append);
    b.register_instance(owner, "Ljava$lang$String$$toString$$", text_to_string);
    b.register_instance(owner, "I$length$$", text_length);
    b.register_instance(owner, "V$setLength$I", builder_set_length);
    b.register_instance(owner, "Ljava$lang$StringBuilder$$append$$C$I$I", builder_append_chars);
}

fn register_string_buffer(b: &mut ImportTableBuilder) {
    let owner = "java.lang.StringBuffer";
    b.register_instance(owner, "V$initializeWith$I", text_clear);
    b.register_instance(owner, "Ljava$lang$StringBuffer$$append$Ljava$lang$String$", text_append);
    b.register_instance(owner, "Ljava$lang$String$$toString$$", text_to_string);
}

fn register_character(b: &mut ImportTableBuilder) {
    let owner = "java.lang.Character";
    b.register_static(owner, "Z$isDigit$C", |_, args| {
        Ok(Value::from_bool(char_arg(args, 0)?.is_ascii_digit()))
    });
    b.register_static(owner, "Z$isLowerCase$C", |_, args| {
        Ok(Value::from_bool(char_arg(args, 0)?.is_lowercase()))
    });
    b.register_static(owner, "Z$isUpperCase$C", |_, args| {
        Ok(Value::from_bool(char_arg(args, 0)?.is_uppercase()))
    });
    b.register_static(owner, "C$toLowerCase$C", |_, args| {
        let c = char_arg(args, 0)?;
        Ok(Value::from_char(c.to_lowercase().next().unwrap_or(c)))
    });
    b.register_static(owner, "C$toUpperCase$C", |_, args| {
        let c = char_arg(args, 0)?;
        Ok(Value::from_char(c.to_uppercase().next().unwrap_or(c)))
    });
    b.register_static(owner, "I$digit$C$I", character_digit);
    b.register_static(owner, "Ljava$lang$String$$toString$C", |rt, args| {
        let c = char_arg(args, 0)?;
        rt.guest_string(c.encode_utf8(&mut [0; 4]))
    });
}

// ============================================================================
// Helpers
// ============================================================================

fn char_arg(args: &[Value], index: usize) -> BridgeResult<char> {
    let value = int_arg(args, index)?;
    u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| BridgeError::ArgumentError(format!("invalid char value {}", value)))
}

fn text_arg(rt: &Runtime, args: &[Value], index: usize) -> BridgeResult<String> {
    rt.host_string(arg(args, index)?)
}

/// Checked `offset..offset + count` range into an array of `len` elements
pub(crate) fn slice_range(offset: i32, count: i32, len: usize) -> BridgeResult<std::ops::Range<usize>> {
    let bounds = (usize::try_from(offset).ok(), usize::try_from(count).ok());
    match bounds {
        (Some(start), Some(n)) if start.checked_add(n).is_some_and(|end| end <= len) => Ok(start..start + n),
        _ => Err(BridgeError::ArgumentError(format!(
            "range {}+{} out of bounds for length {}",
            offset, count, len
        ))),
    }
}

fn chars_from_array(rt: &Runtime, array: Value, offset: i32, count: i32) -> BridgeResult<String> {
    let values = rt.array_values(array)?;
    let range = slice_range(offset, count, values.len())?;
    Ok(from_scalars(
        values[range].iter().map(|v| v.as_i32().unwrap_or(0)),
    ))
}

// ============================================================================
// java.lang.System
// ============================================================================

fn current_time_millis(_rt: &mut Runtime, _args: &[Value]) -> BridgeResult<Value> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Ok(Value::Long(millis))
}

// ============================================================================
// java.lang.String
// ============================================================================

fn string_char_at(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    let index = index_arg(args, 1)?;
    scalar_at(&s, index).map(Value::from_char).ok_or_else(|| {
        BridgeError::ArgumentError(format!(
            "index {} out of bounds for length {}",
            index,
            scalar_len(&s)
        ))
    })
}

fn text_length(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    Ok(Value::Int(scalar_len(&s) as i32))
}

fn string_get_chars(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    let begin = int_arg(args, 1)?;
    let end = int_arg(args, 2)?;
    let dst = arg(args, 3)?;
    let dst_begin = index_arg(args, 4)?;

    let chars: Vec<char> = s.chars().collect();
    let range = slice_range(begin, end - begin, chars.len())?;
    for (i, c) in chars[range].iter().enumerate() {
        rt.array_set(dst, dst_begin + i, Value::from_char(*c))?;
    }
    Ok(Value::Null)
}

fn string_index_of(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    let needle = int_arg(args, 1)?;
    let found = u32::try_from(needle)
        .ok()
        .and_then(char::from_u32)
        .and_then(|c| s.find(c))
        .map(|byte_idx| scalar_index(&s, byte_idx) as i32);
    Ok(Value::Int(found.unwrap_or(-1)))
}

fn string_last_index_of(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    let needle = text_arg(rt, args, 1)?;
    let found = s
        .rfind(needle.as_str())
        .map(|byte_idx| scalar_index(&s, byte_idx) as i32);
    Ok(Value::Int(found.unwrap_or(-1)))
}

fn string_trim(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    rt.guest_string(s.trim_matches(|c: char| c <= ' '))
}

fn string_repeat(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    let count = int_arg(args, 1)?;
    let count = usize::try_from(count)
        .map_err(|_| BridgeError::ArgumentError(format!("negative repeat count {}", count)))?;
    rt.guest_string(&s.repeat(count))
}

fn string_equals(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let other = arg(args, 1)?;
    if other.is_null() {
        return Ok(Value::from_bool(false));
    }
    Ok(Value::from_bool(text_arg(rt, args, 0)? == rt.host_string(other)?))
}

fn string_equals_ignore_case(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let (a, b) = (arg(args, 0)?, arg(args, 1)?);
    if a.is_null() || b.is_null() {
        return Ok(Value::from_bool(false));
    }
    let a = rt.host_string(a)?;
    let b = rt.host_string(b)?;
    Ok(Value::from_bool(a.to_uppercase() == b.to_uppercase()))
}

fn string_init_from_chars(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let text = chars_from_array(rt, arg(args, 1)?, int_arg(args, 2)?, int_arg(args, 3)?)?;
    rt.set_text(arg(args, 0)?, &text)?;
    Ok(Value::Null)
}

fn string_to_char_array(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let s = text_arg(rt, args, 0)?;
    rt.new_array(s.chars().map(Value::from_char).collect())
}

fn string_init_from_string(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let text = text_arg(rt, args, 1)?;
    rt.set_text(arg(args, 0)?, &text)?;
    Ok(Value::Null)
}

// ============================================================================
// StringBuilder / StringBuffer
// ============================================================================

fn text_clear(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    rt.set_text(arg(args, 0)?, "")?;
    Ok(Value::Null)
}

fn text_append(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let target = arg(args, 0)?;
    let appended = arg(args, 1)?;
    let mut text = rt.host_string(target)?;
    if appended.is_null() {
        text.push_str("null");
    } else {
        text.push_str(&rt.host_string(appended)?);
    }
    rt.set_text(target, &text)?;
    Ok(target)
}

fn text_to_string(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let text = text_arg(rt, args, 0)?;
    rt.guest_string(&text)
}

fn builder_set_length(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let target = arg(args, 0)?;
    let length = int_arg(args, 1)?;
    let length = usize::try_from(length)
        .map_err(|_| BridgeError::ArgumentError(format!("negative length {}", length)))?;

    let mut text = rt.host_string(target)?;
    let current = scalar_len(&text);
    if length < current {
        text = text.chars().take(length).collect();
    } else {
        text.extend(std::iter::repeat('\0').take(length - current));
    }
    rt.set_text(target, &text)?;
    Ok(Value::Null)
}

fn builder_append_chars(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let target = arg(args, 0)?;
    let appended = chars_from_array(rt, arg(args, 1)?, int_arg(args, 2)?, int_arg(args, 3)?)?;
    let mut text = rt.host_string(target)?;
    text.push_str(&appended);
    rt.set_text(target, &text)?;
    Ok(target)
}

// ============================================================================
// java.lang.Character
// ============================================================================

fn character_digit(_rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let c = char_arg(args, 0)?;
    let radix = int_arg(args, 1)?;
    let digit = match u32::try_from(radix) {
        Ok(radix @ 2..=36) => c.to_digit(radix).map(|d| d as i32),
        _ => None,
    };
    Ok(Value::Int(digit.unwrap_or(-1)))
}
