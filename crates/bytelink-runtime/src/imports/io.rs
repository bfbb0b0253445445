//! File stream natives over the virtual file table
//!
//! Streams keep their handle in a `FileDescriptor`; I/O failures come back
//! as `-1` rather than errors.

use super::lang::slice_range;
use super::{arg, int_arg, long_arg, ImportTableBuilder};
use crate::runtime::Runtime;
use bytelink_sdk::{BridgeResult, Value};

/// `getBooleanAttributes0` bit for an existing path
pub const BA_EXISTS: i32 = 0x01;

/// Register file stream natives
pub(crate) fn register(builder: &mut ImportTableBuilder) {
    let input = "java.io.FileInputStream";
    builder
        .register_instance(input, "I$open0$Ljava$lang$String$", open0)
        .register_instance(input, "J$skip0$I", |rt, args| {
            let fd = rt.descriptor(arg(args, 0)?)?;
            let amount = long_arg(args, 1).or_else(|_| int_arg(args, 1).map(i64::from))?;
            Ok(Value::Long(rt.files_mut().skip(fd, amount)))
        })
        .register_instance(input, "I$available0$$", |rt, args| {
            let fd = rt.descriptor(arg(args, 0)?)?;
            Ok(Value::Int(rt.files_mut().available(fd)))
        })
        .register_instance(input, "I$read0$$", |rt, args| {
            let fd = rt.descriptor(arg(args, 0)?)?;
            Ok(Value::Int(rt.files_mut().read_byte(fd)))
        })
        .register_instance(input, "I$readBytes$$B$I$I", read_bytes)
        .register_instance(input, "V$close0$$", close0);

    let output = "java.io.FileOutputStream";
    builder
        .register_instance(output, "V$writeBytes$$B$I$I", write_bytes)
        .register_instance(output, "V$writeInt$I", |rt, args| {
            let fd = rt.descriptor(arg(args, 0)?)?;
            let byte = int_arg(args, 1)? as u8;
            rt.files_mut().write(fd, &[byte]);
            Ok(Value::Null)
        });

    builder.register_instance(
        "java.io.UnixFileSystem",
        "I$getBooleanAttributes0$Ljava$lang$String$",
        |rt, args| {
            let path = rt.host_string(arg(args, 1)?)?;
            let exists = rt.files().exists(&path);
            Ok(Value::Int(if exists { BA_EXISTS } else { 0 }))
        },
    );
}

fn open0(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let stream = arg(args, 0)?;
    let path = rt.host_string(arg(args, 1)?)?;
    let fd = rt.files_mut().open_for_read(&path);
    if fd >= 0 {
        rt.set_descriptor(stream, fd)?;
    }
    Ok(Value::Int(fd))
}

fn read_bytes(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let fd = rt.descriptor(arg(args, 0)?)?;
    let array = arg(args, 1)?;
    let (offset, len) = (int_arg(args, 2)?, int_arg(args, 3)?);
    let range = slice_range(offset, len, rt.array_len(array)?)?;
    if range.is_empty() {
        return Ok(Value::Int(0));
    }

    let mut buffer = vec![0u8; range.len()];
    let count = rt.files_mut().read_bytes(fd, &mut buffer);
    if count > 0 {
        for (i, byte) in buffer[..count as usize].iter().enumerate() {
            rt.array_set(array, range.start + i, Value::Int(*byte as i8 as i32))?;
        }
    }
    Ok(Value::Int(count))
}

fn close0(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let stream = arg(args, 0)?;
    let fd = rt.descriptor(stream)?;
    if fd >= 0 {
        rt.files_mut().release(fd);
        rt.set_descriptor(stream, -1)?;
    }
    Ok(Value::Null)
}

fn write_bytes(rt: &mut Runtime, args: &[Value]) -> BridgeResult<Value> {
    let fd = rt.descriptor(arg(args, 0)?)?;
    let array = arg(args, 1)?;
    let (offset, len) = (int_arg(args, 2)?, int_arg(args, 3)?);
    let range = slice_range(offset, len, rt.array_len(array)?)?;

    let bytes = rt.array_values(array)?[range]
        .iter()
        .map(|v| v.expect_i32().map(|b| (b & 0xff) as u8))
        .collect::<BridgeResult<Vec<u8>>>()?;
    rt.files_mut().write(fd, &bytes);
    Ok(Value::Null)
}
