//! `bytelink cat` - read a path through the virtual file table.

use super::load_config;
use bytelink_runtime::Runtime;
use std::io::Write;
use std::path::Path;

const CHUNK: usize = 8192;

pub fn execute(path: &str, config: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config)?;
    config.mode = bytelink_runtime::ExecutionMode::Direct;
    let mut rt = Runtime::new(config)?;

    let files = rt.files_mut();
    let handle = files.open_for_read(path);
    if handle < 0 {
        anyhow::bail!("Cannot open {}", path);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut buffer = vec![0u8; CHUNK];
    loop {
        let count = files.read_bytes(handle, &mut buffer);
        if count <= 0 {
            break;
        }
        out.write_all(&buffer[..count as usize])?;
    }
    out.flush()?;
    files.release(handle);
    Ok(())
}
