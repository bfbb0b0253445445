//! Integration tests for the virtual file table
//!
//! Exercises handle bookkeeping over every byte source: staged memory
//! buffers, a temporary directory and a local HTTP server.

use bytelink_runtime::config::FileSourceConfig;
use bytelink_runtime::files::{DirectorySource, LogConsole, FIRST_DYNAMIC_HANDLE};
use bytelink_runtime::{BridgeConfig, FileTable, MemorySource, Runtime};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

fn memory_table(path: &str, bytes: &[u8]) -> FileTable {
    let source = Arc::new(MemorySource::new());
    source.stage(path, bytes.to_vec());
    let mut table = FileTable::new(source, Arc::new(LogConsole::default()));
    table.enable();
    table
}

/// Answer every request on a fresh listener with `response`
fn serve_forever(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line.trim().is_empty() {
                    break;
                }
            }
            let _ = stream.write_all(response);
        }
    });
    format!("http://{}/", addr)
}

#[test]
fn test_skip_available_read_scenario() {
    let mut table = memory_table("five.bin", &[10, 20, 30, 40, 50]);
    let h = table.open_for_read("five.bin");
    assert_eq!(h, FIRST_DYNAMIC_HANDLE);

    assert_eq!(table.skip(h, 2), 2);
    assert_eq!(table.available(h), 3);

    let mut buf = [0u8; 10];
    assert_eq!(table.read_bytes(h, &mut buf), 3);
    assert_eq!(&buf[..3], &[30, 40, 50]);
    assert_eq!(table.read_bytes(h, &mut buf), -1);
    assert_eq!(table.read_byte(h), -1);
}

#[test]
fn test_contiguous_partitions_reproduce_bytes() {
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    for chunk in [1usize, 3, 7, 64, 999, 1000, 4096] {
        let mut table = memory_table("blob", &data);
        let h = table.open_for_read("blob");
        let mut collected = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = table.read_bytes(h, &mut buf);
            if n < 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n as usize]);
        }
        assert_eq!(collected, data, "chunk size {}", chunk);
    }
}

#[test]
fn test_skips_never_pass_size() {
    let mut table = memory_table("small", &[1, 2, 3, 4, 5, 6, 7]);
    let h = table.open_for_read("small");
    let size = 7i64;
    let mut position = 0i64;
    for step in [3i64, 0, -4, 2, 10, 1] {
        let moved = table.skip(h, step);
        assert!(moved >= 0);
        position += moved;
        assert!(position <= size);
        assert_eq!(table.available(h) as i64, size - position);
    }
    assert_eq!(table.available(h), 0);
}

#[test]
fn test_released_handles_are_reused() {
    let mut table = memory_table("a", b"a");
    let first = table.open_for_read("a");
    let second = table.open_for_read("a");
    assert_eq!(second, first + 1);

    assert!(table.release(first));
    assert!(!table.release(first));
    assert_eq!(table.open_for_read("a"), first);
    assert_eq!(table.open_count(), 2);
}

#[test]
fn test_directory_source() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/hello.txt"), b"hello").unwrap();

    let source = Arc::new(DirectorySource::new(dir.path()));
    let mut table = FileTable::new(source, Arc::new(LogConsole::default()));
    table.enable();

    let h = table.open_for_read("assets/hello.txt");
    assert!(h >= FIRST_DYNAMIC_HANDLE);
    assert_eq!(table.handle(h).unwrap().size(), 5);
    assert_eq!(table.open_for_read("assets/missing.txt"), -1);
    assert!(table.exists("assets/hello.txt"));
}

#[test]
fn test_http_not_found_registers_nothing() {
    let base = serve_forever(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let config = BridgeConfig {
        files: FileSourceConfig::Http {
            base_url: base,
            timeout_ms: 2000,
        },
        ..BridgeConfig::default()
    };
    let mut rt = Runtime::new(config).unwrap();

    assert_eq!(rt.files_mut().open_for_read("missing.bin"), -1);
    assert_eq!(rt.files().open_count(), 0);
    assert!(!rt.files().exists("missing.bin"));
}

#[test]
fn test_http_fetch_through_runtime() {
    let base = serve_forever(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\n\x01\x02\xfe\xff");
    let config = BridgeConfig::from_str(&format!(
        "[files]\nsource = \"http\"\nbase_url = \"{}\"\ntimeout_ms = 2000\n",
        base
    ))
    .unwrap();
    let mut rt = Runtime::new(config).unwrap();

    let h = rt.files_mut().open_for_read("data.bin");
    assert!(h >= FIRST_DYNAMIC_HANDLE);
    let mut buf = [0u8; 4];
    assert_eq!(rt.files_mut().read_bytes(h, &mut buf), 4);
    assert_eq!(buf, [0x01, 0x02, 0xfe, 0xff]);
}
