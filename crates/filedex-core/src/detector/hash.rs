use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;

use twox_hash::XxHash64;

/// Bytes of file prefix covered by the partial hash.
pub const PARTIAL_HASH_LENGTH: usize = 1024 * 1024; // 1 MiB

/// XxHash64 over the first `PARTIAL_HASH_LENGTH` bytes (the whole file if
/// smaller), as lowercase hex.
pub fn partial_hash(file: &Path) -> io::Result<String> {
    let data = read_portion(file)?;
    Ok(format!("{:016x}", hash_data(&data)))
}

/// Streamed blake3 over the entire file content, as lowercase hex.
pub fn full_hash(file: &Path) -> io::Result<String> {
    let mut f = File::open(file)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; PARTIAL_HASH_LENGTH];
    loop {
        let bytes_read = f.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

fn read_portion(file: &Path) -> io::Result<Vec<u8>> {
    let mut f = File::open(file)?;
    let mut buffer = vec![0; PARTIAL_HASH_LENGTH];
    let mut filled = 0;
    // Loop until the buffer is full or EOF; a single read may return short.
    loop {
        let bytes_read = f.read(&mut buffer[filled..])?;
        if bytes_read == 0 {
            break;
        }
        filled += bytes_read;
        if filled == buffer.len() {
            break;
        }
    }
    buffer.truncate(filled);
    Ok(buffer)
}

pub fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}
