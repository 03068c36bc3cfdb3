use std::io::{ErrorKind, Read, Write};

/// Size of the buffer used for streaming copies of large binaries.
pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

/// Copy `reader` into `writer` through a fixed-size buffer.
///
/// Peak memory stays at [`CHUNK_SIZE`] regardless of payload size.
pub(crate) fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> std::io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}
