use std::io::{Read, Write};

/// Size of each chunk moved from source to destination
pub const CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("copy failed during {op}")]
pub struct CopyFailed {
    pub op: Operation,
    #[source]
    pub source: std::io::Error,
}

/// Moves every byte of `source` into `dest`, returning the number of bytes copied.
///
/// Data is moved in [`CHUNK_SIZE`] chunks until `source` returns a zero-length read. Interrupted
/// reads are retried; any other error stops the copy. `dest` is not flushed, that's up to the
/// caller when it closes the stream.
pub fn copy_stream<R, W>(source: &mut R, dest: &mut W) -> Result<u64, CopyFailed>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut copied = 0u64;
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(CopyFailed {
                    op: Operation::Read,
                    source,
                });
            }
        };
        dest.write_all(&buf[..n]).map_err(|source| CopyFailed {
            op: Operation::Write,
            source,
        })?;
        copied += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the size of every write it receives
    #[derive(Default)]
    struct ChunkRecorder {
        data: Vec<u8>,
        writes: Vec<usize>,
    }

    impl Write for ChunkRecorder {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            self.writes.push(buf.len());
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Yields `ok_bytes` bytes then fails with `kind`
    struct FailingReader {
        ok_bytes: usize,
        kind: std::io::ErrorKind,
        failures_left: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.ok_bytes > 0 {
                let n = std::cmp::min(self.ok_bytes, buf.len());
                buf[..n].fill(b'x');
                self.ok_bytes -= n;
                return Ok(n);
            }
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(std::io::Error::new(self.kind, "injected"));
            }
            Ok(0)
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copies_all_bytes_in_fixed_chunks() {
        let input: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let mut dest = ChunkRecorder::default();
        let copied = copy_stream(&mut input.as_slice(), &mut dest).unwrap();
        assert_eq!(copied, 2500);
        assert_eq!(dest.data, input);
        assert_eq!(dest.writes, vec![1024, 1024, 452]);
    }

    #[test]
    fn empty_source_copies_nothing() {
        let mut dest = ChunkRecorder::default();
        let copied = copy_stream(&mut std::io::empty(), &mut dest).unwrap();
        assert_eq!(copied, 0);
        assert!(dest.writes.is_empty());
    }

    #[test]
    fn read_error_is_reported_as_read() {
        let mut source = FailingReader {
            ok_bytes: 10,
            kind: std::io::ErrorKind::ConnectionReset,
            failures_left: 1,
        };
        let mut dest = ChunkRecorder::default();
        let error = copy_stream(&mut source, &mut dest).unwrap_err();
        assert_eq!(error.op, Operation::Read);
        assert_eq!(error.source.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(error.to_string(), "copy failed during read");
        // what was read before the failure was still written out
        assert_eq!(dest.data.len(), 10);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut source = FailingReader {
            ok_bytes: 0,
            kind: std::io::ErrorKind::Interrupted,
            failures_left: 3,
        };
        let mut dest = ChunkRecorder::default();
        assert_eq!(copy_stream(&mut source, &mut dest).unwrap(), 0);
    }

    #[test]
    fn write_error_is_reported_as_write() {
        let error = copy_stream(&mut "some log line".as_bytes(), &mut BrokenWriter).unwrap_err();
        assert_eq!(error.op, Operation::Write);
        assert_eq!(error.to_string(), "copy failed during write");
    }
}
