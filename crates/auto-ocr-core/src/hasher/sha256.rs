use super::RetryPolicy;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::thread;
use tracing::{trace, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hex-encoded SHA-256 of the file's full content.
///
/// A failed read is retried up to `policy.max_retries` times, sleeping
/// `policy.delay` between attempts. The last error is returned once the
/// budget is spent, so `max_retries = 0` fails on the first error.
pub fn fingerprint(path: &Path, policy: RetryPolicy) -> io::Result<String> {
    fingerprint_with(path, policy, || File::open(path))
}

pub(crate) fn fingerprint_with<R, F>(
    path: &Path,
    policy: RetryPolicy,
    mut open: F,
) -> io::Result<String>
where
    R: Read,
    F: FnMut() -> io::Result<R>,
{
    let mut attempt: u32 = 0;
    loop {
        match open().and_then(hash_reader) {
            Ok(hash) => {
                trace!("Hashed {} on attempt {}", path.display(), attempt + 1);
                return Ok(hash);
            }
            Err(e) => {
                if attempt >= policy.max_retries {
                    return Err(e);
                }
                attempt += 1;
                warn!(
                    "Read of {} failed ({}), retry {}/{} in {:.1}s",
                    path.display(),
                    e,
                    attempt,
                    policy.max_retries,
                    policy.delay.as_secs_f64()
                );
                thread::sleep(policy.delay);
            }
        }
    }
}

/// Streams the reader through SHA-256 in fixed-size chunks.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use std::io::Cursor;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_known_digest() {
        assert_eq!(hash_reader(Cursor::new(b"abc")).unwrap(), ABC_SHA256);
    }

    #[test]
    fn test_content_larger_than_chunk() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let streamed = hash_reader(Cursor::new(&data)).unwrap();
        let direct = hex::encode(Sha256::digest(&data));
        assert_eq!(streamed, direct);
        assert_eq!(streamed.len(), 64);
    }

    #[test]
    fn test_same_bytes_same_fingerprint_regardless_of_name() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("renamed copy.pdf");
        fs::write(&a, b"%PDF-1.4 same").unwrap();
        fs::write(&b, b"%PDF-1.4 same").unwrap();
        let c = dir.path().join("c.pdf");
        fs::write(&c, b"%PDF-1.4 different").unwrap();

        let ha = fingerprint(&a, RetryPolicy::none()).unwrap();
        let hb = fingerprint(&b, RetryPolicy::none()).unwrap();
        let hc = fingerprint(&c, RetryPolicy::none()).unwrap();
        assert_eq!(ha, hb);
        assert_ne!(ha, hc);
    }

    #[test]
    fn test_retries_exactly_max_then_fails() {
        let attempts = Cell::new(0u32);
        let policy = RetryPolicy {
            max_retries: 3,
            delay: Duration::from_millis(20),
        };
        let start = Instant::now();
        let result = fingerprint_with(Path::new("flaky.pdf"), policy, || {
            attempts.set(attempts.get() + 1);
            Err::<Cursor<Vec<u8>>, _>(io::Error::new(io::ErrorKind::Other, "device busy"))
        });
        assert!(result.is_err());
        // one initial attempt plus three retries
        assert_eq!(attempts.get(), 4);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_zero_retries_fails_immediately() {
        let attempts = Cell::new(0u32);
        let policy = RetryPolicy {
            max_retries: 0,
            delay: Duration::from_secs(10),
        };
        let start = Instant::now();
        let result = fingerprint_with(Path::new("gone.pdf"), policy, || {
            attempts.set(attempts.get() + 1);
            Err::<Cursor<Vec<u8>>, _>(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(attempts.get(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let attempts = Cell::new(0u32);
        let policy = RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
        };
        let result = fingerprint_with(Path::new("partial.pdf"), policy, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 1 {
                Err(io::Error::new(io::ErrorKind::Other, "still being written"))
            } else {
                Ok(Cursor::new(b"abc".to_vec()))
            }
        });
        assert_eq!(result.unwrap(), ABC_SHA256);
        assert_eq!(attempts.get(), 2);
    }
}
