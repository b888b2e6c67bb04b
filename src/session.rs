// Per-session memoization of parsed uploads, keyed by the MD5 digest of
// the raw bytes. Re-loading the same bytes skips re-parsing; different
// bytes invalidate the entry. Purely an optimization: correctness never
// depends on a cache hit.
//
// The key bytes and the parse input are the caller's business: an
// employee upload keys on the main file plus the contracts file, so a
// changed contracts file invalidates the merged table too.
use crate::error::ReportError;
use std::sync::Arc;

pub struct UploadCache<T> {
    digest: Option<String>,
    value: Option<Arc<T>>,
}

impl<T> Default for UploadCache<T> {
    fn default() -> Self {
        UploadCache {
            digest: None,
            value: None,
        }
    }
}

impl<T> UploadCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value when `key_bytes` hash to the stored
    /// digest; otherwise parse, store and return. The boolean is true on
    /// a cache hit. A parse failure leaves any previous entry untouched.
    pub fn load<F>(&mut self, key_bytes: &[u8], parse: F) -> Result<(Arc<T>, bool), ReportError>
    where
        F: FnOnce() -> Result<T, ReportError>,
    {
        let digest = format!("{:x}", md5::compute(key_bytes));
        if self.digest.as_deref() == Some(digest.as_str()) {
            if let Some(value) = &self.value {
                log::debug!("upload cache hit ({})", digest);
                return Ok((Arc::clone(value), true));
            }
        }
        let value = Arc::new(parse()?);
        self.digest = Some(digest);
        self.value = Some(Arc::clone(&value));
        Ok((value, false))
    }

    pub fn invalidate(&mut self) {
        self.digest = None;
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn identical_bytes_hit_the_cache() {
        let mut cache: UploadCache<usize> = UploadCache::new();
        let calls = Cell::new(0usize);
        let parse = || {
            calls.set(calls.get() + 1);
            Ok(7)
        };
        let (v1, hit1) = cache.load(b"payload", parse).unwrap();
        let (v2, hit2) = cache.load(b"payload", parse).unwrap();
        assert_eq!(*v1, 7);
        assert_eq!(*v2, 7);
        assert!(!hit1);
        assert!(hit2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn different_bytes_invalidate() {
        let mut cache: UploadCache<usize> = UploadCache::new();
        let (_, hit) = cache.load(b"one", || Ok(1)).unwrap();
        assert!(!hit);
        let (v, hit) = cache.load(b"two", || Ok(2)).unwrap();
        assert!(!hit);
        assert_eq!(*v, 2);
    }

    #[test]
    fn explicit_invalidation_forces_reparse() {
        let mut cache: UploadCache<usize> = UploadCache::new();
        cache.load(b"x", || Ok(1)).unwrap();
        cache.invalidate();
        let (_, hit) = cache.load(b"x", || Ok(1)).unwrap();
        assert!(!hit);
    }

    #[test]
    fn parse_failure_keeps_previous_entry() {
        let mut cache: UploadCache<usize> = UploadCache::new();
        cache.load(b"good", || Ok(4)).unwrap();
        let err = cache.load(b"bad", || Err(ReportError::missing_column("whatever")));
        assert!(err.is_err());
        let (v, hit) = cache.load(b"good", || Ok(4)).unwrap();
        assert_eq!(*v, 4);
        assert!(hit);
    }
}
