//! Content fingerprints used to decide whether a cached result is still valid.

use serde::Serialize;
use std::fmt;

/// A 256-bit blake3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        self.0[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Incremental fingerprint builder.
///
/// Every field is written with a one-byte tag and a length prefix so that
/// adjacent fields cannot alias each other.
pub struct FingerprintBuilder {
    hasher: blake3::Hasher,
}

impl FingerprintBuilder {
    pub fn new(domain: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(domain.len() as u64).to_le_bytes());
        hasher.update(domain.as_bytes());
        Self { hasher }
    }

    pub fn bytes(&mut self, tag: u8, bytes: &[u8]) -> &mut Self {
        self.hasher.update(&[tag]);
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self
    }

    pub fn str(&mut self, tag: u8, s: &str) -> &mut Self {
        self.bytes(tag, s.as_bytes())
    }

    pub fn f64(&mut self, tag: u8, v: f64) -> &mut Self {
        // Fold -0.0 into 0.0 so equal geometry hashes equal.
        let v = if v == 0.0 { 0.0 } else { v };
        self.bytes(tag, &v.to_bits().to_le_bytes())
    }

    pub fn u64(&mut self, tag: u8, v: u64) -> &mut Self {
        self.bytes(tag, &v.to_le_bytes())
    }

    pub fn fingerprint(&mut self, tag: u8, fp: &Fingerprint) -> &mut Self {
        self.bytes(tag, fp.as_bytes())
    }

    /// Hash the canonical JSON form of `value`.
    pub fn json<T: Serialize>(&mut self, tag: u8, value: &T) -> Result<&mut Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.bytes(tag, &bytes))
    }

    pub fn finish(&self) -> Fingerprint {
        Fingerprint(*self.hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_fingerprint() {
        let a = FingerprintBuilder::new("t").str(1, "abc").f64(2, 1.5).finish();
        let b = FingerprintBuilder::new("t").str(1, "abc").f64(2, 1.5).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn field_boundaries_do_not_alias() {
        let a = FingerprintBuilder::new("t").str(1, "ab").str(1, "c").finish();
        let b = FingerprintBuilder::new("t").str(1, "a").str(1, "bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn negative_zero_folds() {
        let a = FingerprintBuilder::new("t").f64(1, 0.0).finish();
        let b = FingerprintBuilder::new("t").f64(1, -0.0).finish();
        assert_eq!(a, b);
    }
}
