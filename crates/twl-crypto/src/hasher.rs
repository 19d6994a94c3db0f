use twl_types::Hash;

/// BLAKE3 under a fixed domain tag.
///
/// The tag and a `:` separator are fed to the hasher ahead of the data, so
/// identical bytes hashed for two purposes yield unrelated digests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Content addresses of canonical packet encodings.
    pub const PACKET: Self = Self::new("twl-packet-v1");
    /// Messages signed by satisfiers over a body hash.
    pub const SATISFY: Self = Self::new("twl-satisfy-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn hash(&self, data: &[u8]) -> Hash {
        let digest = blake3::Hasher::new()
            .update(self.domain.as_bytes())
            .update(b":")
            .update(data)
            .finalize();
        Hash::from_hash(*digest.as_bytes())
    }

    /// Whether `data` hashes to `expected` under this domain.
    pub fn verify(&self, data: &[u8], expected: &Hash) -> bool {
        self.hash(data) == *expected
    }
}
