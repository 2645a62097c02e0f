use blake3::Hasher;

/// Content id of a normalized source, `b3:<hex>`.
pub fn digest_b3(bytes: &[u8]) -> String {
    let mut h = Hasher::new();
    h.update(bytes);
    let hash = h.finalize();
    format!("b3:{}", hex::encode(hash.as_bytes()))
}
