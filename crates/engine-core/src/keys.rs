use sha2::{Digest, Sha256};

pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Sequence number of document `j` (1-based) in batch `i` (1-based) of
/// worker `id`, each worker writing `batches` batches of `batch_size`.
pub fn sequence(id: u64, batches: u64, batch_size: u64, i: u64, j: u64) -> u64 {
    (id * batches + i - 1) * batch_size + j
}

/// Document key derived from a sequence number.
pub fn document_key(seq: u64) -> String {
    sha256_hex(&seq.to_string())
}

/// Content hash stored next to the key.
pub fn document_sha(seq: u64) -> String {
    sha256_hex(&format!("SHA{seq}"))
}
