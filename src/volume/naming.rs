//! Claim name derivation for the logical volumes of a cluster.

/// Claim name of the write-ahead log volume
pub fn wal_claim_name(prefix: &str) -> String {
    format!("{}-wal", prefix)
}

/// Claim name of a tablespace volume
pub fn tablespace_claim_name(prefix: &str, tablespace: &str) -> String {
    format!("{}-tablespace-{}", prefix, tablespace)
}
