use std::fmt;

/// Binary megabyte (MiB), the unit the upload limit is expressed in.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Archive size measured against the direct-upload limit.
///
/// The limit is advisory: an oversized archive is still a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub bytes: u64,
    pub limit_mb: u64,
}

impl SizeReport {
    pub fn new(bytes: u64, limit_mb: u64) -> Self {
        Self { bytes, limit_mb }
    }

    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_MB as f64
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Strictly greater than the limit; an archive of exactly the limit still fits.
    pub fn exceeds_limit(&self) -> bool {
        self.bytes > self.limit_bytes()
    }

    /// The line printed after the size, depending on which side of the limit we landed.
    pub fn verdict(&self) -> String {
        if self.exceeds_limit() {
            format!(
                "Warning: archive exceeds {} MB. Upload it via S3 instead.",
                self.limit_mb
            )
        } else {
            "Size OK for direct Lambda upload".to_owned()
        }
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} MB", self.megabytes())
    }
}
