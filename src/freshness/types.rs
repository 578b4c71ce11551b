use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last successful computation of one `(job_name, scope)` unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessRecord {
    pub job_name: String,
    pub scope: String,
    /// Hex BLAKE3 digest of the normalized inputs.
    pub input_hash: String,
    pub computed_at: DateTime<Utc>,
}

impl FreshnessRecord {
    pub fn new(
        job_name: impl Into<String>,
        scope: impl Into<String>,
        input_hash: impl Into<String>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            scope: scope.into(),
            input_hash: input_hash.into(),
            computed_at,
        }
    }

    /// Unique key.
    pub fn key(&self) -> (String, String) {
        (self.job_name.clone(), self.scope.clone())
    }
}
