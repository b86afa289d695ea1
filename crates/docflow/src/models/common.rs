//! Shared serde helpers for catalog models

/// Serde helper for `Option<DateTime<Utc>>` stored as BSON datetime.
pub mod bson_datetime_option {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => {
                let bson_dt = bson::DateTime::from_chrono(*dt);
                Serialize::serialize(&bson_dt, serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}

/// Weak ETag over a document revision counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag(pub String);

impl ETag {
    pub fn from_revision(revision: i64) -> Self {
        ETag(format!("W/\"{:x}\"", revision))
    }

    /// Parse an `If-Match` style value
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.starts_with("W/\"") && s.ends_with('"') && s.len() > 4 {
            Some(ETag(s.to_string()))
        } else if s.starts_with('"') && s.ends_with('"') && s.len() > 2 {
            Some(ETag(format!("W/{}", s)))
        } else {
            None
        }
    }

    /// Revision encoded in this tag
    pub fn revision(&self) -> Option<i64> {
        let inner = self.0.strip_prefix("W/\"")?.strip_suffix('"')?;
        i64::from_str_radix(inner, 16).ok()
    }
}

impl std::fmt::Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
