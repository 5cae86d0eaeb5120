use serde::{Deserialize, Serialize};

/// Kind of record an opportunity can be created from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelatedKind {
    Account,
    Campaign,
    Contact,
}

impl std::fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Account => write!(f, "account"),
            Self::Campaign => write!(f, "campaign"),
            Self::Contact => write!(f, "contact"),
        }
    }
}

/// Reference to a related record, as passed by the "new opportunity" link
/// on a related page: `<kind>_<id>`, e.g. `campaign_6f1f...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedRef {
    pub kind: RelatedKind,
    pub id: String,
}

impl std::str::FromStr for RelatedRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('_')
            .ok_or_else(|| anyhow::anyhow!("Invalid related reference: {}", s))?;
        let kind = match kind {
            "account" => RelatedKind::Account,
            "campaign" => RelatedKind::Campaign,
            "contact" => RelatedKind::Contact,
            _ => return Err(anyhow::anyhow!("Invalid related kind: {}", kind)),
        };
        if id.is_empty() {
            return Err(anyhow::anyhow!("Missing related id: {}", s));
        }
        Ok(Self { kind, id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_and_id() {
        let related: RelatedRef = "campaign_abc-123".parse().unwrap();
        assert_eq!(related.kind, RelatedKind::Campaign);
        assert_eq!(related.id, "abc-123");
    }

    #[test]
    fn rejects_unknown_kind_and_missing_id() {
        assert!("lead_9".parse::<RelatedRef>().is_err());
        assert!("campaign_".parse::<RelatedRef>().is_err());
        assert!("campaign".parse::<RelatedRef>().is_err());
    }
}
