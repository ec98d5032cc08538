use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const EVIDENCE_PREFIX: &str = "BKT";
pub const REQUEST_PREFIX: &str = "PRM";

/// Alert window applied when nothing else has been configured.
pub const DEFAULT_ALERT_THRESHOLD_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Validity {
    #[default]
    Valid,
    #[serde(alias = "Needs Revision")]
    NeedsRevision,
}

impl Validity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::NeedsRevision => "Needs Revision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Pending,
    Fulfilled,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Fulfilled => "Fulfilled",
        }
    }
}

/// A discrete piece of audit documentation with a retrieval link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_link: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub responsible_party: String,
    #[serde(default, with = "calendar_date")]
    pub received_date: Option<NaiveDate>,
    #[serde(default)]
    pub validity: Validity,
    #[serde(default)]
    pub note: String,
    /// Back-reference to a request id, empty when unlinked.
    #[serde(default)]
    pub related_request_id: String,
}

impl EvidenceItem {
    pub fn has_link(&self) -> bool {
        !self.source_link.trim().is_empty()
    }
}

/// A tracked ask for one or more evidence items.
///
/// The two deadline fields are kept as entered: `deadline_date` is a calendar
/// date (`YYYY-MM-DD`) and `deadline_alt` is the compact day-month-year form
/// (`15-10-25`). Both are interpreted by the deadline engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRequest {
    pub id: String,
    #[serde(default, with = "calendar_date")]
    pub request_date: Option<NaiveDate>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline_date: String,
    #[serde(default, alias = "waktu")]
    pub deadline_alt: String,
    #[serde(default)]
    pub responsible_party: String,
    #[serde(default)]
    pub linked_evidence_ids: Vec<String>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, with = "calendar_date")]
    pub fulfillment_date: Option<NaiveDate>,
}

impl EvidenceRequest {
    pub fn is_fulfilled(&self) -> bool {
        self.status == RequestStatus::Fulfilled
    }
}

/// Next identifier for `prefix`: one past the largest numeric id already in use.
///
/// Ids are reduced to their digits before parsing; ids with no digits count as 0.
pub fn next_id<'a, I>(prefix: &str, ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = ids
        .into_iter()
        .filter(|id| id.starts_with(prefix))
        .map(|id| {
            let digits: String = id.chars().filter(char::is_ascii_digit).collect();
            digits.parse::<u64>().unwrap_or(0)
        })
        .max()
        .unwrap_or(0);

    format!("{prefix}-{:03}", highest.saturating_add(1))
}

/// Serde adapter for optional calendar dates stored as `YYYY-MM-DD` or `""`.
///
/// Blank values read as `None`; anything else that is not a calendar date is
/// rejected rather than dropped.
pub(crate) mod calendar_date {
    use chrono::NaiveDate;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::workflows::evidence::deadline::parse_calendar_date;

    pub(crate) fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.collect_str(&date.format("%Y-%m-%d")),
            None => serializer.serialize_str(""),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_calendar_date(text).map(Some).ok_or_else(|| {
                D::Error::custom(format!("invalid calendar date '{text}', expected YYYY-MM-DD"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_skips_malformed_ids() {
        let ids = [
            "PRM-001", "PRM-002", "PRM-abc", "PRM-003", "PRM-004", "PRM-005", "PRM-006",
            "PRM-007",
        ];
        assert_eq!(next_id("PRM", ids), "PRM-008");
    }

    #[test]
    fn next_id_starts_at_one() {
        assert_eq!(next_id(EVIDENCE_PREFIX, std::iter::empty::<&str>()), "BKT-001");
    }

    #[test]
    fn next_id_grows_past_three_digits() {
        assert_eq!(next_id("BKT", ["BKT-999"]), "BKT-1000");
    }

    #[test]
    fn evidence_deserializes_with_missing_optional_fields() {
        let item: EvidenceItem = serde_json::from_str(
            r#"{"id":"BKT-001","description":"Bank statement","receivedDate":""}"#,
        )
        .expect("lenient evidence");
        assert_eq!(item.received_date, None);
        assert_eq!(item.validity, Validity::Valid);
        assert!(item.related_request_id.is_empty());
    }

    #[test]
    fn unreadable_dates_are_rejected() {
        let error = serde_json::from_str::<EvidenceItem>(
            r#"{"id":"BKT-001","receivedDate":"15/10/2025"}"#,
        )
        .expect_err("non calendar date");
        assert!(error.to_string().contains("15/10/2025"));
    }

    #[test]
    fn calendar_dates_survive_a_round_trip() {
        let raw = r#"{"id":"PRM-001","requestDate":"2025-10-01","fulfillmentDate":"2025-10-09T08:00:00+07:00"}"#;
        let request: EvidenceRequest = serde_json::from_str(raw).expect("request parses");
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["requestDate"], "2025-10-01");
        assert_eq!(value["fulfillmentDate"], "2025-10-09");

        let again: EvidenceRequest = serde_json::from_value(value).expect("reparse");
        assert_eq!(again, request);
    }

    #[test]
    fn request_accepts_legacy_compact_deadline_name() {
        let request: EvidenceRequest =
            serde_json::from_str(r#"{"id":"PRM-001","waktu":"15-10-25","status":"Fulfilled"}"#)
                .expect("legacy request");
        assert_eq!(request.deadline_alt, "15-10-25");
        assert!(request.is_fulfilled());
    }

    #[test]
    fn dates_serialize_as_calendar_strings() {
        let request = EvidenceRequest {
            id: "PRM-001".to_string(),
            request_date: NaiveDate::from_ymd_opt(2025, 10, 1),
            ..EvidenceRequest::default()
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["requestDate"], "2025-10-01");
        assert_eq!(value["fulfillmentDate"], "");
        assert_eq!(value["linkedEvidenceIds"], serde_json::json!([]));
    }
}
