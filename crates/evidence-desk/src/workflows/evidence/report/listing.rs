use chrono::NaiveDate;

use super::super::domain::{EvidenceItem, EvidenceRequest};

pub const EVIDENCE_LISTING_HEADER: [&str; 10] = [
    "Id",
    "Category",
    "Description",
    "Link",
    "Unit",
    "ResponsibleParty",
    "ReceivedDate",
    "Validity",
    "Note",
    "RelatedRequestId",
];

pub const REQUEST_LISTING_HEADER: [&str; 10] = [
    "Id",
    "RequestDate",
    "Unit",
    "Description",
    "DeadlineDate",
    "DeadlineAlt",
    "ResponsibleParty",
    "LinkedEvidenceIds",
    "Status",
    "FulfillmentDate",
];

fn date_field(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn write_rows<const N: usize>(
    header: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// The evidence bank as CSV, one row per item.
pub fn evidence_listing_csv(evidence: &[EvidenceItem]) -> Result<Vec<u8>, csv::Error> {
    write_rows(
        EVIDENCE_LISTING_HEADER,
        evidence.iter().map(|item| {
            [
                item.id.clone(),
                item.category.clone(),
                item.description.clone(),
                item.source_link.clone(),
                item.unit.clone(),
                item.responsible_party.clone(),
                date_field(item.received_date),
                item.validity.label().to_string(),
                item.note.clone(),
                item.related_request_id.clone(),
            ]
        }),
    )
}

/// Requests as CSV; linked evidence ids are joined with `;`.
pub fn request_listing_csv(requests: &[EvidenceRequest]) -> Result<Vec<u8>, csv::Error> {
    write_rows(
        REQUEST_LISTING_HEADER,
        requests.iter().map(|request| {
            [
                request.id.clone(),
                date_field(request.request_date),
                request.unit.clone(),
                request.description.clone(),
                request.deadline_date.clone(),
                request.deadline_alt.clone(),
                request.responsible_party.clone(),
                request.linked_evidence_ids.join(";"),
                request.status.label().to_string(),
                date_field(request.fulfillment_date),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::evidence::domain::RequestStatus;

    #[test]
    fn request_listing_joins_links() {
        let request = EvidenceRequest {
            id: "PRM-003".to_string(),
            description: "Access review, Q3".to_string(),
            deadline_date: "2025-10-10".to_string(),
            deadline_alt: "10-10-25".to_string(),
            linked_evidence_ids: vec!["BKT-001".to_string(), "BKT-004".to_string()],
            status: RequestStatus::Fulfilled,
            fulfillment_date: NaiveDate::from_ymd_opt(2025, 10, 9),
            ..EvidenceRequest::default()
        };

        let csv = String::from_utf8(request_listing_csv(&[request]).expect("csv")).expect("utf8");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"Id\",\"RequestDate\""));
        assert_eq!(
            lines[1],
            "\"PRM-003\",\"\",\"\",\"Access review, Q3\",\"2025-10-10\",\"10-10-25\",\"\",\"BKT-001;BKT-004\",\"Fulfilled\",\"2025-10-09\""
        );
    }

    #[test]
    fn empty_evidence_listing_is_header_only() {
        let csv = evidence_listing_csv(&[]).expect("csv");
        assert_eq!(
            String::from_utf8(csv).expect("utf8").lines().count(),
            1
        );
    }
}
