use crate::workflows::evidence::domain::EvidenceItem;

pub const MANIFEST_FILE: &str = "MANIFEST.csv";
pub const FAILURES_FILE: &str = "FAILURES.txt";

/// Column layout of `MANIFEST.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestLayout {
    /// One request: a row for every resolved evidence item.
    SingleRequest,
    /// Many requests: a row for every fetched payload, with its request and path.
    MultiRequest,
}

impl ManifestLayout {
    pub const fn header(self) -> &'static [&'static str] {
        match self {
            Self::SingleRequest => &[
                "EvidenceId",
                "Description",
                "Link",
                "Unit",
                "ResponsibleParty",
            ],
            Self::MultiRequest => &[
                "RequestId",
                "EvidenceId",
                "Description",
                "Link",
                "Unit",
                "ResponsibleParty",
                "Path",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub request_id: String,
    pub evidence_id: String,
    pub description: String,
    pub link: String,
    pub unit: String,
    pub responsible_party: String,
    pub path: String,
}

impl ManifestRow {
    pub fn for_item(request_id: &str, item: &EvidenceItem, path: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            evidence_id: item.id.clone(),
            description: item.description.clone(),
            link: item.source_link.clone(),
            unit: item.unit.clone(),
            responsible_party: item.responsible_party.clone(),
            path: path.into(),
        }
    }

    fn fields(&self, layout: ManifestLayout) -> Vec<&str> {
        let common = [
            self.evidence_id.as_str(),
            self.description.as_str(),
            self.link.as_str(),
            self.unit.as_str(),
            self.responsible_party.as_str(),
        ];
        match layout {
            ManifestLayout::SingleRequest => common.to_vec(),
            ManifestLayout::MultiRequest => std::iter::once(self.request_id.as_str())
                .chain(common)
                .chain(std::iter::once(self.path.as_str()))
                .collect(),
        }
    }
}

/// Ordered manifest rows for one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    layout: ManifestLayout,
    rows: Vec<ManifestRow>,
}

impl Manifest {
    pub fn new(layout: ManifestLayout) -> Self {
        Self {
            layout,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: ManifestRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the manifest with every field quoted.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(self.layout.header())?;
        for row in &self.rows {
            writer.write_record(row.fields(self.layout))?;
        }

        writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))
    }
}
