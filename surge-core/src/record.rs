use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::case::{Case, CaseRun};

/// Datetime layout used in report files and on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Leading columns of every report file; also used to recognize report files.
pub const REPORT_HEADER: &str = r#""Repeat Index","Id","Description","Status","Expected","Received","Output","Starts DateTime","Ends DateTime","E2E Taken","Log Path""#;

/// Immutable snapshot of a finished case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub repeat_index: u64,
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub status: bool,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub received: Option<String>,
    #[serde(default)]
    pub output_messages: Vec<String>,
    #[serde(default, with = "timestamp")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub time_taken: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<String>,
}

impl ResultRecord {
    pub fn new(case: &dyn Case, run: &CaseRun) -> Self {
        Self {
            repeat_index: run.repeat_index,
            id: case.id().to_string(),
            description: case.description().to_string(),
            status: run.is_pass(),
            expected: run.expected.clone(),
            received: run.received.clone(),
            output_messages: run.output_messages.clone(),
            start_time: run.start_time,
            end_time: run.end_time,
            time_taken: run.time_taken(),
            log_path: run.log_path.as_ref().map(|p| p.display().to_string()),
            additional: run.additional_messages.clone(),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.status { "Pass" } else { "Fail" }
    }

    /// One report row, terminated by a newline. Output messages are joined with an
    /// embedded line break inside their quoted field.
    pub fn to_csv_row(&self) -> String {
        let output = self
            .output_messages
            .iter()
            .map(|m| csv_escape(m))
            .collect::<Vec<_>>()
            .join("\n");

        let mut row = format!(
            r#""{}","{}","{}","{}","{}","{}","{}","{}","{}","{}","{}""#,
            self.repeat_index,
            csv_escape(&self.id),
            csv_escape(&self.description),
            self.status_label(),
            csv_escape(self.expected.as_deref().unwrap_or("")),
            csv_escape(self.received.as_deref().unwrap_or("")),
            output,
            format_timestamp(self.start_time),
            format_timestamp(self.end_time),
            self.time_taken.map(|t| t.to_string()).unwrap_or_default(),
            csv_escape(self.log_path.as_deref().unwrap_or("")),
        );
        for extra in &self.additional {
            row.push_str(&format!(r#","{}""#, csv_escape(extra)));
        }
        row.push('\n');
        row
    }

    /// One self-describing datagram payload.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// Header line (with trailing newline) for a report carrying `extra` additional columns.
pub fn report_header(extra: &[String]) -> String {
    let mut header = REPORT_HEADER.to_string();
    for h in extra {
        header.push(',');
        header.push_str(h);
    }
    header.push('\n');
    header
}

pub fn csv_escape(value: &str) -> String {
    value.replace('"', "\"\"")
}

pub fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    value
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

pub fn parse_timestamp(value: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&super::format_timestamp(Some(*t))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| super::parse_timestamp(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
