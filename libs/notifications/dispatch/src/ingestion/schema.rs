//! Table layouts in the analytical store.

use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    DateTime,
    Int,
    String,
}

impl ColumnType {
    fn as_kql(&self) -> &'static str {
        match self {
            ColumnType::DateTime => "datetime",
            ColumnType::Int => "int",
            ColumnType::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub mapping: &'static str,
    pub columns: &'static [(&'static str, ColumnType)],
}

pub const EMAIL_TABLE: TableSchema = TableSchema {
    table: "DotFlyerEmails",
    mapping: "DotFlyerEmailsMapping",
    columns: &[
        ("IngestDateTimeUtc", ColumnType::DateTime),
        ("StatusCode", ColumnType::Int),
        ("Status", ColumnType::String),
        ("ResponseContent", ColumnType::String),
        ("FromEmail", ColumnType::String),
        ("FromName", ColumnType::String),
        ("To", ColumnType::String),
        ("Cc", ColumnType::String),
        ("Bcc", ColumnType::String),
        ("Subject", ColumnType::String),
        ("Body", ColumnType::String),
        ("Attachments", ColumnType::String),
        ("Tags", ColumnType::String),
        ("TemplateId", ColumnType::String),
    ],
};

pub const SMS_TABLE: TableSchema = TableSchema {
    table: "DotFlyerSMSs",
    mapping: "DotFlyerSMSsMapping",
    columns: &[
        ("IngestDateTimeUtc", ColumnType::DateTime),
        ("StatusCode", ColumnType::Int),
        ("Status", ColumnType::String),
        ("ResponseContent", ColumnType::String),
        ("From", ColumnType::String),
        ("To", ColumnType::String),
        ("Body", ColumnType::String),
        ("Tags", ColumnType::String),
    ],
};

impl TableSchema {
    /// `.create-merge table` adds missing columns and leaves existing data alone.
    pub fn create_merge_command(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|(name, kind)| format!("['{name}']:{}", kind.as_kql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(".create-merge table ['{}'] ({columns})", self.table)
    }

    /// JSON ingestion mapping reading every column from `$.<Column>`.
    pub fn mapping_command(&self) -> String {
        let mapping = self
            .columns
            .iter()
            .map(|(name, _)| {
                json!({
                    "column": name,
                    "Properties": { "Path": format!("$.{name}") }
                })
            })
            .collect::<Vec<_>>();
        let mapping = serde_json::Value::Array(mapping).to_string();

        format!(
            ".create-or-alter table ['{}'] ingestion json mapping '{}' '{}'",
            self.table,
            self.mapping,
            mapping.replace('\'', "\\'")
        )
    }
}
