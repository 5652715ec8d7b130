use std::path::{Path, PathBuf};

use chatbot_storage::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::chat::ConversationTurn;
use crate::error::{
    ClientResult, CreateExportDirectorySnafu, ExportSerializeSnafu, ExportWriteSnafu,
};

const EXPORT_FILE_STEM: &str = "chatbot-history";

/// Document written by a history export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryExport {
    pub platform: String,
    pub export_date: DateTime<Utc>,
    /// Absent for backends that do not track sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub message_count: usize,
    pub messages: Vec<ConversationTurn>,
}

impl HistoryExport {
    pub fn new(
        platform: impl Into<String>,
        export_date: DateTime<Utc>,
        session_id: Option<SessionId>,
        messages: Vec<ConversationTurn>,
    ) -> Self {
        Self {
            platform: platform.into(),
            export_date,
            session_id,
            message_count: messages.len(),
            messages,
        }
    }

    /// `<prefix>chatbot-history-YYYY-MM-DD.json`, dated by the export's UTC day.
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{prefix}{EXPORT_FILE_STEM}-{}.json",
            self.export_date.format("%Y-%m-%d")
        )
    }

    pub fn to_pretty_json(&self) -> ClientResult<String> {
        serde_json::to_string_pretty(self).context(ExportSerializeSnafu {
            stage: "serialize-export",
        })
    }

    /// Writes the export into `dir`, replacing a same-day export, and returns its path.
    pub fn write_to_dir(&self, dir: &Path, prefix: &str) -> ClientResult<PathBuf> {
        let payload = self.to_pretty_json()?;

        std::fs::create_dir_all(dir).context(CreateExportDirectorySnafu {
            stage: "create-export-dir",
            path: dir.display().to_string(),
        })?;

        let path = dir.join(self.file_name(prefix));
        std::fs::write(&path, payload).context(ExportWriteSnafu {
            stage: "write-export",
            path: path.display().to_string(),
        })?;

        tracing::info!(
            path = %path.display(),
            message_count = self.message_count,
            "exported conversation history"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> HistoryExport {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 22, 15, 0).unwrap();
        HistoryExport::new(
            "Django ChatBot",
            at,
            Some(SessionId::generate()),
            vec![
                ConversationTurn::new("hi", "hello", at),
                ConversationTurn::new("bye", "see you", at),
            ],
        )
    }

    #[test]
    fn file_name_carries_prefix_and_day() {
        let export = sample();
        assert_eq!(
            export.file_name("django-"),
            "django-chatbot-history-2024-03-09.json"
        );
        assert_eq!(export.file_name(""), "chatbot-history-2024-03-09.json");
    }

    #[test]
    fn written_file_matches_document() {
        let dir = tempfile::tempdir().unwrap();
        let export = sample();

        let path = export.write_to_dir(&dir.path().join("out"), "django-").unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(written["platform"], "Django ChatBot");
        assert_eq!(written["message_count"], 2);
        assert_eq!(written["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(written["messages"][0]["user_message"], "hi");
        assert_eq!(
            written["session_id"],
            export.session_id.map(|id| id.to_string()).unwrap_or_default()
        );
    }

    #[test]
    fn sessionless_export_omits_the_field() {
        let export = HistoryExport {
            session_id: None,
            ..sample()
        };

        let written: serde_json::Value =
            serde_json::from_str(&export.to_pretty_json().unwrap()).unwrap();
        assert!(written.get("session_id").is_none());
        assert_eq!(written["message_count"], 2);
    }

    #[test]
    fn unwritable_target_reports_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let error = sample().write_to_dir(&blocker, "").unwrap_err();
        assert!(matches!(
            error,
            crate::error::ClientError::CreateExportDirectory { .. }
        ));
    }
}
