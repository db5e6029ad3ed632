//! Uploaded clips and schedule entries for store mode.
//!
//! These records are bookkeeping for display only. Nothing here plays a
//! clip or switches a device when a scheduled time arrives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Kind of uploaded content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Audio,
    Playlist,
}

/// A clip uploaded to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedContent {
    pub id: String,
    pub name: String,
    /// Display label such as `2:30`
    pub duration: String,
    pub upload_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl UploadedContent {
    /// Record a fresh upload. Duration is unknown until probed, shown as `0:00`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("content-{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            duration: "0:00".to_string(),
            upload_date: Utc::now(),
            content_type: ContentType::Audio,
        }
    }
}

/// Repeat cadence of a schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
}

/// A schedule entry for uploaded content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledContent {
    pub id: String,
    pub content_id: String,
    pub content_name: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub repeat: Repeat,
}

/// Form input for a new schedule entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRequest {
    pub content_id: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub date: String,
    pub repeat: Repeat,
}

impl ScheduleRequest {
    /// Check required fields, in the order a form would report them
    pub fn validate(&self) -> Result<()> {
        if self.content_id.trim().is_empty() {
            return Err(RegistryError::MissingField("contentId"));
        }
        if self.start_time.trim().is_empty() {
            return Err(RegistryError::MissingField("startTime"));
        }
        if self.date.trim().is_empty() {
            return Err(RegistryError::MissingField("date"));
        }
        Ok(())
    }
}

/// Uploads and schedules belonging to one device
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    uploads: Vec<UploadedContent>,
    schedules: Vec<ScheduledContent>,
}

impl ContentLibrary {
    pub fn uploads(&self) -> &[UploadedContent] {
        &self.uploads
    }

    pub fn schedules(&self) -> &[ScheduledContent] {
        &self.schedules
    }

    pub fn upload(&mut self, name: &str) -> Result<UploadedContent> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::MissingField("name"));
        }
        let content = UploadedContent::new(name);
        self.uploads.push(content.clone());
        Ok(content)
    }

    pub fn schedule(&mut self, request: ScheduleRequest) -> Result<ScheduledContent> {
        request.validate()?;

        let content = self
            .uploads
            .iter()
            .find(|c| c.id == request.content_id)
            .ok_or_else(|| RegistryError::ContentNotFound(request.content_id.clone()))?;

        let end_time = match request.end_time {
            Some(end) if !end.trim().is_empty() => end,
            _ => request.start_time.clone(),
        };

        let entry = ScheduledContent {
            id: format!("schedule-{}", uuid::Uuid::new_v4().simple()),
            content_id: content.id.clone(),
            content_name: content.name.clone(),
            start_time: request.start_time,
            end_time,
            date: request.date,
            repeat: request.repeat,
        };
        self.schedules.push(entry.clone());
        Ok(entry)
    }

    pub fn remove_schedule(&mut self, schedule_id: &str) -> bool {
        let before = self.schedules.len();
        self.schedules.retain(|s| s.id != schedule_id);
        self.schedules.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(content_id: &str) -> ScheduleRequest {
        ScheduleRequest {
            content_id: content_id.to_string(),
            start_time: "09:00".to_string(),
            end_time: None,
            date: "2024-01-15".to_string(),
            repeat: Repeat::Daily,
        }
    }

    #[test]
    fn test_upload_records_placeholder_duration() {
        let mut library = ContentLibrary::default();
        let content = library.upload("Store Announcement.mp3").unwrap();

        assert_eq!(content.duration, "0:00");
        assert_eq!(content.content_type, ContentType::Audio);
        assert!(content.id.starts_with("content-"));
        assert_eq!(library.uploads().len(), 1);
    }

    #[test]
    fn test_upload_rejects_blank_name() {
        let mut library = ContentLibrary::default();
        assert_eq!(library.upload("  "), Err(RegistryError::MissingField("name")));
    }

    #[test]
    fn test_schedule_defaults_end_time_to_start() {
        let mut library = ContentLibrary::default();
        let content = library.upload("Special Promotion.mp3").unwrap();

        let entry = library.schedule(request(&content.id)).unwrap();
        assert_eq!(entry.end_time, "09:00");
        assert_eq!(entry.content_name, "Special Promotion.mp3");
        assert_eq!(entry.repeat, Repeat::Daily);
    }

    #[test]
    fn test_schedule_unknown_content() {
        let mut library = ContentLibrary::default();
        let result = library.schedule(request("content-missing"));
        assert_eq!(result, Err(RegistryError::ContentNotFound("content-missing".to_string())));
    }

    #[rstest]
    #[case("", "09:00", "2024-01-15", "contentId")]
    #[case("content-1", "", "2024-01-15", "startTime")]
    #[case("content-1", "09:00", "", "date")]
    fn test_schedule_missing_fields(
        #[case] content_id: &str,
        #[case] start_time: &str,
        #[case] date: &str,
        #[case] field: &'static str,
    ) {
        let request = ScheduleRequest {
            content_id: content_id.to_string(),
            start_time: start_time.to_string(),
            date: date.to_string(),
            ..Default::default()
        };
        assert_eq!(request.validate(), Err(RegistryError::MissingField(field)));
    }

    #[test]
    fn test_remove_schedule() {
        let mut library = ContentLibrary::default();
        let content = library.upload("clip.mp3").unwrap();
        let entry = library.schedule(request(&content.id)).unwrap();

        assert!(library.remove_schedule(&entry.id));
        assert!(!library.remove_schedule(&entry.id));
        assert!(library.schedules().is_empty());
    }

    #[test]
    fn test_schedule_request_deserialize() {
        let request: ScheduleRequest = serde_json::from_str(
            r#"{"contentId":"content-1","startTime":"10:30","date":"2024-02-01","repeat":"weekly"}"#,
        )
        .unwrap();
        assert_eq!(request.repeat, Repeat::Weekly);
        assert!(request.end_time.is_none());
    }
}
