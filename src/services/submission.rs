//! Update submission: form state, validation and the submit flow.
//!
//! A submission generates an identity code, uploads the photos one at a time,
//! inserts the update row and then tries to export the report PDF. Photo and
//! PDF failures degrade the result; a failed insert aborts the submission.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::RngExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::RecordStore;
use crate::error::{AppError, AppResult};
use crate::models::{MAX_RESIDENTS, NewRealTimeUpdate, RealTimeUpdate, SubmitUpdateResponse, UpdateType};
use crate::services::pdf_export::PdfExporter;
use crate::services::storage::{ObjectStore, Storage};

/// Prefix of generated identity codes.
pub const UPDATE_CODE_PREFIX: &str = "RTU";

/// Length of the random identity code suffix.
pub const UPDATE_CODE_SUFFIX_LEN: usize = 6;

/// Longest accepted `update_no`, matching its column width.
pub const MAX_UPDATE_NO_LEN: usize = 64;

/// Photo extensions accepted on submission.
pub const ALLOWED_PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic"];

/// Generate an identity code: `RTU-<epoch-millis>-<6 uppercase alphanumerics>`.
pub fn generate_update_code(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(UPDATE_CODE_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();

    format!("{}-{}-{}", UPDATE_CODE_PREFIX, now.timestamp_millis(), suffix)
}

/// Parse a report date typed as `dd/mm/yyyy` or sent as `yyyy-mm-dd`.
pub fn parse_report_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| {
            AppError::InvalidInput(format!(
                "Invalid date '{}': expected dd/mm/yyyy or yyyy-mm-dd",
                raw
            ))
        })
}

/// A selected photo held in memory until it is uploaded.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Lowercased file extension, `jpg` when there is none.
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
            _ => "jpg".to_string(),
        }
    }

    fn object_key(&self, update_code: &str, seq: usize) -> String {
        format!(
            "photos/{}/{:02}_{}.{}",
            update_code,
            seq,
            self.id.simple(),
            self.extension()
        )
    }

    fn resolved_content_type(&self) -> String {
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => ct.to_string(),
            _ => Storage::content_type_for_extension(&self.extension()).to_string(),
        }
    }
}

/// In-progress update form as received from the dashboard.
///
/// Text values are kept raw until `validate`; photos keep their selection order.
#[derive(Debug, Clone, Default)]
pub struct UpdateForm {
    pub project_id: Option<String>,
    pub csr_partner_id: Option<String>,
    pub toll_id: Option<String>,
    pub update_no: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub day: Option<String>,
    pub tutor: Option<String>,
    pub filled_by: Option<String>,
    pub activity: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub update_type: Option<String>,
    pub residents: Vec<String>,
    pub photos: Vec<PhotoUpload>,
}

impl UpdateForm {
    /// Set a text field by its form name. Returns false for unknown names.
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "project_id" => &mut self.project_id,
            "csr_partner_id" => &mut self.csr_partner_id,
            "toll_id" => &mut self.toll_id,
            "update_no" => &mut self.update_no,
            "date" => &mut self.date,
            "location" => &mut self.location,
            "day" => &mut self.day,
            "tutor" => &mut self.tutor,
            "filled_by" => &mut self.filled_by,
            "activity" => &mut self.activity,
            "title" => &mut self.title,
            "description" => &mut self.description,
            "update_type" => &mut self.update_type,
            "resident" | "residents" | "residents[]" => {
                self.residents.push(value);
                return true;
            }
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Check required fields and parse values.
    ///
    /// Nothing is written anywhere before this succeeds.
    pub fn validate(self) -> AppResult<ValidatedForm> {
        let project_id = required(self.project_id, "project_id")?;
        let project_id = Uuid::parse_str(&project_id)
            .map_err(|_| AppError::InvalidInput(format!("Invalid project_id '{}'", project_id)))?;
        let update_no = required(self.update_no, "update_no")?;
        if update_no.chars().count() > MAX_UPDATE_NO_LEN {
            return Err(AppError::InvalidInput(format!(
                "update_no must be at most {} characters",
                MAX_UPDATE_NO_LEN
            )));
        }
        let report_date = parse_report_date(&required(self.date, "date")?)?;

        let update_type = match optional(self.update_type) {
            Some(raw) => UpdateType::parse(&raw)
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid update_type '{}'", raw)))?,
            None => UpdateType::default(),
        };

        let residents: Vec<String> = self
            .residents
            .into_iter()
            .filter_map(|name| optional(Some(name)))
            .collect();
        if residents.len() > MAX_RESIDENTS {
            return Err(AppError::InvalidInput(format!(
                "At most {} residents allowed, got {}",
                MAX_RESIDENTS,
                residents.len()
            )));
        }

        for photo in &self.photos {
            let ext = photo.extension();
            if !ALLOWED_PHOTO_EXTENSIONS.contains(&ext.as_str()) {
                return Err(AppError::InvalidInput(format!(
                    "Photo '{}' has unsupported extension '{}'",
                    photo.file_name, ext
                )));
            }
        }

        Ok(ValidatedForm {
            draft: NewRealTimeUpdate {
                update_code: String::new(),
                project_id,
                csr_partner_id: optional_uuid(self.csr_partner_id, "csr_partner_id")?,
                toll_id: optional_uuid(self.toll_id, "toll_id")?,
                update_no,
                report_date,
                location: optional(self.location),
                day: optional(self.day),
                tutor: optional(self.tutor),
                filled_by: optional(self.filled_by),
                activity: optional(self.activity),
                title: optional(self.title),
                description: optional(self.description),
                residents,
                update_type,
                photos: Vec::new(),
            },
            photos: self.photos,
        })
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    optional(value).ok_or_else(|| AppError::InvalidInput(format!("{} is required", field)))
}

fn optional_uuid(value: Option<String>, field: &str) -> AppResult<Option<Uuid>> {
    optional(value)
        .map(|raw| {
            Uuid::parse_str(&raw)
                .map_err(|_| AppError::InvalidInput(format!("Invalid {} '{}'", field, raw)))
        })
        .transpose()
}

/// A form that passed validation. The draft has no code or photos yet.
#[derive(Debug, Clone)]
pub struct ValidatedForm {
    pub draft: NewRealTimeUpdate,
    pub photos: Vec<PhotoUpload>,
}

/// Result of a submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub update: RealTimeUpdate,
    pub photos_selected: usize,
    pub photos_uploaded: usize,
    pub pdf_generated: bool,
}

impl From<SubmissionOutcome> for SubmitUpdateResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        SubmitUpdateResponse {
            update: outcome.update,
            photos_selected: outcome.photos_selected,
            photos_uploaded: outcome.photos_uploaded,
            pdf_generated: outcome.pdf_generated,
        }
    }
}

/// The submit flow over the record store, the photo bucket and the exporter.
#[derive(Clone)]
pub struct UpdateSubmission {
    records: Arc<dyn RecordStore>,
    photos: Arc<dyn ObjectStore>,
    exporter: PdfExporter,
}

impl UpdateSubmission {
    pub fn new(
        records: Arc<dyn RecordStore>,
        photos: Arc<dyn ObjectStore>,
        exporter: PdfExporter,
    ) -> Self {
        Self {
            records,
            photos,
            exporter,
        }
    }

    pub async fn submit(&self, form: UpdateForm) -> AppResult<SubmissionOutcome> {
        let ValidatedForm { mut draft, photos } = form.validate()?;

        let update_code = generate_update_code(Utc::now());
        let photos_selected = photos.len();

        let (photo_urls, uploaded_keys) = self.upload_photos(&update_code, photos).await;
        let photos_uploaded = photo_urls.len();

        draft.update_code = update_code.clone();
        draft.photos = photo_urls;

        let update = match self.records.insert_update(draft).await {
            Ok(update) => update,
            Err(e) => {
                self.discard_photos(&update_code, &uploaded_keys).await;
                return Err(e);
            }
        };

        info!(
            update_code = %update.update_code,
            update_id = %update.id,
            photos_selected,
            photos_uploaded,
            "Update submitted"
        );

        let (update, pdf_generated) = match self.exporter.try_export(&update).await {
            Some(exported) => (exported, true),
            None => (update, false),
        };

        Ok(SubmissionOutcome {
            update,
            photos_selected,
            photos_uploaded,
            pdf_generated,
        })
    }

    /// Upload photos in selection order. Failed uploads are logged and dropped.
    async fn upload_photos(
        &self,
        update_code: &str,
        photos: Vec<PhotoUpload>,
    ) -> (Vec<String>, Vec<String>) {
        let mut urls = Vec::with_capacity(photos.len());
        let mut keys = Vec::with_capacity(photos.len());

        for (index, photo) in photos.into_iter().enumerate() {
            let key = photo.object_key(update_code, index + 1);
            let content_type = photo.resolved_content_type();

            match self.photos.put(&key, photo.bytes, &content_type).await {
                Ok(()) => {
                    urls.push(self.photos.urls().url_for(&key));
                    keys.push(key);
                }
                Err(e) => {
                    warn!(
                        update_code = %update_code,
                        file_name = %photo.file_name,
                        key = %key,
                        error = %e,
                        "Photo upload failed; dropping photo"
                    );
                }
            }
        }

        (urls, keys)
    }

    /// Best-effort removal of photos uploaded for a submission that was not stored.
    async fn discard_photos(&self, update_code: &str, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.photos.remove(key).await {
                warn!(update_code = %update_code, key = %key, error = %e, "Failed to remove orphaned photo");
            }
        }
    }
}
