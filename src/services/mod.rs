//! Business logic services.

pub mod cascade;
pub mod event_broadcaster;
pub mod feed;
pub mod pdf_backfill;
pub mod pdf_export;
pub mod report_layout;
pub mod storage;
pub mod submission;

pub use event_broadcaster::EventBroadcaster;
pub use pdf_backfill::start_pdf_backfill_task;
pub use pdf_export::{EvidencePhotos, PdfExporter, PdfRenderer, PrintPdfRenderer, ReportFonts};
pub use storage::{ObjectStore, PublicUrls, Storage, StorageBuckets};
pub use submission::{UpdateForm, UpdateSubmission};
