//! PDF export for real-time updates.
//!
//! Builds the report layout for an update, fetches its evidence photos from the
//! photo bucket, renders a multi-page A4 PDF with the photos embedded, uploads the
//! binary to the report bucket under `real_time/` and writes the public URL back
//! onto the update row.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{
    Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use tracing::{error, info, warn};

use crate::config::ReportFontSettings;
use crate::db::RecordStore;
use crate::error::{AppError, AppResult};
use crate::models::RealTimeUpdate;
use crate::services::feed;
use crate::services::report_layout::{
    EVIDENCE_HEADING, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, ReportLayout, ReportPage, ReportTable,
};
use crate::services::storage::ObjectStore;

/// Key prefix for generated reports inside the report bucket.
pub const PDF_KEY_PREFIX: &str = "real_time";

/// Photo bytes fetched for a report, keyed by public URL.
pub type EvidencePhotos = HashMap<String, Vec<u8>>;

/// Turns a report layout into PDF bytes.
///
/// Photos missing from `photos` are drawn as captioned placeholders.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, layout: &ReportLayout, photos: &EvidencePhotos) -> AppResult<Vec<u8>>;
}

/// Object key for an update's report: `real_time/update_<no-or-code>_<millis>.pdf`.
pub fn pdf_object_key(update: &RealTimeUpdate, at: DateTime<Utc>) -> String {
    let label = match update.update_no.trim() {
        "" => update.update_code.as_str(),
        no => no,
    };
    let label: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "{}/update_{}_{}.pdf",
        PDF_KEY_PREFIX,
        label,
        at.timestamp_millis()
    )
}

/// Export and removal of report PDFs.
#[derive(Clone)]
pub struct PdfExporter {
    records: Arc<dyn RecordStore>,
    photos: Arc<dyn ObjectStore>,
    reports: Arc<dyn ObjectStore>,
    renderer: Arc<dyn PdfRenderer>,
}

impl PdfExporter {
    pub fn new(
        records: Arc<dyn RecordStore>,
        photos: Arc<dyn ObjectStore>,
        reports: Arc<dyn ObjectStore>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            records,
            photos,
            reports,
            renderer,
        }
    }

    /// Render, upload and link the report for an update.
    ///
    /// Returns the update with its new `pdf_url`. A previously linked report is
    /// removed from storage once the new one is in place. If the link cannot be
    /// written, the freshly uploaded report is removed again.
    pub async fn export(&self, update: &RealTimeUpdate) -> AppResult<RealTimeUpdate> {
        let heading = feed::heading_for_update(self.records.as_ref(), update).await?;
        let layout = ReportLayout::build(update, heading);
        let page_count = layout.page_count();
        let photos = self.fetch_photos(update).await;
        let embedded = photos.len();

        let renderer = Arc::clone(&self.renderer);
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&layout, &photos))
            .await
            .map_err(|e| AppError::Pdf(format!("Render task failed: {}", e)))??;

        let key = pdf_object_key(update, Utc::now());
        let size = bytes.len();
        self.reports.put(&key, bytes, "application/pdf").await?;

        let url = self.reports.urls().url_for(&key);
        let updated = match self.records.set_update_pdf_url(update.id, Some(url)).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Err(remove_err) = self.reports.remove(&key).await {
                    warn!(key = %key, error = %remove_err, "Failed to remove unlinked report PDF");
                }
                return Err(e);
            }
        };

        info!(
            update_code = %update.update_code,
            key = %key,
            pages = page_count,
            photos = embedded,
            bytes = size,
            "Report PDF exported"
        );

        if let Some(ref previous) = update.pdf_url
            && let Some(old_key) = self.reports.urls().key_for(previous)
            && old_key != key
            && let Err(e) = self.reports.remove(&old_key).await
        {
            warn!(key = %old_key, error = %e, "Failed to remove superseded report PDF");
        }

        Ok(updated)
    }

    /// Download the update's photos from the photo bucket.
    ///
    /// Photos outside the bucket or failing to download are left out and end up
    /// as placeholders in the report.
    async fn fetch_photos(&self, update: &RealTimeUpdate) -> EvidencePhotos {
        let fetches = update.photos.iter().map(|url| async move {
            let Some(key) = self.photos.urls().key_for(url) else {
                warn!(url = %url, "Evidence photo is not in the photo bucket");
                return None;
            };
            match self.photos.get(&key).await {
                Ok(bytes) => Some((url.clone(), bytes)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to fetch evidence photo");
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Export, logging instead of returning failures.
    pub async fn try_export(&self, update: &RealTimeUpdate) -> Option<RealTimeUpdate> {
        match self.export(update).await {
            Ok(updated) => Some(updated),
            Err(e) => {
                error!(
                    update_code = %update.update_code,
                    error = %e,
                    "Report PDF export failed"
                );
                None
            }
        }
    }

    /// Delete the linked report object and clear `pdf_url`.
    ///
    /// URLs outside the report bucket are refused before any storage call, and
    /// the record is left as it was.
    pub async fn remove(&self, update: &RealTimeUpdate) -> AppResult<RealTimeUpdate> {
        let url = update
            .pdf_url
            .as_deref()
            .ok_or_else(|| AppError::NotFound(format!("PDF for update {}", update.id)))?;

        let key = self.reports.urls().key_for(url).ok_or_else(|| {
            AppError::InvalidInput(format!("PDF URL is not in the report bucket: {}", url))
        })?;

        self.reports.remove(&key).await?;
        let updated = self.records.set_update_pdf_url(update.id, None).await?;

        info!(update_code = %update.update_code, key = %key, "Report PDF removed");
        Ok(updated)
    }
}

// Page geometry in millimetres, origin bottom-left.
const MARGIN: f32 = 12.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN;
const TABLE_ROW_HEIGHT: f32 = 9.0;
const GRID_GAP: f32 = 6.0;
const FOOTER_Y: f32 = 8.0;
const PHOTO_PADDING: f32 = 2.0;
const PHOTO_CAPTION_HEIGHT: f32 = 6.0;

/// Longest photo side, in pixels, after downscaling for the PDF.
const MAX_PHOTO_PX: u32 = 1600;

const BUNDLED_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BUNDLED_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// TrueType faces embedded into every report.
#[derive(Clone)]
pub struct ReportFonts {
    regular: Cow<'static, [u8]>,
    bold: Cow<'static, [u8]>,
}

impl Default for ReportFonts {
    fn default() -> Self {
        Self {
            regular: Cow::Borrowed(BUNDLED_REGULAR),
            bold: Cow::Borrowed(BUNDLED_BOLD),
        }
    }
}

impl ReportFonts {
    /// Load the configured fonts, falling back to the bundled DejaVu Sans.
    ///
    /// Fonts are parsed once here so a broken file fails at startup rather
    /// than on every export.
    pub fn load(settings: &ReportFontSettings) -> AppResult<Self> {
        let bundled = Self::default();
        let regular = match settings.regular {
            Some(ref path) => Cow::Owned(read_font(path)?),
            None => bundled.regular,
        };
        let bold = match (&settings.bold, &settings.regular) {
            (Some(path), _) => Cow::Owned(read_font(path)?),
            (None, Some(_)) => regular.clone(),
            (None, None) => bundled.bold,
        };

        let fonts = Self { regular, bold };
        fonts.add_to(&PdfDocument::empty("font check"))?;
        Ok(fonts)
    }

    fn add_to(&self, doc: &PdfDocumentReference) -> AppResult<Fonts> {
        let load = |bytes: &[u8]| {
            doc.add_external_font(bytes)
                .map_err(|e| AppError::Pdf(format!("Failed to load font: {}", e)))
        };
        Ok(Fonts {
            regular: load(&*self.regular)?,
            bold: load(&*self.bold)?,
        })
    }
}

fn read_font(path: &Path) -> AppResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| AppError::Pdf(format!("Failed to read font {}: {}", path.display(), e)))
}

/// Renders layouts with printpdf using embedded TrueType fonts.
#[derive(Clone, Default)]
pub struct PrintPdfRenderer {
    fonts: Arc<ReportFonts>,
}

impl PrintPdfRenderer {
    pub fn new(fonts: ReportFonts) -> Self {
        Self {
            fonts: Arc::new(fonts),
        }
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl PdfRenderer for PrintPdfRenderer {
    fn render(&self, layout: &ReportLayout, photos: &EvidencePhotos) -> AppResult<Vec<u8>> {
        let (doc, first_page, first_layer) = PdfDocument::new(
            layout.title.as_str(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Report",
        );
        let fonts = self.fonts.add_to(&doc)?;

        let mut cells = PhotoCells {
            fonts: &fonts,
            photos,
            number: 0,
        };
        for (index, page) in layout.pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page_ref, layer_ref) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Report");
                doc.get_page(page_ref).get_layer(layer_ref)
            };
            layer.set_outline_thickness(0.4);

            match page {
                ReportPage::Summary {
                    table,
                    photos: urls,
                } => {
                    let mut y = draw_header(&layer, &fonts, layout);
                    y = draw_table(&layer, &fonts, table, y);
                    if let Some(ref description) = layout.description {
                        y = draw_paragraph(&layer, &fonts, description, y - 6.0);
                    }
                    if !urls.is_empty() {
                        let cell_height = (y - 6.0 - (FOOTER_Y + 8.0)).clamp(30.0, 90.0);
                        cells.draw_row(&layer, urls, y - 6.0, cell_height);
                    }
                }
                ReportPage::Evidence { photos: urls } => {
                    let top = PAGE_HEIGHT_MM - MARGIN - 6.0;
                    layer.use_text(EVIDENCE_HEADING, 14.0, Mm(MARGIN), Mm(top), &fonts.bold);

                    let grid_top = top - 8.0;
                    let cell_height = (grid_top - (FOOTER_Y + 8.0) - GRID_GAP) / 2.0;
                    for (row, chunk) in urls.chunks(2).enumerate() {
                        let row_top = grid_top - row as f32 * (cell_height + GRID_GAP);
                        cells.draw_row(&layer, chunk, row_top, cell_height);
                    }
                }
            }

            layer.use_text(
                layout.footer(index + 1),
                8.0,
                Mm(MARGIN),
                Mm(FOOTER_Y),
                &fonts.regular,
            );
        }

        doc.save_to_bytes()
            .map_err(|e| AppError::Pdf(format!("Failed to serialize PDF: {}", e)))
    }
}

/// Title and scope line. Returns the y coordinate below the header.
fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, layout: &ReportLayout) -> f32 {
    let top = PAGE_HEIGHT_MM - MARGIN - 6.0;
    layer.use_text(
        truncate(&layout.title, 60),
        16.0,
        Mm(MARGIN),
        Mm(top),
        &fonts.bold,
    );

    let meta = format!(
        "{} | {} | {} | {}",
        layout.heading.project_name,
        layout.heading.csr_partner_name,
        layout.heading.toll_name,
        layout.update_type.label()
    );
    layer.use_text(
        truncate(&meta, 110),
        9.0,
        Mm(MARGIN),
        Mm(top - 7.0),
        &fonts.regular,
    );

    top - 12.0
}

/// Seven-row table on a four-column grid. Returns the y coordinate below it.
fn draw_table(layer: &PdfLayerReference, fonts: &Fonts, table: &ReportTable, top: f32) -> f32 {
    let unit = CONTENT_WIDTH / 4.0;
    let mut y = top;

    for row in &table.rows {
        let span = 4 / row.cells.len().max(1);
        let width = unit * span as f32;

        for (i, cell) in row.cells.iter().enumerate() {
            let x = MARGIN + i as f32 * width;
            frame(layer, x, y - TABLE_ROW_HEIGHT, width, TABLE_ROW_HEIGHT);

            let label = format!("{}:", cell.label);
            let label_width = label.chars().count() as f32 * 1.7 + 2.5;
            layer.use_text(label, 8.0, Mm(x + 1.5), Mm(y - 6.0), &fonts.bold);

            let room = ((width - label_width - 2.0) / 1.7).max(1.0) as usize;
            layer.use_text(
                truncate(&cell.value, room),
                8.0,
                Mm(x + label_width),
                Mm(y - 6.0),
                &fonts.regular,
            );
        }

        y -= TABLE_ROW_HEIGHT;
    }

    y
}

/// Description text, wrapped and capped at four lines.
fn draw_paragraph(layer: &PdfLayerReference, fonts: &Fonts, text: &str, top: f32) -> f32 {
    let lines = wrap(text, 110, 4);
    let mut y = top;
    for line in lines {
        y -= 4.5;
        layer.use_text(line, 9.0, Mm(MARGIN), Mm(y), &fonts.regular);
    }
    y
}

/// Evidence cells, numbered across the whole report.
struct PhotoCells<'a> {
    fonts: &'a Fonts,
    photos: &'a EvidencePhotos,
    number: usize,
}

impl PhotoCells<'_> {
    /// Up to two framed cells side by side.
    fn draw_row(&mut self, layer: &PdfLayerReference, urls: &[String], top: f32, height: f32) {
        let width = (CONTENT_WIDTH - GRID_GAP) / 2.0;

        for (i, url) in urls.iter().take(2).enumerate() {
            self.number += 1;
            let x = MARGIN + i as f32 * (width + GRID_GAP);
            let bottom = top - height;
            frame(layer, x, bottom, width, height);

            let image = self
                .photos
                .get(url)
                .and_then(|bytes| decode_photo(bytes, url));
            match image {
                Some(image) => {
                    place_photo(layer, &image, x, bottom, width, height);
                    layer.use_text(
                        format!("Photo {}", self.number),
                        8.0,
                        Mm(x + 3.0),
                        Mm(bottom + PHOTO_PADDING),
                        &self.fonts.bold,
                    );
                }
                None => self.draw_placeholder(layer, url, x, top, height),
            }
        }
    }

    /// Number and URL of a photo that could not be embedded.
    fn draw_placeholder(
        &self,
        layer: &PdfLayerReference,
        url: &str,
        x: f32,
        top: f32,
        height: f32,
    ) {
        layer.use_text(
            format!("Photo {}", self.number),
            10.0,
            Mm(x + 3.0),
            Mm(top - height / 2.0),
            &self.fonts.bold,
        );
        for (n, line) in wrap(url, 60, 3).into_iter().enumerate() {
            layer.use_text(
                line,
                6.0,
                Mm(x + 3.0),
                Mm(top - height / 2.0 - 5.0 - n as f32 * 3.0),
                &self.fonts.regular,
            );
        }
    }
}

/// Decode a photo and shrink it to `MAX_PHOTO_PX`. Alpha is dropped.
fn decode_photo(bytes: &[u8], url: &str) -> Option<DynamicImage> {
    let image = match image_crate::load_from_memory(bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!(url = %url, error = %e, "Evidence photo could not be decoded");
            return None;
        }
    };

    let image = if image.width() > MAX_PHOTO_PX || image.height() > MAX_PHOTO_PX {
        image.thumbnail(MAX_PHOTO_PX, MAX_PHOTO_PX)
    } else {
        image
    };
    Some(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Fit the image inside its cell above the caption strip, keeping the aspect ratio.
fn place_photo(
    layer: &PdfLayerReference,
    image: &DynamicImage,
    x: f32,
    bottom: f32,
    width: f32,
    height: f32,
) {
    let (px_w, px_h) = image.dimensions();
    if px_w == 0 || px_h == 0 {
        return;
    }

    let room_w = width - 2.0 * PHOTO_PADDING;
    let room_h = height - 2.0 * PHOTO_PADDING - PHOTO_CAPTION_HEIGHT;
    let mm_per_px = (room_w / px_w as f32).min(room_h / px_h as f32);
    let (img_w, img_h) = (px_w as f32 * mm_per_px, px_h as f32 * mm_per_px);

    Image::from_dynamic_image(image).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x + PHOTO_PADDING + (room_w - img_w) / 2.0)),
            translate_y: Some(Mm(
                bottom + PHOTO_PADDING + PHOTO_CAPTION_HEIGHT + (room_h - img_h) / 2.0,
            )),
            dpi: Some(25.4 / mm_per_px),
            ..Default::default()
        },
    );
}

fn frame(layer: &PdfLayerReference, x: f32, y: f32, width: f32, height: f32) {
    let corner = |px: f32, py: f32| (Point::new(Mm(px), Mm(py)), false);
    layer.add_line(Line {
        points: vec![
            corner(x, y),
            corner(x + width, y),
            corner(x + width, y + height),
            corner(x, y + height),
        ],
        is_closed: true,
    });
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Hard-wrap at `width` characters, preferring spaces, with at most `max_lines`.
fn wrap(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }

        let needed =
            current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = truncate(&format!("{}...", last), width);
        }
    }
    lines
}
