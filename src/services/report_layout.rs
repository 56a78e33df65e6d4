//! Report layout for real-time updates.
//!
//! A report is a sequence of fixed-size A4 sheets. The first sheet carries the
//! header, the seven-row data table and up to two photos; every further sheet
//! carries up to four photos under an "Additional Evidence" heading. The same
//! layout value feeds the HTML preview and the PDF renderer.

use std::fmt::Write as _;

use crate::models::{RealTimeUpdate, UpdateType};

/// Photos on the first sheet.
pub const SUMMARY_PAGE_PHOTOS: usize = 2;

/// Photos on each additional evidence sheet.
pub const EVIDENCE_PAGE_PHOTOS: usize = 4;

/// Physical page size (A4 portrait).
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Placeholder for empty cells.
pub const EMPTY_CELL: &str = "-";

pub const DEFAULT_TITLE: &str = "Real-Time Update Report";
pub const EVIDENCE_HEADING: &str = "Additional Evidence";

/// Display names shown in the report header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeading {
    pub project_name: String,
    pub csr_partner_name: String,
    pub toll_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub label: String,
    pub value: String,
}

impl TableCell {
    fn new(label: impl Into<String>, value: Option<&str>) -> Self {
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(EMPTY_CELL);
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

/// One row of the data table; rows hold one, two or four cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// The fixed seven-row data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub rows: Vec<TableRow>,
}

impl ReportTable {
    pub fn for_update(update: &RealTimeUpdate) -> Self {
        let resident = |i: usize| update.residents.get(i).map(String::as_str);
        let date = update.report_date.format("%d/%m/%Y").to_string();
        let resident_count = update
            .residents
            .iter()
            .filter(|name| !name.trim().is_empty())
            .count()
            .to_string();

        let rows = vec![
            TableRow {
                cells: vec![
                    TableCell::new("Update No.", Some(&update.update_no)),
                    TableCell::new("Date", Some(&date)),
                ],
            },
            TableRow {
                cells: vec![
                    TableCell::new("Location", update.location.as_deref()),
                    TableCell::new("Day", update.day.as_deref()),
                ],
            },
            TableRow {
                cells: vec![
                    TableCell::new("Tutor", update.tutor.as_deref()),
                    TableCell::new("Filled By", update.filled_by.as_deref()),
                ],
            },
            TableRow {
                cells: vec![TableCell::new("No. of Residents", Some(&resident_count))],
            },
            TableRow {
                cells: (0..2)
                    .map(|i| TableCell::new(format!("Resident {}", i + 1), resident(i)))
                    .collect(),
            },
            TableRow {
                cells: (2..6)
                    .map(|i| TableCell::new(format!("Resident {}", i + 1), resident(i)))
                    .collect(),
            },
            TableRow {
                cells: vec![TableCell::new("Activity", update.activity.as_deref())],
            },
        ];

        Self { rows }
    }
}

/// One printable sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportPage {
    /// Header, data table and the first photos.
    Summary {
        table: ReportTable,
        photos: Vec<String>,
    },
    /// Additional photos in a 2x2 grid.
    Evidence { photos: Vec<String> },
}

impl ReportPage {
    pub fn photos(&self) -> &[String] {
        match self {
            ReportPage::Summary { photos, .. } | ReportPage::Evidence { photos } => photos,
        }
    }
}

/// Split photos into the first-sheet pair and the groups of four that follow.
pub fn paginate_photos(photos: &[String]) -> (Vec<String>, Vec<Vec<String>>) {
    let split = photos.len().min(SUMMARY_PAGE_PHOTOS);
    let (first, rest) = photos.split_at(split);

    let evidence = rest
        .chunks(EVIDENCE_PAGE_PHOTOS)
        .map(<[String]>::to_vec)
        .collect();

    (first.to_vec(), evidence)
}

/// The complete report for one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub title: String,
    pub update_code: String,
    pub update_type: UpdateType,
    pub heading: ReportHeading,
    pub description: Option<String>,
    pub pages: Vec<ReportPage>,
}

impl ReportLayout {
    pub fn build(update: &RealTimeUpdate, heading: ReportHeading) -> Self {
        let (first, evidence) = paginate_photos(&update.photos);

        let mut pages = Vec::with_capacity(1 + evidence.len());
        pages.push(ReportPage::Summary {
            table: ReportTable::for_update(update),
            photos: first,
        });
        pages.extend(
            evidence
                .into_iter()
                .map(|photos| ReportPage::Evidence { photos }),
        );

        let title = update
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        Self {
            title,
            update_code: update.update_code.clone(),
            update_type: update.update_type,
            heading,
            description: update
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total photos placed across all sheets.
    pub fn photo_count(&self) -> usize {
        self.pages.iter().map(|p| p.photos().len()).sum()
    }

    /// Footer line for a 1-based page number.
    pub fn footer(&self, page_number: usize) -> String {
        format!(
            "{} | Page {} of {}",
            self.update_code,
            page_number,
            self.page_count()
        )
    }

    /// Render the layout as a standalone HTML document with one fixed-size
    /// element per sheet.
    pub fn render_html(&self) -> String {
        let mut html = String::with_capacity(4096);

        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n",
            escape_html(&self.title),
            PAGE_CSS
        );

        for (index, page) in self.pages.iter().enumerate() {
            let _ = write!(html, "<section class=\"report-page\">\n");

            match page {
                ReportPage::Summary { table, photos } => {
                    self.write_header(&mut html);
                    write_table(&mut html, table);
                    if let Some(ref description) = self.description {
                        let _ = write!(
                            html,
                            "<p class=\"description\">{}</p>\n",
                            escape_html(description)
                        );
                    }
                    if !photos.is_empty() {
                        write_photo_grid(&mut html, photos, "grid-two");
                    }
                }
                ReportPage::Evidence { photos } => {
                    let _ = write!(html, "<h2>{}</h2>\n", EVIDENCE_HEADING);
                    write_photo_grid(&mut html, photos, "grid-four");
                }
            }

            let _ = write!(
                html,
                "<footer>{}</footer>\n</section>\n",
                escape_html(&self.footer(index + 1))
            );
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn write_header(&self, html: &mut String) {
        let _ = write!(
            html,
            "<header>\n<h1>{}</h1>\n<p class=\"meta\">{} | {} | {} | {}</p>\n</header>\n",
            escape_html(&self.title),
            escape_html(&self.heading.project_name),
            escape_html(&self.heading.csr_partner_name),
            escape_html(&self.heading.toll_name),
            self.update_type.label()
        );
    }
}

fn write_table(html: &mut String, table: &ReportTable) {
    html.push_str("<table class=\"report-table\">\n");
    for row in &table.rows {
        // Every row spans four value columns so one-, two- and four-cell rows line up.
        let span = 4 / row.cells.len().max(1);
        html.push_str("<tr>");
        for cell in &row.cells {
            let _ = write!(
                html,
                "<td colspan=\"{}\"><span class=\"label\">{}</span> {}</td>",
                span,
                escape_html(&cell.label),
                escape_html(&cell.value)
            );
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

fn write_photo_grid(html: &mut String, photos: &[String], class: &str) {
    let _ = write!(html, "<div class=\"photos {}\">\n", class);
    for (i, url) in photos.iter().enumerate() {
        let _ = write!(
            html,
            "<figure><img src=\"{}\" alt=\"Evidence photo {}\"></figure>\n",
            escape_html(url),
            i + 1
        );
    }
    html.push_str("</div>\n");
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_CSS: &str = "\
body{margin:0;background:#eee;font-family:Helvetica,Arial,sans-serif;}\
.report-page{width:210mm;height:297mm;box-sizing:border-box;padding:12mm;margin:0 auto 8mm;background:#fff;position:relative;overflow:hidden;}\
header h1{margin:0 0 2mm;font-size:18pt;}\
.meta{margin:0 0 6mm;color:#555;font-size:10pt;}\
.report-table{width:100%;border-collapse:collapse;table-layout:fixed;font-size:10pt;}\
.report-table td{border:1px solid #999;padding:2mm;}\
.label{font-weight:bold;}\
.description{font-size:10pt;}\
.photos{display:grid;grid-template-columns:1fr 1fr;gap:4mm;margin-top:6mm;}\
.grid-four{grid-template-rows:1fr 1fr;height:240mm;}\
.photos figure{margin:0;border:1px solid #ccc;display:flex;align-items:center;justify-content:center;overflow:hidden;}\
.photos img{max-width:100%;max-height:100%;object-fit:contain;}\
footer{position:absolute;bottom:8mm;left:12mm;right:12mm;text-align:center;font-size:8pt;color:#777;}";
