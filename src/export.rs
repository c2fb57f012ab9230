use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook, Reader, Xlsx};
use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rust_xlsxwriter::{Format, Url, Workbook};

use crate::models::Document;

pub const SHEET_NAME: &str = "Documents";

/// Column order is fixed; both the spreadsheet and the PDF grid follow it.
pub const COLUMNS: [&str; 10] = [
    "Doc No",
    "Flow",
    "Date",
    "Time",
    "Recipient",
    "Type",
    "File Name",
    "File Path",
    "Description",
    "Status",
];

const FONT_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 20.0;
const ROW_HEIGHT: f32 = 20.0;
const CELL_PADDING: f32 = 4.0;
const MARGIN_LEFT: f32 = 50.0;
const TABLE_TOP: f32 = 100.0;

// A4 landscape, in points.
const PAGE_WIDTH: f32 = 842.0;
const PAGE_HEIGHT: f32 = 595.0;
const PT_TO_MM: f32 = 25.4 / 72.0;

/// Renders one row per document into a fixed 10-column spreadsheet, with the
/// file path written as a file:// hyperlink.
pub fn write_spreadsheet(documents: &[Document], output: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (idx, doc) in documents.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet.write_string(row, 0, &doc.document_number)?;
        worksheet.write_string(row, 1, &doc.flow_type)?;
        worksheet.write_string(row, 2, &doc.date)?;
        worksheet.write_string(row, 3, &doc.time)?;
        worksheet.write_string(row, 4, &doc.recipient)?;
        worksheet.write_string(row, 5, &doc.document_type)?;
        worksheet.write_string(row, 6, &doc.file_name)?;
        if doc.file_path.is_empty() {
            worksheet.write_string(row, 7, "")?;
        } else {
            let hyperlink = format!("file:///{}", doc.file_path.replace('\\', "/"));
            worksheet.write_url_with_text(row, 7, Url::new(hyperlink), &doc.file_path)?;
        }
        worksheet.write_string(row, 8, &doc.description)?;
        worksheet.write_string(row, 9, &doc.status)?;
    }

    workbook
        .save(output)
        .with_context(|| format!("failed to save spreadsheet {}", output.display()))?;
    Ok(())
}

/// Reads a previously written spreadsheet and lays it out as a bordered PDF
/// grid: bold header row, columns sized to their widest cell at the rendering
/// font. Single flowing page; long result sets run past the bottom edge.
pub fn spreadsheet_to_pdf(table_path: &Path, output: &Path) -> Result<()> {
    let rows = read_table(table_path)?;
    if rows.is_empty() {
        bail!("spreadsheet {} has no rows", table_path.display());
    }

    let column_count = rows[0].len();
    let mut widths = vec![0f32; column_count];
    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(text_width(cell, FONT_SIZE));
        }
    }

    let (doc, page, layer) = PdfDocument::new(
        "Document Search Results",
        Mm(PAGE_WIDTH * PT_TO_MM),
        Mm(PAGE_HEIGHT * PT_TO_MM),
        "table",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let layer = doc.get_page(page).get_layer(layer);

    let title = "Document Search Results";
    let title_x = (PAGE_WIDTH - text_width(title, TITLE_SIZE)) / 2.0;
    layer.use_text(
        title,
        TITLE_SIZE,
        Mm(title_x * PT_TO_MM),
        Mm((PAGE_HEIGHT - 50.0) * PT_TO_MM),
        &bold,
    );

    let mut y_top = PAGE_HEIGHT - TABLE_TOP;
    for (row_idx, row) in rows.iter().enumerate() {
        let row_font = if row_idx == 0 { &bold } else { &font };
        let mut x = MARGIN_LEFT;
        for (col, cell) in row.iter().enumerate().take(column_count) {
            let cell_width = widths[col] + CELL_PADDING * 2.0;
            draw_cell_border(&layer, x, y_top, cell_width, ROW_HEIGHT);
            draw_cell_text(&layer, cell, row_font, x + CELL_PADDING, y_top);
            x += cell_width;
        }
        y_top -= ROW_HEIGHT;
    }

    let file = File::create(output)
        .with_context(|| format!("failed to create pdf {}", output.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|err| anyhow!("failed to write pdf {}: {err}", output.display()))?;
    Ok(())
}

/// Picks the first unused `search_results<N>.<extension>` in the downloads
/// directory so earlier exports are never overwritten.
pub fn next_export_path(downloads_dir: &Path, extension: &str) -> PathBuf {
    let mut index = 1u32;
    loop {
        let candidate = downloads_dir.join(format!("search_results{index}.{extension}"));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

fn read_table(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|err| anyhow!("failed to open spreadsheet {}: {err}", path.display()))?;
    let range = workbook
        .worksheet_range(SHEET_NAME)
        .map_err(|err| anyhow!("missing sheet {SHEET_NAME} in {}: {err}", path.display()))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

fn draw_cell_border(layer: &PdfLayerReference, x: f32, y_top: f32, width: f32, height: f32) {
    let points = vec![
        (Point::new(Mm(x * PT_TO_MM), Mm(y_top * PT_TO_MM)), false),
        (
            Point::new(Mm((x + width) * PT_TO_MM), Mm(y_top * PT_TO_MM)),
            false,
        ),
        (
            Point::new(Mm((x + width) * PT_TO_MM), Mm((y_top - height) * PT_TO_MM)),
            false,
        ),
        (
            Point::new(Mm(x * PT_TO_MM), Mm((y_top - height) * PT_TO_MM)),
            false,
        ),
    ];
    layer.add_line(Line {
        points,
        is_closed: true,
    });
}

fn draw_cell_text(layer: &PdfLayerReference, text: &str, font: &IndirectFontRef, x: f32, y_top: f32) {
    // Baseline sits a padding plus descender clearance below the cell top.
    let baseline = y_top - CELL_PADDING - FONT_SIZE;
    layer.use_text(
        text,
        FONT_SIZE,
        Mm(x * PT_TO_MM),
        Mm(baseline * PT_TO_MM),
        font,
    );
}

// Helvetica AFM advance widths for the printable ASCII range, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, // 'A'..'P'
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'Q'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, // 'a'..'p'
    556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'q'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn char_width_units(ch: char) -> u16 {
    let code = ch as u32;
    match code {
        0x20..=0x7E => HELVETICA_WIDTHS[(code - 0x20) as usize],
        _ => 600,
    }
}

/// Width of `text` in points when rendered in Helvetica at `font_size`.
fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(char_width_units(ch))).sum();
    units as f32 * font_size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_path_skips_existing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(
            next_export_path(dir.path(), "xlsx"),
            dir.path().join("search_results1.xlsx")
        );

        std::fs::write(dir.path().join("search_results1.xlsx"), b"x")?;
        std::fs::write(dir.path().join("search_results2.xlsx"), b"x")?;
        assert_eq!(
            next_export_path(dir.path(), "xlsx"),
            dir.path().join("search_results3.xlsx")
        );
        // Extensions are tracked independently.
        assert_eq!(
            next_export_path(dir.path(), "pdf"),
            dir.path().join("search_results1.pdf")
        );
        Ok(())
    }

    #[test]
    fn wider_strings_measure_wider() {
        assert!(text_width("Recipient", FONT_SIZE) > text_width("Flow", FONT_SIZE));
        assert!(text_width("WWW", FONT_SIZE) > text_width("iii", FONT_SIZE));
        assert_eq!(text_width("", FONT_SIZE), 0.0);
    }

    #[test]
    fn spreadsheet_round_trips_through_calamine() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.xlsx");
        let doc = Document {
            id: 1,
            flow_type: "inward".into(),
            document_number: "IN-001".into(),
            date: "2024-01-01".into(),
            time: "10:30 AM".into(),
            recipient: "Accounts".into(),
            document_type: "Invoice".into(),
            file_name: "IN-001.pdf".into(),
            file_path: "/tmp/uploads/IN-001.pdf".into(),
            description: "January invoice".into(),
            status: "pending".into(),
        };

        write_spreadsheet(&[doc], &path)?;
        let rows = read_table(&path)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], COLUMNS.map(String::from).to_vec());
        assert_eq!(rows[1][0], "IN-001");
        assert_eq!(rows[1][7], "/tmp/uploads/IN-001.pdf");
        assert_eq!(rows[1][9], "pending");
        Ok(())
    }

    #[test]
    fn pdf_conversion_writes_a_pdf_stream() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let table = dir.path().join("table.xlsx");
        let pdf = dir.path().join("out.pdf");
        let doc = Document {
            id: 1,
            flow_type: "outward".into(),
            document_number: "OUT-007".into(),
            date: "2024-02-02".into(),
            time: "09:00 AM".into(),
            recipient: "Registrar".into(),
            document_type: "Letter".into(),
            file_name: String::new(),
            file_path: String::new(),
            description: String::new(),
            status: "approved".into(),
        };

        write_spreadsheet(&[doc], &table)?;
        spreadsheet_to_pdf(&table, &pdf)?;

        let bytes = std::fs::read(&pdf)?;
        assert!(bytes.starts_with(b"%PDF"));
        Ok(())
    }
}
