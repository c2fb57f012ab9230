use axum::extract::{Json, Query, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::export;
use crate::routes::documents::{load_documents, DocumentFilter};
use crate::state::AppState;

const TEMP_SPREADSHEET: &str = "search_results_temp.xlsx";

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: String,
    pub document_number: Option<String>,
    pub flow_type: Option<String>,
    pub document_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub recipient: Option<String>,
}

impl ExportQuery {
    fn filter(&self) -> DocumentFilter {
        DocumentFilter {
            document_number: self.document_number.clone(),
            flow_type: self.flow_type.clone(),
            document_type: self.document_type.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            recipient: self.recipient.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub path: String,
}

/// Runs the search, renders the result set into the downloads directory under
/// the first free `search_results<N>` name, and reports the path. PDF output
/// goes through a temporary spreadsheet that is removed afterwards.
pub async fn download_search_results(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<DownloadResponse>> {
    let extension = match query.format.as_str() {
        "excel" => "xlsx",
        "pdf" => "pdf",
        _ => return Err(AppError::bad_request("Unsupported format")),
    };

    let mut conn = state.db()?;
    let documents = load_documents(&mut conn, &query.filter())?;
    drop(conn);

    if documents.is_empty() {
        return Err(AppError::not_found("No documents found"));
    }

    let downloads_dir = state.config.downloads_dir.clone();
    let output = export::next_export_path(&downloads_dir, extension);

    if extension == "xlsx" {
        export::write_spreadsheet(&documents, &output)?;
    } else {
        let temp = downloads_dir.join(TEMP_SPREADSHEET);
        export::write_spreadsheet(&documents, &temp)?;
        let converted = export::spreadsheet_to_pdf(&temp, &output);
        if let Err(err) = std::fs::remove_file(&temp) {
            warn!(error = %err, path = %temp.display(), "failed to remove temporary spreadsheet");
        }
        converted?;
    }

    info!(
        path = %output.display(),
        format = %query.format,
        count = documents.len(),
        "search results exported"
    );
    Ok(Json(DownloadResponse {
        success: true,
        path: output.to_string_lossy().into_owned(),
    }))
}
