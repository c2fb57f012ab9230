use std::path::Path as FsPath;

use axum::extract::{Json, Multipart, Path, Query, State};
use axum::http::StatusCode;
use base64::Engine;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::select;
use diesel::result::DatabaseErrorKind;
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{
    Document, NewDocument, FLOW_INWARD, FLOW_OUTWARD, STATUS_APPROVED, STATUS_PENDING,
};
use crate::schema::documents;
use crate::state::AppState;
use crate::storage::canonical_file_name;

#[derive(Debug, Default, Deserialize)]
pub struct DocumentFilter {
    pub document_number: Option<String>,
    pub flow_type: Option<String>,
    pub document_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub recipient: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    pub success: bool,
    pub data: Document,
}

#[derive(Deserialize)]
pub struct UpdateDocumentRequest {
    pub date: String,
    pub time: String,
    pub recipient: String,
    pub document_type: String,
    #[serde(default)]
    pub description: String,
    pub file_name: Option<String>,
    /// Base64-encoded replacement attachment bytes.
    pub file_content: Option<String>,
}

#[derive(Deserialize)]
pub struct NextNumberQuery {
    pub flow_type: String,
}

#[derive(Serialize)]
pub struct NextNumberResponse {
    pub document_number: String,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_known_flow_type(value: &str) -> bool {
    value == FLOW_INWARD || value == FLOW_OUTWARD
}

/// Runs the ANDed predicate set against the documents table and returns rows
/// in store natural order.
pub fn load_documents(
    conn: &mut SqliteConnection,
    filter: &DocumentFilter,
) -> AppResult<Vec<Document>> {
    let mut query = documents::table.into_boxed();

    if let Some(value) = non_blank(&filter.document_number) {
        query = query.filter(documents::document_number.eq(value.to_string()));
    }
    if let Some(value) = non_blank(&filter.flow_type) {
        query = query.filter(documents::flow_type.eq(value.to_string()));
    }
    if let Some(value) = non_blank(&filter.document_type) {
        query = query.filter(documents::document_type.eq(value.to_string()));
    }

    // A single-sided date filter matches that date exactly rather than opening
    // a range; behavior carried over from the original registry.
    match (non_blank(&filter.date_from), non_blank(&filter.date_to)) {
        (Some(from), Some(to)) => {
            query = query.filter(documents::date.between(from.to_string(), to.to_string()));
        }
        (Some(single), None) | (None, Some(single)) => {
            query = query.filter(documents::date.eq(single.to_string()));
        }
        (None, None) => {}
    }

    let mut docs: Vec<Document> = query.load(conn)?;

    // SQLite LIKE folds ASCII case, and recipient matching is case-sensitive,
    // so the substring check runs here instead of in SQL.
    if let Some(needle) = non_blank(&filter.recipient) {
        let needle = needle.to_string();
        docs.retain(|doc| doc.recipient.contains(&needle));
    }

    Ok(docs)
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(filter): Query<DocumentFilter>,
) -> AppResult<Json<Vec<Document>>> {
    let mut conn = state.db()?;
    let docs = load_documents(&mut conn, &filter)?;
    Ok(Json(docs))
}

pub async fn register_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentDetailResponse>)> {
    let mut flow_type: Option<String> = None;
    let mut document_number: Option<String> = None;
    let mut date: Option<String> = None;
    let mut time: Option<String> = None;
    let mut recipient: Option<String> = None;
    let mut document_type: Option<String> = None;
    let mut description = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().map(|n| n.to_string()).unwrap_or_default();
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                if !data.is_empty() {
                    file = Some((original_name, data.to_vec()));
                }
            }
            Some(field_name) => {
                let field_name = field_name.to_string();
                let value = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid field {field_name}: {err}"))
                })?;
                match field_name.as_str() {
                    "flow_type" => flow_type = Some(value),
                    "document_number" => document_number = Some(value),
                    "date" => date = Some(value),
                    "time" => time = Some(value),
                    "recipient" => recipient = Some(value),
                    "document_type" => document_type = Some(value),
                    "description" => description = value,
                    _ => {}
                }
            }
            None => {}
        }
    }

    let flow_type = require_field(flow_type, "flow_type")?;
    let document_number = require_field(document_number, "document_number")?;
    let date = require_field(date, "date")?;
    let time = require_field(time, "time")?;
    let recipient = require_field(recipient, "recipient")?;
    let document_type = require_field(document_type, "document_type")?;

    if !is_known_flow_type(&flow_type) {
        return Err(AppError::bad_request(format!(
            "flow_type must be '{FLOW_INWARD}' or '{FLOW_OUTWARD}'"
        )));
    }

    // The duplicate check runs before the attachment is written: the canonical
    // file name collides exactly when the number does, and writing first would
    // clobber the existing document's attachment.
    let mut conn = state.db()?;
    let already_registered: bool = select(exists(
        documents::table.filter(documents::document_number.eq(&document_number)),
    ))
    .get_result(&mut conn)?;
    if already_registered {
        return Err(AppError::conflict("document number already exists"));
    }

    let (file_name, file_path) = match file {
        Some((original_name, bytes)) => {
            let canonical = canonical_file_name(&document_number, &original_name);
            let path = state
                .attachments
                .store(&canonical, bytes)
                .await
                .map_err(AppError::from)?;
            (canonical, path.to_string_lossy().into_owned())
        }
        None => (String::new(), String::new()),
    };

    let row = NewDocument {
        flow_type,
        document_number: document_number.clone(),
        date,
        time,
        recipient,
        document_type,
        file_name,
        file_path: file_path.clone(),
        description,
        status: STATUS_PENDING.to_string(),
    };

    match diesel::insert_into(documents::table)
        .values(&row)
        .execute(&mut conn)
    {
        Ok(_) => {}
        // Backstop for the pre-check; single-writer pool makes this unreachable
        // in practice.
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::conflict("document number already exists"));
        }
        Err(err) => {
            if !file_path.is_empty() {
                warn!(path = %file_path, "document insert failed after attachment write");
            }
            return Err(AppError::from(err));
        }
    }

    let doc: Document = documents::table
        .filter(documents::document_number.eq(&document_number))
        .first(&mut conn)?;

    info!(
        document_number = %doc.document_number,
        flow_type = %doc.flow_type,
        has_attachment = !doc.file_path.is_empty(),
        "document registered"
    );
    Ok((
        StatusCode::CREATED,
        Json(DocumentDetailResponse {
            success: true,
            data: doc,
        }),
    ))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(document_number): Path<String>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> AppResult<Json<StatusResponse>> {
    let mut conn = state.db()?;

    let existing: Document = match documents::table
        .filter(documents::document_number.eq(&document_number))
        .first(&mut conn)
    {
        Ok(doc) => doc,
        Err(diesel::result::Error::NotFound) => {
            warn!(%document_number, "update rejected: unknown document number");
            return Err(AppError::not_found(
                "No document found with the given document number",
            ));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    let affected = if let Some(encoded) = payload.file_content.as_deref() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| {
                AppError::bad_request(format!("file_content must be valid base64: {err}"))
            })?;
        let original_name = payload.file_name.as_deref().unwrap_or_default();
        let canonical = canonical_file_name(&document_number, original_name);

        // Old-file cleanup is best effort; a stale attachment must not block
        // the metadata update.
        if !existing.file_path.is_empty() {
            if let Err(err) = state
                .attachments
                .remove(FsPath::new(&existing.file_path))
                .await
            {
                warn!(error = %err, path = %existing.file_path, "failed to delete old attachment");
            }
        }

        let new_path = state
            .attachments
            .store(&canonical, bytes)
            .await
            .map_err(AppError::from)?;

        diesel::update(documents::table.find(existing.id))
            .set((
                documents::date.eq(&payload.date),
                documents::time.eq(&payload.time),
                documents::recipient.eq(&payload.recipient),
                documents::document_type.eq(&payload.document_type),
                documents::file_name.eq(&canonical),
                documents::file_path.eq(new_path.to_string_lossy().into_owned()),
                documents::description.eq(&payload.description),
            ))
            .execute(&mut conn)?
    } else {
        diesel::update(documents::table.find(existing.id))
            .set((
                documents::date.eq(&payload.date),
                documents::time.eq(&payload.time),
                documents::recipient.eq(&payload.recipient),
                documents::document_type.eq(&payload.document_type),
                documents::description.eq(&payload.description),
            ))
            .execute(&mut conn)?
    };

    if affected == 0 {
        error!(%document_number, "update affected no rows");
        return Err(AppError::internal("update affected no rows"));
    }

    info!(%document_number, replaced_attachment = payload.file_content.is_some(), "document updated");
    Ok(Json(StatusResponse::ok()))
}

/// Attachment first, then the row. A failed file removal is logged and the
/// row delete proceeds regardless.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<i32>,
) -> AppResult<Json<StatusResponse>> {
    let mut conn = state.db()?;

    let file_path: Option<String> = documents::table
        .find(document_id)
        .select(documents::file_path)
        .first(&mut conn)
        .optional()?;

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        if let Err(err) = state.attachments.remove(FsPath::new(&path)).await {
            warn!(error = %err, path = %path, "failed to remove attachment during delete");
        }
    }

    diesel::delete(documents::table.find(document_id)).execute(&mut conn)?;
    info!(document_id, "document deleted");
    Ok(Json(StatusResponse::ok()))
}

/// One-way status transition; re-approving an approved row is a no-op.
pub async fn approve_document(
    State(state): State<AppState>,
    Path(document_id): Path<i32>,
) -> AppResult<Json<StatusResponse>> {
    let mut conn = state.db()?;
    diesel::update(documents::table.find(document_id))
        .set(documents::status.eq(STATUS_APPROVED))
        .execute(&mut conn)?;
    info!(document_id, "document approved");
    Ok(Json(StatusResponse::ok()))
}

pub async fn next_document_number(
    State(state): State<AppState>,
    Query(query): Query<NextNumberQuery>,
) -> AppResult<Json<NextNumberResponse>> {
    let prefix = match query.flow_type.as_str() {
        FLOW_INWARD => "IN",
        FLOW_OUTWARD => "OUT",
        other => {
            return Err(AppError::bad_request(format!("unknown flow type '{other}'")));
        }
    };

    let mut conn = state.db()?;
    let numbers: Vec<String> = documents::table
        .filter(documents::flow_type.eq(&query.flow_type))
        .select(documents::document_number)
        .load(&mut conn)?;

    // Max existing suffix plus one: numbers are never reused, even after the
    // highest document is deleted mid-sequence.
    let next = numbers
        .iter()
        .filter_map(|number| number_suffix(number))
        .max()
        .unwrap_or(0)
        + 1;

    Ok(Json(NextNumberResponse {
        document_number: format_document_number(prefix, next),
    }))
}

fn require_field(value: Option<String>, name: &str) -> AppResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::bad_request(format!("{name} field is required"))),
    }
}

fn number_suffix(document_number: &str) -> Option<u32> {
    document_number
        .split_once('-')
        .and_then(|(_, suffix)| suffix.parse().ok())
}

fn format_document_number(prefix: &str, number: u32) -> String {
    format!("{prefix}-{number:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_parses_padded_numbers() {
        assert_eq!(number_suffix("IN-001"), Some(1));
        assert_eq!(number_suffix("OUT-042"), Some(42));
        assert_eq!(number_suffix("IN-1000"), Some(1000));
        assert_eq!(number_suffix("garbage"), None);
        assert_eq!(number_suffix("IN-"), None);
    }

    #[test]
    fn formatting_pads_to_three_digits() {
        assert_eq!(format_document_number("IN", 1), "IN-001");
        assert_eq!(format_document_number("OUT", 42), "OUT-042");
        assert_eq!(format_document_number("IN", 1000), "IN-1000");
    }
}
