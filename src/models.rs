use diesel::prelude::*;
use serde::Serialize;

use crate::schema::*;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";

pub const FLOW_INWARD: &str = "inward";
pub const FLOW_OUTWARD: &str = "outward";

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub account_type: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub account_type: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = documents)]
pub struct Document {
    pub id: i32,
    pub flow_type: String,
    pub document_number: String,
    pub date: String,
    pub time: String,
    pub recipient: String,
    pub document_type: String,
    pub file_name: String,
    pub file_path: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub flow_type: String,
    pub document_number: String,
    pub date: String,
    pub time: String,
    pub recipient: String,
    pub document_type: String,
    pub file_name: String,
    pub file_path: String,
    pub description: String,
    pub status: String,
}
