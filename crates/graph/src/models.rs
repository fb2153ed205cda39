//! Graph resource shapes used by the client.
//!
//! Only the fields this service reads are modelled; everything else in the
//! Graph payloads is ignored.

use serde::{Deserialize, Serialize};
use spn_core::types::Timestamp;

/// OData collection envelope: `{ "value": [...] }`.
#[derive(Debug, Deserialize)]
pub struct GraphCollection<T> {
    pub value: Vec<T>,
}

/// An application registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Directory object id, used in `/applications/{id}` paths.
    pub id: String,
    /// The client id handed to the application owner.
    pub app_id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub password_credentials: Vec<PasswordCredential>,
}

impl Application {
    /// Latest `endDateTime` across all password credentials.
    pub fn latest_secret_expiry(&self) -> Option<Timestamp> {
        self.password_credentials
            .iter()
            .filter_map(|c| c.end_date_time)
            .max()
    }
}

/// A client secret registered on an application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredential {
    pub key_id: Option<String>,
    pub display_name: Option<String>,
    pub end_date_time: Option<Timestamp>,
    /// Only present in the `addPassword` response.
    pub secret_text: Option<String>,
}

/// Directory user, as much as owner assignment needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewApplication<'a> {
    pub display_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddPasswordRequest<'a> {
    pub password_credential: NewPasswordCredential<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewPasswordCredential<'a> {
    pub display_name: &'a str,
    pub end_date_time: Timestamp,
}

#[derive(Debug, Serialize)]
pub(crate) struct OwnerReference {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}
