//! Email subjects and HTML bodies.
//!
//! Every interpolated value is HTML-escaped; display names and owner names
//! come from user input.

use spn_core::expiry::NotificationKind;
use spn_core::provisioning::SecretLifetime;
use spn_core::types::Timestamp;

const SIGNATURE: &str = "Service Principal Automation Team";

/// A ready-to-send email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html_body: String,
}

/// Escape the five HTML-significant characters.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

fn format_day(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn format_instant(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Wrap paragraphs in the shared greeting/signature layout.
fn layout(owner_name: &str, paragraphs: &[String]) -> String {
    let mut body = String::from(
        "<html>\n  <body style=\"font-family: Arial, sans-serif; color: #333;\">\n",
    );
    body.push_str(&format!("    <p>Hi {},</p>\n", escape_html(owner_name)));
    for p in paragraphs {
        body.push_str(&format!("    <p>{p}</p>\n"));
    }
    body.push_str(&format!(
        "    <p>Best Regards,<br>{SIGNATURE}</p>\n  </body>\n</html>\n"
    ));
    body
}

fn credential_table(rows: &[(&str, String)]) -> String {
    let mut table = String::from("<table style=\"border-collapse: collapse; margin-top: 10px;\">");
    for (label, value) in rows {
        table.push_str(&format!(
            "<tr><td style=\"padding: 8px; font-weight: bold;\">{label}:</td>\
             <td style=\"padding: 8px;\">{}</td></tr>",
            escape_html(value)
        ));
    }
    table.push_str("</table>");
    table
}

// ---------------------------------------------------------------------------
// Expiry notices
// ---------------------------------------------------------------------------

/// Render the notice for `kind`.
///
/// For [`NotificationKind::Renewal`], `expiry` is the new expiry; otherwise
/// it is the expiry being warned about.
pub fn expiry_notice(
    kind: NotificationKind,
    owner_name: &str,
    app_name: &str,
    expiry: Timestamp,
) -> RenderedEmail {
    let app = escape_html(app_name);
    let day = format_day(expiry);
    match kind {
        NotificationKind::Upcoming => RenderedEmail {
            subject: format!("[Upcoming Expiry] SP Secret for '{app_name}'"),
            html_body: layout(
                owner_name,
                &[
                    format!(
                        "<strong>Heads up:</strong> Your Service Principal secret for \
                         <strong>{app}</strong> will expire on <strong>{day}</strong>."
                    ),
                    "Please renew it before expiry to avoid disruption.".to_string(),
                ],
            ),
        },
        NotificationKind::Expired => RenderedEmail {
            subject: format!("[Expired] SP Secret for '{app_name}'"),
            html_body: layout(
                owner_name,
                &[
                    format!(
                        "<strong>Action Required:</strong> Your Service Principal secret for \
                         <strong>{app}</strong> expired on <strong>{day}</strong>."
                    ),
                    "Please generate a new secret to avoid service disruption.".to_string(),
                ],
            ),
        },
        NotificationKind::Renewal => RenderedEmail {
            subject: format!("[Renewed] SP Secret for '{app_name}'"),
            html_body: layout(
                owner_name,
                &[
                    format!(
                        "The secret for <strong>{app}</strong> has been renewed. \
                         New expiry: <strong>{day}</strong>."
                    ),
                    "Thank you for keeping your credentials up to date.".to_string(),
                ],
            ),
        },
    }
}

// ---------------------------------------------------------------------------
// Credential emails
// ---------------------------------------------------------------------------

/// Values shown in a credentials email.
#[derive(Debug, Clone)]
pub struct CredentialDetails<'a> {
    pub owner_name: &'a str,
    pub app_name: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub tenant_id: &'a str,
    pub expires_at: Timestamp,
    pub lifetime: SecretLifetime,
}

/// Sent once after a new application is provisioned.
pub fn credentials_created(details: &CredentialDetails<'_>) -> RenderedEmail {
    let table = credential_table(&[
        ("Service Principal Name", details.app_name.to_string()),
        ("Client ID", details.client_id.to_string()),
        ("Client Secret", details.client_secret.to_string()),
        ("Tenant ID", details.tenant_id.to_string()),
        ("Secret Expiry", format_instant(details.expires_at)),
    ]);
    RenderedEmail {
        subject: format!("Service Principal Credentials for '{}'", details.app_name),
        html_body: layout(
            details.owner_name,
            &[
                "Your Service Principal has been created successfully. \
                 Please find the credentials below:"
                    .to_string(),
                table,
                format!(
                    "<strong>NOTE: Secret is valid for {} from date of creation.</strong>",
                    details.lifetime.describe()
                ),
                "<strong>Please store these credentials securely</strong>. \
                 Do not share them with unauthorized users."
                    .to_string(),
            ],
        ),
    }
}

/// Sent after a secret is renewed on request.
pub fn credentials_renewed(details: &CredentialDetails<'_>) -> RenderedEmail {
    let table = credential_table(&[
        ("Service Principal Name", details.app_name.to_string()),
        ("Client ID", details.client_id.to_string()),
        ("New Client Secret", details.client_secret.to_string()),
        ("Tenant ID", details.tenant_id.to_string()),
        ("New Secret Expiry", format_instant(details.expires_at)),
    ]);
    RenderedEmail {
        subject: format!("Secret Renewed: Service Principal '{}'", details.app_name),
        html_body: layout(
            details.owner_name,
            &[
                format!(
                    "The client secret for your Service Principal <strong>'{}'</strong> \
                     has been successfully renewed.",
                    escape_html(details.app_name)
                ),
                "Please find the new credentials below:".to_string(),
                table,
                format!(
                    "<strong>NOTE: This new secret is valid for {} from date of creation.</strong>",
                    details.lifetime.describe()
                ),
                "<strong>Please discard the old secret and store these new credentials \
                 securely</strong>."
                    .to_string(),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn expiry() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2026, 11, 5, 8, 30, 0).unwrap()
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn each_kind_has_a_distinct_subject() {
        let subjects: Vec<String> = NotificationKind::ALL
            .iter()
            .map(|k| expiry_notice(*k, "Jane", "billing", expiry()).subject)
            .collect();
        assert_eq!(subjects[0], "[Upcoming Expiry] SP Secret for 'billing'");
        assert_eq!(subjects[1], "[Expired] SP Secret for 'billing'");
        assert_eq!(subjects[2], "[Renewed] SP Secret for 'billing'");
    }

    #[test]
    fn notice_body_mentions_expiry_day_and_escapes_names() {
        let email = expiry_notice(NotificationKind::Expired, "<Jane>", "a&b", expiry());
        assert!(email.html_body.contains("2026-11-05"));
        assert!(email.html_body.contains("Hi &lt;Jane&gt;,"));
        assert!(email.html_body.contains("<strong>a&amp;b</strong>"));
    }

    #[test]
    fn created_email_contains_credentials_and_lifetime() {
        let email = credentials_created(&CredentialDetails {
            owner_name: "Jane",
            app_name: "billing",
            client_id: "client-123",
            client_secret: "s3cr3t",
            tenant_id: "tenant-9",
            expires_at: expiry(),
            lifetime: SecretLifetime::TestMode,
        });
        assert!(email.html_body.contains("client-123"));
        assert!(email.html_body.contains("s3cr3t"));
        assert!(email.html_body.contains("tenant-9"));
        assert!(email.html_body.contains("2026-11-05 08:30:00 UTC"));
        assert!(email.html_body.contains("10 minutes"));
    }

    #[test]
    fn renewed_email_uses_new_secret_labels() {
        let email = credentials_renewed(&CredentialDetails {
            owner_name: "Jane",
            app_name: "billing",
            client_id: "client-123",
            client_secret: "n3w",
            tenant_id: "tenant-9",
            expires_at: expiry(),
            lifetime: SecretLifetime::Standard,
        });
        assert_eq!(email.subject, "Secret Renewed: Service Principal 'billing'");
        assert!(email.html_body.contains("New Client Secret:"));
        assert!(email.html_body.contains("24 months"));
    }
}
