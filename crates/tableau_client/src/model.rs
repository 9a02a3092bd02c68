//! Wire-level items returned by the REST API.

use serde_json::Value;

use crate::error::TableauError;

/// An authenticated session. Only valid between sign-in and sign-out.
#[derive(Clone)]
pub struct Session {
    /// Value for the `X-Tableau-Auth` header
    pub token: String,
    /// Site LUID used in `/sites/{id}/...` paths
    pub site_id: String,
    pub user_id: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookItem {
    pub id: String,
    pub name: String,
    pub project_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewItem {
    pub id: String,
    pub name: String,
}

/// Paging info from a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_number: u64,
    pub page_size: u64,
    pub total_available: u64,
}

// ── JSON extraction ─────────────────────────────────────────────────

/// Tableau encodes numbers in pagination as strings.
fn json_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn json_str(v: &Value, key: &str) -> Result<String, TableauError> {
    v[key]
        .as_str()
        .map(String::from)
        .ok_or_else(|| TableauError::Parse(format!("missing '{}' in response", key)))
}

/// `{"foo": {"bar": [ ... ]}}` as a slice. An absent or empty container is
/// an empty list (Tableau sends `{"workbooks": {}}` for zero items).
fn nested_list<'a>(body: &'a Value, outer: &str, inner: &str) -> &'a [Value] {
    body.get(outer)
        .and_then(|o| o.get(inner))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn parse_session(body: &Value) -> Result<Session, TableauError> {
    let creds = body
        .get("credentials")
        .ok_or_else(|| TableauError::Parse("missing 'credentials' in sign-in response".into()))?;
    Ok(Session {
        token: json_str(creds, "token")?,
        site_id: json_str(&creds["site"], "id")?,
        user_id: creds["user"]["id"].as_str().unwrap_or_default().to_string(),
    })
}

pub(crate) fn parse_pagination(body: &Value) -> Option<Pagination> {
    let p = body.get("pagination")?;
    Some(Pagination {
        page_number: json_u64(&p["pageNumber"])?,
        page_size: json_u64(&p["pageSize"])?,
        total_available: json_u64(&p["totalAvailable"])?,
    })
}

pub(crate) fn parse_workbooks(body: &Value) -> Result<Vec<WorkbookItem>, TableauError> {
    nested_list(body, "workbooks", "workbook")
        .iter()
        .map(|w| {
            Ok(WorkbookItem {
                id: json_str(w, "id")?,
                name: json_str(w, "name")?,
                project_name: w["project"]["name"].as_str().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_views(body: &Value) -> Result<Vec<ViewItem>, TableauError> {
    nested_list(body, "views", "view")
        .iter()
        .map(|v| {
            Ok(ViewItem {
                id: json_str(v, "id")?,
                name: json_str(v, "name")?,
            })
        })
        .collect()
}

pub(crate) fn parse_rest_api_version(body: &Value) -> Result<String, TableauError> {
    body["serverInfo"]["restApiVersion"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| TableauError::Parse("missing 'serverInfo.restApiVersion'".into()))
}

/// `{"error": {"summary", "detail", "code"}}` → "summary: detail (code)"
pub(crate) fn extract_error(body: &str, status: u16) -> (Option<String>, String) {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let err = &parsed["error"];
    let code = err["code"].as_str().map(String::from);
    let summary = err["summary"].as_str().unwrap_or_default();
    let detail = err["detail"].as_str().unwrap_or_default();

    let msg = match (summary.is_empty(), detail.is_empty()) {
        (false, false) => format!("{}: {}", summary, detail),
        (false, true) => summary.to_string(),
        (true, false) => detail.to_string(),
        (true, true) if !body.trim().is_empty() && parsed.is_null() => {
            body.chars().take(200).collect()
        }
        _ => format!("status {}", status),
    };
    let msg = match &code {
        Some(c) => format!("{} ({})", msg, c),
        None => msg,
    };
    (code, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_session() {
        let body = json!({
            "credentials": {
                "token": "tok",
                "site": { "id": "site-luid", "contentUrl": "sales" },
                "user": { "id": "user-luid" }
            }
        });
        let s = parse_session(&body).unwrap();
        assert_eq!(s.token, "tok");
        assert_eq!(s.site_id, "site-luid");
        assert_eq!(s.user_id, "user-luid");
        assert!(!format!("{:?}", s).contains("tok\""));
    }

    #[test]
    fn test_parse_session_missing_token() {
        let body = json!({ "credentials": { "site": { "id": "x" } } });
        assert!(matches!(parse_session(&body), Err(TableauError::Parse(_))));
    }

    #[test]
    fn test_pagination_string_numbers() {
        let body = json!({
            "pagination": { "pageNumber": "2", "pageSize": "100", "totalAvailable": "150" }
        });
        let p = parse_pagination(&body).unwrap();
        assert_eq!(p, Pagination { page_number: 2, page_size: 100, total_available: 150 });
    }

    #[test]
    fn test_empty_workbook_container() {
        let body = json!({ "workbooks": {} });
        assert!(parse_workbooks(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_workbooks_with_project() {
        let body = json!({
            "workbooks": { "workbook": [
                { "id": "w1", "name": "Sales", "project": { "id": "p1", "name": "Finance" } },
                { "id": "w2", "name": "HR" }
            ]}
        });
        let wbs = parse_workbooks(&body).unwrap();
        assert_eq!(wbs[0].project_name, "Finance");
        assert_eq!(wbs[1].project_name, "");
    }

    #[test]
    fn test_extract_error_formats() {
        let body = r#"{"error":{"summary":"Signin Error","detail":"Invalid PAT","code":"401001"}}"#;
        let (code, msg) = extract_error(body, 401);
        assert_eq!(code.as_deref(), Some("401001"));
        assert_eq!(msg, "Signin Error: Invalid PAT (401001)");

        let (code, msg) = extract_error("", 502);
        assert!(code.is_none());
        assert_eq!(msg, "status 502");

        let (_, msg) = extract_error("<html>bad gateway</html>", 502);
        assert_eq!(msg, "<html>bad gateway</html>");
    }
}
