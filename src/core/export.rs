use crate::core::storage::MembershipRow;

pub const CSV_HEADER: &[&str] = &[
    "tg_user_id",
    "username",
    "first_name",
    "last_name",
    "is_bot",
    "is_verified",
    "group_id",
    "group_title",
    "crawled_at",
];

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Renders membership rows as CSV: header first, then one `\n`-terminated line per row.
pub fn render_csv(rows: &[MembershipRow]) -> String {
    let mut out = String::with_capacity(64 * (rows.len() + 1));
    out.push_str(&CSV_HEADER.join(","));
    out.push('\n');

    for row in rows {
        let fields = [
            row.tg_user_id.to_string(),
            escape(row.username.as_deref().unwrap_or_default()),
            escape(row.first_name.as_deref().unwrap_or_default()),
            escape(row.last_name.as_deref().unwrap_or_default()),
            flag(row.is_bot).to_string(),
            flag(row.is_verified).to_string(),
            escape(&row.group_id),
            escape(&row.group_title),
            escape(&row.crawled_at),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}
