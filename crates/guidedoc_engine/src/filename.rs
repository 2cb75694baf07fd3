/// Windows-safe document filename derived from the guide title.
///
/// Falls back to `manual_{guide_id}` (or `manual_unknown`) when fewer than
/// two usable characters survive cleaning.
pub fn document_filename(title: &str, guide_id: Option<&str>) -> String {
    let cleaned = clean_title(title);
    let base = if cleaned.chars().count() < 2 {
        match guide_id {
            Some(id) => format!("manual_{id}"),
            None => "manual_unknown".to_string(),
        }
    } else {
        cleaned
    };
    format!("{base}.docx")
}

fn clean_title(title: &str) -> String {
    let kept: String = title.chars().filter(|c| !is_forbidden(*c)).collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(200).collect();
    truncated.trim_end_matches(['.', ' ']).to_string()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' | '\0'..='\u{1f}' | '\u{7f}'
    )
}
