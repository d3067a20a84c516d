// src/utils.rs
use anyhow::Result;

/// Replace characters that are unsafe in file names, keep spaces and dashes
pub fn normalize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Collapse all runs of whitespace into single spaces
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shorten long text for log lines
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validate file extension against allowed types
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> Result<()> {
    let ext = get_file_extension(filename)
        .ok_or_else(|| anyhow::anyhow!("File has no extension: {}", filename))?;

    if !allowed.contains(&ext.as_str()) {
        anyhow::bail!("Unsupported file extension: {}. Allowed: {:?}", ext, allowed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(
            normalize_file_name("Dev/Ops Engineer - Acme: Labs Cover Letter"),
            "Dev_Ops Engineer - Acme_ Labs Cover Letter"
        );
        assert_eq!(normalize_file_name(" Sr. Engineer (m/f/d) "), "Sr. Engineer _m_f_d_");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Years of\n\n   experience \t with Rust "), "Years of experience with Rust");
        assert_eq!(clean_text("\n \n"), "");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("a longer sentence", 8), "a longer...");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(get_file_extension("resume.PDF"), Some("pdf".to_string()));
        assert_eq!(get_file_extension("noext"), None);
        assert!(validate_file_extension("answers.csv", &["csv"]).is_ok());
        assert!(validate_file_extension("answers.txt", &["csv"]).is_err());
    }
}
