//! CDN reference rewriting.
//!
//! References listed in the `[cdn]` config section are rewritten to point
//! at the CDN base URL. Only exact quoted references (with or without a
//! leading slash) are rewritten; everything else is left alone.

use crate::config::CdnConfig;

/// Rewrite CDN-eligible references in an HTML document.
pub fn rewrite_cdn(html: &str, cdn: &CdnConfig) -> String {
    if !cdn.enabled || cdn.files.is_empty() {
        return html.to_string();
    }

    let base = cdn.base.trim_end_matches('/');
    let mut result = html.to_string();

    for file in &cdn.files {
        let file = file.trim_start_matches('/');
        let cdn_url = format!("{}/{}", base, file);

        for reference in [format!("\"/{}\"", file), format!("\"{}\"", file)] {
            let replacement = format!("\"{}\"", cdn_url);
            result = result.replace(&reference, &replacement);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdn(files: &[&str]) -> CdnConfig {
        CdnConfig {
            enabled: true,
            base: "https://cdn.example.com/".to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_rewrite_root_relative_reference() {
        let html = r#"<script src="/js/lib.js"></script>"#;
        let rewritten = rewrite_cdn(html, &cdn(&["js/lib.js"]));
        assert_eq!(
            rewritten,
            r#"<script src="https://cdn.example.com/js/lib.js"></script>"#
        );
    }

    #[test]
    fn test_rewrite_bare_reference() {
        let html = r#"<link href="styles/app.css">"#;
        let rewritten = rewrite_cdn(html, &cdn(&["styles/app.css"]));
        assert_eq!(rewritten, r#"<link href="https://cdn.example.com/styles/app.css">"#);
    }

    #[test]
    fn test_unlisted_references_untouched() {
        let html = r#"<script src="/js/app.js"></script>"#;
        let rewritten = rewrite_cdn(html, &cdn(&["js/lib.js"]));
        assert_eq!(rewritten, html);
    }

    #[test]
    fn test_disabled_cdn_is_identity() {
        let html = r#"<script src="/js/lib.js"></script>"#;
        let config = CdnConfig { enabled: false, ..cdn(&["js/lib.js"]) };
        assert_eq!(rewrite_cdn(html, &config), html);
    }
}
