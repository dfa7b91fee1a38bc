use serde::{Deserialize, Serialize};

/// Script element the loader asks the host document to append to `<head>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDirective {
    pub src: String,
    pub mime_type: String,
    pub is_async: bool,
}

impl ScriptDirective {
    /// Directive for the SDK bundle hosted by a Formbricks instance.
    ///
    /// `app_url` is expected to be normalised already (no trailing slash).
    pub fn for_app(app_url: &str, bundle_file: &str) -> Self {
        Self {
            src: bundle_src(app_url, bundle_file),
            mime_type: "text/javascript".to_string(),
            is_async: true,
        }
    }

    pub fn to_html(&self) -> String {
        let mut tag = format!(
            r#"<script type="{}" src="{}""#,
            escape_attr(&self.mime_type),
            escape_attr(&self.src)
        );
        if self.is_async {
            tag.push_str(" async");
        }
        tag.push_str("></script>");
        tag
    }
}

pub fn bundle_src(app_url: &str, bundle_file: &str) -> String {
    format!("{app_url}/js/{}", bundle_file.trim_start_matches('/'))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}
