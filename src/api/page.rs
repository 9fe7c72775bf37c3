use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::{APP_TITLE, DATASET_TIPS, TAGLINE};

/// Stylesheet text, or `None` when the file is absent or unreadable.
pub fn read_stylesheet(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(css) => Some(css),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "stylesheet absent");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), "stylesheet unreadable: {e}");
            None
        }
    }
}

/// Landing page: optional stylesheet, hero banner and dataset tips.
pub fn landing_page(stylesheet: Option<&str>) -> String {
    let mut html = String::from("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{APP_TITLE}</title>\n"));
    if let Some(css) = stylesheet {
        html.push_str("<style>");
        html.push_str(css);
        html.push_str("</style>\n");
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!(
        "<div class=\"hero\">\n<h1>✈️ {APP_TITLE}</h1>\n<p>{TAGLINE}</p>\n</div>\n"
    ));
    html.push_str("<div class=\"tips-card\" id=\"dataset-tips\">\n<h3>📋 Dataset Tips</h3>\n<ul>\n");
    for tip in DATASET_TIPS {
        html.push_str(&format!("<li>{tip}</li>\n"));
    }
    html.push_str("</ul>\n</div>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_is_injected_verbatim() {
        let page = landing_page(Some(".hero { color: red; }"));
        assert!(page.contains("<style>.hero { color: red; }</style>"));
        assert!(page.contains(APP_TITLE));
    }

    #[test]
    fn missing_stylesheet_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let css = read_stylesheet(&dir.path().join("style.css"));
        assert!(css.is_none());
        let page = landing_page(css.as_deref());
        assert!(!page.contains("<style>"));
        assert_eq!(page.matches("<li>").count(), DATASET_TIPS.len());
    }
}
