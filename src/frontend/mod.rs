use tracing::{info, warn};

use crate::errors::CodeGenError;
use crate::extract::links_stylesheet;
use crate::prompt::{self, STYLESHEET_NAME};
use crate::provider::Completer;
use crate::wire::FrontendArtifact;

/// Generates the page for `prompt`. The returned html always links
/// `index.css`.
pub async fn generate(llm: &Completer, prompt: &str) -> Result<FrontendArtifact, CodeGenError> {
    let mut out: FrontendArtifact = llm.invoke("frontend", &prompt::frontend(prompt)).await?;
    if !links_stylesheet(&out.html_code, STYLESHEET_NAME) {
        warn!("generated html does not link {STYLESHEET_NAME}; injecting the link");
        out.html_code = inject_stylesheet_link(&out.html_code);
    }
    info!(html_bytes = out.html_code.len(), css_bytes = out.css_code.len(), "frontend generated");
    Ok(out)
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

/// Offset of the first `<tag>` or `<tag ...>` opener. `<head` must not match
/// `<header`.
fn find_open_tag(html: &str, tag: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let needle = format!("<{tag}");
    lower.match_indices(&needle).map(|(at, _)| at).find(|&at| {
        lower[at + needle.len()..]
            .bytes()
            .next()
            .is_some_and(|b| b == b'>' || b == b'/' || b.is_ascii_whitespace())
    })
}

/// Places the link before `</head>`, else right after the opening `<head>`
/// or `<html>` tag, else at the very start.
fn inject_stylesheet_link(html: &str) -> String {
    let link = format!(r#"<link rel="stylesheet" href="{STYLESHEET_NAME}">"#);

    if let Some(at) = find_ascii_ci(html, "</head>") {
        return format!("{}{link}{}", &html[..at], &html[at..]);
    }
    for tag in ["head", "html"] {
        if let Some(start) = find_open_tag(html, tag) {
            if let Some(end) = html[start..].find('>') {
                let at = start + end + 1;
                return format!("{}{link}{}", &html[..at], &html[at..]);
            }
        }
    }
    format!("{link}{html}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{completer, ScriptedProvider};
    use serde_json::json;

    #[test]
    fn injects_before_head_close() {
        let out = inject_stylesheet_link("<html><HEAD><title>x</title></HEAD><body></body></html>");
        assert_eq!(
            out,
            r#"<html><HEAD><title>x</title><link rel="stylesheet" href="index.css"></HEAD><body></body></html>"#
        );
    }

    #[test]
    fn injects_after_html_open_or_prepends() {
        let out = inject_stylesheet_link(r#"<html lang="en"><body></body></html>"#);
        assert!(out.starts_with(r#"<html lang="en"><link rel="stylesheet" href="index.css">"#));

        let out = inject_stylesheet_link("<form></form>");
        assert!(out.starts_with(r#"<link rel="stylesheet""#));
        assert!(links_stylesheet(&out, STYLESHEET_NAME));
    }

    #[test]
    fn header_element_is_not_the_head() {
        let out = inject_stylesheet_link("<body><header><h1>Login</h1></header></body>");
        assert!(out.starts_with(r#"<link rel="stylesheet" href="index.css"><body><header>"#));

        let out = inject_stylesheet_link("<html>\n<header>x</header><head >\n</html>");
        assert!(out.contains(r#"<head ><link rel="stylesheet""#));
    }

    #[tokio::test]
    async fn generated_html_links_stylesheet() {
        let llm = completer(ScriptedProvider::default().reply(
            "Output",
            json!({
                "html_code": "<html><head><title>Login</title></head><body><form><input name=\"email\" type=\"email\"></form></body></html>",
                "css_code": "body { margin: 0; }"
            }),
        ));
        let out = generate(&llm, "Create a login form").await.unwrap();
        assert!(links_stylesheet(&out.html_code, STYLESHEET_NAME));
        assert_eq!(out.css_code, "body { margin: 0; }");
    }

    #[tokio::test]
    async fn sends_prompt_with_stylesheet_note() {
        let provider = std::sync::Arc::new(ScriptedProvider::default().reply(
            "Output",
            json!({"html_code": "<link rel=\"stylesheet\" href=\"index.css\">", "css_code": ""}),
        ));
        let llm = Completer::new(provider.clone(), std::time::Duration::from_secs(5));
        generate(&llm, "A bakery page").await.unwrap();

        let seen = provider.seen.lock();
        assert_eq!(seen[0].0, "Output");
        assert!(seen[0].1.user.starts_with("A bakery page"));
        assert!(seen[0].1.user.contains("index.css"));
    }
}
