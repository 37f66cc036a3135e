use scraper::node::Element;
use scraper::Html;
use std::collections::HashSet;

use crate::wire::FormField;

fn elements(document: &Html) -> impl Iterator<Item = &Element> {
    document.tree.root().descendants().filter_map(|node| node.value().as_element())
}

/// Named form controls in document order. Names are kept exactly as written
/// and only a missing or empty `name` is skipped. The first control carrying a
/// name wins; later ones with the same name are dropped. Parsing is
/// tolerant, so broken markup yields whatever controls survive, possibly none.
pub fn extract_fields(html: &str) -> Vec<FormField> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for el in elements(&document) {
        let kind = match el.name() {
            "input" => match el.attr("type").map(str::trim) {
                Some(t) if !t.is_empty() => t.to_string(),
                _ => "text".to_string(),
            },
            "textarea" | "select" => el.name().to_string(),
            _ => continue,
        };
        let name = match el.attr("name") {
            Some(n) if !n.is_empty() => n,
            _ => continue,
        };
        if seen.insert(name.to_string()) {
            fields.push(FormField::new(name, kind));
        }
    }
    fields
}

/// Whether some `<link rel="stylesheet">` points at `stylesheet`.
pub fn links_stylesheet(html: &str, stylesheet: &str) -> bool {
    let document = Html::parse_document(html);
    let wanted = stylesheet.trim_start_matches("./");
    let linked = elements(&document).any(|el| {
        el.name() == "link"
            && el.attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            })
            && el
                .attr("href")
                .is_some_and(|href| href.trim().trim_start_matches("./") == wanted)
    });
    linked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let fields = extract_fields("<input name='a' type='email'><input name='a' type='text'>");
        assert_eq!(fields, vec![FormField::new("a", "email")]);
    }

    #[test]
    fn nameless_inputs_are_skipped() {
        assert!(extract_fields("<input type='text'>").is_empty());
        assert!(extract_fields("<input name='' type='text'><textarea name=''></textarea>").is_empty());
    }

    #[test]
    fn names_are_kept_as_written() {
        let fields = extract_fields("<input name=' a '><input name=' '><input name='a'>");
        assert_eq!(
            fields,
            vec![
                FormField::new(" a ", "text"),
                FormField::new(" ", "text"),
                FormField::new("a", "text"),
            ]
        );
    }

    #[test]
    fn type_defaults_to_text_and_order_is_kept() {
        let html = r#"
            <form>
              <input name="email" type="email">
              <input name="nickname">
              <textarea name="bio"></textarea>
              <select name="country"><option>NL</option></select>
              <input name="password" type="password">
            </form>"#;
        let fields = extract_fields(html);
        assert_eq!(
            fields,
            vec![
                FormField::new("email", "email"),
                FormField::new("nickname", "text"),
                FormField::new("bio", "textarea"),
                FormField::new("country", "select"),
                FormField::new("password", "password"),
            ]
        );
    }

    #[test]
    fn malformed_markup_does_not_panic() {
        assert!(extract_fields("<<<>>> <div <input").is_empty());
        let fields = extract_fields("<form><input name=user type=text<p>oops</form");
        assert!(fields.len() <= 1);
        assert!(extract_fields("").is_empty());
    }

    #[test]
    fn uppercase_tags_are_matched() {
        assert_eq!(extract_fields("<INPUT NAME='q' TYPE='search'>"), vec![FormField::new("q", "search")]);
    }

    #[test]
    fn detects_stylesheet_link() {
        let html = r#"<html><head><link rel="stylesheet" href="./index.css"></head><body></body></html>"#;
        assert!(links_stylesheet(html, "index.css"));
        assert!(!links_stylesheet("<html><head></head></html>", "index.css"));
        assert!(!links_stylesheet(r#"<link href="main.css">"#, "index.css"));
        assert!(links_stylesheet(r#"<link rel="Alternate STYLESHEET" href="index.css">"#, "index.css"));
    }

    #[test]
    fn non_stylesheet_rel_does_not_count() {
        assert!(!links_stylesheet(r#"<link rel="icon" href="index.css">"#, "index.css"));
        assert!(!links_stylesheet(r#"<link href="index.css">"#, "index.css"));
        assert!(!links_stylesheet(r#"<link rel="preload" href="index.css" as="style">"#, "index.css"));
    }
}
