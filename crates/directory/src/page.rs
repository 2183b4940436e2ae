//! Markup assumptions about the directory's plugin page.
//!
//! The page is not an API: everything here depends on the element ids and
//! class names the directory happens to render, and breaks when the site is
//! redesigned. Keeping the parsing pure lets those assumptions be tested
//! against synthetic pages without HTTP.
//!
//! The parsed document is never held across an `.await`; callers pass the
//! response body and get owned data back.

use {
    regex::Regex,
    scraper::{Html, Selector},
};

use crate::{Error, Result, types::VoteTable};

/// Row ids look like `compatibility-version-3_5`.
const ROW_ID_PREFIX: &str = "compatibility-version-";

const VOTE_TABLE: &str = "table#compatibility-table";
const VOTE_FORM_INPUTS: &str = "form.compatibility input";

/// Extract the logged-in account's votes from the compatibility table.
///
/// Each table row whose id encodes a host version yields an entry for that
/// version. Within a row, a cell whose class carries
/// `compatibility-topic-version-<plugin version>` records a vote only when the
/// class also has a `user-works` or `user-broken` token; cells without either
/// token produce no entry.
pub fn extract_votes(html: &str) -> Result<VoteTable> {
    let document = Html::parse_document(html);
    let table_selector = selector(VOTE_TABLE)?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;
    let patterns = ClassPatterns::new()?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| Error::unknown_page_format("no compatibility table"))?;

    let mut votes = VoteTable::new();
    for row in table.select(&row_selector) {
        let Some(id) = row.value().id().filter(|id| !id.is_empty()) else {
            continue;
        };
        let host_version = decode_version(&id.replace(ROW_ID_PREFIX, ""));
        votes.ensure_host(&host_version);

        for cell in row.select(&cell_selector) {
            let class = cell.value().attr("class").unwrap_or_default();
            let Some(plugin_version) = patterns.plugin_version(class) else {
                continue;
            };
            if let Some(compatible) = patterns.user_vote(class) {
                votes.insert(&host_version, &plugin_version, compatible);
            }
        }
    }
    Ok(votes)
}

/// Collect the `name`/`value` pairs of every named input inside the voting
/// form, hidden nonces included. Duplicate names keep their first position
/// and their last value.
pub fn extract_form_fields(html: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let input_selector = selector(VOTE_FORM_INPUTS)?;

    let mut inputs = document.select(&input_selector).peekable();
    if inputs.peek().is_none() {
        return Err(Error::unknown_page_format(
            "no voting form on the plugin's directory page",
        ));
    }

    let mut fields = Vec::new();
    for input in inputs {
        let element = input.value();
        let Some(name) = element.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        set_field(&mut fields, name, element.attr("value").unwrap_or_default());
    }
    Ok(fields)
}

/// Insert or replace a form field, keeping its original position.
pub fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    match fields.iter_mut().find(|(n, _)| n == name) {
        Some(field) => field.1 = value.to_string(),
        None => fields.push((name.to_string(), value.to_string())),
    }
}

/// `3_5_1` → `3.5.1`.
fn decode_version(encoded: &str) -> String {
    encoded.replace('_', ".").trim().to_string()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| Error::unknown_page_format(format!("bad selector {css}: {e:?}")))
}

struct ClassPatterns {
    plugin_version: Regex,
    user_vote: Regex,
}

impl ClassPatterns {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::unknown_page_format(format!("bad pattern {pattern}: {e}")))
        };
        Ok(Self {
            plugin_version: compile(
                r"(?i)compatibility-topic-version-(?P<version>\S+?)(?:\s|$)",
            )?,
            user_vote: compile(r"(?:\s|^)user-(?P<vote>works|broken)(?:\s|$)")?,
        })
    }

    fn plugin_version(&self, class: &str) -> Option<String> {
        self.plugin_version
            .captures(class)
            .and_then(|caps| caps.name("version"))
            .map(|m| decode_version(m.as_str()))
    }

    fn user_vote(&self, class: &str) -> Option<bool> {
        self.user_vote
            .captures(class)
            .and_then(|caps| caps.name("vote"))
            .map(|m| m.as_str() == "works")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn page_with_cell(class: &str) -> String {
        format!(
            r#"<html><body>
            <table id="compatibility-table">
              <tr id="compatibility-version-3_5">
                <th>3.5</th>
                <td class="{class}">vote</td>
              </tr>
            </table>
            </body></html>"#
        )
    }

    #[rstest]
    #[case("compatibility-topic-version-1_0 user-works", Some(true))]
    #[case("compatibility-topic-version-1_0 user-broken", Some(false))]
    #[case("user-works compatibility-topic-version-1_0", Some(true))]
    #[case("compatibility-topic-version-1_0", None)]
    #[case("compatibility-topic-version-1_0 works", None)]
    #[case("compatibility-topic-version-1_0 user-worksforme", None)]
    fn cell_vote_markers(#[case] class: &str, #[case] expected: Option<bool>) {
        let votes = extract_votes(&page_with_cell(class)).unwrap();
        assert_eq!(votes.get("3.5", "1.0"), expected);
        assert!(serde_json::to_value(&votes).unwrap()["3.5"].is_object());
    }

    #[test]
    fn cells_without_version_class_are_ignored() {
        let votes = extract_votes(&page_with_cell("user-works")).unwrap();
        assert!(votes.is_empty());
    }

    #[test]
    fn version_class_is_case_insensitive() {
        let votes = extract_votes(&page_with_cell("Compatibility-Topic-Version-2_1_3 user-works"))
            .unwrap();
        assert_eq!(votes.get("3.5", "2.1.3"), Some(true));
    }

    #[test]
    fn parses_full_table() {
        let html = r#"
            <table id="compatibility-table">
              <thead><tr><th></th><th>1.0</th><th>1.1</th></tr></thead>
              <tbody>
                <tr id="compatibility-version-5_0">
                  <td class="compatibility-topic-version-1_0 user-broken"></td>
                  <td class="compatibility-topic-version-1_1 user-works"></td>
                </tr>
                <tr id="compatibility-version-4_9_8">
                  <td class="compatibility-topic-version-1_0 user-works"></td>
                  <td class="compatibility-topic-version-1_1"></td>
                </tr>
              </tbody>
            </table>"#;

        let votes = extract_votes(html).unwrap();
        assert_eq!(votes.get("5.0", "1.0"), Some(false));
        assert_eq!(votes.get("5.0", "1.1"), Some(true));
        assert_eq!(votes.get("4.9.8", "1.0"), Some(true));
        assert_eq!(votes.get("4.9.8", "1.1"), None);
        assert_eq!(votes.len(), 3);
    }

    #[test]
    fn missing_table_is_unknown_format() {
        let err = extract_votes("<html><body><p>Maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::UnknownPageFormat { .. }));
    }

    #[test]
    fn extracts_named_form_inputs() {
        let html = r#"
            <form class="compatibility" method="post">
              <input type="hidden" name="_wpnonce" value="n0nce">
              <input type="hidden" name="compatibility[version]" value="6.4">
              <input type="submit" value="Vote">
              <input type="text" name="note">
            </form>
            <form class="search"><input name="q" value="x"></form>"#;

        let fields = extract_form_fields(html).unwrap();
        assert_eq!(
            fields,
            vec![
                ("_wpnonce".to_string(), "n0nce".to_string()),
                ("compatibility[version]".to_string(), "6.4".to_string()),
                ("note".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn missing_form_is_unknown_format() {
        let err = extract_form_fields(r#"<form class="search"><input name="q"></form>"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownPageFormat { .. }));
    }

    #[test]
    fn set_field_overwrites_in_place() {
        let mut fields = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        set_field(&mut fields, "a", "9");
        set_field(&mut fields, "c", "3");
        assert_eq!(
            fields,
            vec![
                ("a".to_string(), "9".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }
}
