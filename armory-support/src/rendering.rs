//! Text rendering helpers for kernel diagnostics.
//!
//! Resolution errors carry identifier chains and candidate lists; these
//! helpers turn them into the multi-line messages users see.

use std::fmt::Write as _;

use tracing::trace;

/// Joins an identifier chain with arrows, root first.
///
/// # Examples
/// ```
/// use armory_support::rendering::render_chain;
///
/// let chain = ["INinja", "IKatana", "INinja"];
/// assert_eq!(render_chain(&chain), "INinja → IKatana → INinja");
/// ```
pub fn render_chain<S: AsRef<str>>(chain: &[S]) -> String {
    let mut out = String::new();
    for (i, link) in chain.iter().enumerate() {
        if i > 0 {
            out.push_str(" → ");
        }
        out.push_str(link.as_ref());
    }
    out
}

/// Renders entries as an indented bullet list, one per line.
///
/// Each line starts with a newline so the result can be appended directly
/// after a headline.
///
/// ```
/// use armory_support::rendering::render_list;
///
/// let rendered = render_list(&["#1 Katana", "#2 Shuriken"], 4);
/// assert_eq!(rendered, "\n    - #1 Katana\n    - #2 Shuriken");
/// ```
pub fn render_list<S: AsRef<str>>(entries: &[S], indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::new();
    for entry in entries {
        let _ = write!(out, "\n{pad}- {}", entry.as_ref());
    }
    out
}

/// Drops module paths from a fully qualified type name.
///
/// ```
/// use armory_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("dojo::weapons::Katana"), "Katana");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn dojo::Weapon>"),
///     "Arc<dyn Weapon>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push_str(&segment);
                out.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    out.push_str(&segment);
    out
}

/// Picks registered identifiers that look like the requested one.
///
/// Substring matches rank highest, then shared prefixes of at least three
/// characters. At most `limit` names are returned, best first.
pub fn suggest_similar(requested: &str, available: &[String], limit: usize) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &String)> = available
        .iter()
        .filter_map(|candidate| {
            let name = shorten_type_name(candidate).to_lowercase();
            if name == wanted {
                return None;
            }
            if name.contains(&wanted) || wanted.contains(&name) {
                return Some((100, candidate));
            }
            let common = name
                .chars()
                .zip(wanted.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (common >= 3).then_some((common * 10, candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    trace!(requested, matches = scored.len(), "Computed suggestions");

    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_with_cycle() {
        assert_eq!(render_chain(&["A", "B", "C", "A"]), "A → B → C → A");
    }

    #[test]
    fn chain_single_and_empty() {
        assert_eq!(render_chain(&["A"]), "A");
        let empty: [&str; 0] = [];
        assert_eq!(render_chain(&empty), "");
    }

    #[test]
    fn list_is_empty_for_no_entries() {
        let empty: [&str; 0] = [];
        assert_eq!(render_list(&empty, 2), "");
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("core::option::Option<alloc::vec::Vec<dojo::Katana>>"),
            "Option<Vec<Katana>>"
        );
    }

    #[test]
    fn shorten_plain_name() {
        assert_eq!(shorten_type_name("IKatana"), "IKatana");
    }

    #[test]
    fn suggests_close_identifiers() {
        let available = vec![
            "IKatana".to_string(),
            "IShuriken".to_string(),
            "INinja".to_string(),
        ];
        let suggestions = suggest_similar("IKatanna", &available, 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("IKatana"));
    }

    #[test]
    fn no_suggestion_for_unrelated_name() {
        let available = vec!["IShuriken".to_string()];
        assert!(suggest_similar("Database", &available, 3).is_empty());
    }

    #[test]
    fn exact_name_is_not_suggested() {
        let available = vec!["IKatana".to_string()];
        assert!(suggest_similar("IKatana", &available, 3).is_empty());
    }
}
