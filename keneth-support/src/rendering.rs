//! Text rendering for human-friendly error output.
//!
//! Type names coming from [`std::any::type_name`] are long and noisy, so
//! everything shown to a developer goes through [`shorten_type_name`] first.

/// Separator used between the links of a dependency chain.
pub const CHAIN_ARROW: &str = " → ";

/// Joins a dependency chain into a single line.
///
/// # Examples
/// ```
/// use keneth_support::rendering::render_chain;
///
/// let chain = ["Handler", "Repo", "Handler"];
/// assert_eq!(render_chain(&chain), "Handler → Repo → Handler");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut out = String::new();
    for (i, link) in chain.iter().enumerate() {
        if i > 0 {
            out.push_str(CHAIN_ARROW);
        }
        out.push_str(link.as_ref());
    }
    out
}

/// Strips module paths from every path segment of a type name,
/// keeping generic structure intact.
///
/// ```
/// use keneth_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::repo::Repo"), "Repo");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn app::db::Pool>"),
///     "Arc<dyn Pool>"
/// );
/// assert_eq!(
///     shorten_type_name("core::option::Option<(app::A, app::B)>"),
///     "Option<(A, B)>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment_start = 0;

    for (idx, ch) in full_name.char_indices() {
        if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' | '*') {
            out.push_str(last_path_segment(&full_name[segment_start..idx]));
            out.push(ch);
            segment_start = idx + ch.len_utf8();
        }
    }
    out.push_str(last_path_segment(&full_name[segment_start..]));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Picks up to `limit` names from `available` that look like `requested`.
///
/// Matches are ranked: substring of the full name first, then substring of
/// the short name, then a shared prefix of at least three characters.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let wanted_full = requested.to_lowercase();
    let wanted_short = shorten_type_name(requested).to_lowercase();

    let mut ranked: Vec<(usize, &str)> = available
        .iter()
        .filter_map(|&candidate| {
            let full = candidate.to_lowercase();
            if full == wanted_full {
                return None;
            }
            let short = shorten_type_name(candidate).to_lowercase();

            let score = if full.contains(&wanted_full) || wanted_full.contains(&full) {
                100
            } else if short.contains(&wanted_short) || wanted_short.contains(&short) {
                80
            } else {
                let prefix = short
                    .chars()
                    .zip(wanted_short.chars())
                    .take_while(|(a, b)| a == b)
                    .count();
                if prefix < 3 {
                    return None;
                }
                prefix * 10
            };
            Some((score, candidate))
        })
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}
