//! Presentation order for compatibility tool names.

/// Sorts tool names, ordering `Proton-<major>.<minor>` builds numerically.
///
/// Names are first sorted lexically. Each Proton build then gets the key
/// `major * 100 + minor`; every other name (or a Proton name whose version
/// does not parse) keeps its 1-based lexical position as key. The final
/// order is by key, ties keeping lexical order.
pub fn sort_tool_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut lexical: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    lexical.sort_unstable();

    let mut keyed: Vec<(u32, &str)> = lexical
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let fallback = u32::try_from(i + 1).unwrap_or(u32::MAX);
            (proton_sort_key(name).unwrap_or(fallback), name)
        })
        .collect();

    // Stable: equal keys stay in lexical order.
    keyed.sort_by_key(|(key, _)| *key);

    keyed.into_iter().map(|(_, name)| name.to_string()).collect()
}

/// Numeric key for names like `Proton-6.21-GE-2`.
fn proton_sort_key(name: &str) -> Option<u32> {
    if !name.contains("Proton-") {
        return None;
    }

    let version = name.split('-').nth(1)?;
    let mut parts = version.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;

    major.checked_mul(100)?.checked_add(minor)
}
