use std::collections::BTreeMap;

/// Finds the `@domain` suffix shared by the most owners.
///
/// Ties go to the lexicographically smallest suffix so output is stable
/// between runs. Returns `None` when no owner contains an `@`.
pub fn common_suffix<'a, I>(owners: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut domains: BTreeMap<&str, usize> = BTreeMap::new();
    for owner in owners {
        if let Some(at) = owner.find('@') {
            *domains.entry(&owner[at..]).or_default() += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (suffix, count) in domains {
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((suffix, count));
        }
    }
    best.map(|(suffix, _)| suffix.to_string())
}

/// Drops `suffix` from `owner` if it ends with it.
pub fn strip(owner: &str, suffix: Option<&str>) -> String {
    let short = match suffix {
        Some(suffix) if !suffix.is_empty() => owner.strip_suffix(suffix).unwrap_or(owner),
        _ => owner,
    };
    short.to_string()
}

/// Shortens every owner by the most common suffix among them.
pub fn abbreviate(owners: &[&str]) -> (Vec<String>, Option<String>) {
    let suffix = common_suffix(owners.iter().copied());
    let short = owners
        .iter()
        .map(|owner| strip(owner, suffix.as_deref()))
        .collect();
    (short, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_domain_wins() {
        let (short, suffix) = abbreviate(&["a@x.com", "b@x.com", "c@y.com"]);
        assert_eq!(suffix.as_deref(), Some("@x.com"));
        assert_eq!(short, vec!["a", "b", "c@y.com"]);
    }

    #[test]
    fn test_tie_is_deterministic() {
        for _ in 0..10 {
            let suffix = common_suffix(["z@b.org", "y@a.org"]);
            assert_eq!(suffix.as_deref(), Some("@a.org"));
        }
    }

    #[test]
    fn test_no_emails_no_suffix() {
        let (short, suffix) = abbreviate(&["alice", ""]);
        assert_eq!(suffix, None);
        assert_eq!(short, vec!["alice", ""]);
    }

    #[test]
    fn test_split_on_first_at() {
        assert_eq!(
            common_suffix(["a@b@c.com", "d@b@c.com"]).as_deref(),
            Some("@b@c.com")
        );
    }

    #[test]
    fn test_stripping_is_idempotent() {
        let suffix = Some("@x.com");
        let once: Vec<String> = ["a@x.com", "c@y.com"]
            .iter()
            .map(|o| strip(o, suffix))
            .collect();
        let twice: Vec<String> = once.iter().map(|o| strip(o, suffix)).collect();
        assert_eq!(once, twice);
        assert_eq!(twice, vec!["a", "c@y.com"]);
    }

    #[test]
    fn test_second_pass_picks_a_new_suffix() {
        let (once, suffix) = abbreviate(&["a@x.com", "b@x.com", "c@y.com"]);
        assert_eq!(suffix.as_deref(), Some("@x.com"));
        let once: Vec<&str> = once.iter().map(String::as_str).collect();
        let (twice, suffix) = abbreviate(&once);
        assert_eq!(suffix.as_deref(), Some("@y.com"));
        assert_eq!(twice, vec!["a", "b", "c"]);
    }
}
