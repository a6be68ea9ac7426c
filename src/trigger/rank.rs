//! Typeahead ordering shared by all three menus

/// How well a candidate string matches a query, best first
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MatchRank {
    /// The whole string starts with the query
    Prefix,
    /// Some later word starts with the query
    WordPrefix,
    /// The query appears anywhere
    Substring,
}

fn rank_one(query: &str, candidate: &str) -> Option<MatchRank> {
    let candidate = candidate.to_lowercase();
    if candidate.starts_with(query) {
        Some(MatchRank::Prefix)
    } else if candidate
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .skip(1)
        .any(|word| word.starts_with(query))
    {
        Some(MatchRank::WordPrefix)
    } else if candidate.contains(query) {
        Some(MatchRank::Substring)
    } else {
        None
    }
}

/// The best rank any of `candidates` achieves, `None` if none matches
pub(crate) fn match_rank<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<MatchRank> {
    let query = query.to_lowercase();
    candidates
        .into_iter()
        .filter_map(|c| rank_one(&query, c))
        .min()
}

/// Keeps the items that match and orders them by rank
///
/// Items of equal rank keep their original order, so an empty query returns
/// the list as given.
pub(crate) fn rank_by<T, F>(items: Vec<T>, query: &str, keys: F) -> Vec<T>
where
    F: Fn(&T) -> Vec<&str>,
{
    let mut ranked: Vec<(MatchRank, T)> = items
        .into_iter()
        .filter_map(|item| match_rank(query, keys(&item)).map(|rank| (rank, item)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order() {
        assert_eq!(match_rank("ja", ["Jane Doe"]), Some(MatchRank::Prefix));
        assert_eq!(match_rank("do", ["Jane Doe"]), Some(MatchRank::WordPrefix));
        assert_eq!(match_rank("ne", ["Jane Doe"]), Some(MatchRank::Substring));
        assert_eq!(match_rank("x", ["Jane Doe"]), None);
        assert_eq!(match_rank("smi", ["grin", "smile"]), Some(MatchRank::Prefix));
    }

    #[test]
    fn test_rank_by_is_stable() {
        let items = vec!["Adam Li", "Liam", "Ali", "Olivia"];
        assert_eq!(rank_by(items, "li", |s| vec![*s]), ["Liam", "Adam Li", "Ali", "Olivia"]);
        let all = vec!["b", "a"];
        assert_eq!(rank_by(all, "", |s| vec![*s]), ["b", "a"]);
    }
}
