/// Input file parsing: item counts, pair history, judgment outcomes.
///
/// Every format has a JSON form and a plain-text form; the first non-blank
/// character decides which. Plain-text lines starting with `#` are skipped.
use std::collections::{BTreeMap, HashSet};

/// Parse item counts: a JSON object `{"id": times_sampled}` or one
/// `id[,count]` per line. A missing count means never sampled.
pub fn parse_items(content: &str) -> Result<BTreeMap<String, u64>, String> {
    let trimmed = content.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed)
            .map_err(|e| format!("File looks like JSON but failed to parse: {e}"));
    }

    let mut items = BTreeMap::new();
    for (lineno, line) in data_lines(content) {
        let (id, count) = match line.split_once(',') {
            Some((id, count)) => {
                let count: u64 = count.trim().parse().map_err(|_| {
                    format!("line {lineno}: invalid sample count \"{}\"", count.trim())
                })?;
                (id.trim(), count)
            }
            None => (line, 0),
        };
        if id.is_empty() {
            return Err(format!("line {lineno}: empty item id"));
        }
        if items.insert(id.to_string(), count).is_some() {
            return Err(format!("line {lineno}: duplicate item \"{id}\""));
        }
    }
    Ok(items)
}

/// Parse a list of pairs: a JSON array `[["a", "b"], ...]` or one `a,b`
/// per line. Order is kept; for outcomes the first element is the winner.
pub fn parse_pairs(content: &str) -> Result<Vec<(String, String)>, String> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        let pairs: Vec<(String, String)> = serde_json::from_str(trimmed)
            .map_err(|e| format!("File looks like JSON but failed to parse: {e}"))?;
        if let Some((a, _)) = pairs.iter().find(|(a, b)| a == b) {
            return Err(format!("item \"{a}\" paired with itself"));
        }
        return Ok(pairs);
    }

    let mut pairs = Vec::new();
    for (lineno, line) in data_lines(content) {
        let Some((a, b)) = line.split_once(',') else {
            return Err(format!("line {lineno}: expected \"a,b\", got \"{line}\""));
        };
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() || b.contains(',') {
            return Err(format!("line {lineno}: expected \"a,b\", got \"{line}\""));
        }
        if a == b {
            return Err(format!("line {lineno}: item \"{a}\" paired with itself"));
        }
        pairs.push((a.to_string(), b.to_string()));
    }
    Ok(pairs)
}

/// True if the file content is in the JSON array form.
pub fn is_json_array(content: &str) -> bool {
    content.trim_start().starts_with('[')
}

/// Render pairs in the plain-text form, one per line.
pub fn format_pair_lines(pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (a, b) in pairs {
        out.push_str(a);
        out.push(',');
        out.push_str(b);
        out.push('\n');
    }
    out
}

/// Items named in `pairs` that are missing from `known`, in first-seen order.
pub fn unknown_items<'a>(pairs: &'a [(String, String)], known: &BTreeMap<String, u64>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    pairs
        .iter()
        .flat_map(|(a, b)| [a.as_str(), b.as_str()])
        .filter(|id| !known.contains_key(*id) && seen.insert(*id))
        .collect()
}

/// Non-blank, non-comment lines with 1-based line numbers.
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_from_lines() {
        let content = "# photos\nbeach.jpg,3\n\nforest.jpg\n  city.jpg , 1 \n";
        let items = parse_items(content).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items["beach.jpg"], 3);
        assert_eq!(items["forest.jpg"], 0);
        assert_eq!(items["city.jpg"], 1);
    }

    #[test]
    fn test_items_from_json() {
        let items = parse_items(r#"{"a.png": 2, "b.png": 0}"#).unwrap();
        assert_eq!(items["a.png"], 2);
        assert_eq!(items["b.png"], 0);
    }

    #[test]
    fn test_items_rejects_bad_count_and_duplicates() {
        let err = parse_items("a,x\n").unwrap_err();
        assert!(err.contains("line 1"), "{err}");

        let err = parse_items("a\nb\na,2\n").unwrap_err();
        assert!(err.contains("duplicate"), "{err}");
    }

    #[test]
    fn test_pairs_from_lines() {
        let pairs = parse_pairs("a,b\n# skip\n c , d\n").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string())
            ]
        );
    }

    #[test]
    fn test_pairs_from_json() {
        let pairs = parse_pairs(r#"[["x", "y"], ["y", "z"]]"#).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("y".to_string(), "z".to_string()));
    }

    #[test]
    fn test_pairs_reject_malformed_lines() {
        assert!(parse_pairs("a\n").unwrap_err().contains("line 1"));
        assert!(parse_pairs("a,b,c\n").is_err());
        assert!(parse_pairs("a,a\n").unwrap_err().contains("itself"));
        assert!(parse_pairs(r#"[["a", "a"]]"#).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_items("").unwrap().is_empty());
        assert!(parse_pairs("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_pair_lines_round_trip() {
        let pairs = vec![("a".to_string(), "b".to_string())];
        let text = format_pair_lines(&pairs);
        assert_eq!(text, "a,b\n");
        assert_eq!(parse_pairs(&text).unwrap(), pairs);
        assert!(!is_json_array(&text));
        assert!(is_json_array("  [[\"a\",\"b\"]]"));
    }

    #[test]
    fn test_unknown_items() {
        let known = parse_items("a\nb\n").unwrap();
        let pairs = parse_pairs("a,c\nc,b\nd,a\n").unwrap();
        assert_eq!(unknown_items(&pairs, &known), vec!["c", "d"]);
    }
}
