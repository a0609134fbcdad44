/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // single-row DP
    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];
    for (i, a_char) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (curr_row[j] + 1)
                .min(prev_row[j + 1] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b.len()]
}

/// True when `a` and `b` are at most `max` edits apart.
pub fn within_distance(a: &str, b: &str, max: usize) -> bool {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la.abs_diff(lb) > max {
        return false;
    }
    levenshtein(a, b) <= max
}

/// Lowercased search tokens of a symbol: the whole name plus its
/// camelCase / snake_case / path words.
pub fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = vec![name.to_lowercase()];
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            push_token(&mut tokens, &mut current);
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            push_token(&mut tokens, &mut current);
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    push_token(&mut tokens, &mut current);
    tokens.sort();
    tokens.dedup();
    tokens
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("a", ""), 1);
        assert_eq!(levenshtein("", "b"), 1);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("getusr", "getuser"), 1);
    }

    #[test]
    fn test_within_distance() {
        assert!(within_distance("getusr", "getuser", 2));
        assert!(!within_distance("gtus", "getuser", 2));
        assert!(within_distance("gtus", "getuser", 3));
        assert!(!within_distance("a", "abcd", 2));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("getUserById"), vec!["by", "get", "getuserbyid", "id", "user"]);
        assert_eq!(tokenize("user_service.py"), vec!["py", "service", "user", "user_service.py"]);
        assert_eq!(tokenize("HTTPClient"), vec!["httpclient"]);
    }
}
