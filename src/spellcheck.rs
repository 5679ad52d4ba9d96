/// Loose answer comparison: allows one wrong, missing or extra letter.
///
/// Case, hyphens and apostrophes are ignored.
pub fn spellcheck(worda: &str, wordb: &str) -> bool {
    let worda = normalize(worda);
    let wordb = normalize(wordb);

    if worda == wordb {
        return true;
    }

    let (mut longer, shorter) = if worda.len() >= wordb.len() {
        (worda, wordb)
    } else {
        (wordb, worda)
    };

    if longer.len() == shorter.len() {
        let wrong = longer.iter().zip(&shorter).filter(|(x, y)| x != y).count();
        return wrong <= 1;
    }

    if longer.len() - shorter.len() > 1 {
        return false;
    }

    // Drop the first mismatched letter from the longer word and keep comparing
    let mut wrong = 0;
    for (i, c) in shorter.iter().enumerate() {
        match longer.get(i) {
            Some(l) if l == c => {}
            Some(_) => {
                wrong += 1;
                longer.remove(i);
            }
            None => return false,
        }
    }
    wrong <= 1
}

fn normalize(word: &str) -> Vec<char> {
    word.to_lowercase()
        .replace('-', " ")
        .replace('\'', "")
        .chars()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_ignores_case_and_punctuation() {
        assert!(spellcheck("Cooper's Hawk", "coopers hawk"));
        assert!(spellcheck("Black-capped Chickadee", "black capped chickadee"));
    }

    #[test]
    fn test_one_substitution() {
        assert!(spellcheck("blue jay", "blue jey"));
        assert!(!spellcheck("blue jay", "blie jey"));
    }

    #[test]
    fn test_one_insertion_or_deletion() {
        assert!(spellcheck("cardinal", "cardnal"));
        assert!(spellcheck("cardnal", "cardinal"));
        assert!(spellcheck("robin", "robins"));
        assert!(spellcheck("robin", "xrobin"));
    }

    #[test]
    fn test_length_difference_over_one() {
        assert!(!spellcheck("robin", "robinss"));
        assert!(!spellcheck("wren", "w"));
    }

    #[test]
    fn test_insertion_plus_substitution() {
        assert!(!spellcheck("cardinal", "cerdnal"));
    }
}
