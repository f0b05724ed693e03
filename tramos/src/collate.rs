//! Spanish (es-CO) ordering for option lists.
//!
//! Primary level ignores case and accents but keeps `ñ` as its own letter
//! after `n`. Ties fall back to accents, then case, then code points.

use std::cmp::Ordering;

fn fold(c: char) -> (char, bool) {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let base = match lower {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ç' => 'c',
        other => other,
    };
    (base, base != lower)
}

// (letter, is_ñ) so that ñ sorts between n and o
fn primary(c: char) -> (char, u8) {
    match fold(c).0 {
        'ñ' => ('n', 1),
        b => (b, 0),
    }
}

pub fn compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary)
        .cmp(b.chars().map(primary))
        .then_with(|| {
            a.chars()
                .map(|c| fold(c).1)
                .cmp(b.chars().map(|c| fold(c).1))
        })
        // lower case first, as browsers do for es
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

pub fn sort(values: &mut [String]) {
    values.sort_by(|a, b| compare(a, b));
}

/// Upper-cased, accent-stripped key used to match map features by name.
pub fn normalize_key(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            let (base, _) = fold(c);
            match base {
                'ñ' => 'N',
                b => b.to_uppercase().next().unwrap_or(b),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accents_do_not_move_primary_order() {
        let mut v: Vec<String> = ["Urrao", "Ábriaquí", "Angostura", "Envigado"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort(&mut v);
        assert_eq!(v, ["Ábriaquí", "Angostura", "Envigado", "Urrao"]);
    }

    #[test]
    fn enie_sorts_after_n() {
        let mut v: Vec<String> = ["Ñame", "Nuevo", "Oriente"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort(&mut v);
        assert_eq!(v, ["Nuevo", "Ñame", "Oriente"]);
    }

    #[test]
    fn case_and_accent_ties_are_stable() {
        assert_eq!(compare("peñol", "Peñol"), Ordering::Less);
        assert_eq!(compare("Medellin", "Medellín"), Ordering::Less);
        assert_eq!(compare("Norte", "Norte"), Ordering::Equal);
    }

    #[test]
    fn normalized_keys() {
        assert_eq!(normalize_key(" El Peñol "), "EL PENOL");
        assert_eq!(normalize_key("Medellín"), "MEDELLIN");
    }
}
