//! Spelling out of cardinal numbers in Italian.

const UNITS: [&str; 20] = [
    "zero",
    "uno",
    "due",
    "tre",
    "quattro",
    "cinque",
    "sei",
    "sette",
    "otto",
    "nove",
    "dieci",
    "undici",
    "dodici",
    "tredici",
    "quattordici",
    "quindici",
    "sedici",
    "diciassette",
    "diciotto",
    "diciannove",
];

const TENS: [&str; 10] = [
    "", "", "venti", "trenta", "quaranta", "cinquanta", "sessanta", "settanta", "ottanta",
    "novanta",
];

/// Spell out a string of ASCII digits as an Italian cardinal.
///
/// Compounds ending in `tre` take the accent (`ventitré`), as required by
/// standard orthography. Returns `None` for digit strings too large for `u64`.
pub fn spell_out(digits: &str) -> Option<String> {
    let spelled = cardinal(digits.parse::<u64>().ok()?);

    if spelled.ends_with("tre") && spelled.chars().count() > 3 {
        let mut accented: String = spelled.chars().take(spelled.chars().count() - 1).collect();
        accented.push('é');
        Some(accented)
    } else {
        Some(spelled)
    }
}

fn cardinal(n: u64) -> String {
    const BILLION: u64 = 1_000_000_000;
    const MILLION: u64 = 1_000_000;

    if n >= BILLION {
        let (high, rest) = (n / BILLION, n % BILLION);
        let head = if high == 1 {
            "un miliardo".to_string()
        } else {
            format!("{} miliardi", cardinal(high))
        };
        return join_large(head, rest);
    }

    if n >= MILLION {
        let (high, rest) = (n / MILLION, n % MILLION);
        let head = if high == 1 {
            "un milione".to_string()
        } else {
            format!("{} milioni", cardinal(high))
        };
        return join_large(head, rest);
    }

    if n >= 1000 {
        let (high, rest) = (n / 1000, n % 1000);
        let head = if high == 1 {
            "mille".to_string()
        } else {
            format!("{}mila", below_thousand(high))
        };
        return if rest == 0 {
            head
        } else {
            format!("{head}{}", below_thousand(rest))
        };
    }

    below_thousand(n)
}

fn join_large(head: String, rest: u64) -> String {
    if rest == 0 {
        head
    } else {
        format!("{head} {}", cardinal(rest))
    }
}

fn below_thousand(n: u64) -> String {
    debug_assert!(n < 1000);
    if n < 100 {
        return below_hundred(n);
    }

    let (hundreds, rest) = (n / 100, n % 100);
    let head = if hundreds == 1 {
        "cento".to_string()
    } else {
        format!("{}cento", UNITS[hundreds as usize])
    };

    match rest {
        0 => head,
        // centottanta, not centoottanta
        80..=89 => format!("{}{}", &head[..head.len() - 1], below_hundred(rest)),
        _ => format!("{head}{}", below_hundred(rest)),
    }
}

fn below_hundred(n: u64) -> String {
    if n < 20 {
        return UNITS[n as usize].to_string();
    }

    let (tens, unit) = ((n / 10) as usize, (n % 10) as usize);
    let ten = TENS[tens];
    match unit {
        0 => ten.to_string(),
        // vowel elision: ventuno, trentotto
        1 | 8 => format!("{}{}", &ten[..ten.len() - 1], UNITS[unit]),
        _ => format!("{ten}{}", UNITS[unit]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_numbers() {
        assert_eq!(spell_out("0").as_deref(), Some("zero"));
        assert_eq!(spell_out("3").as_deref(), Some("tre"));
        assert_eq!(spell_out("17").as_deref(), Some("diciassette"));
        assert_eq!(spell_out("20").as_deref(), Some("venti"));
    }

    #[test]
    fn test_elision_and_accent() {
        assert_eq!(spell_out("21").as_deref(), Some("ventuno"));
        assert_eq!(spell_out("38").as_deref(), Some("trentotto"));
        assert_eq!(spell_out("23").as_deref(), Some("ventitré"));
        assert_eq!(spell_out("103").as_deref(), Some("centotré"));
        assert_eq!(spell_out("180").as_deref(), Some("centottanta"));
    }

    #[test]
    fn test_large_numbers() {
        assert_eq!(spell_out("100").as_deref(), Some("cento"));
        assert_eq!(spell_out("1000").as_deref(), Some("mille"));
        assert_eq!(spell_out("2024").as_deref(), Some("duemilaventiquattro"));
        assert_eq!(spell_out("1000000").as_deref(), Some("un milione"));
        assert_eq!(spell_out("3000005").as_deref(), Some("tre milioni cinque"));
    }

    #[test]
    fn test_overflow_is_left_alone() {
        assert_eq!(spell_out("100000000000000000000"), None);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(spell_out("007").as_deref(), Some("sette"));
    }
}
