//! Header sanitization: raw column label -> canonical, SQL-safe identifier.
//!
//! The same function renames every uploaded header and previews technical names while a display
//! name is typed, so both always agree.

/// Sanitize a raw label into `[a-z0-9_]`, with no leading, trailing, or doubled underscore.
///
/// Steps, in order:
///
/// 1. transliterate Latin diacritics to their ASCII base letter (case-preserving)
/// 2. lowercase
/// 3. replace every run of characters outside `[a-z0-9]` with one `_`
/// 4. collapse consecutive `_`
/// 5. strip leading/trailing `_`
///
/// Empty or fully-symbolic input yields `""`; callers treat that as an unresolvable header.
///
/// ```rust
/// use bronze_ingest::sanitize::sanitize;
///
/// assert_eq!(sanitize("Sipariş Tarihi & No."), "siparis_tarihi_no");
/// assert_eq!(sanitize("  --  "), "");
/// ```
pub fn sanitize(raw: &str) -> String {
    let mut latin = String::with_capacity(raw.len());
    for c in raw.chars() {
        match transliterate(c) {
            Some(ascii) => latin.push_str(ascii),
            None => latin.push(c),
        }
    }

    let lowered = latin.to_lowercase();

    // Steps 3-5 in one pass: a separator is only emitted between two kept characters, so runs
    // collapse and the ends never carry one.
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// `true` if `s` is non-empty and already canonical.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && sanitize(s) == s
}

/// Technical name suggested for a display name while an administrator types it.
pub fn suggest_technical_name(display_name: &str) -> String {
    sanitize(display_name)
}

fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        // Turkish
        'ı' => "i",
        'İ' => "I",
        'ğ' => "g",
        'Ğ' => "G",
        'ş' | 'ș' => "s",
        'Ş' | 'Ș' => "S",
        'ç' => "c",
        'Ç' => "C",
        'ö' => "o",
        'Ö' => "O",
        'ü' => "u",
        'Ü' => "U",
        // Western/Central European
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => "E",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' => "I",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' | 'Ō' | 'Ő' => "O",
        'ù' | 'ú' | 'û' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ć' | 'č' => "c",
        'Ć' | 'Č' => "C",
        'ď' => "d",
        'Ď' => "D",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' => "s",
        'Ś' | 'Š' => "S",
        'ť' | 'ț' => "t",
        'Ť' | 'Ț' => "T",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        _ => return None,
    };
    Some(ascii)
}
