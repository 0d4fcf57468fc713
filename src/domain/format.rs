// src/domain/format.rs

/// `1234567.4` -> `"1,234,567"`. Rounds to whole units.
pub fn group_thousands(n: f64) -> String {
    let rounded = n.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

pub fn kg(n: f64) -> String {
    format!("{} kg", group_thousands(n))
}

pub fn rupees(n: f64) -> String {
    format!("₹{}", group_thousands(n))
}
