//! Number-format evaluation used to measure rendered cell text.
//!
//! [`BuiltinNumberFormatEvaluator`] understands the codes charts typically
//! export with: `General`, digit placeholders with thousands separators,
//! percentages, scientific notation, quoted literals, multi-section
//! `positive;negative;zero` codes, and `y/m/d/h/s` date tokens. Hosts with a
//! full format engine can plug it in through [`NumberFormatEvaluator`].

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::spec::EnumCellValue;
use crate::util::{convert_datetime_to_excel_datetime, convert_excel_serial_to_datetime};

/// Renders a cell value through an Excel number format code.
pub trait NumberFormatEvaluator {
    /// Display text of `value` under `num_format`.
    fn format(&self, num_format: &str, value: &EnumCellValue) -> String;
}

/// Built-in evaluator for common Excel format codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinNumberFormatEvaluator;

impl NumberFormatEvaluator for BuiltinNumberFormatEvaluator {
    fn format(&self, num_format: &str, value: &EnumCellValue) -> String {
        match value {
            EnumCellValue::None => String::new(),
            EnumCellValue::String(s) => s.clone(),
            EnumCellValue::Error(err) => err.as_str().to_string(),
            EnumCellValue::Number(n) => format_number(num_format, *n),
            EnumCellValue::DateTime(dt) => {
                if check_datetime_format(num_format) {
                    return format_datetime(num_format, dt);
                }
                match convert_datetime_to_excel_datetime(dt) {
                    Some(dt_excel) => format_number(num_format, dt_excel.to_excel()),
                    None => value.to_natural_string(),
                }
            }
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Split a format code into `;` sections, ignoring quoted/escaped semicolons.
fn split_sections(num_format: &str) -> Vec<&str> {
    let mut l_sections = Vec::new();
    let mut n_start = 0usize;
    let mut if_quoted = false;
    let mut if_escaped = false;
    for (n_idx, chr) in num_format.char_indices() {
        if if_escaped {
            if_escaped = false;
            continue;
        }
        match chr {
            '\\' => if_escaped = true,
            '"' => if_quoted = !if_quoted,
            ';' if !if_quoted => {
                l_sections.push(&num_format[n_start..n_idx]);
                n_start = n_idx + 1;
            }
            _ => {}
        }
    }
    l_sections.push(&num_format[n_start..]);
    l_sections
}

/// True when the code contains date/time tokens outside literals.
pub fn check_datetime_format(num_format: &str) -> bool {
    let mut if_quoted = false;
    let mut if_escaped = false;
    let mut n_brackets = 0u8;
    for chr in num_format.chars() {
        if if_escaped {
            if_escaped = false;
            continue;
        }
        match chr {
            '\\' | '_' | '*' => if_escaped = true,
            '"' => if_quoted = !if_quoted,
            '[' if !if_quoted => n_brackets += 1,
            ']' if !if_quoted => n_brackets = n_brackets.saturating_sub(1),
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S'
                if !if_quoted && n_brackets == 0 =>
            {
                return true;
            }
            _ => {}
        }
    }
    false
}

fn format_number(num_format: &str, value: f64) -> String {
    if !value.is_finite() {
        return "#NUM!".to_string();
    }

    let c_code = num_format.trim();
    if c_code.is_empty() || c_code.eq_ignore_ascii_case("general") {
        return format_general(value);
    }

    let l_sections = split_sections(c_code);
    let (c_section, n_value, if_signed) = if value < 0.0 && l_sections.len() >= 2 {
        (l_sections[1], value.abs(), false)
    } else if value == 0.0 && l_sections.len() >= 3 {
        (l_sections[2], value, false)
    } else {
        (l_sections[0], value, true)
    };

    if check_datetime_format(c_section) {
        return match convert_excel_serial_to_datetime(n_value) {
            Some(dt) => format_datetime(c_section, &dt),
            None => format_general(value),
        };
    }
    if c_section.trim().eq_ignore_ascii_case("general") {
        return format_general(n_value);
    }

    let pattern = NumberPattern::parse(c_section);
    if !pattern.if_has_digits {
        return pattern.prefix + &pattern.suffix;
    }

    let mut n_scaled = if pattern.if_percent {
        n_value * 100.0
    } else {
        n_value
    };
    if !if_signed {
        n_scaled = n_scaled.abs();
    }

    let c_body = match pattern.n_exponent_digits {
        Some(n_exp_digits) => format_scientific(n_scaled.abs(), &pattern, n_exp_digits),
        None => format_fixed(n_scaled.abs(), &pattern),
    };
    let c_sign = if if_signed && n_scaled < 0.0 && c_body.chars().any(|chr| chr.is_ascii_digit() && chr != '0') {
        "-"
    } else {
        ""
    };

    format!("{c_sign}{}{c_body}{}", pattern.prefix, pattern.suffix)
}

/// Excel `General`: integers plainly, fractions with up to 10 decimals.
fn format_general(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e11 {
        return format!("{value:.0}");
    }
    if value.abs() >= 1e11 || value.abs() < 1e-9 {
        let c_text = format!("{value:.5E}");
        return normalize_exponent(&c_text, 2);
    }
    let c_text = format!("{value:.10}");
    c_text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn format_fixed(value: f64, pattern: &NumberPattern) -> String {
    let c_text = format!("{value:.*}", pattern.n_decimals);
    let (c_int, c_frac) = c_text.split_once('.').unwrap_or((c_text.as_str(), ""));

    let mut c_int = if c_int == "0" && pattern.n_int_zeros == 0 {
        String::new()
    } else {
        c_int.to_string()
    };
    while c_int.len() < pattern.n_int_zeros {
        c_int.insert(0, '0');
    }
    if pattern.if_thousands {
        c_int = group_thousands(&c_int);
    }

    if pattern.n_decimals == 0 {
        return c_int;
    }
    // Optional `#` decimals drop trailing zeros.
    let mut c_frac = c_frac.to_string();
    while c_frac.len() > pattern.n_decimals_required && c_frac.ends_with('0') {
        c_frac.pop();
    }
    format!("{c_int}.{c_frac}")
}

fn format_scientific(value: f64, pattern: &NumberPattern, n_exp_digits: usize) -> String {
    let c_text = format!("{value:.*E}", pattern.n_decimals);
    normalize_exponent(&c_text, n_exp_digits)
}

/// Rust prints `1.5E3`; Excel prints `1.5E+03`.
fn normalize_exponent(text: &str, n_exp_digits: usize) -> String {
    let Some((c_mantissa, c_exp)) = text.split_once('E') else {
        return text.to_string();
    };
    let (c_sign, c_digits) = match c_exp.strip_prefix('-') {
        Some(c_digits) => ('-', c_digits),
        None => ('+', c_exp),
    };
    format!("{c_mantissa}E{c_sign}{c_digits:0>n_exp_digits$}")
}

fn group_thousands(digits: &str) -> String {
    let n_len = digits.len();
    let mut c_grouped = String::with_capacity(n_len + n_len / 3);
    for (n_idx, chr) in digits.chars().enumerate() {
        if n_idx > 0 && (n_len - n_idx) % 3 == 0 {
            c_grouped.push(',');
        }
        c_grouped.push(chr);
    }
    c_grouped
}

/// Parsed numeric section of a format code.
#[derive(Debug, Default)]
struct NumberPattern {
    prefix: String,
    suffix: String,
    n_int_zeros: usize,
    n_decimals: usize,
    n_decimals_required: usize,
    n_exponent_digits: Option<usize>,
    if_thousands: bool,
    if_percent: bool,
    if_has_digits: bool,
}

impl NumberPattern {
    fn parse(section: &str) -> Self {
        let mut pattern = NumberPattern::default();
        let mut if_after_point = false;
        let mut if_after_number = false;
        let l_chars: Vec<char> = section.chars().collect();
        let mut n_idx = 0usize;

        while n_idx < l_chars.len() {
            let chr = l_chars[n_idx];
            let if_in_number = pattern.if_has_digits && !if_after_number;
            let mut c_literal = String::new();
            match chr {
                '"' => {
                    n_idx += 1;
                    while n_idx < l_chars.len() && l_chars[n_idx] != '"' {
                        c_literal.push(l_chars[n_idx]);
                        n_idx += 1;
                    }
                }
                '\\' => {
                    n_idx += 1;
                    if let Some(chr_next) = l_chars.get(n_idx) {
                        c_literal.push(*chr_next);
                    }
                }
                '_' => {
                    n_idx += 1;
                    c_literal.push(' ');
                }
                '*' => {
                    n_idx += 1;
                }
                '[' => {
                    while n_idx < l_chars.len() && l_chars[n_idx] != ']' {
                        n_idx += 1;
                    }
                }
                '0' | '#' | '?' if !if_after_number => {
                    pattern.if_has_digits = true;
                    if if_after_point {
                        pattern.n_decimals += 1;
                        if chr != '#' {
                            pattern.n_decimals_required = pattern.n_decimals;
                        }
                    } else if chr != '#' {
                        pattern.n_int_zeros += 1;
                    }
                }
                '.' if !if_after_number
                    && (if_in_number
                        || l_chars
                            .get(n_idx + 1)
                            .is_some_and(|chr_next| matches!(chr_next, '0' | '#' | '?'))) =>
                {
                    pattern.if_has_digits = true;
                    if_after_point = true;
                }
                ',' if if_in_number && !if_after_point => {
                    pattern.if_thousands = true;
                }
                'E' | 'e'
                    if if_in_number
                        && l_chars
                            .get(n_idx + 1)
                            .is_some_and(|chr_next| matches!(chr_next, '+' | '-')) =>
                {
                    n_idx += 1;
                    let mut n_exp_digits = 0usize;
                    while l_chars
                        .get(n_idx + 1)
                        .is_some_and(|chr_next| matches!(chr_next, '0' | '#'))
                    {
                        n_idx += 1;
                        n_exp_digits += 1;
                    }
                    pattern.n_exponent_digits = Some(usize::max(1, n_exp_digits));
                    if_after_number = true;
                }
                '%' => {
                    pattern.if_percent = true;
                    c_literal.push('%');
                }
                _ => c_literal.push(chr),
            }

            if !c_literal.is_empty() {
                if pattern.if_has_digits {
                    if_after_number = true;
                    pattern.suffix.push_str(&c_literal);
                } else {
                    pattern.prefix.push_str(&c_literal);
                }
            }
            n_idx += 1;
        }

        pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumDateToken {
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    AmPm,
}

fn format_datetime(num_format: &str, dt: &NaiveDateTime) -> String {
    let c_section = split_sections(num_format)[0];
    let l_chars: Vec<char> = c_section.chars().collect();

    // Literal text is kept as `Err`, tokens as `Ok`.
    let mut l_parts: Vec<Result<EnumDateToken, String>> = Vec::new();
    let mut n_idx = 0usize;
    while n_idx < l_chars.len() {
        let chr = l_chars[n_idx];
        let chr_lower = chr.to_ascii_lowercase();
        match chr_lower {
            'y' | 'm' | 'd' | 'h' | 's' => {
                let mut n_len = 1usize;
                while l_chars
                    .get(n_idx + n_len)
                    .is_some_and(|chr_next| chr_next.to_ascii_lowercase() == chr_lower)
                {
                    n_len += 1;
                }
                n_idx += n_len;
                l_parts.push(Ok(match chr_lower {
                    'y' => EnumDateToken::Year(n_len),
                    'm' => EnumDateToken::Month(n_len),
                    'd' => EnumDateToken::Day(n_len),
                    'h' => EnumDateToken::Hour(n_len),
                    _ => EnumDateToken::Second(n_len),
                }));
                continue;
            }
            'a' if c_section[c_section
                .char_indices()
                .nth(n_idx)
                .map_or(0, |(n_byte, _)| n_byte)..]
                .to_ascii_uppercase()
                .starts_with("AM/PM") =>
            {
                n_idx += 5;
                l_parts.push(Ok(EnumDateToken::AmPm));
                continue;
            }
            '"' => {
                let mut c_literal = String::new();
                n_idx += 1;
                while n_idx < l_chars.len() && l_chars[n_idx] != '"' {
                    c_literal.push(l_chars[n_idx]);
                    n_idx += 1;
                }
                l_parts.push(Err(c_literal));
            }
            '\\' => {
                n_idx += 1;
                if let Some(chr_next) = l_chars.get(n_idx) {
                    l_parts.push(Err(chr_next.to_string()));
                }
            }
            '[' => {
                while n_idx < l_chars.len() && l_chars[n_idx] != ']' {
                    n_idx += 1;
                }
            }
            _ => l_parts.push(Err(chr.to_string())),
        }
        n_idx += 1;
    }

    // `m` after an hour token or before a seconds token means minutes.
    let l_token_idx: Vec<usize> = l_parts
        .iter()
        .enumerate()
        .filter_map(|(n_idx, part)| part.is_ok().then_some(n_idx))
        .collect();
    for (n_pos, n_idx_part) in l_token_idx.iter().enumerate() {
        let Ok(EnumDateToken::Month(n_len)) = l_parts[*n_idx_part] else {
            continue;
        };
        if n_len > 2 {
            continue;
        }
        let if_after_hour = n_pos > 0
            && matches!(l_parts[l_token_idx[n_pos - 1]], Ok(EnumDateToken::Hour(_)));
        let if_before_second = l_token_idx
            .get(n_pos + 1)
            .is_some_and(|n_idx_next| matches!(l_parts[*n_idx_next], Ok(EnumDateToken::Second(_))));
        if if_after_hour || if_before_second {
            l_parts[*n_idx_part] = Ok(EnumDateToken::Minute(n_len));
        }
    }

    let if_twelve_hour = l_parts.contains(&Ok(EnumDateToken::AmPm));
    let mut c_rendered = String::new();
    for part in l_parts {
        match part {
            Err(c_literal) => c_rendered.push_str(&c_literal),
            Ok(token) => c_rendered.push_str(&render_date_token(token, dt, if_twelve_hour)),
        }
    }
    c_rendered
}

fn render_date_token(token: EnumDateToken, dt: &NaiveDateTime, if_twelve_hour: bool) -> String {
    match token {
        EnumDateToken::Year(n_len) if n_len <= 2 => format!("{:02}", dt.year().rem_euclid(100)),
        EnumDateToken::Year(_) => format!("{:04}", dt.year()),
        EnumDateToken::Month(1) => dt.month().to_string(),
        EnumDateToken::Month(2) => format!("{:02}", dt.month()),
        EnumDateToken::Month(3) => MONTH_NAMES[dt.month0() as usize][..3].to_string(),
        EnumDateToken::Month(4) => MONTH_NAMES[dt.month0() as usize].to_string(),
        EnumDateToken::Month(_) => MONTH_NAMES[dt.month0() as usize][..1].to_string(),
        EnumDateToken::Day(1) => dt.day().to_string(),
        EnumDateToken::Day(2) => format!("{:02}", dt.day()),
        EnumDateToken::Day(3) => {
            WEEKDAY_NAMES[dt.weekday().num_days_from_monday() as usize][..3].to_string()
        }
        EnumDateToken::Day(_) => {
            WEEKDAY_NAMES[dt.weekday().num_days_from_monday() as usize].to_string()
        }
        EnumDateToken::Hour(n_len) => {
            let n_hour = if if_twelve_hour {
                match dt.hour() % 12 {
                    0 => 12,
                    n_hour => n_hour,
                }
            } else {
                dt.hour()
            };
            if n_len >= 2 {
                format!("{n_hour:02}")
            } else {
                n_hour.to_string()
            }
        }
        EnumDateToken::Minute(n_len) if n_len >= 2 => format!("{:02}", dt.minute()),
        EnumDateToken::Minute(_) => dt.minute().to_string(),
        EnumDateToken::Second(n_len) if n_len >= 2 => format!("{:02}", dt.second()),
        EnumDateToken::Second(_) => dt.second().to_string(),
        EnumDateToken::AmPm => {
            if dt.hour() < 12 {
                "AM".to_string()
            } else {
                "PM".to_string()
            }
        }
    }
}
