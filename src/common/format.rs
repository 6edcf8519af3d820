// src/common/format.rs
//
// Formatação pt-BR. Só roda depois que toda a conta foi feita.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

pub const DEFAULT_DIGITS: u32 = 2;

/// Moeda: `R$ 1.234,50`. Valor ausente vira `R$ 0,00`.
pub fn format_currency(value: Option<Decimal>) -> String {
    let value = value.unwrap_or(Decimal::ZERO);
    let (negative, int_part, frac_part) = split_rounded(value, DEFAULT_DIGITS);
    let sign = if negative { "-" } else { "" };
    format!("R$ {}{},{}", sign, group_thousands(&int_part), frac_part)
}

/// Decimal com vírgula e `digits` casas, sem separador de milhar: `12,30`.
pub fn format_decimal(value: Decimal, digits: u32) -> String {
    let (negative, int_part, frac_part) = split_rounded(value, digits);
    let sign = if negative { "-" } else { "" };
    if digits == 0 {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{},{}", sign, int_part, frac_part)
    }
}

/// Data curta `dd/mm/aaaa`; ausente vira string vazia.
pub fn format_short_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

// (negativo?, parte inteira, parte fracionária com `digits` dígitos)
fn split_rounded(value: Decimal, digits: u32) -> (bool, String, String) {
    let rounded = value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.*}", digits as usize, rounded.abs());
    match text.split_once('.') {
        Some((int_part, frac_part)) => (negative, int_part.to_string(), frac_part.to_string()),
        None => (negative, text, String::new()),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}
