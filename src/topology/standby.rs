//! Parser for PostgreSQL's `synchronous_standby_names` GUC
//!
//! Recognizes the 9.6+ grammar:
//! - `ANY num_sync ( name [, ...] )` — quorum commit; no individual standby
//!   is guaranteed synchronous, so the parsed set is empty
//! - `[FIRST] num_sync ( name [, ...] )` — the first `num_sync` names
//! - `name [, ...]` — exactly the first name
//!
//! The tokenizer treats double quotes as plain separators, so quoted names
//! containing commas are split. This matches how the value is consumed for
//! replica promotion, where names are compared against escaped host names
//! that never contain separator characters.

const QUORUM_KEYWORD: &str = "ANY";
const PRIORITY_KEYWORD: &str = "FIRST";

/// Separator set for tokenization. Consecutive separators collapse.
const SEPARATORS: &[char] = &[' ', ',', '(', ')', '"'];

/// Parse a `synchronous_standby_names` value into the application names to
/// treat as synchronous for the current master.
///
/// Pure and total: malformed input yields an empty vector, never an error.
pub fn parse_sync_standby_names(value: &str) -> Vec<String> {
    let mut rest = value;
    let mut num_sync = 0usize;

    let mut token = consume_token(&mut rest);
    if token.eq_ignore_ascii_case(QUORUM_KEYWORD) {
        // ANY num_sync ( standby_name [, ...] ) — under quorum commit no
        // deterministic subset of standbys is synchronous
    } else if !token.is_empty() {
        if token.eq_ignore_ascii_case(PRIORITY_KEYWORD) {
            token = consume_token(&mut rest);
        }
        if rest.contains('(') {
            // [FIRST] num_sync ( standby_name [, ...] )
            num_sync = parse_size(token);
            token = consume_token(&mut rest);
        } else {
            // standby_name [, ...]
            num_sync = 1;
        }
    }

    let mut names = Vec::new();
    while num_sync > 0 && !token.is_empty() {
        names.push(token.to_string());
        token = consume_token(&mut rest);
        num_sync -= 1;
    }
    names
}

/// Advance past leading separators and return the next maximal
/// non-separator run, or `""` once the input is exhausted.
fn consume_token<'a>(input: &mut &'a str) -> &'a str {
    let rest = input.trim_start_matches(SEPARATORS);
    match rest.find(SEPARATORS) {
        Some(end) => {
            let (token, tail) = rest.split_at(end);
            *input = tail;
            token
        }
        None => {
            *input = "";
            rest
        }
    }
}

/// Leading decimal digits only; the first non-digit ends the number.
/// Non-numeric tokens yield 0.
fn parse_size(token: &str) -> usize {
    let digits = token
        .find(|c: char| !c.is_ascii_digit())
        .map_or(token, |end| &token[..end]);
    digits.parse().unwrap_or(0)
}
