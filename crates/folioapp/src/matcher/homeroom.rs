//! Homeroom-code parsing: pulls `(homeroom letter, roll number)` out of free text.
//!
//! Accepted surface forms, tried in this order:
//!
//! | form | examples |
//! |------|----------|
//! | `X組N番` | `中学1年A組13番`, `A組13番`, `高校2年E組 04番` |
//! | kanji grade prefix | `中3A01`, `高1D 13` |
//! | delimited ASCII token | `D01`, `J3_D12`, `asdfjl_dsf-D9_s` |
//!
//! Letters are A-F, case-insensitive; numbers are one or two digits with leading
//! zeros ignored. A roll number of zero is not a code.

use crate::model::Homeroom;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeroomCode {
    pub homeroom: Homeroom,
    pub number: u32,
}

static KUMI_BAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Fa-f])\s*組\s*0*(\d{1,2})\s*番").expect("valid homeroom regex")
});

static GRADE_PREFIXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[中高][^0-9A-Za-z]{0,2}[1-6]年?\s*([A-Fa-f])\s*0*(\d{1,2})(?:[^0-9]|$)")
        .expect("valid homeroom regex")
});

static ASCII_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])([A-Fa-f])0*(\d{1,2})(?:[^A-Za-z0-9]|$)")
        .expect("valid homeroom regex")
});

fn first_code(re: &Regex, text: &str) -> Option<HomeroomCode> {
    re.captures_iter(text).find_map(|caps| {
        let letter = caps.get(1)?.as_str().chars().next()?;
        let number: u32 = caps.get(2)?.as_str().parse().ok()?;
        if number == 0 {
            return None;
        }
        Some(HomeroomCode {
            homeroom: Homeroom::from_letter(letter)?,
            number,
        })
    })
}

pub fn parse_homeroom_code(text: &str) -> Option<HomeroomCode> {
    [&*KUMI_BAN, &*GRADE_PREFIXED, &*ASCII_TOKEN]
        .into_iter()
        .find_map(|re| first_code(re, text))
}
