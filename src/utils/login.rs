use crate::constants::probe::DEFAULT_LOGINS;
use crate::models::Credential;
use once_cell::sync::Lazy;
use regex::Regex;

static LOGIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^((?-u:\w)+?)/+((?-u:\w)+)$").unwrap());

/// Parses a `user/pass` string from the monitor list. Only ASCII word
/// characters are accepted and surrounding whitespace is not stripped.
pub fn parse_login(raw: &str) -> Option<Credential> {
    let caps = LOGIN_RE.captures(raw)?;
    Some(Credential::new(&caps[1], &caps[2]))
}

pub fn default_credentials() -> Vec<Credential> {
    DEFAULT_LOGINS
        .iter()
        .map(|(username, password)| Credential::new(*username, *password))
        .collect()
}

/// Panel-supplied logins first, then the built-in defaults. The flag is set
/// when the panel contributed nothing usable.
pub fn candidate_credentials(raw_logins: &[String]) -> (Vec<Credential>, bool) {
    let mut candidates: Vec<Credential> = raw_logins.iter().filter_map(|raw| parse_login(raw)).collect();
    let using_default_login = candidates.is_empty();
    candidates.extend(default_credentials());
    (candidates, using_default_login)
}
