pub mod credential_scan;
pub mod login;
