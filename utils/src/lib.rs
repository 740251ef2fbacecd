pub mod cache;
pub mod config;
pub mod lnurl;
pub mod text;
pub mod xlogging;
