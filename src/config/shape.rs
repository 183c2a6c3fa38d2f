use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

/// on-disk shape of the settings file. everything is optional and merged
/// over the defaults in the order the files were given
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub listener: Option<SocketAddr>,
    pub templates: Option<PathBuf>,
    pub master_key: Option<String>,
    pub totp_issuer: Option<String>,
    pub db: Option<Db>,
    pub session: Option<Session>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Db {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    pub secure: Option<bool>,
    pub domain: Option<String>,
}
