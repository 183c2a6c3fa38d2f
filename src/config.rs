use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::error::{self, Context};

mod shape;

pub type Kdf = hkdf::Hkdf<sha3::Sha3_512>;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// a config path to load settings from. later files override earlier
    /// ones
    #[arg(long)]
    config: Vec<PathBuf>
}

pub struct Config {
    pub settings: Settings,
    pub kdf: Kdf,
}

#[derive(Debug)]
pub struct Settings {
    pub listener: SocketAddr,
    pub templates: PathBuf,
    pub master_key: String,
    pub totp_issuer: String,
    pub db: Db,
    pub session: Session,
}

#[derive(Debug)]
pub struct Db {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub dbname: String,
}

#[derive(Debug)]
pub struct Session {
    pub secure: bool,
    pub domain: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listener: SocketAddr::from(([0, 0, 0, 0], 8080)),
            templates: PathBuf::from("./templates"),
            master_key: String::new(),
            totp_issuer: String::from("charkeep"),
            db: Db {
                user: String::from("charkeep"),
                password: None,
                host: String::from("localhost"),
                port: 5432,
                dbname: String::from("charkeep"),
            },
            session: Session {
                secure: false,
                domain: None,
            },
        }
    }
}

impl Settings {
    fn merge(&mut self, loaded: shape::Settings) {
        if let Some(listener) = loaded.listener {
            self.listener = listener;
        }

        if let Some(templates) = loaded.templates {
            self.templates = templates;
        }

        if let Some(master_key) = loaded.master_key {
            self.master_key = master_key;
        }

        if let Some(totp_issuer) = loaded.totp_issuer {
            self.totp_issuer = totp_issuer;
        }

        if let Some(db) = loaded.db {
            if let Some(user) = db.user {
                self.db.user = user;
            }

            if let Some(password) = db.password {
                self.db.password = Some(password);
            }

            if let Some(host) = db.host {
                self.db.host = host;
            }

            if let Some(port) = db.port {
                self.db.port = port;
            }

            if let Some(dbname) = db.dbname {
                self.db.dbname = dbname;
            }
        }

        if let Some(session) = loaded.session {
            if let Some(secure) = session.secure {
                self.session.secure = secure;
            }

            if let Some(domain) = session.domain {
                self.session.domain = Some(domain);
            }
        }
    }
}

impl Config {
    pub fn from_args(args: CliArgs) -> error::Result<Self> {
        let cwd = std::env::current_dir()
            .context("failed to retrieve cwd for Settings")?;
        let mut settings = Settings::default();

        for config_path in args.config {
            let full = if config_path.is_absolute() {
                config_path
            } else {
                cwd.join(config_path)
            };

            tracing::debug!("loading config file \"{}\"", full.display());

            settings.merge(Self::load_file(&full)?);
        }

        if settings.master_key.is_empty() {
            return Err(error::Error::new()
                .kind("MissingMasterKey")
                .message("settings.master_key must be provided by a config file"));
        }

        {
            let meta = std::fs::metadata(&settings.templates).context(
                "failed to retrieve metadata for settings.templates"
            )?;

            if !meta.is_dir() {
                return Err(error::Error::new().message(
                    "settings.templates is not a directory"
                ));
            }
        }

        tracing::debug!("{settings:#?}");

        let kdf = hkdf::Hkdf::<sha3::Sha3_512>::new(None, settings.master_key.as_bytes());

        Ok(Config {
            settings,
            kdf
        })
    }

    fn load_file(path: &PathBuf) -> error::Result<shape::Settings> {
        let ext = path.extension().context(format!(
            "failed to retrieve the file extension for config file: \"{}\"", path.display()
        ))?;

        let ext = ext.to_ascii_lowercase();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .context(format!("failed to open config file: \"{}\"", path.display()))?;

        if ext.eq("yaml") || ext.eq("yml") {
            serde_yaml::from_reader(&file).context(format!(
                "failed to parse yaml config file: \"{}\"", path.display()
            ))
        } else if ext.eq("json") {
            serde_json::from_reader(&file).context(format!(
                "failed to parse json config file: \"{}\"", path.display()
            ))
        } else {
            Err(error::Error::new().message(format!(
                "unknown file extension for config file: \"{}\"", path.display()
            )))
        }
    }
}

pub fn get_config() -> error::Result<Config> {
    Config::from_args(CliArgs::parse())
}
