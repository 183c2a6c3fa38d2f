use crate::error;
use crate::config;

#[derive(Debug)]
pub struct SessionInfo {
    domain: Option<String>,
    secure: bool,
}

impl SessionInfo {
    fn from_config(config: &config::Config) -> SessionInfo {
        SessionInfo {
            domain: config.settings.session.domain.clone(),
            secure: config.settings.session.secure,
        }
    }

    pub fn domain(&self) -> Option<&String> {
        self.domain.as_ref()
    }

    pub fn secure(&self) -> &bool {
        &self.secure
    }
}

/// keys and knobs for the authentication mechanisms. the session signing
/// key and the password pepper are both expanded from the configured
/// master key so only one secret has to be managed
pub struct Sec {
    session_key: [u8; blake3::KEY_LEN],
    pepper: [u8; 64],
    totp_issuer: String,
    session_info: SessionInfo,
}

impl Sec {
    pub fn from_config(config: &config::Config) -> error::Result<Sec> {
        tracing::debug!("creating Sec state");

        let mut session_key = [0u8; blake3::KEY_LEN];
        config.kdf.expand(b"charkeep/session", &mut session_key)?;

        let mut pepper = [0u8; 64];
        config.kdf.expand(b"charkeep/password", &mut pepper)?;

        Ok(Sec {
            session_key,
            pepper,
            totp_issuer: config.settings.totp_issuer.clone(),
            session_info: SessionInfo::from_config(config),
        })
    }

    pub fn session_key(&self) -> &[u8; blake3::KEY_LEN] {
        &self.session_key
    }

    pub fn pepper(&self) -> &[u8] {
        &self.pepper
    }

    pub fn totp_issuer(&self) -> &str {
        &self.totp_issuer
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.session_info
    }
}
