pub mod initiator;
pub mod password;
pub mod session;
pub mod totp;
