pub mod login;
pub mod logout;
pub mod reset;
pub mod verify;
