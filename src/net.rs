pub mod error;
pub mod cookie;
pub mod html;
pub mod layer;
