use std::sync::Arc;

use deadpool_postgres::Pool;

use crate::error;
use crate::config;
use crate::template;
use crate::sec;

pub mod db;

pub type ArcShared = Arc<Shared>;

/// the primary application state shared between request handlers
pub struct Shared {
    pool: Pool,
    templates: template::state::Templates,
    sec: sec::state::Sec,
}

impl Shared {
    pub fn from_config(config: &config::Config) -> error::Result<Shared> {
        Ok(Shared {
            pool: db::from_config(config)?,
            templates: template::state::Templates::from_config(config)?,
            sec: sec::state::Sec::from_config(config)?,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn templates(&self) -> &template::state::Templates {
        &self.templates
    }

    pub fn sec(&self) -> &sec::state::Sec {
        &self.sec
    }
}

impl AsRef<Pool> for Shared {
    fn as_ref(&self) -> &Pool {
        &self.pool
    }
}

impl AsRef<template::state::Templates> for Shared {
    fn as_ref(&self) -> &template::state::Templates {
        &self.templates
    }
}

impl AsRef<sec::state::Sec> for Shared {
    fn as_ref(&self) -> &sec::state::Sec {
        &self.sec
    }
}
