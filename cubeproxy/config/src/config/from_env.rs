use std::{marker::PhantomData, str::FromStr};

use super::ConfigContext;
use crate::config::{source::ConfigSource, ConfigError, Result};

/// Reads a value from the environment variable `0` and parses it with [`FromStr`].
#[derive(Clone)]
pub struct FromEnv<T>(&'static str, PhantomData<T>);

impl<T> FromEnv<T> {
    pub fn new(env: &'static str) -> Self {
        FromEnv(env, PhantomData::<T>)
    }
}

impl<T> ConfigSource for FromEnv<T>
where
    T: FromStr,
{
    type Value = T;

    fn source_value(self, context: &mut ConfigContext) -> Option<Result<Self::Value>> {
        context.get_env(self.0).ok().map(|var| {
            var.parse()
                .map_err(|_| ConfigError::InvalidValue(var.to_string(), self.0))
        })
    }
}
