use super::ConfigContext;
use crate::config::Result;

/// A place a single configuration value can come from (environment, file, default).
pub trait ConfigSource: Sized {
    type Value;

    fn source_value(self, context: &mut ConfigContext) -> Option<Result<Self::Value>>;

    fn or<T: ConfigSource<Value = Self::Value>>(self, fallback: T) -> Or<Self, T> {
        Or::new(self, fallback)
    }
}

#[derive(Clone)]
pub struct Or<A, B>(A, B);

impl<A, B> Or<A, B>
where
    A: ConfigSource,
    B: ConfigSource<Value = A::Value>,
{
    fn new(first: A, fallback: B) -> Self {
        Or(first, fallback)
    }
}

impl<A, B> ConfigSource for Or<A, B>
where
    A: ConfigSource,
    B: ConfigSource<Value = A::Value>,
{
    type Value = A::Value;

    fn source_value(self, context: &mut ConfigContext) -> Option<Result<Self::Value>> {
        self.0
            .source_value(context)
            .or_else(|| self.1.source_value(context))
    }
}

impl<V> ConfigSource for Option<V>
where
    V: Clone,
{
    type Value = V;

    fn source_value(self, _context: &mut ConfigContext) -> Option<Result<Self::Value>> {
        self.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::config::from_env::FromEnv;

    #[rstest]
    #[case(None, 10)]
    #[case(Some("13"), 13)]
    fn env_then_file_then_fallback(#[case] env: Option<&str>, #[case] outcome: i32) {
        let mut context = ConfigContext::default()
            .override_env("FALLBACK", "10")
            .strict_env(true);
        if let Some(env) = env {
            context = context.override_env("TEST_VALUE", env);
        }

        let value = FromEnv::<i32>::new("TEST_VALUE")
            .or(None)
            .or(FromEnv::new("FALLBACK"));

        assert_eq!(value.source_value(&mut context).unwrap().unwrap(), outcome);
    }

    #[test]
    fn file_value_used_when_env_missing() {
        let mut context = ConfigContext::default().strict_env(true);

        let value = FromEnv::<u16>::new("TEST_PORT").or(Some(9090));

        assert_eq!(value.source_value(&mut context).unwrap().unwrap(), 9090);
    }
}
