pub mod tracing {
    use std::fmt;

    use tracing_subscriber::{fmt::time::FormatTime, EnvFilter, FmtSubscriber};

    pub fn init() {
        struct LocalTimeOnly;

        impl FormatTime for LocalTimeOnly {
            fn format_time(
                &self,
                w: &mut tracing_subscriber::fmt::format::Writer<'_>,
            ) -> fmt::Result {
                let now = chrono::Local::now();
                write!(w, "{}", now.format("%H:%M:%S"))
            }
        }

        let subscriber = FmtSubscriber::builder()
            .with_timer(LocalTimeOnly)
            .compact()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    }

    pub fn init_test(level: &str) {
        let subscriber = FmtSubscriber::builder()
            .without_time()
            .compact()
            .with_env_filter(EnvFilter::new(level))
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_test_is_repeatable() {
        // Second call hits the already-set global default and must not panic.
        super::tracing::init_test("debug");
        super::tracing::init_test("info");
        tracing::info!("test subscriber installed");
    }
}
