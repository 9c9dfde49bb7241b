use tracing::Level;
use tracing_subscriber::{
    filter::FromEnvError, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("invalid RUST_LOG: {0}")]
    Filter(#[from] FromEnvError),
}

pub struct TracingBuilder {
    level: Level,
    json: bool,
    span_events: bool,
}

impl Default for TracingBuilder {
    fn default() -> Self {
        TracingBuilder {
            level: Level::INFO,
            json: false,
            span_events: false,
        }
    }
}

impl TracingBuilder {
    /// Set the log level for the stderr layer. RUST_LOG still has a higher
    /// priority over this value.
    pub fn level(mut self, level: Level) -> TracingBuilder {
        self.level = level;
        self
    }

    /// Emit one JSON object per event instead of the compact human readable
    /// format, default is disabled.
    pub fn enable_json(mut self) -> TracingBuilder {
        self.json = true;
        self
    }

    /// Additionally log whenever an instrumented span closes, together with
    /// its timings. Default is disabled.
    pub fn enable_span_events(mut self) -> TracingBuilder {
        self.span_events = true;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, Error> {
        Ok(EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env()?)
    }

    /// This will setup tracing based on the configuration passed in.
    /// It will setup a stderr writer output layer and a EnvFilter based on the
    /// provided log level (RUST_LOG still has a higher priority over the
    /// configured value).
    pub fn build(self) -> Result<(), Error> {
        let span_events = if self.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let fmt_layer = if self.json {
            tracing_subscriber::fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_span_events(span_events)
                .json()
                .boxed()
        } else {
            tracing_subscriber::fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_span_events(span_events)
                .compact()
                .boxed()
        };

        tracing_subscriber::registry()
            .with(self.env_filter()?)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
