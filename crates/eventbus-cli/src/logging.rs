//! Tracing initialization: a compact stdout formatter plus an
//! `EnvFilter` driven by `EVENTBUSD_LOG` (falling back to `info`).

pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("EVENTBUSD_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true)
        .compact()
        .init();
}
