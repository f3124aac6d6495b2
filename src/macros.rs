/// Like `tracing::info!`, with an optional starting time.
/// When a starting time is passed in, the time elapsed since then is logged with the message.
/// ```
/// # use leaderscrap::info_time;
/// info_time!("str {}, {}", 1, 2);
/// let time = chrono::Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($strfm:literal $(,)? $($arg:expr),*) => {{
        ::tracing::info!("{}", format!($strfm, $($arg),*));
    }};
    ($time:expr, $strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        let run_time = (local_now - $time)
                .num_microseconds()
                .map(|n| n as f64 / 1_000_000.0)
                .unwrap_or(0.0);
        ::tracing::info!(runtime_sec = run_time, "{}", format!($strfm, $($arg),*));
    }};
}
