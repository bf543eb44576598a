pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`thread_count` must be a positive integer")]
    InvalidThreadCount,

    #[error("`repeat_times` must be a positive integer")]
    InvalidRepeatTimes,

    #[error(
        "invalid mode `{0}` (expected `normal`, `continuous`, `simultaneous`, `concurrency`, `frequent` or 0..4)"
    )]
    InvalidMode(String),

    #[error("`ends_time` must not be before `starts_time`")]
    InvalidWindow,

    #[error("failed to open result sink: {0}")]
    Sink(std::io::Error),
}
