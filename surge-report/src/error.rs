use std::time::Duration;

use chrono::NaiveDateTime;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`group_minutes` must be a positive integer")]
    InvalidGroupMinutes,

    #[error("sample of `{case}` ending {end_time} falls outside the bucket range")]
    OutOfRange {
        case: String,
        end_time: NaiveDateTime,
    },

    #[error("no report file or folder given")]
    NoInput,

    #[error("report server `{0}` did not resolve")]
    Unresolved(String),

    #[error("no reply from report server within {0:?}")]
    Timeout(Duration),
}
