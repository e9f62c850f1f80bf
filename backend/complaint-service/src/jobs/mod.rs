pub mod daily_digest;

pub use daily_digest::DailyDigestJob;
