pub mod session;

pub use session::{Credentials, DownloadOutcome, Session};
