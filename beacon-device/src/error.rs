/// Failures reported by the control core.
///
/// Field validation never shows up here: bad values are replaced by their
/// defaults where they are read.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("radio error: {0}")]
    Radio(String),
    #[error("cloud link not established")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, Error>;
