use thiserror::Error;

pub type RfResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid municipality code: {code}")]
    InvalidAgs { code: String },

    #[error("Unknown token: {what} = {token}")]
    UnknownToken { what: &'static str, token: String },

    #[error("Invalid time grid: {what}")]
    InvalidTimeGrid { what: String },
}
