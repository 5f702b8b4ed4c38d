use std::fmt;

/// Caller-facing error taxonomy for coaching operations.
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Caller precondition not met (no profile, no exercise name)
    Validation(String)
  , /// Upstream exhausted retries or failed hard, no fallback
    ServiceUnavailable(String)
  , /// Upstream text could not be coerced to JSON, no fallback
    MalformedResponse(String)
  , /// Parsed JSON does not have the expected plan shape
    Schema(String)
  , /// Requested record does not exist
    NotFound(String)
  , /// Durable store failure
    Storage(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
}

impl Error
{   /// Whether the presentation layer should answer with
    /// "system busy, try again shortly" instead of the raw error.
    pub fn is_retryable_by_user(&self) -> bool
    {   matches!(
          self
        , Error::ServiceUnavailable(_)
          | Error::MalformedResponse(_)
          | Error::Schema(_)
        )
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Validation(msg) => {
              write!(f, "Validation error: {}", msg)
            }
          , Error::ServiceUnavailable(msg) => {
              write!(f, "Service unavailable: {}", msg)
            }
          , Error::MalformedResponse(msg) => {
              write!(f, "Malformed response: {}", msg)
            }
          , Error::Schema(msg) => {
              write!(f, "Schema error: {}", msg)
            }
          , Error::NotFound(what) => {
              write!(f, "Not found: {}", what)
            }
          , Error::Storage(msg) => {
              write!(f, "Storage error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error
{   fn from(e: StoreError) -> Self
    {   Error::Storage(e.to_string())
    }
}

/// Failure of a single call to the text-generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError
{   /// Service answered "too many requests"
    RateLimited
  , /// API key is missing
    MissingApiKey(String)
  , /// HTTP transport error
    HttpError(String)
  , /// API returned a non-success status
    ApiError
    {   status: u16
      , message: String
    }
  , /// Failed to parse API envelope
    ParseError(String)
  , /// No candidates in API response
    NoCandidates
  , /// Client task is gone
    Disconnected
}

impl GenerateError
{   /// Only the rate-limit class is eligible for retry
    pub fn is_throttled(&self) -> bool
    {   matches!(self, GenerateError::RateLimited)
    }
}

impl fmt::Display for GenerateError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   GenerateError::RateLimited => {
              write!(f, "API rate limit exceeded")
            }
          , GenerateError::MissingApiKey(what) => {
              write!(f, "Missing API key for: {}", what)
            }
          , GenerateError::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , GenerateError::ApiError { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , GenerateError::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , GenerateError::NoCandidates => {
              write!(f, "API response contained no candidates")
            }
          , GenerateError::Disconnected => {
              write!(f, "Generation client disconnected")
            }
        }
    }
}

impl std::error::Error for GenerateError {}

/// Durable store failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError
{   /// Underlying file could not be read or written
    Io(String)
  , /// Document could not be (de)serialized
    Serialization(String)
}

impl fmt::Display for StoreError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   StoreError::Io(msg) => write!(f, "I/O error: {}", msg)
          , StoreError::Serialization(msg) => {
              write!(f, "Serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError
{   fn from(e: std::io::Error) -> Self
    {   StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError
{   fn from(e: serde_json::Error) -> Self
    {   StoreError::Serialization(e.to_string())
    }
}
