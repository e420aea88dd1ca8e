pub type Result<T, E = QuarryError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    #[error("{0}")]
    Message(String),

    #[error("Not yet implemented: {0}")]
    NotImplemented(String),

    #[error("{msg}: {source}")]
    Context {
        msg: String,
        #[source]
        source: Box<QuarryError>,
    },
}

impl QuarryError {
    pub fn new(msg: impl Into<String>) -> Self {
        QuarryError::Message(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        QuarryError::NotImplemented(msg.into())
    }
}

/// Early-return with a `NotImplemented` error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {
        return Err($crate::QuarryError::NotImplemented(format!($($arg)*)))
    };
}

pub trait ResultExt<T> {
    /// Wrap an error with a static context message.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a lazily computed context message.
    fn context_fn<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|err| QuarryError::Context {
            msg: msg.to_string(),
            source: Box::new(err),
        })
    }

    fn context_fn<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|err| QuarryError::Context {
            msg: f(),
            source: Box::new(err),
        })
    }
}

pub trait OptionExt<T> {
    /// Convert a None into an error referencing the missing field.
    fn required(self, field: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, field: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(QuarryError::new(format!("Missing required field: {field}"))),
        }
    }
}
