use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Broad category of an error.
///
/// Analysis of a statement is deterministic, so none of these are retryable.
/// The kind only decides how an error is reported and whether the FROM
/// clause driver may suppress it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The statement contains an invalid construct.
    Analysis,
    /// A table, view or column could not be found.
    MissingObject,
    /// A constant expression or predicate failed to evaluate.
    Evaluation,
    /// A caller broke an invariant (e.g. adding slots after layout).
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "Analysis"),
            Self::MissingObject => write!(f, "Missing object"),
            Self::Evaluation => write!(f, "Evaluation"),
            Self::Internal => write!(f, "Internal"),
        }
    }
}

#[derive(Debug)]
pub struct DbError {
    inner: Box<DbErrorInner>,
}

struct DbErrorInner {
    msg: String,
    kind: ErrorKind,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
    fields: Vec<ErrorField>,
    backtrace: Backtrace,
}

struct ErrorField {
    key: Cow<'static, str>,
    value: Box<dyn fmt::Display + Send + Sync + 'static>,
}

impl DbError {
    /// Create a new analysis error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Analysis, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                msg: msg.into(),
                kind,
                source: None,
                fields: Vec::new(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::MissingObject, msg)
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Evaluation, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_source(mut self, source: Box<dyn Error + Send + Sync + 'static>) -> Self {
        self.inner.source = Some(source);
        self
    }

    /// Attach an additional key/value to the error.
    ///
    /// Fields are printed in insertion order after the message.
    pub fn with_field<V>(mut self, key: impl Into<Cow<'static, str>>, value: V) -> Self
    where
        V: fmt::Display + Send + Sync + 'static,
    {
        self.inner.fields.push(ErrorField {
            key: key.into(),
            value: Box::new(value),
        });
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.inner.kind == kind
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    /// Get the value of a field by key, formatted as a string.
    pub fn get_field(&self, key: &str) -> Option<String> {
        self.inner
            .fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.to_string())
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl fmt::Debug for DbErrorInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbError")
            .field("msg", &self.msg)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("num_fields", &self.fields.len())
            .finish()
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        for field in &self.inner.fields {
            write!(f, "\n  {}: {}", field.key, field.value)?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }

        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<fmt::Error> for DbError {
    fn from(value: fmt::Error) -> Self {
        DbError::internal("Format error").with_source(Box::new(value))
    }
}

/// Add context to an error, keeping the original error as the source.
pub trait ResultExt<T, E> {
    /// Wrap the error with a new analysis error using `msg`.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Same as `context` but lazily builds the message.
    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::new(msg).with_source(Box::new(e))),
        }
    }

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::new(f()).with_source(Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an internal error naming `field` if the value is None.
    fn required(self, field: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, field: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(DbError::internal(format!("Missing field '{field}'"))),
        }
    }
}

/// Return early with a "not implemented" analysis error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::DbError::new(format!("Not yet implemented: {msg}")));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_fields_in_order() {
        let err = DbError::new("Offset boundaries are in the wrong order")
            .with_field("left", 5)
            .with_field("right", 2);

        let s = err.to_string();
        let left = s.find("left: 5").unwrap();
        let right = s.find("right: 2").unwrap();
        assert!(left < right);
        assert_eq!(Some("5".to_string()), err.get_field("left"));
    }

    #[test]
    fn default_kind_is_analysis() {
        let err = DbError::new("bad");
        assert!(err.is_kind(ErrorKind::Analysis));
        assert_eq!(ErrorKind::MissingObject, DbError::missing("gone").kind());
    }

    #[test]
    fn context_keeps_source() {
        let res: std::result::Result<(), DbError> = Err(DbError::evaluation("divide by zero"));
        let err = res.context("Couldn't evaluate expression").unwrap_err();

        assert!(err.is_kind(ErrorKind::Analysis));
        assert_eq!("Couldn't evaluate expression", err.get_msg());
        assert!(err.source().unwrap().to_string().contains("divide by zero"));
    }

    #[test]
    fn option_required() {
        let v: Option<i32> = None;
        let err = v.required("desc").unwrap_err();
        assert!(err.is_kind(ErrorKind::Internal));
        assert_eq!(Some(4), Some(4).required("desc").ok());
    }

    #[test]
    fn not_implemented_macro() {
        fn unimpl() -> Result<()> {
            not_implemented!("RANGE offset {}", "boundaries")
        }

        let err = unimpl().unwrap_err();
        assert_eq!("Not yet implemented: RANGE offset boundaries", err.get_msg());
    }
}
