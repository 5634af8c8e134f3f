use nimbus::ErrorKind;
use nimbus_lib::context_trait;

type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

/// what the user can do about a failed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    /// the message says what to change, run the command again with it
    Inline,
    /// the server failed or could not be reached, the same command may work
    Retry,
    /// the token was refused and has to be replaced
    Login,
}

#[derive(Debug)]
pub struct Error {
    kind: Option<ErrorKind>,
    context: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T = ()> = std::result::Result<T, Error>;

impl Error {
    pub fn new() -> Error {
        Error {
            kind: None,
            context: None,
            src: None,
        }
    }

    /// rejects what was typed before anything is sent to the server
    pub fn input<C>(msg: C) -> Error
    where
        C: Into<String>
    {
        Error::new()
            .kind(ErrorKind::Validation)
            .context(msg)
    }

    pub fn kind(mut self, kind: ErrorKind) -> Error {
        self.kind = Some(kind);
        self
    }

    pub fn context<C>(mut self, cxt: C) -> Error
    where
        C: Into<String>
    {
        self.context = Some(cxt.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Error
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }

    pub fn remedy(&self) -> Remedy {
        match self.kind {
            Some(ErrorKind::Auth) => Remedy::Login,
            Some(ErrorKind::Network) => Remedy::Retry,
            _ => Remedy::Inline,
        }
    }

    /// the error followed by a line on how to recover when there is more to
    /// do than read the message
    pub fn report(&self) -> String {
        match self.remedy() {
            Remedy::Inline => self.to_string(),
            Remedy::Retry => format!("{self}\nthe server did not complete the request, try again"),
            Remedy::Login => format!(
                "{self}\nthe server refused the token. set server.token in the config or pass --token"
            ),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.context, &self.src) {
            (Some(cxt), Some(src)) => write!(f, "{}: {}", cxt, src),
            (Some(cxt), None) => write!(f, "{}", cxt),
            (None, Some(src)) => write!(f, "{}", src),
            (None, None) => write!(f, "UNKNOWN ERROR"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

context_trait!(Error);

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<BoxDynError>
{
    fn context<C>(self, cxt: C) -> std::result::Result<T, Error>
    where
        C: Into<String>
    {
        self.map_err(|err| Error::new().context(cxt).source(err))
    }
}

impl<T> Context<T, ()> for std::option::Option<T> {
    fn context<C>(self, cxt: C) -> std::result::Result<T, Error>
    where
        C: Into<String>
    {
        self.ok_or_else(|| Error::input(cxt))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new().context("terminal io failed").source(err)
    }
}

impl From<nimbus::config::error::Error> for Error {
    fn from(err: nimbus::config::error::Error) -> Self {
        Error::new().context("invalid config").source(err)
    }
}

impl From<nimbus::Error> for Error {
    fn from(err: nimbus::Error) -> Self {
        Error::new().kind(err.kind()).source(err)
    }
}
