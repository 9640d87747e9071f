//! Request dispatch: one decoded [`Message`] in, one [`Response`] out.
//!
//! The handler is picked from the message's `type` field before anything else
//! happens. Storage is initialised only inside the handlers that write files,
//! so a `GET_TOKEN` request works even when the output directory is unusable.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::HandlerError,
    host::frame::Message,
    secret::{FileSecret, SecretSource},
    storage::{FsStorage, Storage},
};

pub const GET_TOKEN: &str = "GET_TOKEN";
pub const TEST_PATH: &str = "TEST_PATH";
pub const LOG: &str = "LOG";
pub const DUMP: &str = "DUMP";

const LOG_FILE: &str = "debug.log";
const TWEETS_FILE: &str = "tweets.jsonl";
const PROBE_FILE: &str = ".nm-bridge-probe";

/// Reply to one message. Serialized as a flat object with `ok` plus whatever
/// the handler added (`error` on failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    pub fn success() -> Self {
        Self {
            ok: true,
            fields: Map::new(),
        }
    }

    pub fn failure(error: impl fmt::Display) -> Self {
        let mut fields = Map::new();
        fields.insert("error".into(), Value::String(error.to_string()));
        Self { ok: false, fields }
    }

    /// Builder-style field insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn error(&self) -> Option<&str> {
        self.fields.get("error").and_then(Value::as_str)
    }
}

/// Routes messages to handlers. Collaborators are injected so tests can
/// substitute a fixed secret or a storage stub.
pub struct Dispatcher<S = FileSecret, T = FsStorage> {
    config: Config,
    secret: S,
    storage: T,
}

impl Dispatcher<FileSecret, FsStorage> {
    /// File-backed secret at `config.secret_path`, real filesystem storage.
    pub fn from_config(config: Config) -> Self {
        let secret = FileSecret::new(config.secret_path.clone());
        Self::new(config, secret, FsStorage)
    }
}

impl<S: SecretSource, T: Storage> Dispatcher<S, T> {
    pub fn new(config: Config, secret: S, storage: T) -> Self {
        Self {
            config,
            secret,
            storage,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one message. Never fails: handler errors become `ok: false`.
    pub fn dispatch(&self, msg: &Message) -> Response {
        match self.route(msg) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "request failed");
                Response::failure(e)
            }
        }
    }

    fn route(&self, msg: &Message) -> Result<Response, HandlerError> {
        match msg.get("type") {
            Some(Value::String(ty)) => {
                debug!(kind = %ty, "dispatching");
                match ty.as_str() {
                    GET_TOKEN => self.get_token(),
                    TEST_PATH => self.test_path(msg),
                    LOG => self.append_log(msg),
                    DUMP => self.dump(msg),
                    other => Err(HandlerError::UnknownType(other.to_string())),
                }
            }
            Some(_) => Err(HandlerError::InvalidField {
                field: "type",
                reason: "expected a string".into(),
            }),
            // Tweet batches are the one message shape without a type.
            None if msg.contains_key("tweets") => self.save_tweets(msg),
            None => Err(HandlerError::MissingType),
        }
    }

    fn get_token(&self) -> Result<Response, HandlerError> {
        let token = self.secret.read_secret().map_err(HandlerError::Secret)?;
        if token.is_empty() {
            return Err(HandlerError::EmptySecret);
        }
        debug!(len = token.len(), "token read");
        Ok(Response::success()
            .with("token", token)
            .with("port", self.config.port))
    }

    fn test_path(&self, msg: &Message) -> Result<Response, HandlerError> {
        let dir = self
            .output_dir(msg)?
            .ok_or(HandlerError::MissingField("outputDir"))?;
        self.init_dir(&dir)?;
        let probe = dir.join(PROBE_FILE);
        self.storage
            .write(&probe, b"ok")
            .and_then(|()| self.storage.remove(&probe))
            .map_err(HandlerError::Storage)?;
        Ok(Response::success().with("outputDir", dir.to_string_lossy()))
    }

    fn append_log(&self, msg: &Message) -> Result<Response, HandlerError> {
        let lines = array_field(msg, "lines")?;
        let mut buf = String::new();
        for line in lines {
            let line = line.as_str().ok_or(HandlerError::InvalidField {
                field: "lines",
                reason: "every line must be a string".into(),
            })?;
            buf.push_str(line);
            buf.push('\n');
        }
        let dir = self.dir_or_default(msg)?;
        self.init_dir(&dir)?;
        self.storage
            .append(&dir.join(LOG_FILE), buf.as_bytes())
            .map_err(HandlerError::Storage)?;
        Ok(Response::success().with("count", lines.len()))
    }

    fn dump(&self, msg: &Message) -> Result<Response, HandlerError> {
        let filename = str_field(msg, "filename")?;
        check_file_name(filename)?;
        let content = str_field(msg, "content")?;
        let dir = self.dir_or_default(msg)?;
        self.init_dir(&dir)?;
        let path = dir.join(filename);
        self.storage
            .write(&path, content.as_bytes())
            .map_err(HandlerError::Storage)?;
        Ok(Response::success().with("path", path.to_string_lossy()))
    }

    fn save_tweets(&self, msg: &Message) -> Result<Response, HandlerError> {
        let tweets = array_field(msg, "tweets")?;
        if tweets.is_empty() {
            return Ok(Response::success().with("count", 0));
        }
        let mut buf = String::new();
        for tweet in tweets {
            buf.push_str(&serde_json::to_string(tweet)?);
            buf.push('\n');
        }
        let dir = self.dir_or_default(msg)?;
        self.init_dir(&dir)?;
        self.storage
            .append(&dir.join(TWEETS_FILE), buf.as_bytes())
            .map_err(HandlerError::Storage)?;
        Ok(Response::success().with("count", tweets.len()))
    }

    fn init_dir(&self, dir: &Path) -> Result<(), HandlerError> {
        self.storage.init_dir(dir).map_err(HandlerError::Storage)
    }

    /// `outputDir` from the message; absent, null and empty all mean "not given".
    fn output_dir(&self, msg: &Message) -> Result<Option<PathBuf>, HandlerError> {
        match msg.get("outputDir") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(PathBuf::from(s))),
            Some(_) => Err(HandlerError::InvalidField {
                field: "outputDir",
                reason: "expected a string".into(),
            }),
        }
    }

    fn dir_or_default(&self, msg: &Message) -> Result<PathBuf, HandlerError> {
        Ok(self
            .output_dir(msg)?
            .unwrap_or_else(|| self.config.output_dir.clone()))
    }
}

fn str_field<'a>(msg: &'a Message, field: &'static str) -> Result<&'a str, HandlerError> {
    match msg.get(field) {
        None | Some(Value::Null) => Err(HandlerError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(HandlerError::InvalidField {
            field,
            reason: "expected a string".into(),
        }),
    }
}

fn array_field<'a>(msg: &'a Message, field: &'static str) -> Result<&'a [Value], HandlerError> {
    match msg.get(field) {
        None | Some(Value::Null) => Err(HandlerError::MissingField(field)),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(HandlerError::InvalidField {
            field,
            reason: "expected an array".into(),
        }),
    }
}

/// Dump targets must be a bare file name inside the output dir.
fn check_file_name(name: &str) -> Result<(), HandlerError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(HandlerError::InvalidField {
            field: "filename",
            reason: format!("{name:?} is not a plain file name"),
        });
    }
    Ok(())
}
