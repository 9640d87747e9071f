//! Host side of the bridge: framing plus stdio entry points.
//!
//! The codec in [`frame`] is synchronous and works on any `Read`/`Write`.
//! With the `tokio` feature, the helpers below push that blocking work onto
//! `spawn_blocking` so it can sit inside an async application.

pub mod frame;

use std::io;

pub use frame::{
    encode_message, encode_message_capped, read_message, read_message_capped, read_payload,
    write_message, Message, MAX_FROM_BROWSER, MAX_TO_BROWSER,
};

use crate::{
    dispatch::Dispatcher,
    secret::SecretSource,
    session::{Outcome, Session},
    storage::Storage,
};

/// Serve frames from the process's stdin to its stdout until EOF or a
/// framing error. Both handles are locked and used as raw byte streams.
pub fn run_stdio<S: SecretSource, T: Storage>(dispatcher: Dispatcher<S, T>) -> Outcome {
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    Session::new(stdin, stdout, dispatcher).run().outcome
}

#[cfg(feature = "tokio")]
mod async_io {
    use std::io::{self, Read, Write};

    use serde::Serialize;

    use super::{frame, Message};
    use crate::{
        dispatch::Dispatcher,
        error::FrameError,
        secret::SecretSource,
        session::{Outcome, Report, Session},
        storage::Storage,
    };

    fn join_error(e: tokio::task::JoinError) -> FrameError {
        FrameError::Io(io::Error::new(io::ErrorKind::Other, e))
    }

    /// Read one message on the blocking pool. The reader is handed back so the
    /// caller can keep reading from it.
    pub async fn read_message_blocking<R>(mut reader: R) -> Result<(R, Option<Message>), FrameError>
    where
        R: Read + Send + 'static,
    {
        tokio::task::spawn_blocking(move || -> Result<_, FrameError> {
            let msg = frame::read_message(&mut reader)?;
            Ok((reader, msg))
        })
        .await
        .map_err(join_error)?
    }

    /// Encode on the calling task, write on the blocking pool.
    pub async fn write_message_blocking<W, T>(mut writer: W, msg: &T) -> Result<W, FrameError>
    where
        W: Write + Send + 'static,
        T: Serialize + ?Sized,
    {
        let bytes = frame::encode_message(msg)?;
        tokio::task::spawn_blocking(move || -> Result<W, FrameError> {
            writer.write_all(&bytes)?;
            writer.flush()?;
            Ok(writer)
        })
        .await
        .map_err(join_error)?
    }

    /// Run a whole [`Session`] on the blocking pool and hand back its report.
    pub async fn run_session_blocking<R, W, S, T>(
        reader: R,
        writer: W,
        dispatcher: Dispatcher<S, T>,
    ) -> Result<Report<W>, FrameError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
        S: SecretSource + Send + 'static,
        T: Storage + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Session::new(reader, writer, dispatcher).run())
            .await
            .map_err(join_error)
    }

    /// [`super::run_stdio`] on the blocking pool.
    pub async fn run_stdio_async<S, T>(dispatcher: Dispatcher<S, T>) -> Result<Outcome, FrameError>
    where
        S: SecretSource + Send + 'static,
        T: Storage + Send + 'static,
    {
        let report = run_session_blocking(io::stdin(), io::stdout(), dispatcher).await?;
        Ok(report.outcome)
    }
}

#[cfg(feature = "tokio")]
pub use async_io::{
    read_message_blocking, run_session_blocking, run_stdio_async, write_message_blocking,
};
