//! The read → dispatch → write loop, as an explicit state machine.
//!
//! ```text
//!            frame read                 response written
//! AwaitingFrame ──────────► Dispatching ───────────────► AwaitingFrame
//!      │                          │
//!      │ clean EOF                │ write failed
//!      ▼                          ▼
//! Terminated(Clean)        Terminated(Failed)
//!      ▲
//!      │ framing error
//! AwaitingFrame
//! ```
//!
//! Handler errors never leave `Dispatching`: they are already `ok: false`
//! responses by the time the dispatcher returns.

use std::io::{Read, Write};

use tracing::{debug, error, info};

use crate::{
    dispatch::Dispatcher,
    error::FrameError,
    host::frame::{read_message_capped, write_message, Message},
    secret::{FileSecret, SecretSource},
    storage::{FsStorage, Storage},
};

#[derive(Debug)]
pub enum State {
    AwaitingFrame,
    Dispatching(Message),
    Terminated(Outcome),
}

/// How a session ended.
#[derive(Debug)]
pub enum Outcome {
    /// Input closed at a frame boundary.
    Clean,
    /// The stream broke; it cannot be read further.
    Failed(FrameError),
}

impl Outcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, Outcome::Clean)
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Clean => 0,
            Outcome::Failed(_) => 1,
        }
    }
}

/// What [`Session::run`] hands back.
#[derive(Debug)]
pub struct Report<W> {
    pub outcome: Outcome,
    /// Messages answered before termination.
    pub handled: usize,
    pub writer: W,
}

pub struct Session<R, W, S = FileSecret, T = FsStorage> {
    reader: R,
    writer: W,
    dispatcher: Dispatcher<S, T>,
    state: State,
    handled: usize,
}

impl<R: Read, W: Write, S: SecretSource, T: Storage> Session<R, W, S, T> {
    pub fn new(reader: R, writer: W, dispatcher: Dispatcher<S, T>) -> Self {
        Self {
            reader,
            writer,
            dispatcher,
            state: State::AwaitingFrame,
            handled: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn handled(&self) -> usize {
        self.handled
    }

    /// Perform one transition. A terminated session stays terminated.
    pub fn step(&mut self) -> &State {
        self.state = match std::mem::replace(&mut self.state, State::AwaitingFrame) {
            State::AwaitingFrame => self.await_frame(),
            State::Dispatching(msg) => self.answer(&msg),
            done @ State::Terminated(_) => done,
        };
        &self.state
    }

    fn await_frame(&mut self) -> State {
        let cap = self.dispatcher.config().max_message_len;
        match read_message_capped(&mut self.reader, cap) {
            Ok(Some(msg)) => {
                debug!(keys = msg.len(), "frame received");
                State::Dispatching(msg)
            }
            Ok(None) => {
                info!(handled = self.handled, "input closed, shutting down");
                State::Terminated(Outcome::Clean)
            }
            Err(e) => {
                error!(error = %e, "framing error, aborting");
                State::Terminated(Outcome::Failed(e))
            }
        }
    }

    fn answer(&mut self, msg: &Message) -> State {
        let resp = self.dispatcher.dispatch(msg);
        match write_message(&mut self.writer, &resp) {
            Ok(()) => {
                self.handled += 1;
                debug!(ok = resp.ok, "response written");
                State::AwaitingFrame
            }
            Err(e) => {
                error!(error = %e, "cannot write response, aborting");
                State::Terminated(Outcome::Failed(e))
            }
        }
    }

    /// Step until terminated.
    pub fn run(mut self) -> Report<W> {
        loop {
            match std::mem::replace(&mut self.state, State::AwaitingFrame) {
                State::Terminated(outcome) => {
                    return Report {
                        outcome,
                        handled: self.handled,
                        writer: self.writer,
                    }
                }
                state => {
                    self.state = state;
                    self.step();
                }
            }
        }
    }
}
