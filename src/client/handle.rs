use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use super::{Response, WebRequest};
use crate::Error;

/// Aborts a request from another thread.
///
/// Aborting shuts down the socket of the request, so any blocking read or
/// write on it fails, and every later operation on the request fails with
/// [`Error::Aborted`].
#[derive(Clone, Default)]
pub struct AbortHandle {
    inner: Arc<Mutex<AbortState>>,
}

#[derive(Default)]
struct AbortState {
    aborted: bool,
    socket: Option<TcpStream>,
}

impl AbortHandle {
    /// Abort the request. Aborting twice does nothing.
    pub fn abort(&self) {
        let mut state = self.lock();
        if state.aborted {
            return;
        }
        state.aborted = true;

        debug!("Abort request");

        if let Some(socket) = state.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    /// Tell if [`abort`][AbortHandle::abort] was called.
    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Watch the socket of a new connection, replacing the previous one.
    pub(crate) fn watch(&self, socket: Option<TcpStream>) -> Result<(), Error> {
        let mut state = self.lock();

        if state.aborted {
            if let Some(socket) = socket {
                let _ = socket.shutdown(Shutdown::Both);
            }
            return Err(Error::Aborted);
        }

        state.socket = socket;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, AbortState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// A response being fetched on a worker thread.
///
/// Made by [`WebRequest::begin_get_response`].
#[derive(Debug)]
pub struct ResponseHandle {
    rx: Receiver<Result<Response, Error>>,
    result: Option<Result<Response, Error>>,
    abort: AbortHandle,
}

impl ResponseHandle {
    pub(crate) fn spawn(mut request: WebRequest) -> Result<Self, Error> {
        let (tx, rx) = mpsc::channel();
        let abort = request.abort_handle();

        thread::Builder::new()
            .name("webrequest".into())
            .spawn(move || {
                let result = request.get_response();
                // The handle might be gone, nobody wants the result then.
                let _ = tx.send(result);
            })?;

        Ok(ResponseHandle {
            rx,
            result: None,
            abort,
        })
    }

    /// Tell if the response (or error) is ready.
    pub fn is_completed(&mut self) -> bool {
        if self.result.is_none() {
            match self.rx.try_recv() {
                Ok(v) => self.result = Some(v),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.result = Some(Err(worker_gone())),
            }
        }
        self.result.is_some()
    }

    /// Block until the response is ready.
    pub fn wait(mut self) -> Result<Response, Error> {
        if let Some(result) = self.result.take() {
            return result;
        }
        self.rx.recv().unwrap_or_else(|_| Err(worker_gone()))
    }

    /// Block at most `timeout` for the response.
    ///
    /// Returns `None` if it is still not ready. The operation carries on,
    /// call [`abort`][ResponseHandle::abort] to stop it.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<Response, Error>> {
        if let Some(result) = self.result.take() {
            return Some(result);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(v) => Some(v),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(worker_gone())),
        }
    }

    /// Abort the operation.
    pub fn abort(&self) {
        self.abort.abort();
    }
}

fn worker_gone() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::Other,
        "request worker thread ended without a result",
    ))
}
