//! Background extraction.
//!
//! [`spawn`] decodes an archive on its own thread and streams the result back
//! over a channel, one [`Response`] per decoded entry, so the caller can start
//! on early payloads before the whole archive is done. [`untar`] is the
//! collecting side of that exchange.
//!
//! A decode cannot be cancelled once started. Dropping the receiver only makes
//! the worker stop at its next send.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{Level, debug, log};

use crate::error::{Error, Result};
use crate::tar::{ArchiveIterator, TarEntry};

#[derive(Debug)]
pub enum Request {
    Extract { buffer: Vec<u8> },
}

#[derive(Debug)]
pub enum Response {
    /// One decoded entry; extended header blocks never produce one.
    Extract(TarEntry),
    /// Sent once after the last entry.
    Complete,
    /// Sent at most once; nothing follows it.
    Error { message: String },
    /// Diagnostics only.
    Log { level: Level, msg: String },
}

/// Starts a worker thread for `request`.
pub fn spawn(request: Request) -> Result<Receiver<Response>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("untar-worker".into())
        .spawn(move || match request {
            Request::Extract { buffer } => untar_buffer(&buffer, &tx),
        })?;
    Ok(rx)
}

fn post_log(tx: &Sender<Response>, level: Level, msg: String) {
    let _ = tx.send(Response::Log { level, msg });
}

fn untar_buffer(buffer: &[u8], tx: &Sender<Response>) {
    post_log(tx, Level::Debug, format!("extracting {} bytes", buffer.len()));
    let mut count = 0usize;
    for entry in ArchiveIterator::new(buffer) {
        match entry {
            Ok(entry) => {
                if tx.send(Response::Extract(entry)).is_err() {
                    // receiver dropped
                    return;
                }
                count += 1;
            }
            Err(e) => {
                let _ = tx.send(Response::Error {
                    message: e.to_string(),
                });
                return;
            }
        }
    }
    post_log(tx, Level::Debug, format!("extracted {} entries", count));
    let _ = tx.send(Response::Complete);
}

/// Decodes `buffer` in the background and collects every entry.
///
/// `progress` sees each entry as soon as it arrives. On failure the entries
/// received so far are discarded and only the error is returned.
pub fn untar<F>(buffer: Vec<u8>, mut progress: F) -> Result<Vec<TarEntry>>
where
    F: FnMut(&TarEntry),
{
    let rx = spawn(Request::Extract { buffer })?;
    let mut files = Vec::new();
    for response in rx {
        match response {
            Response::Log { level, msg } => log!(level, "Worker: {}", msg),
            Response::Extract(entry) => {
                progress(&entry);
                files.push(entry);
            }
            Response::Complete => {
                debug!("worker completed with {} entries", files.len());
                return Ok(files);
            }
            Response::Error { message } => return Err(Error::Worker(message)),
        }
    }
    Err(Error::Worker("worker exited without completing".into()))
}
