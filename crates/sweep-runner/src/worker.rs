// crates/sweep-runner/src/worker.rs
// ============================================================================
// Module: Worker Loop
// Description: Owns one device session and executes framed requests.
// Purpose: Run module operations in an isolated, killable process.
// Dependencies: sweep-core, crate::protocol
// ============================================================================

//! ## Overview
//! [`serve_worker`] is the body of the hidden worker process. It opens the
//! module's device once, then answers each [`WorkerRequest`] with exactly one
//! reply until its input closes, at which point it releases the device and
//! returns. Panics raised by the operation are caught and reported as failed
//! replies so the session survives them; a device that fails to open turns
//! every request into a failed reply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::io::BufRead;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use sweep_core::DeviceOptions;
use sweep_core::DeviceSession;
use sweep_core::EventSink;
use sweep_core::HarnessEvent;
use sweep_core::SweepModule;
use sweep_core::VectorParams;
use sweep_core::WorkerReply;

use crate::protocol::ProtocolError;
use crate::protocol::WorkerRequest;
use crate::protocol::read_message;
use crate::protocol::write_message;

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes one vector on a device, converting panics into failed replies.
pub fn execute_guarded(session: &mut dyn DeviceSession, params: &VectorParams) -> WorkerReply {
    match catch_unwind(AssertUnwindSafe(|| session.execute(params))) {
        Ok(outcome) => WorkerReply::from_outcome(outcome),
        Err(payload) => WorkerReply::failed(panic_message(payload.as_ref())),
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}

// ============================================================================
// SECTION: Worker Loop
// ============================================================================

/// Serves framed requests until the input closes.
///
/// # Errors
///
/// Returns [`ProtocolError`] when a request is malformed or a reply cannot
/// be written; end of input is a clean stop and returns `Ok`.
pub fn serve_worker(
    module: &dyn SweepModule,
    options: &DeviceOptions,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    events: &dyn EventSink,
) -> Result<(), ProtocolError> {
    let mut device = module.open_device(options);
    match &device {
        Ok(session) => events.record(
            &HarnessEvent::new("device_opened")
                .with_module(module.name())
                .with_message(session.label()),
        ),
        Err(err) => events.record(
            &HarnessEvent::new("device_open_failed")
                .with_module(module.name())
                .with_message(err.to_string()),
        ),
    }
    let served = loop {
        let request = match read_message::<WorkerRequest>(reader) {
            Ok(request) => request,
            Err(ProtocolError::Closed) => break Ok(()),
            Err(err) => break Err(err),
        };
        let reply = match request {
            WorkerRequest::Execute {
                params,
            } => match &mut device {
                Ok(session) => execute_guarded(session.as_mut(), &params),
                Err(err) => WorkerReply::failed(err.to_string()),
            },
        };
        if let Err(err) = write_message(writer, &reply) {
            break Err(err);
        }
    };
    if let Ok(session) = device {
        let label = session.label().to_string();
        match session.close() {
            Ok(()) => events.record(
                &HarnessEvent::new("device_closed").with_module(module.name()).with_message(label),
            ),
            Err(err) => events.record(
                &HarnessEvent::new("device_close_failed")
                    .with_module(module.name())
                    .with_message(err.to_string()),
            ),
        }
    }
    served
}
