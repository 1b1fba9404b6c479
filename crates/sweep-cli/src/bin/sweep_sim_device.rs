// crates/sweep-cli/src/bin/sweep_sim_device.rs
// ============================================================================
// Module: Simulated Device Host
// Description: Stand-in device host for demos and end-to-end tests.
// Purpose: Reproduce pass, failure, hang, and crash behavior on demand.
// Dependencies: clap, sweep-core, sweep-runner
// ============================================================================

//! ## Overview
//! Answers framed execute requests the way a real device host would. The
//! vector parameters choose the behavior:
//! - `sleep_ms`: delay before replying (a long delay simulates a hang).
//! - `fail_message` / `failure_kind`: reply with a failure.
//! - `perf_ns`: end-to-end duration reported on success.
//! - `exit`: exit immediately with this code, without replying.
//! - `panic`: abort the host mid-request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use sweep_core::FailureKind;
use sweep_core::VectorParams;
use sweep_core::WorkerReply;
use sweep_runner::DeviceRequest;
use sweep_runner::ProtocolError;
use sweep_runner::protocol::read_message;
use sweep_runner::protocol::write_message;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Simulated device host.
#[derive(Parser, Debug)]
#[command(name = "sweep-sim-device")]
struct SimArgs {
    /// Module the session was opened for.
    #[arg(long, value_name = "MODULE")]
    module: Option<String>,
}

/// What to do with one request.
enum Step {
    /// Send this reply.
    Reply(WorkerReply),
    /// Exit without replying.
    Exit(u8),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Serves requests until stdin closes.
fn main() -> ExitCode {
    let args = SimArgs::parse();
    let module = args.module.unwrap_or_else(|| "unnamed".to_string());
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = stdin.lock();
    let mut writer = stdout.lock();
    loop {
        let request = match read_message::<DeviceRequest>(&mut reader) {
            Ok(request) => request,
            Err(ProtocolError::Closed) => return ExitCode::SUCCESS,
            Err(err) => return fail(&module, &err.to_string()),
        };
        let DeviceRequest::Execute {
            params,
        } = request;
        match simulate(&params) {
            Step::Reply(reply) => {
                if let Err(err) = write_message(&mut writer, &reply) {
                    return fail(&module, &err.to_string());
                }
            }
            Step::Exit(code) => return ExitCode::from(code),
        }
    }
}

// ============================================================================
// SECTION: Simulation
// ============================================================================

/// Applies the behavior selected by the vector parameters.
fn simulate(params: &VectorParams) -> Step {
    if let Some(millis) = params.get("sleep_ms").and_then(Value::as_u64) {
        thread::sleep(Duration::from_millis(millis));
    }
    if let Some(code) = params.get("exit").and_then(Value::as_u64) {
        return Step::Exit(u8::try_from(code).unwrap_or(u8::MAX));
    }
    if params.get("panic").and_then(Value::as_bool) == Some(true) {
        abort_host();
    }
    if let Some(message) = params.get("fail_message").and_then(Value::as_str) {
        let failure_kind = params
            .get("failure_kind")
            .cloned()
            .and_then(|kind| serde_json::from_value::<FailureKind>(kind).ok());
        return Step::Reply(WorkerReply {
            status: false,
            message: message.to_string(),
            e2e_perf_ns: None,
            failure_kind,
        });
    }
    Step::Reply(WorkerReply {
        status: true,
        message: "simulated pass".to_string(),
        e2e_perf_ns: params.get("perf_ns").and_then(Value::as_u64),
        failure_kind: None,
    })
}

/// Crashes the host the way a faulting device driver would.
#[allow(clippy::panic, reason = "Simulates a device driver crash on request.")]
fn abort_host() -> ! {
    panic!("simulated device crash");
}

/// Reports a host error and returns a failure exit code.
fn fail(module: &str, message: &str) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "sweep-sim-device ({module}): {message}");
    ExitCode::FAILURE
}
