//! Inspect the virtual-to-physical translations of a target process.
//!
//! ```text
//! vm-inspector [-v] <pid> <va_begin> <va_end>
//! ```
//!
//! Captures a mirror of the target's page tables over the given range
//! through the privileged snapshot channel, walks it, and prints one line
//! per present page (`-v` additionally surfaces unmapped pages as sentinel
//! lines). A `pid` of `-1` leaves target selection to the provider.
//! Addresses accept hexadecimal with a `0x` prefix or plain decimal.

use std::env;
use std::error::Error;
use std::process::ExitCode;

use inspector_addresses::VirtualAddress;
use inspector_snapshot::TargetPid;

const USAGE: &str = "Usage: vm-inspector [-v] <pid> <va_begin> <va_end>";

struct Args {
    report_gaps: bool,
    pid: TargetPid,
    begin: VirtualAddress,
    end: VirtualAddress,
}

fn main() -> ExitCode {
    env_logger::init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let Some(args) = parse_args(&raw) else {
        // Malformed input: usage goes to stdout, exit is nonzero, nothing is
        // captured or walked.
        println!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("vm-inspector: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_os = "linux")]
fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    use inspector_snapshot::{LinuxPagetableSyscalls, MirroredBuffers, SnapshotProvider, ingest};
    use std::io::{self, Write};

    let provider = LinuxPagetableSyscalls;
    let layout = provider.table_layout()?;

    let mut buffers = MirroredBuffers::allocate();
    provider.capture(args.pid, args.begin, args.end, &mut buffers)?;
    let snapshot = ingest(&buffers, layout)?;

    log::info!(
        "walking [{}, {}) for pid {}",
        args.begin,
        args.end,
        args.pid.as_raw()
    );

    let mut stdout = io::stdout().lock();
    for record in snapshot.walk(args.begin, args.end, args.report_gaps) {
        writeln!(stdout, "{record}")?;
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run(_args: &Args) -> Result<(), Box<dyn Error>> {
    Err("the capture channel is only available on Linux".into())
}

fn parse_args(raw: &[String]) -> Option<Args> {
    let (report_gaps, rest) = match raw {
        [flag, rest @ ..] if flag == "-v" => (true, rest),
        rest => (false, rest),
    };
    let [pid, begin, end] = rest else {
        return None;
    };

    Some(Args {
        report_gaps,
        pid: parse_pid(pid)?,
        begin: parse_vaddr(begin)?,
        end: parse_vaddr(end)?,
    })
}

/// A pid is a plain decimal number, or the literal `-1` sentinel.
fn parse_pid(s: &str) -> Option<TargetPid> {
    if s == "-1" {
        return Some(TargetPid::UNSPECIFIED);
    }
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i32>().ok().map(TargetPid::new)
}

/// An address is hexadecimal with a `0x`/`0X` prefix, otherwise decimal.
fn parse_vaddr(s: &str) -> Option<VirtualAddress> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(VirtualAddress::new);
    }
    s.parse::<u64>().ok().map(VirtualAddress::new)
}
