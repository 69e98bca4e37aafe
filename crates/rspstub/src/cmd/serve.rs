use std::io::Write;

use rspstub_session::{SessionConfig, StubListener};
use rspstub_target::{SimConfig, SimTarget};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_session, OutputFormat, SessionSummary};

/// Smallest body bound accepted for a session.
const MIN_PACKET: usize = 8;

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    validate(&args)?;

    let sim = SimConfig {
        register_count: args.registers,
        memory_base: args.memory_base,
        memory_size: args.memory_size,
    };
    let config = SessionConfig::default().with_max_body_len(args.max_packet);

    let listener = StubListener::bind(&args.host, args.port)
        .map_err(|err| session_error("bind failed", err))?
        .with_config(config);
    let listen_addr = listener.local_addr();

    // Scripts binding port 0 read the real address from this line.
    let mut stdout = std::io::stdout();
    writeln!(stdout, "listening on {listen_addr}")
        .and_then(|()| stdout.flush())
        .map_err(|err| io_error("stdout", err))?;

    let target = SimTarget::new(sim);
    info!(
        memory = ?target.memory_range(),
        registers = args.registers,
        "simulated target ready"
    );

    let mut connection = listener
        .accept(target)
        .map_err(|err| session_error("accept failed", err))?;
    let end = connection
        .serve()
        .map_err(|err| session_error("session failed", err))?;

    let target = connection.dispatcher().target();
    info!(
        pc = target.pc(),
        resumes = target.resume_count(),
        steps = target.step_count(),
        "final target state"
    );

    let summary = SessionSummary {
        listen_addr: listen_addr.to_string(),
        peer_addr: connection.peer_addr().map(|addr| addr.to_string()),
        end,
        stats: connection.stats(),
    };
    print_session(&summary, format);
    Ok(SUCCESS)
}

fn validate(args: &ServeArgs) -> CliResult<()> {
    if args.max_packet < MIN_PACKET {
        return Err(CliError::new(
            USAGE,
            format!("--max-packet must be at least {MIN_PACKET}"),
        ));
    }
    if args
        .memory_base
        .checked_add(args.memory_size as u64)
        .is_none()
    {
        return Err(CliError::new(
            USAGE,
            "--memory-base + --memory-size overflows the address space",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            port: 0,
            host: "127.0.0.1".to_string(),
            registers: 32,
            memory_base: 0,
            memory_size: 0x100,
            max_packet: rspstub_packet::DEFAULT_MAX_BODY_LEN,
        }
    }

    #[test]
    fn default_args_are_valid() {
        assert!(validate(&args()).is_ok());
    }

    #[test]
    fn tiny_packet_bound_is_usage_error() {
        let mut bad = args();
        bad.max_packet = 2;
        assert_eq!(validate(&bad).unwrap_err().code, USAGE);
    }

    #[test]
    fn memory_past_end_of_address_space_is_usage_error() {
        let mut bad = args();
        bad.memory_base = u64::MAX;
        assert_eq!(validate(&bad).unwrap_err().code, USAGE);
    }
}
