//! Routing of verified packet bodies to handlers.
//!
//! Each body is parsed into a [`Command`] keyed by its first byte, then run
//! against the [`Target`]. Handlers never fail the session: bad arguments
//! become `E01`, target failures become `E NN` with the target's code, and
//! anything unrecognized gets the empty "not supported" reply.

use rspstub_packet::hex::{decode_hex, parse_hex_u64};
use rspstub_target::Target;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::CommandError;
use crate::features::supported_reply;
use crate::query::{self, Attachment, QueryKind};
use crate::reply::Reply;

/// Reply code for arguments that could not be decoded.
pub const MALFORMED: u8 = 0x01;
/// Reply code for selecting a thread for `c`.
pub const CONTINUE_THREAD_UNSUPPORTED: u8 = 0x99;
/// Signal reported in stop replies (SIGTRAP).
pub const SIGTRAP: u8 = 5;

/// A parsed request from the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `c [addr]`
    Continue { addr: Option<u64> },
    /// `s [addr]`
    Step { addr: Option<u64> },
    /// `g`
    ReadRegisters,
    /// `G XX…`
    WriteRegisters { image: Vec<u8> },
    /// `H op thread-id`
    SetThread { op: u8, thread: &'a [u8] },
    /// `m addr,length`
    ReadMemory { addr: u64, len: usize },
    /// `M addr,length:XX…`
    WriteMemory { addr: u64, data: Vec<u8> },
    /// `q name[:args]`
    Query { kind: QueryKind, args: &'a [u8] },
    /// `Q name[:args]`
    Set { args: &'a [u8] },
    /// `?`
    HaltReason,
    /// `D`
    Detach,
    /// `k`
    Kill,
    /// Anything else, including an empty body.
    Unsupported { command: Option<u8> },
}

impl<'a> Command<'a> {
    /// Parse a verified packet body.
    pub fn parse(body: &'a [u8]) -> Result<Self, CommandError> {
        let Some((&command, args)) = body.split_first() else {
            return Ok(Command::Unsupported { command: None });
        };

        let parsed = match command {
            b'c' => Command::Continue {
                addr: optional_addr(command, args)?,
            },
            b's' => Command::Step {
                addr: optional_addr(command, args)?,
            },
            b'g' => Command::ReadRegisters,
            b'G' => Command::WriteRegisters {
                image: decode_hex(args).map_err(CommandError::hex(command))?,
            },
            b'H' => {
                let (&op, thread) = args.split_first().ok_or(CommandError::Malformed {
                    command: 'H',
                    reason: "missing operation",
                })?;
                Command::SetThread { op, thread }
            }
            b'm' => {
                let (addr, len) = addr_len(command, args)?;
                Command::ReadMemory { addr, len }
            }
            b'M' => {
                let (header, digits) = split_once(args, b':').ok_or(CommandError::Malformed {
                    command: 'M',
                    reason: "missing ':' before data",
                })?;
                let (addr, len) = addr_len(command, header)?;
                let data = decode_hex(digits).map_err(CommandError::hex(command))?;
                if data.len() != len {
                    return Err(CommandError::Malformed {
                        command: 'M',
                        reason: "data length does not match declared length",
                    });
                }
                Command::WriteMemory { addr, data }
            }
            b'q' => Command::Query {
                kind: QueryKind::classify(args),
                args,
            },
            b'Q' => Command::Set { args },
            b'?' => Command::HaltReason,
            b'D' => Command::Detach,
            b'k' => Command::Kill,
            other => Command::Unsupported {
                command: Some(other),
            },
        };
        Ok(parsed)
    }
}

fn split_once(bytes: &[u8], separator: u8) -> Option<(&[u8], &[u8])> {
    let idx = bytes.iter().position(|&b| b == separator)?;
    Some((&bytes[..idx], &bytes[idx + 1..]))
}

fn optional_addr(command: u8, args: &[u8]) -> Result<Option<u64>, CommandError> {
    if args.is_empty() {
        return Ok(None);
    }
    parse_hex_u64(args)
        .map(Some)
        .map_err(CommandError::hex(command))
}

fn addr_len(command: u8, args: &[u8]) -> Result<(u64, usize), CommandError> {
    let (addr, len) = split_once(args, b',').ok_or(CommandError::Malformed {
        command: char::from(command),
        reason: "missing ',' between address and length",
    })?;
    let addr = parse_hex_u64(addr).map_err(CommandError::hex(command))?;
    let len = parse_hex_u64(len).map_err(CommandError::hex(command))?;
    let len = usize::try_from(len).map_err(|_| CommandError::Malformed {
        command: char::from(command),
        reason: "length does not fit in memory",
    })?;
    Ok((addr, len))
}

/// Runs commands against one target and keeps the per-connection state.
pub struct Dispatcher<T> {
    target: T,
    attachment: Attachment,
    supported: String,
    max_body_len: usize,
}

impl<T: Target> Dispatcher<T> {
    pub fn new(target: T, config: &SessionConfig) -> Self {
        Self {
            target,
            attachment: Attachment::default(),
            supported: supported_reply(config.packet.max_body_len, &config.features),
            max_body_len: config.packet.max_body_len,
        }
    }

    /// Handle one verified body and produce the reply to send.
    pub fn dispatch(&mut self, body: &[u8]) -> Reply {
        let command = match Command::parse(body) {
            Ok(command) => command,
            Err(err) => {
                warn!(
                    body = %String::from_utf8_lossy(body),
                    error = %err,
                    "rejecting malformed command"
                );
                return Reply::error(MALFORMED);
            }
        };

        debug!(?command, "dispatching");
        let reply = self.run(command);
        self.bounded(reply)
    }

    fn run(&mut self, command: Command<'_>) -> Reply {
        match command {
            Command::Continue { addr } => match self.target.resume(addr) {
                Ok(()) => Reply::Silent,
                Err(err) => target_failure("resume", err),
            },
            Command::Step { addr } => match self.target.step(addr) {
                Ok(()) => Reply::stopped(SIGTRAP),
                Err(err) => target_failure("step", err),
            },
            Command::ReadRegisters => match self.target.read_registers() {
                Ok(image) => Reply::hex(&image),
                Err(err) => target_failure("read registers", err),
            },
            Command::WriteRegisters { image } => match self.target.write_registers(&image) {
                Ok(()) => Reply::ok(),
                Err(err) => target_failure("write registers", err),
            },
            Command::SetThread { op, thread } => {
                debug!(
                    op = %char::from(op),
                    thread = %String::from_utf8_lossy(thread),
                    "set thread"
                );
                match op {
                    b'g' | b'G' | b'm' | b'M' => Reply::ok(),
                    b'c' => Reply::error(CONTINUE_THREAD_UNSUPPORTED),
                    _ => Reply::empty(),
                }
            }
            Command::ReadMemory { addr, len } => {
                if len.saturating_mul(2) > self.max_body_len {
                    let err = CommandError::TooLarge {
                        command: 'm',
                        len: len.saturating_mul(2),
                        max: self.max_body_len,
                    };
                    warn!(error = %err, "rejecting memory read");
                    return Reply::error(MALFORMED);
                }
                match self.target.read_memory(addr, len) {
                    Ok(bytes) => Reply::hex(&bytes),
                    Err(err) => target_failure("read memory", err),
                }
            }
            Command::WriteMemory { addr, data } => match self.target.write_memory(addr, &data) {
                Ok(()) => Reply::ok(),
                Err(err) => target_failure("write memory", err),
            },
            Command::Query { kind, args } => {
                query::answer(kind, args, &mut self.attachment, &self.supported)
            }
            Command::Set { args } => {
                debug!(args = %String::from_utf8_lossy(args), "ignoring set packet");
                Reply::empty()
            }
            Command::HaltReason => Reply::stopped(SIGTRAP),
            Command::Detach => Reply::Final(b"OK".to_vec()),
            Command::Kill => Reply::Close,
            Command::Unsupported { command } => {
                debug!(command = ?command.map(char::from), "unsupported command");
                Reply::empty()
            }
        }
    }

    fn bounded(&self, reply: Reply) -> Reply {
        match reply.body() {
            Some(body) if body.len() > self.max_body_len => {
                warn!(
                    len = body.len(),
                    max = self.max_body_len,
                    "reply exceeds packet limit"
                );
                Reply::error(MALFORMED)
            }
            _ => reply,
        }
    }

    /// Borrow the target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Mutably borrow the target.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Consume the dispatcher and return the target.
    pub fn into_target(self) -> T {
        self.target
    }

    /// Current attachment state.
    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    /// The precomputed `qSupported` reply body.
    pub fn supported(&self) -> &str {
        &self.supported
    }
}

fn target_failure(operation: &'static str, err: rspstub_target::TargetError) -> Reply {
    warn!(operation, error = %err, code = err.code(), "target operation failed");
    Reply::error(err.code())
}

#[cfg(test)]
mod tests {
    use rspstub_target::{SimConfig, SimTarget, TargetError};

    use super::*;

    fn dispatcher() -> Dispatcher<SimTarget> {
        let target = SimTarget::new(SimConfig {
            register_count: 2,
            memory_base: 0x1000,
            memory_size: 0x100,
        });
        Dispatcher::new(target, &SessionConfig::default())
    }

    fn reply_text(reply: &Reply) -> &str {
        std::str::from_utf8(reply.body().unwrap_or_default()).unwrap()
    }

    #[test]
    fn parse_routes_by_first_byte() {
        assert_eq!(
            Command::parse(b"c").unwrap(),
            Command::Continue { addr: None }
        );
        assert_eq!(
            Command::parse(b"c1000").unwrap(),
            Command::Continue { addr: Some(0x1000) }
        );
        assert_eq!(
            Command::parse(b"s2000").unwrap(),
            Command::Step { addr: Some(0x2000) }
        );
        assert_eq!(Command::parse(b"g").unwrap(), Command::ReadRegisters);
        assert_eq!(
            Command::parse(b"Hg0").unwrap(),
            Command::SetThread {
                op: b'g',
                thread: b"0"
            }
        );
        assert_eq!(
            Command::parse(b"m1000,4").unwrap(),
            Command::ReadMemory {
                addr: 0x1000,
                len: 4
            }
        );
        assert_eq!(
            Command::parse(b"M1000,2:beef").unwrap(),
            Command::WriteMemory {
                addr: 0x1000,
                data: vec![0xBE, 0xEF]
            }
        );
        assert_eq!(Command::parse(b"?").unwrap(), Command::HaltReason);
        assert_eq!(Command::parse(b"D;1").unwrap(), Command::Detach);
        assert_eq!(Command::parse(b"k").unwrap(), Command::Kill);
        assert_eq!(
            Command::parse(b"z0,1000,4").unwrap(),
            Command::Unsupported {
                command: Some(b'z')
            }
        );
        assert_eq!(
            Command::parse(b"").unwrap(),
            Command::Unsupported { command: None }
        );
    }

    #[test]
    fn parse_rejects_malformed_arguments() {
        assert!(matches!(
            Command::parse(b"m1000"),
            Err(CommandError::Malformed { command: 'm', .. })
        ));
        assert!(matches!(
            Command::parse(b"mzz,4"),
            Err(CommandError::Hex { command: 'm', .. })
        ));
        assert!(matches!(
            Command::parse(b"M1000,2"),
            Err(CommandError::Malformed { command: 'M', .. })
        ));
        assert!(matches!(
            Command::parse(b"M1000,3:beef"),
            Err(CommandError::Malformed { command: 'M', .. })
        ));
        assert!(matches!(
            Command::parse(b"Gabc"),
            Err(CommandError::Hex { command: 'G', .. })
        ));
        assert!(matches!(
            Command::parse(b"H"),
            Err(CommandError::Malformed { command: 'H', .. })
        ));
        assert!(matches!(
            Command::parse(b"cxyz"),
            Err(CommandError::Hex { command: 'c', .. })
        ));
    }

    #[test]
    fn unrecognized_command_gets_empty_reply() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(b"z"), Reply::empty());
        assert_eq!(d.dispatch(b"vCont?"), Reply::empty());
        assert_eq!(d.dispatch(b""), Reply::empty());
    }

    #[test]
    fn set_packets_get_empty_reply() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(b"QStartNoAckMode"), Reply::empty());
    }

    #[test]
    fn malformed_arguments_reply_e01() {
        let mut d = dispatcher();
        assert_eq!(reply_text(&d.dispatch(b"m1000")), "E01");
        assert_eq!(reply_text(&d.dispatch(b"M1000,4:00")), "E01");
    }

    #[test]
    fn read_registers_as_hex() {
        let mut d = dispatcher();
        d.target_mut().set_register(0, 0x1122_3344);
        d.target_mut().set_pc(0x1000);
        assert_eq!(
            reply_text(&d.dispatch(b"g")),
            "443322110000000000100000"
        );
    }

    #[test]
    fn write_registers_then_read_back() {
        let mut d = dispatcher();
        assert_eq!(
            d.dispatch(b"G010000000200000000200000"),
            Reply::ok()
        );
        assert_eq!(d.target().register(1), Some(2));
        assert_eq!(d.target().pc(), 0x2000);
    }

    #[test]
    fn write_registers_wrong_size_reports_einval() {
        let mut d = dispatcher();
        assert_eq!(reply_text(&d.dispatch(b"G0102")), "E16");
    }

    #[test]
    fn memory_write_then_read() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(b"M1010,4:deadbeef"), Reply::ok());
        assert_eq!(reply_text(&d.dispatch(b"m100f,6")), "00DEADBEEF00");
    }

    #[test]
    fn memory_fault_reports_efault() {
        let mut d = dispatcher();
        assert_eq!(reply_text(&d.dispatch(b"m0,4")), "E0E");
        assert_eq!(reply_text(&d.dispatch(b"M10ff,2:0000")), "E0E");
    }

    #[test]
    fn oversized_memory_read_is_rejected_before_target() {
        let mut d = dispatcher();
        // 0x200 bytes render as 0x400 hex digits, beyond the 0x255 bound.
        assert_eq!(reply_text(&d.dispatch(b"m1000,200")), "E01");
    }

    #[test]
    fn set_thread_ops() {
        let mut d = dispatcher();
        for body in [&b"Hg0"[..], b"HG1", b"Hm-1", b"HM0"] {
            assert_eq!(d.dispatch(body), Reply::ok());
        }
        assert_eq!(reply_text(&d.dispatch(b"Hc-1")), "E99");
        assert_eq!(d.dispatch(b"Hx0"), Reply::empty());
    }

    #[test]
    fn continue_is_silent_and_resumes() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(b"c1000"), Reply::Silent);
        assert_eq!(d.target().resume_count(), 1);
        assert_eq!(d.target().pc(), 0x1000);
    }

    #[test]
    fn continue_failure_reports_code() {
        let mut d = dispatcher();
        assert_eq!(reply_text(&d.dispatch(b"c100000000")), "E0E");
    }

    #[test]
    fn step_reports_sigtrap() {
        let mut d = dispatcher();
        assert_eq!(reply_text(&d.dispatch(b"s")), "S05");
        assert_eq!(d.target().pc(), 4);
        assert_eq!(d.target().step_count(), 1);
    }

    #[test]
    fn step_without_support_reports_enosys() {
        let mut d = Dispatcher::new(NoStep, &SessionConfig::default());
        assert_eq!(reply_text(&d.dispatch(b"s")), "E26");
    }

    #[test]
    fn halt_detach_kill() {
        let mut d = dispatcher();
        assert_eq!(reply_text(&d.dispatch(b"?")), "S05");
        assert_eq!(d.dispatch(b"D"), Reply::Final(b"OK".to_vec()));
        assert_eq!(d.dispatch(b"k"), Reply::Close);
    }

    #[test]
    fn queries_share_attachment_state() {
        let mut d = dispatcher();
        assert!(!d.attachment().is_attached());
        assert_eq!(reply_text(&d.dispatch(b"qAttached")), "0");
        assert_eq!(reply_text(&d.dispatch(b"qAttached")), "1");
        assert!(d.attachment().is_attached());
        assert_eq!(reply_text(&d.dispatch(b"qSupported")), "PacketSize=255");
        assert_eq!(reply_text(&d.dispatch(b"qfThreadInfo")), "m1");
        assert_eq!(reply_text(&d.dispatch(b"qsThreadInfo")), "1");
        assert_eq!(d.dispatch(b"qC"), Reply::empty());
    }

    #[test]
    fn supported_reflects_configured_bound() {
        let config = SessionConfig::default().with_max_body_len(0x1000);
        let d = Dispatcher::new(SimTarget::default(), &config);
        assert_eq!(d.supported(), "PacketSize=1000");
    }

    struct NoStep;

    impl Target for NoStep {
        fn read_registers(&mut self) -> rspstub_target::Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn write_registers(&mut self, _image: &[u8]) -> rspstub_target::Result<()> {
            Ok(())
        }

        fn read_memory(&mut self, addr: u64, len: usize) -> rspstub_target::Result<Vec<u8>> {
            Err(TargetError::Fault { addr, len })
        }

        fn write_memory(&mut self, addr: u64, data: &[u8]) -> rspstub_target::Result<()> {
            Err(TargetError::Fault {
                addr,
                len: data.len(),
            })
        }

        fn resume(&mut self, _addr: Option<u64>) -> rspstub_target::Result<()> {
            Ok(())
        }
    }
}
