//! `q` packet classification and answers.

use tracing::{debug, info};

use crate::reply::Reply;

/// Recognized `q` sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Attached,
    Supported,
    FThreadInfo,
    SThreadInfo,
    Symbol,
    TStatus,
    Xfer,
    Unknown,
}

/// Known names, matched as case-sensitive prefixes in this order.
const QUERY_NAMES: &[(&[u8], QueryKind)] = &[
    (b"Supported", QueryKind::Supported),
    (b"TStatus", QueryKind::TStatus),
    (b"Attached", QueryKind::Attached),
    (b"fThreadInfo", QueryKind::FThreadInfo),
    (b"sThreadInfo", QueryKind::SThreadInfo),
    (b"Symbol", QueryKind::Symbol),
    (b"Xfer", QueryKind::Xfer),
];

impl QueryKind {
    /// Classify the text following `q`.
    ///
    /// The sub-command name ends at `:`, `;`, `,` or the end of the body.
    pub fn classify(args: &[u8]) -> Self {
        let name = query_name(args);
        QUERY_NAMES
            .iter()
            .find(|(known, _)| name.starts_with(known))
            .map(|&(_, kind)| kind)
            .unwrap_or(QueryKind::Unknown)
    }
}

/// The sub-command name at the start of a query's arguments.
pub fn query_name(args: &[u8]) -> &[u8] {
    let end = args
        .iter()
        .position(|b| matches!(b, b':' | b';' | b','))
        .unwrap_or(args.len());
    &args[..end]
}

/// Whether the stub is already attached to a running target.
///
/// Starts detached. The first `qAttached` answers `0` ("a new process is
/// being created") and flips the state; every later one answers `1`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    attached: bool,
}

impl Attachment {
    /// Answer a `qAttached` query, attaching on first use.
    pub fn query(&mut self) -> bool {
        let was_attached = self.attached;
        if was_attached {
            debug!("attached to existing process");
        } else {
            info!("creating new process");
            self.attached = true;
        }
        was_attached
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Answer a classified query.
///
/// `supported` is the precomputed `qSupported` body. Unknown queries are
/// answered with an empty packet like any other unsupported command, so a
/// debugger never waits on a reply that will not come.
pub fn answer(
    kind: QueryKind,
    args: &[u8],
    attachment: &mut Attachment,
    supported: &str,
) -> Reply {
    match kind {
        QueryKind::Attached => {
            if attachment.query() {
                Reply::text("1")
            } else {
                Reply::text("0")
            }
        }
        QueryKind::Supported => {
            if let Some(offered) = args.strip_prefix(b"Supported:") {
                debug!(
                    offered = %String::from_utf8_lossy(offered),
                    "debugger features"
                );
            }
            Reply::text(supported)
        }
        QueryKind::FThreadInfo => Reply::text("m1"),
        QueryKind::SThreadInfo => Reply::text("1"),
        QueryKind::Symbol | QueryKind::TStatus | QueryKind::Xfer => Reply::empty(),
        QueryKind::Unknown => {
            debug!(
                query = %String::from_utf8_lossy(query_name(args)),
                "unrecognized query"
            );
            Reply::empty()
        }
    }
}
