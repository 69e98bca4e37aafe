//! Serve a simulated target to one debugger, with a program preloaded.
//!
//! Run with:
//!   cargo run --example sim-stub
//!
//! Then attach from the debugger:
//!   (gdb) target remote 127.0.0.1:3333

use rspstub::session::StubListener;
use rspstub::target::{SimConfig, SimTarget, Target};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut target = SimTarget::new(SimConfig {
        register_count: 16,
        memory_base: 0x8000,
        memory_size: 0x4000,
    });

    // A few recognizable words at the entry point.
    target.write_memory(0x8000, &[0x13, 0x00, 0x00, 0x00, 0x6f, 0x00, 0x00, 0x00])?;
    target.set_pc(0x8000);

    let listener = StubListener::bind("127.0.0.1", 3333)?;
    eprintln!("Listening on {}", listener.local_addr());

    let mut connection = listener.accept(target)?;
    if let Some(peer) = connection.peer_addr() {
        eprintln!("Debugger connected: {peer}");
    }

    let end = connection.serve()?;
    let stats = connection.stats();
    eprintln!(
        "Session ended ({end:?}): {} packets, {} replies",
        stats.packets, stats.replies
    );
    Ok(())
}
