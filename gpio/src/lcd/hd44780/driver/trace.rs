use crate::lcd::hd44780::driver::{mirror_byte, LogicalPins};
use crate::mock::MockEvent;
use std::collections::HashMap;

/// One byte latched by the controller, as seen on the wires.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BusTransfer {
    /// Register select level: `false` for an instruction, `true` for data.
    pub rs: bool,
    /// Read/write level: `false` for a write.
    pub rw: bool,
    /// The byte, with the mirroring undone if it was applied.
    pub byte: u8,
}

/// Replays a recorded [MockEvent] log the way the controller would see it.
///
/// Line levels are tracked from the writes. The shift register is modelled stage by stage: it is
/// zeroed while clear is low, and every low-to-high clock edge shifts the data level in. Each
/// high-to-low edge on EN latches the register contents together with the RS and RW levels.
///
/// Lines that were never written count as low.
pub fn decode_transfers(
    events: &[MockEvent],
    lines: &LogicalPins,
    input_mirrored: bool,
) -> Vec<BusTransfer> {
    let mut levels: HashMap<usize, bool> = HashMap::new();
    let mut register = 0u8;
    let mut transfers = Vec::new();

    for event in events {
        let MockEvent::Write { line, value } = *event else {
            continue;
        };
        let previous = levels.insert(line, value).unwrap_or(false);
        let level = |line: usize| levels.get(&line).copied().unwrap_or(false);

        if line == lines.sreg_clr && !value {
            register = 0;
        } else if line == lines.sreg_clk && value && !previous {
            // LSb goes in first, so after 8 clocks it has travelled down to bit 0
            register = (register >> 1) | ((level(lines.sreg_dat) as u8) << 7);
        } else if line == lines.lcd_en && !value && previous {
            transfers.push(BusTransfer {
                rs: level(lines.lcd_rs),
                rw: level(lines.lcd_rw),
                byte: if input_mirrored { mirror_byte(register) } else { register },
            });
        }
    }

    transfers
}
