//! NEC infrared frame timings.
//!
//! A frame is a 9 ms leader mark, a 4.5 ms space, 32 data bits (address,
//! inverted address, command, inverted command, LSB first) and a trailing
//! mark. Timings alternate mark/space and are in microseconds.

pub const LEADER_MARK_US: u16 = 9_000;
pub const LEADER_SPACE_US: u16 = 4_500;
pub const BIT_MARK_US: u16 = 562;
pub const ZERO_SPACE_US: u16 = 562;
pub const ONE_SPACE_US: u16 = 1_687;

/// Number of timings in one frame: leader pair, 32 bit pairs, stop mark.
pub const FRAME_TIMINGS: usize = 2 + 32 * 2 + 1;

pub fn encode(address: u8, command: u8) -> Vec<u16> {
    let mut timings = Vec::with_capacity(FRAME_TIMINGS);
    timings.push(LEADER_MARK_US);
    timings.push(LEADER_SPACE_US);

    for byte in [address, !address, command, !command] {
        for bit in 0..8 {
            timings.push(BIT_MARK_US);
            timings.push(if (byte >> bit) & 1 == 1 {
                ONE_SPACE_US
            } else {
                ZERO_SPACE_US
            });
        }
    }

    timings.push(BIT_MARK_US);
    timings
}

/// Inverse of [`encode`], rejecting frames whose check bytes do not match.
pub fn decode(timings: &[u16]) -> Option<(u8, u8)> {
    if timings.len() != FRAME_TIMINGS {
        return None;
    }

    let mut bytes = [0u8; 4];
    for (index, space) in timings[2..66].iter().skip(1).step_by(2).enumerate() {
        if *space > (ZERO_SPACE_US + ONE_SPACE_US) / 2 {
            bytes[index / 8] |= 1 << (index % 8);
        }
    }

    let [address, address_check, command, command_check] = bytes;
    (address == !address_check && command == !command_check).then_some((address, command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_leader_and_stop() {
        let frame = encode(0x00, 0x10);

        assert_eq!(frame.len(), FRAME_TIMINGS);
        assert_eq!(&frame[..2], &[LEADER_MARK_US, LEADER_SPACE_US]);
        assert_eq!(frame.last(), Some(&BIT_MARK_US));
    }

    #[test]
    fn bits_are_lsb_first() {
        let frame = encode(0x01, 0x00);

        // First address bit is 1, second is 0.
        assert_eq!(frame[3], ONE_SPACE_US);
        assert_eq!(frame[5], ZERO_SPACE_US);
        // Inverted address starts with bit 0 = 0.
        assert_eq!(frame[2 + 16 + 1], ZERO_SPACE_US);
    }

    #[test]
    fn decodes_own_frames() {
        assert_eq!(decode(&encode(0x00, 0x13)), Some((0x00, 0x13)));
        assert_eq!(decode(&encode(0xEF, 0x01)), Some((0xEF, 0x01)));
    }

    #[test]
    fn rejects_corrupted_check_byte() {
        let mut frame = encode(0x00, 0x11);
        // Flip the first bit of the inverted command.
        let index = 2 + 3 * 16 + 1;
        frame[index] = if frame[index] == ONE_SPACE_US {
            ZERO_SPACE_US
        } else {
            ONE_SPACE_US
        };

        assert_eq!(decode(&frame), None);
        assert_eq!(decode(&frame[..10]), None);
    }
}
