use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Waiting for C0+C1
    #[default]
    Uninitialized,

    /// Sent S0+S1+S2, waiting for C2
    SentS0S1S2,

    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeEvent {
    ReceivedC0C1,
    ReceivedC2,
}

impl HandshakeState {
    pub fn is_done(&self) -> bool {
        *self == HandshakeState::Done
    }

    /// Advance on `event`, rejecting out-of-order input
    pub fn transition(&mut self, event: HandshakeEvent) -> Result<()> {
        *self = match (*self, event) {
            (HandshakeState::Uninitialized, HandshakeEvent::ReceivedC0C1) => HandshakeState::SentS0S1S2,
            (HandshakeState::SentS0S1S2, HandshakeEvent::ReceivedC2) => HandshakeState::Done,
            (state, event) => {
                return Err(Error::handshake(format!(
                    "Invalid transition from {:?} with event {:?}",
                    state, event
                )));
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut state = HandshakeState::default();
        state.transition(HandshakeEvent::ReceivedC0C1).unwrap();
        assert!(!state.is_done());
        state.transition(HandshakeEvent::ReceivedC2).unwrap();
        assert!(state.is_done());
    }

    #[test]
    fn test_out_of_order() {
        let mut state = HandshakeState::default();
        assert!(state.transition(HandshakeEvent::ReceivedC2).is_err());
        assert_eq!(state, HandshakeState::Uninitialized);
    }
}
