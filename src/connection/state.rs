/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake done or in progress, `connect` not yet received
    #[default]
    Handshaking,

    /// `connect` accepted
    Connected,

    Publishing,

    Playing,

    /// The read loop exits before the next message
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Publishing | ConnectionState::Playing
        )
    }

    /// `publish` and `play` bind a role only once
    pub fn can_bind_role(&self) -> bool {
        *self == ConnectionState::Connected
    }

    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        match (*self, next) {
            (ConnectionState::Handshaking, ConnectionState::Connected) => true,
            (ConnectionState::Connected, ConnectionState::Publishing) => true,
            (ConnectionState::Connected, ConnectionState::Playing) => true,
            (ConnectionState::Closed, _) => false,
            (_, ConnectionState::Closed) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let state = ConnectionState::default();
        assert!(state.can_transition_to(ConnectionState::Connected));
        assert!(!state.can_transition_to(ConnectionState::Publishing));
        assert!(ConnectionState::Connected.can_bind_role());
        assert!(!ConnectionState::Playing.can_bind_role());
        assert!(!ConnectionState::Publishing.can_transition_to(ConnectionState::Playing));
        assert!(ConnectionState::Playing.can_transition_to(ConnectionState::Closed));
        assert!(!ConnectionState::Closed.can_transition_to(ConnectionState::Connected));
        assert!(ConnectionState::Publishing.is_connected());
    }
}
