//! # Connection and Command States
//!
//! The emergency handshake is driven by the device's emergency flag:
//!
//! | Current           | Emergency flag | Action | Next      |
//! |-------------------|----------------|--------|-----------|
//! | InitiateEmergency | set            | -      | Idle      |
//! | InitiateEmergency | clear          | Raise  | Emergency |
//! | Emergency         | set            | Clear  | Idle      |
//! | InitiateReset     | clear          | -      | Idle      |
//! | InitiateReset     | set            | Raise  | Reset     |
//! | Reset             | clear          | Clear  | Idle      |
//!
//! Every other combination keeps the current state.

/// Link state with the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Channels open, waiting for the first accepted telemetry
    Bootstrapping,
    Connected,
}

/// Progress of a multi-step emergency request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandState {
    #[default]
    Idle,
    InitiateEmergency,
    Emergency,
    InitiateReset,
    Reset,
}

/// Input bitmask change issued by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyAction {
    /// Land and set the emergency bit
    Raise,
    /// Land and clear the emergency bit
    Clear,
}

/// Advance the command state for one telemetry sample
pub fn next_command_state(
    state: CommandState,
    has_emergency: bool,
) -> (CommandState, Option<EmergencyAction>) {
    use CommandState::*;

    match (state, has_emergency) {
        (InitiateEmergency, true) => (Idle, None),
        (InitiateEmergency, false) => (Emergency, Some(EmergencyAction::Raise)),
        (Emergency, true) => (Idle, Some(EmergencyAction::Clear)),
        (InitiateReset, false) => (Idle, None),
        (InitiateReset, true) => (Reset, Some(EmergencyAction::Raise)),
        (Reset, false) => (Idle, Some(EmergencyAction::Clear)),
        (state, _) => (state, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CommandState::*;

    #[test]
    fn test_transition_table() {
        let cases = [
            (InitiateEmergency, true, Idle, None),
            (InitiateEmergency, false, Emergency, Some(EmergencyAction::Raise)),
            (Emergency, true, Idle, Some(EmergencyAction::Clear)),
            (Emergency, false, Emergency, None),
            (InitiateReset, false, Idle, None),
            (InitiateReset, true, Reset, Some(EmergencyAction::Raise)),
            (Reset, false, Idle, Some(EmergencyAction::Clear)),
            (Reset, true, Reset, None),
            (Idle, true, Idle, None),
            (Idle, false, Idle, None),
        ];

        for (state, emergency, next, action) in cases {
            assert_eq!(
                next_command_state(state, emergency),
                (next, action),
                "{:?} with emergency={}",
                state,
                emergency
            );
        }
    }

    #[test]
    fn test_full_emergency_cycle() {
        // Device not yet in emergency: raise, wait for the flag, then clear
        let (state, action) = next_command_state(InitiateEmergency, false);
        assert_eq!(action, Some(EmergencyAction::Raise));
        let (state, action) = next_command_state(state, false);
        assert_eq!((state, action), (Emergency, None));
        let (state, action) = next_command_state(state, true);
        assert_eq!((state, action), (Idle, Some(EmergencyAction::Clear)));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(CommandState::default(), Idle);
    }
}
