//! Typed ID definitions for relay resources.
//!
//! Each ID type has a unique prefix identifying the resource type.
//! IDs are ULID-based for sortability and uniqueness.

use crate::define_id;

define_id!(ConnectionId, "conn");
define_id!(ServiceId, "svc");

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn connection_id_roundtrip() {
        let id = ConnectionId::new();
        let parsed: ConnectionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn connection_id_prefix() {
        let id = ConnectionId::new();
        assert!(id.to_string().starts_with("conn_"));
    }

    #[test]
    fn wrong_prefix_is_rejected() {
        let result: Result<ConnectionId, _> = "svc_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(
            result.unwrap_err(),
            crate::IdError::InvalidPrefix { .. }
        ));
    }

    #[test]
    fn missing_separator_is_rejected() {
        let result: Result<ConnectionId, _> = "conn01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(
            result.unwrap_err(),
            crate::IdError::MissingSeparator
        ));
    }

    #[test]
    fn empty_string_is_rejected() {
        let result: Result<ConnectionId, _> = "".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::Empty));
    }

    #[test]
    fn invalid_ulid_is_rejected() {
        let result: Result<ServiceId, _> = "svc_not-a-ulid".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::InvalidUlid(_)));
    }

    #[test]
    fn json_roundtrip() {
        let id = ServiceId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ServiceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn connection_ids_sort_by_accept_time() {
        let first = ConnectionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ConnectionId::new();
        assert!(first < second);
    }

    proptest! {
        #[test]
        fn parse_never_panics(s in ".*") {
            let _ = ConnectionId::parse(&s);
        }

        #[test]
        fn display_roundtrips(raw in any::<u128>()) {
            let id = ConnectionId::from_ulid(crate::Ulid::from(raw));
            let parsed = ConnectionId::parse(&id.to_string()).unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
