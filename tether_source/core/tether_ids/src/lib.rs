pub mod ids;

pub use ids::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_nil() {
        let nil = NodeID::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.index(), 0);
        assert_eq!(nil.generation(), 0);
        assert_eq!(NodeID::default(), nil);
    }

    #[test]
    fn node_id_parts() {
        let id = NodeID::from_parts(5, 2);
        assert_eq!(id.index(), 5);
        assert_eq!(id.generation(), 2);
        assert!(!id.is_nil());
    }

    #[test]
    fn node_id_generation_distinguishes_reused_slot() {
        let old = NodeID::from_parts(3, 0);
        let reused = NodeID::from_parts(3, 1);
        assert_eq!(old.index(), reused.index());
        assert_ne!(old, reused);
    }

    #[test]
    fn node_id_parse_short_and_long() {
        assert_eq!(NodeID::parse_str("2a").unwrap(), NodeID::from_parts(0x2a, 0));
        assert_eq!(
            NodeID::parse_str("0x0000000100000007").unwrap(),
            NodeID::from_parts(7, 1)
        );
        assert_eq!("0000000100000007".parse::<NodeID>().unwrap(), NodeID::from_parts(7, 1));
        assert!(NodeID::parse_str("").is_err());
        assert!(NodeID::parse_str("xyz").is_err());
        assert!(NodeID::parse_str("00000000000000001").is_err());
    }

    #[test]
    fn node_id_serializes_as_hex() {
        let id = NodeID::from_parts(7, 1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0000000100000007\"");
        let back: NodeID = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn node_id_deserializes_from_integer() {
        let back: NodeID = serde_json::from_str("4294967303").unwrap();
        assert_eq!(back, NodeID::from_parts(7, 1));
    }

    #[test]
    fn node_id_display() {
        let id = NodeID::from_parts(4, 9);
        assert_eq!(id.to_string(), "4:9");
        assert_eq!(format!("{id:?}"), "NodeID(4:9)");
        assert_eq!(NodeID::parse_str("4:9").unwrap(), id);
        assert!(NodeID::parse_str("4:x").is_err());
    }
}
