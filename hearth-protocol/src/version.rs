use hearth_packets::VarInt;

/// Maps a protocol number onto the vanilla version name it belongs to.
///
/// Only the versions this server has been exercised against are listed;
/// anything else is advertised with a generic name, which clients accept
/// as long as the protocol number matches.
pub fn version_name(protocol: VarInt) -> &'static str {
    match protocol {
        765 => "1.20.4",
        766 => "1.20.6",
        767 => "1.21.1",
        772 => "1.21.7",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_versions() {
        assert_eq!(version_name(765), "1.20.4");
        assert_eq!(version_name(772), "1.21.7");
        assert_eq!(version_name(-1), "unknown");
    }
}
