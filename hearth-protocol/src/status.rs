use crate::options::ServerOptions;
use crate::version::version_name;
use serde::Serialize;

/// The status JSON document returned for a server list query.
///
/// The field casing follows the wire contract, which is why the two chat
/// flags carry explicit renames.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub version: ServerVersion,
    pub players: ServerPlayers,
    pub description: Description,
    #[serde(rename = "enforcesSecureChat")]
    pub enforces_secure_chat: bool,
    #[serde(rename = "previewsChat")]
    pub previews_chat: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerPlayers {
    pub max: usize,
    pub online: usize,
    pub sample: Vec<PlayerSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSample {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Description {
    pub text: String,
}

/// Assembles the status document from the server options and the live
/// player count.
pub fn build_status(options: &ServerOptions, online: usize) -> ServerStatus {
    ServerStatus {
        version: ServerVersion {
            name: version_name(options.protocol_version).to_owned(),
            protocol: options.protocol_version,
        },
        players: ServerPlayers {
            max: options.max_players,
            online,
            sample: Vec::new(),
        },
        description: Description {
            text: options.motd.clone(),
        },
        enforces_secure_chat: false,
        previews_chat: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_document_shape() {
        let options = ServerOptions {
            motd: "hello".to_owned(),
            max_players: 64,
            protocol_version: 765,
            ..ServerOptions::default()
        };
        let json = serde_json::to_value(build_status(&options, 3)).unwrap();

        assert_eq!(json["version"]["name"], "1.20.4");
        assert_eq!(json["version"]["protocol"], 765);
        assert_eq!(json["players"]["max"], 64);
        assert_eq!(json["players"]["online"], 3);
        assert_eq!(json["players"]["sample"].as_array().unwrap().len(), 0);
        assert_eq!(json["description"]["text"], "hello");
        assert_eq!(json["enforcesSecureChat"], false);
        assert_eq!(json["previewsChat"], false);
    }
}
