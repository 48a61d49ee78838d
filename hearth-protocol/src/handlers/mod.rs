pub(crate) mod configuration;
pub(crate) mod handshaking;
pub(crate) mod login;
pub(crate) mod play;
pub(crate) mod status;
