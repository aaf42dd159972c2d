mod config_file;
#[cfg(feature = "music")]
mod now_playing;
