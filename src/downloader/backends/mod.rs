// Resolver backends

pub mod ytdlp;

pub use ytdlp::YtDlp;
