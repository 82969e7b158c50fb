pub mod check;
pub mod init;
pub mod version;

pub use check::Check;
pub use init::Init;
pub use version::Version;
