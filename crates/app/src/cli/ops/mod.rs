pub mod init;
pub mod login;
pub mod ls;
pub mod open;
pub mod seal;
pub mod serve;
pub mod share;
pub mod whoami;

pub use init::Init;
pub use login::Login;
pub use ls::Ls;
pub use open::Open;
pub use seal::Seal;
pub use serve::Serve;
pub use share::Share;
pub use whoami::Whoami;
