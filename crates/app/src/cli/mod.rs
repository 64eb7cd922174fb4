pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Init, Login, Ls, Open, Seal, Serve, Share, Whoami};
