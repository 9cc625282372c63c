pub mod server;

use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Server {
        config: Option<PathBuf>,
        port: Option<u16>,
    },
}
