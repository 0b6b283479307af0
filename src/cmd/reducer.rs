use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::REDUCER_PORT;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Port to accept worker frames on
    #[clap(short = 'P', long, default_value_t = REDUCER_PORT)]
    pub port: u16,
    /// Address to bind
    #[clap(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,
}

impl Args {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
