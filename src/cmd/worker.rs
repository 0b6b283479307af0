use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::{CHUNK_SIZE, REDUCER_ADDR};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Port to accept chunks on
    #[clap(short = 'P', long)]
    pub port: u16,
    /// Address to bind
    #[clap(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,
    /// Reducer to forward partial counts to
    #[clap(short, long, default_value = REDUCER_ADDR)]
    pub reducer: String,
    /// Most bytes read from a single chunk connection
    #[clap(short, long, default_value_t = CHUNK_SIZE)]
    pub max_chunk: usize,
}

impl Args {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
